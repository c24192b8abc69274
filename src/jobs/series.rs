//! Time-series jobs: the grid time-series service and the chart server.
//!
//! Both are queried per parameter over a rolling 21 day window reaching nine
//! days into the future, and judged by how many days actually carry data.

use super::{JobError, OutputOptions, SAMPLES_PER_DAY};
use crate::config::Config;
use crate::db::{now_seconds, SeriesRecord, SeriesSource, Store};
use crate::probe::{self, ProbeOutcome};
use crate::report::{series_chart, write_log_file, SERIES_LOG_HEADER};

use chrono::{Duration as ChronoDuration, Local, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Days in every requested window.
pub const DAYS_REQUESTED: i64 = 21;
/// How far past today the window ends.
pub const DAYS_AHEAD: i64 = 9;
/// Parameters probed when none are given.
pub const DEFAULT_PARAMETERS: [&str; 3] = ["sdfsw", "tm", "sd"];

const CHARTSERVER_LINE_SEPARATOR: &str = "<br />";
const CHARTSERVER_TOKEN_SEPARATOR: &str = ", ";
const CHARTSERVER_NO_DATA: &str = "Ingen data";

/// Errors interpreting a time-series response body.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing field {0}")]
    MissingField(&'static str),
    #[error("invalid NoDataValue: {0}")]
    InvalidNoDataValue(String),
}

/// Inclusive date range of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    /// The window ending `DAYS_AHEAD` days after `today`, `DAYS_REQUESTED` days long.
    pub fn rolling(today: NaiveDate) -> Self {
        let to = today + ChronoDuration::days(DAYS_AHEAD);
        let from = to - ChronoDuration::days(DAYS_REQUESTED - 1);
        Self { from, to }
    }
}

/// Date format the source expects in its URL.
pub fn date_format(source: SeriesSource) -> &'static str {
    match source {
        SeriesSource::Gts => "%Y-%m-%d",
        SeriesSource::Chartserver => "%Y%m%d",
    }
}

/// Days of history included in reports.
pub fn history_days(source: SeriesSource) -> usize {
    match source {
        SeriesSource::Gts => 11,
        SeriesSource::Chartserver => 10,
    }
}

/// Build the request URL for one parameter.
pub fn build_url(
    source: SeriesSource,
    base_url: &str,
    parameter: &str,
    window: DateWindow,
) -> String {
    let fmt = date_format(source);
    let from = window.from.format(fmt);
    let to = window.to.format(fmt);

    match source {
        SeriesSource::Gts => format!(
            "{}/api/GridTimeSeries/gridtimeserie?theme={}&startdate={}&enddate={}&x=111899&y=6730791",
            base_url, parameter, from, to
        ),
        SeriesSource::Chartserver => format!(
            "{}/chartserver/ShowData.aspx?req=getchart&ver=1.0&vfmt=text\
             &time={}T0600;{}T0600\
             &chs=10x10&lang=no&chlf=desc&chsl=0;+0&chhl=2|0|2&timeo=-06:00&app=3d\
             &chd=ds=hgts,da=29,id=111899;6730791;{},cht=line,mth=inst&nocache=0.1597993119329173",
            base_url, from, to, parameter
        ),
    }
}

/// Count the days with data in a response body.
pub fn days_received(
    source: SeriesSource,
    body: &str,
    days_requested: i64,
) -> Result<i64, ParseError> {
    match source {
        SeriesSource::Gts => parse_gts(body),
        SeriesSource::Chartserver => Ok(parse_chartserver(body, days_requested)),
    }
}

/// Count the values in `Data` that differ from the declared `NoDataValue`.
pub fn parse_gts(body: &str) -> Result<i64, ParseError> {
    let json: Value = serde_json::from_str(body)?;
    let data = json
        .get("Data")
        .and_then(Value::as_array)
        .ok_or(ParseError::MissingField("Data"))?;
    let no_data = json
        .get("NoDataValue")
        .ok_or(ParseError::MissingField("NoDataValue"))
        .and_then(no_data_value)?;

    let count = data
        .iter()
        .filter(|d| d.as_f64() != Some(no_data as f64))
        .count();
    Ok(count as i64)
}

fn no_data_value(v: &Value) -> Result<i64, ParseError> {
    if let Some(n) = v.as_i64() {
        return Ok(n);
    }
    if let Some(f) = v.as_f64() {
        return Ok(f.trunc() as i64);
    }
    v.as_str()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| ParseError::InvalidNoDataValue(v.to_string()))
}

/// Days with data in a chart server text body.
///
/// Lines with fewer than two tokens are days without data. A body carrying
/// the no-data marker anywhere has no days at all.
pub fn parse_chartserver(body: &str, days_requested: i64) -> i64 {
    if body.contains(CHARTSERVER_NO_DATA) {
        return 0;
    }

    let days_without_data = body
        .split(CHARTSERVER_LINE_SEPARATOR)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.split(CHARTSERVER_TOKEN_SEPARATOR)
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .count()
        })
        .filter(|&tokens| tokens < 2)
        .count();

    days_requested - days_without_data as i64
}

/// Probes one time-series source for a list of parameters.
#[derive(Debug, Clone)]
pub struct SeriesJob {
    pub source: SeriesSource,
    pub base_url: String,
    pub timeout: Duration,
    pub parameters: Vec<String>,
}

impl SeriesJob {
    pub fn gts(cfg: &Config, parameters: Vec<String>) -> Self {
        Self::new(SeriesSource::Gts, &cfg.gts_base_url, cfg.series_timeout(), parameters)
    }

    pub fn chartserver(cfg: &Config, parameters: Vec<String>) -> Self {
        Self::new(
            SeriesSource::Chartserver,
            &cfg.chartserver_base_url,
            cfg.series_timeout(),
            parameters,
        )
    }

    /// An empty parameter list selects [`DEFAULT_PARAMETERS`].
    pub fn new(
        source: SeriesSource,
        base_url: &str,
        timeout: Duration,
        parameters: Vec<String>,
    ) -> Self {
        let parameters = if parameters.is_empty() {
            DEFAULT_PARAMETERS.iter().map(|p| p.to_string()).collect()
        } else {
            parameters
        };
        Self {
            source,
            base_url: base_url.to_string(),
            timeout,
            parameters,
        }
    }

    /// Probe and record every parameter in turn, then render reports as requested.
    pub async fn run(
        &self,
        cfg: &Config,
        store: &Store,
        opts: OutputOptions,
    ) -> Result<(), JobError> {
        let today = Local::now().date_naive();

        for parameter in &self.parameters {
            let record = self.probe_parameter(parameter, today, now_seconds()).await;
            store.insert_series_record(self.source, &record)?;

            tracing::info!(
                "{} {}: http_code={} responds_time={:.3}s days_received={}/{}",
                self.source,
                parameter,
                record.http_status,
                record.latency_seconds,
                record.days_received,
                record.days_requested
            );
        }

        if opts.write_to_file || opts.make_plot {
            let limit = history_days(self.source) * SAMPLES_PER_DAY * DEFAULT_PARAMETERS.len();
            let history = store.recent_series_records(self.source, limit)?;
            let name = self.source.name();

            if opts.write_to_file {
                write_log_file(&cfg.log_file_path(name), &SERIES_LOG_HEADER, &history)?;
            }

            if opts.make_plot {
                series_chart(name, &self.parameters, &history)
                    .write(&cfg.plot_file_path(name))?;
            }
        }

        Ok(())
    }

    /// Probe one parameter. Always yields a record; failures give the
    /// all-zero fallback.
    pub async fn probe_parameter(
        &self,
        parameter: &str,
        today: NaiveDate,
        time: NaiveDateTime,
    ) -> SeriesRecord {
        let window = DateWindow::rolling(today);
        let url = build_url(self.source, &self.base_url, parameter, window);
        let outcome = probe::execute(&url, self.timeout).await;
        self.record(parameter, url, outcome, time)
    }

    fn record(
        &self,
        parameter: &str,
        url: String,
        outcome: ProbeOutcome,
        time: NaiveDateTime,
    ) -> SeriesRecord {
        let fallback = |url: String| SeriesRecord {
            time,
            parameter: parameter.to_string(),
            http_status: 0,
            latency_seconds: 0.0,
            days_requested: DAYS_REQUESTED,
            days_received: 0,
            url,
            body: String::new(),
        };

        let response = match outcome {
            ProbeOutcome::Success(response) => response,
            ProbeOutcome::Failure(e) => {
                tracing::warn!("{}: {} requesting {}: {}", self.source, e.kind(), url, e);
                return fallback(url);
            }
        };

        let body = response.text();
        match days_received(self.source, &body, DAYS_REQUESTED) {
            Ok(days) => SeriesRecord {
                time,
                parameter: parameter.to_string(),
                http_status: i64::from(response.status),
                latency_seconds: response.latency_seconds(),
                days_requested: DAYS_REQUESTED,
                days_received: days,
                url,
                body,
            },
            Err(e) => {
                tracing::warn!("{}: ParseError for {}: {}", self.source, url, e);
                fallback(url)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ProbeError, ProbeResponse};
    use crate::testutil::{closed_port_url, serve, WarnCounter};
    use axum::{extract::Query, routing::get, Router};
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup() -> (TempDir, Config, Store) {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            db_path: dir.path().join("logging.sqlite"),
            output_dir: dir.path().join("out"),
            ..Default::default()
        };
        let store = Store::new(&cfg.db_path).unwrap();
        (dir, cfg, store)
    }

    #[test]
    fn test_rolling_window() {
        let window = DateWindow::rolling(date(2024, 12, 28));
        assert_eq!(window.to, date(2025, 1, 6));
        assert_eq!(window.from, date(2024, 12, 17));
        assert_eq!((window.to - window.from).num_days(), DAYS_REQUESTED - 1);
    }

    #[test]
    fn test_urls_use_source_date_format() {
        let window = DateWindow::rolling(date(2024, 3, 1));

        let gts = build_url(SeriesSource::Gts, "http://gts.test", "tm", window);
        assert_eq!(
            gts,
            "http://gts.test/api/GridTimeSeries/gridtimeserie?theme=tm&startdate=2024-02-19&enddate=2024-03-10&x=111899&y=6730791"
        );

        let chart = build_url(SeriesSource::Chartserver, "http://chart.test", "sd", window);
        assert!(chart.starts_with(
            "http://chart.test/chartserver/ShowData.aspx?req=getchart&ver=1.0&vfmt=text\
             &time=20240219T0600;20240310T0600&chs=10x10"
        ));
        assert!(chart.contains("id=111899;6730791;sd,cht=line"));
    }

    #[test]
    fn test_parse_gts() {
        assert_eq!(parse_gts(r#"{"Data": [5, -9999, 7], "NoDataValue": -9999}"#).unwrap(), 2);
        assert_eq!(parse_gts(r#"{"Data": [1.5, -9999.0], "NoDataValue": "-9999"}"#).unwrap(), 1);
        assert_eq!(parse_gts(r#"{"Data": [], "NoDataValue": -9999}"#).unwrap(), 0);
    }

    #[test]
    fn test_parse_gts_errors() {
        assert!(matches!(parse_gts("<html>"), Err(ParseError::Json(_))));
        assert!(matches!(
            parse_gts(r#"{"NoDataValue": -9999}"#),
            Err(ParseError::MissingField("Data"))
        ));
        assert!(matches!(
            parse_gts(r#"{"Data": [1]}"#),
            Err(ParseError::MissingField("NoDataValue"))
        ));
        assert!(matches!(
            parse_gts(r#"{"Data": [1], "NoDataValue": "none"}"#),
            Err(ParseError::InvalidNoDataValue(_))
        ));
    }

    #[test]
    fn test_parse_chartserver() {
        let body = "2020-01-01, 12.3 <br />2020-01-02, <br />2020-01-03, 9.8 ";
        assert_eq!(parse_chartserver(body, 3), 2);
        assert_eq!(parse_chartserver("", 21), 21);
    }

    #[test]
    fn test_parse_chartserver_no_data_marker() {
        let body = "2020-01-01, 12.3 <br />2020-01-02, 4.0 <br />Ingen data";
        assert_eq!(parse_chartserver(body, 21), 0);
        assert_eq!(days_received(SeriesSource::Chartserver, "Ingen data", 21).unwrap(), 0);
    }

    fn response(body: &str) -> ProbeOutcome {
        ProbeOutcome::Success(ProbeResponse {
            status: 200,
            latency: Duration::from_millis(40),
            body: body.as_bytes().to_vec(),
        })
    }

    #[test]
    fn test_one_warning_per_failed_parameter() {
        let job = SeriesJob::new(
            SeriesSource::Gts,
            "http://gts.test",
            Duration::from_secs(5),
            Vec::new(),
        );
        let url = "http://gts.test/api/GridTimeSeries/gridtimeserie?theme=tm".to_string();

        let counter = WarnCounter::default();
        let outcome = ProbeOutcome::Failure(ProbeError::Connect("connection refused".into()));
        let record = counter.capture(|| job.record("tm", url.clone(), outcome, now_seconds()));
        assert_eq!(counter.count(), 1);
        assert_eq!(record.http_status, 0);

        let counter = WarnCounter::default();
        let outcome = response("<html>");
        let record = counter.capture(|| job.record("tm", url.clone(), outcome, now_seconds()));
        assert_eq!(counter.count(), 1);
        assert_eq!(record.http_status, 0);
        assert!(record.body.is_empty());

        let counter = WarnCounter::default();
        let body = r#"{"Data": [1, -9999], "NoDataValue": -9999}"#;
        let outcome = response(body);
        let record = counter.capture(|| job.record("tm", url.clone(), outcome, now_seconds()));
        assert_eq!(counter.count(), 0);
        assert_eq!(record.days_received, 1);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let (_dir, cfg, store) = setup();
        rusqlite::Connection::open(&cfg.db_path)
            .unwrap()
            .execute_batch("DROP TABLE chartserver_up_time")
            .unwrap();
        let base = closed_port_url().await;
        let job = SeriesJob::new(
            SeriesSource::Chartserver,
            base.trim_end_matches('/'),
            Duration::from_secs(5),
            Vec::new(),
        );

        let result = job.run(&cfg, &store, OutputOptions::default()).await;
        assert!(matches!(result, Err(JobError::Db(_))));
    }

    #[test]
    fn test_default_parameters() {
        let job = SeriesJob::gts(&Config::default(), Vec::new());
        assert_eq!(job.parameters, vec!["sdfsw", "tm", "sd"]);

        let job = SeriesJob::chartserver(&Config::default(), vec!["sd".to_string()]);
        assert_eq!(job.parameters, vec!["sd"]);
        assert_eq!(job.source, SeriesSource::Chartserver);
    }

    #[tokio::test]
    async fn test_failed_parameter_does_not_stop_others() {
        let (_dir, cfg, store) = setup();
        let app = Router::new().route(
            "/api/GridTimeSeries/gridtimeserie",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                match q.get("theme").map(String::as_str) {
                    Some("tm") => "not json".to_string(),
                    _ => r#"{"Data": [1, 2, -9999, 4], "NoDataValue": -9999}"#.to_string(),
                }
            }),
        );
        let base = serve(app).await;
        let job = SeriesJob::new(SeriesSource::Gts, &base, Duration::from_secs(5), Vec::new());

        job.run(&cfg, &store, OutputOptions::default()).await.unwrap();

        let mut records = store.recent_series_records(SeriesSource::Gts, 100).unwrap();
        records.reverse();
        assert_eq!(records.len(), 3);

        let params: Vec<&str> = records.iter().map(|r| r.parameter.as_str()).collect();
        assert_eq!(params, vec!["sdfsw", "tm", "sd"]);

        for r in [&records[0], &records[2]] {
            assert_eq!(r.http_status, 200);
            assert_eq!(r.days_received, 3);
            assert_eq!(r.days_requested, 21);
            assert!(!r.body.is_empty());
        }

        let failed = &records[1];
        assert_eq!(failed.http_status, 0);
        assert_eq!(failed.latency_seconds, 0.0);
        assert_eq!(failed.days_received, 0);
        assert!(failed.body.is_empty());
        assert!(failed.url.contains("theme=tm"));
    }

    #[tokio::test]
    async fn test_chartserver_probe() {
        let app = Router::new().route(
            "/chartserver/ShowData.aspx",
            get(|| async { "2020-01-01, 1.0 <br />2020-01-02, <br />" }),
        );
        let base = serve(app).await;
        let job = SeriesJob::new(
            SeriesSource::Chartserver,
            &base,
            Duration::from_secs(5),
            vec!["sd".to_string()],
        );

        let record = job.probe_parameter("sd", date(2024, 1, 1), now_seconds()).await;
        assert_eq!(record.http_status, 200);
        assert_eq!(record.days_received, DAYS_REQUESTED - 1);
        assert!(record.latency_seconds >= 0.0);
        assert_eq!(record.body, "2020-01-01, 1.0 <br />2020-01-02, <br />");
    }

    #[tokio::test]
    async fn test_unreachable_source_records_fallback() {
        let (_dir, cfg, store) = setup();
        let base = closed_port_url().await;
        let job = SeriesJob::new(
            SeriesSource::Chartserver,
            base.trim_end_matches('/'),
            Duration::from_secs(5),
            Vec::new(),
        );

        job.run(&cfg, &store, OutputOptions::default()).await.unwrap();

        let records = store.recent_series_records(SeriesSource::Chartserver, 100).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records
            .iter()
            .all(|r| r.http_status == 0 && r.days_received == 0 && r.latency_seconds == 0.0));
    }

    #[tokio::test]
    async fn test_run_writes_reports() {
        let (_dir, cfg, store) = setup();
        let app = Router::new().route(
            "/api/GridTimeSeries/gridtimeserie",
            get(|| async { r#"{"Data": [1, 2], "NoDataValue": -9999}"# }),
        );
        let base = serve(app).await;
        let job = SeriesJob::new(SeriesSource::Gts, &base, Duration::from_secs(5), Vec::new());
        let opts = OutputOptions {
            write_to_file: true,
            make_plot: true,
        };

        job.run(&cfg, &store, opts).await.unwrap();

        let log = std::fs::read_to_string(cfg.log_file_path("gts")).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], SERIES_LOG_HEADER.join("\t"));
        assert!(lines[1..].iter().all(|l| l.ends_with("\t21\t2")));

        let svg = std::fs::read_to_string(cfg.plot_file_path("gts")).unwrap();
        assert_eq!(svg.matches("<polyline").count(), 3);
    }
}
