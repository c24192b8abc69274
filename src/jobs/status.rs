//! Simple-status jobs: one URL, one record of status, latency and size.

use super::{JobError, OutputOptions, SAMPLES_PER_DAY};
use crate::config::Config;
use crate::db::{now_seconds, StatusRecord, Store};
use crate::probe::{self, ProbeError, ProbeOutcome};
use crate::report::{status_chart, write_log_file, STATUS_LOG_HEADER};

use chrono::NaiveDateTime;
use std::time::Duration;

/// Days of history included in reports.
pub const STATUS_HISTORY_DAYS: usize = 11;
/// Max wait of the named jobs, and the fallback for an unusable value.
pub const DEFAULT_MAX_WAIT_SECONDS: f64 = 15.0;

/// A named probe of a single fixed URL.
#[derive(Debug, Clone)]
pub struct StatusJob {
    pub name: String,
    pub url: String,
    /// Request timeout; also the latency recorded for a failed probe
    pub max_wait_seconds: f64,
}

impl StatusJob {
    /// A max wait that is not a positive finite number falls back to
    /// [`DEFAULT_MAX_WAIT_SECONDS`].
    pub fn new(name: &str, url: &str, max_wait_seconds: f64) -> Self {
        let max_wait_seconds = if max_wait_seconds > 0.0 && max_wait_seconds.is_finite() {
            max_wait_seconds
        } else {
            DEFAULT_MAX_WAIT_SECONDS
        };
        Self {
            name: name.to_string(),
            url: url.to_string(),
            max_wait_seconds,
        }
    }

    /// regObs KDV elements, needed by the app at startup.
    pub fn kdvelements(cfg: &Config) -> Self {
        Self::new(
            "kdvelements",
            &format!("{}/kdvelements/getkdvs/", cfg.regobs_base_url),
            DEFAULT_MAX_WAIT_SECONDS,
        )
    }

    /// regObs observations within 100 km of a fixed point.
    pub fn observations_within_radius(cfg: &Config) -> Self {
        Self::new(
            "getobservationswithinradius",
            &format!(
                "{}/Observations/GetObservationsWithinRadius?latitude=59.844226&longitude=10.42702&range=100000&geohazardId=70&$format=JSON",
                cfg.regobs_base_url
            ),
            DEFAULT_MAX_WAIT_SECONDS,
        )
    }

    /// Probe the URL, record the result, then render reports as requested.
    pub async fn run(
        &self,
        cfg: &Config,
        store: &Store,
        opts: OutputOptions,
    ) -> Result<(), JobError> {
        let timeout = Duration::from_secs_f64(self.max_wait_seconds);
        let outcome = probe::execute(&self.url, timeout).await;

        let record = self.record(&outcome, now_seconds());
        store.insert_status_record(&record)?;

        tracing::info!(
            "{}: http_code={} responds_time={:.3}s size={}",
            self.name,
            record.http_status,
            record.latency_seconds,
            record.payload_size_bytes
        );

        if opts.write_to_file || opts.make_plot {
            let limit = STATUS_HISTORY_DAYS * SAMPLES_PER_DAY;
            let history = store.recent_status_records(&self.name, limit)?;

            if opts.write_to_file {
                write_log_file(&cfg.log_file_path(&self.name), &STATUS_LOG_HEADER, &history)?;
            }

            if opts.make_plot {
                status_chart(&self.name, &history).write(&cfg.plot_file_path(&self.name))?;
            }
        }

        Ok(())
    }

    /// Build the record for an outcome.
    ///
    /// A failed probe is recorded with status 0, size 0 and the max wait time
    /// as latency, whatever the cause of the failure.
    pub fn record(&self, outcome: &ProbeOutcome, time: NaiveDateTime) -> StatusRecord {
        let (http_status, latency_seconds, payload_size_bytes) = match outcome {
            ProbeOutcome::Success(response) => (
                i64::from(response.status),
                response.latency_seconds(),
                response.size() as i64,
            ),
            ProbeOutcome::Failure(e) => {
                match e {
                    ProbeError::Connect(_) => {
                        tracing::warn!("ConnectionError for {}: {}", self.name, e)
                    }
                    _ => tracing::warn!("Error requesting for {} {}: {}", self.name, e.kind(), e),
                }
                (0, self.max_wait_seconds, 0)
            }
        };

        StatusRecord {
            time,
            job_name: self.name.clone(),
            http_status,
            latency_seconds,
            payload_size_bytes,
            target: self.url.clone(),
        }
    }
}
