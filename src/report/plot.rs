//! SVG charts of probe history.

use super::{ensure_parent, ReportError};
use crate::db::{SeriesRecord, StatusRecord};

use chrono::NaiveDateTime;
use std::fs;
use std::path::Path;

const WIDTH: f64 = 960.0;
const HEIGHT: f64 = 420.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 150.0;
const MARGIN_Y: f64 = 50.0;

const PALETTE: [&str; 6] = ["#1f77b4", "#ff7f0e", "#2ca02c", "#9467bd", "#8c564b", "#17becf"];
const FAILURE_COLOR: &str = "#d62728";

/// One labelled line on a chart.
#[derive(Debug, Clone)]
pub struct Line {
    pub label: String,
    pub points: Vec<(NaiveDateTime, f64)>,
}

/// A time-based line chart.
#[derive(Debug, Clone, Default)]
pub struct Chart {
    pub title: String,
    pub y_label: String,
    pub lines: Vec<Line>,
    /// Points drawn as red dots on top of the lines
    pub markers: Vec<(NaiveDateTime, f64)>,
}

impl Chart {
    /// Render the chart as a standalone SVG document.
    pub fn to_svg(&self) -> String {
        let all: Vec<(NaiveDateTime, f64)> = self
            .lines
            .iter()
            .flat_map(|l| l.points.iter().copied())
            .chain(self.markers.iter().copied())
            .collect();

        let (t_min, t_max) = match (all.iter().map(|p| p.0).min(), all.iter().map(|p| p.0).max()) {
            (Some(min), Some(max)) => (min, max),
            _ => return self.empty_svg(),
        };
        let y_max = all.iter().map(|p| p.1).fold(0.0_f64, f64::max);
        let y_max = if y_max > 0.0 && y_max.is_finite() { y_max } else { 1.0 };
        let t_span = ((t_max - t_min).num_seconds() as f64).max(1.0);

        let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = HEIGHT - 2.0 * MARGIN_Y;
        let x = |t: NaiveDateTime| MARGIN_LEFT + (t - t_min).num_seconds() as f64 / t_span * plot_w;
        let y = |v: f64| HEIGHT - MARGIN_Y - v.clamp(0.0, y_max) / y_max * plot_h;

        let mut svg = self.header();
        svg.push_str(&format!(
            r#"<line x1="{l}" y1="{b}" x2="{r}" y2="{b}" stroke="black"/><line x1="{l}" y1="{t}" x2="{l}" y2="{b}" stroke="black"/>"#,
            l = MARGIN_LEFT,
            r = MARGIN_LEFT + plot_w,
            t = MARGIN_Y,
            b = HEIGHT - MARGIN_Y,
        ));
        svg.push('\n');
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" font-size="11" text-anchor="end">{}</text>"#,
            MARGIN_LEFT - 6.0,
            MARGIN_Y + 4.0,
            format_value(y_max)
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" font-size="11" text-anchor="end">0</text>"#,
            MARGIN_LEFT - 6.0,
            HEIGHT - MARGIN_Y + 4.0
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" font-size="11">{}</text>"#,
            MARGIN_LEFT,
            HEIGHT - MARGIN_Y + 18.0,
            t_min.format("%Y-%m-%d %H:%M")
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" font-size="11" text-anchor="end">{}</text>"#,
            MARGIN_LEFT + plot_w,
            HEIGHT - MARGIN_Y + 18.0,
            t_max.format("%Y-%m-%d %H:%M")
        ));
        svg.push('\n');

        for (i, line) in self.lines.iter().enumerate() {
            let color = PALETTE[i % PALETTE.len()];
            let mut points = line.points.clone();
            points.sort_by_key(|p| p.0);
            let coords: Vec<String> = points
                .iter()
                .map(|&(t, v)| format!("{:.1},{:.1}", x(t), y(v)))
                .collect();
            svg.push_str(&format!(
                r#"<polyline fill="none" stroke="{}" stroke-width="1.5" points="{}"/>"#,
                color,
                coords.join(" ")
            ));
            svg.push_str(&format!(
                r#"<text x="{}" y="{}" font-size="12" fill="{}">{}</text>"#,
                MARGIN_LEFT + plot_w + 12.0,
                MARGIN_Y + 16.0 * (i as f64 + 1.0),
                color,
                escape(&line.label)
            ));
            svg.push('\n');
        }

        for &(t, v) in &self.markers {
            svg.push_str(&format!(
                r#"<circle cx="{:.1}" cy="{:.1}" r="3" fill="{}"/>"#,
                x(t),
                y(v),
                FAILURE_COLOR
            ));
        }

        svg.push_str("</svg>\n");
        svg
    }

    /// Render and write the chart to `path`.
    pub fn write(&self, path: &Path) -> Result<(), ReportError> {
        ensure_parent(path)?;
        fs::write(path, self.to_svg())?;
        tracing::info!("Wrote chart {}", path.display());
        Ok(())
    }

    fn header(&self) -> String {
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" font-family=\"sans-serif\">\n\
             <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n\
             <text x=\"{tx}\" y=\"24\" font-size=\"16\">{title}</text>\n\
             <text x=\"14\" y=\"{ly}\" font-size=\"12\" transform=\"rotate(-90 14 {ly})\" text-anchor=\"middle\">{y_label}</text>\n",
            w = WIDTH,
            h = HEIGHT,
            tx = MARGIN_LEFT,
            ly = HEIGHT / 2.0,
            title = escape(&self.title),
            y_label = escape(&self.y_label),
        )
    }

    fn empty_svg(&self) -> String {
        let mut svg = self.header();
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" font-size="14">no data</text>"#,
            MARGIN_LEFT,
            HEIGHT / 2.0
        ));
        svg.push_str("\n</svg>\n");
        svg
    }
}

/// Latency over time for one simple-status job; failed probes are marked.
pub fn status_chart(job_name: &str, records: &[StatusRecord]) -> Chart {
    Chart {
        title: format!("{} response time", job_name),
        y_label: "responds_time (s)".to_string(),
        lines: vec![Line {
            label: job_name.to_string(),
            points: records.iter().map(|r| (r.time, r.latency_seconds)).collect(),
        }],
        markers: records
            .iter()
            .filter(|r| r.http_status == 0 || r.http_status >= 400)
            .map(|r| (r.time, r.latency_seconds))
            .collect(),
    }
}

/// Days received over time, one line per parameter.
pub fn series_chart(name: &str, parameters: &[String], records: &[SeriesRecord]) -> Chart {
    let lines = parameters
        .iter()
        .map(|parameter| Line {
            label: parameter.clone(),
            points: records
                .iter()
                .filter(|r| &r.parameter == parameter)
                .map(|r| (r.time, r.days_received as f64))
                .collect(),
        })
        .collect();

    Chart {
        title: format!("{} days received", name),
        y_label: "days_received".to_string(),
        lines,
        markers: records
            .iter()
            .filter(|r| r.http_status == 0)
            .map(|r| (r.time, 0.0))
            .collect(),
    }
}

fn format_value(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
