//! Reporting: render stored history to a flat log file or a chart.

mod plot;

pub use plot::*;

use crate::db::{SeriesRecord, StatusRecord, DB_TIME_FORMAT};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Reporting error types.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Column header of the simple-status log file.
pub const STATUS_LOG_HEADER: [&str; 6] = [
    "date_and_time (Server is UTC0)",
    "log_who_short_name",
    "http_code",
    "responds_time (s)",
    "responds_size (bytes)",
    "log_who",
];

/// Column header of the time-series log files.
pub const SERIES_LOG_HEADER: [&str; 6] = [
    "date_and_time",
    "parameter",
    "http_code",
    "responds_time",
    "days_requested",
    "days_received",
];

/// A record that can be written as one line of a log file.
pub trait LogRow {
    fn columns(&self) -> Vec<String>;
}

impl LogRow for StatusRecord {
    fn columns(&self) -> Vec<String> {
        vec![
            self.time.format(DB_TIME_FORMAT).to_string(),
            self.job_name.clone(),
            self.http_status.to_string(),
            self.latency_seconds.to_string(),
            self.payload_size_bytes.to_string(),
            self.target.clone(),
        ]
    }
}

impl LogRow for SeriesRecord {
    fn columns(&self) -> Vec<String> {
        vec![
            self.time.format(DB_TIME_FORMAT).to_string(),
            self.parameter.clone(),
            self.http_status.to_string(),
            self.latency_seconds.to_string(),
            self.days_requested.to_string(),
            self.days_received.to_string(),
        ]
    }
}

/// Write `rows` as a tab separated file with `header` as its first line.
///
/// The file is replaced on every call; missing parent directories are created.
pub fn write_log_file<R: LogRow>(
    path: &Path,
    header: &[&str],
    rows: &[R],
) -> Result<(), ReportError> {
    ensure_parent(path)?;

    let mut out = BufWriter::new(fs::File::create(path)?);
    writeln!(out, "{}", header.join("\t"))?;
    for row in rows {
        writeln!(out, "{}", row.columns().join("\t"))?;
    }
    out.flush()?;

    tracing::info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

pub(crate) fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
