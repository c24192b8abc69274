//! Database model types.

use chrono::{Local, NaiveDateTime, Timelike};

/// Format used for every timestamp written to the store.
pub const DB_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Local wall-clock time truncated to whole seconds.
pub fn now_seconds() -> NaiveDateTime {
    truncate_to_seconds(Local::now().naive_local())
}

pub fn truncate_to_seconds(time: NaiveDateTime) -> NaiveDateTime {
    time.with_nanosecond(0).unwrap_or(time)
}

/// One probe of a simple-status endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusRecord {
    pub time: NaiveDateTime,
    pub job_name: String,
    /// HTTP status code, 0 when no response was received
    pub http_status: i64,
    /// Seconds; the job's max wait time when the probe failed
    pub latency_seconds: f64,
    pub payload_size_bytes: i64,
    /// The probed URL
    pub target: String,
}

/// One probe of a time-series endpoint for a single parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRecord {
    pub time: NaiveDateTime,
    pub parameter: String,
    pub http_status: i64,
    pub latency_seconds: f64,
    pub days_requested: i64,
    pub days_received: i64,
    pub url: String,
    /// Raw response text, empty on failure
    pub body: String,
}

/// Which time-series service a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesSource {
    Gts,
    Chartserver,
}

impl SeriesSource {
    pub fn name(self) -> &'static str {
        match self {
            SeriesSource::Gts => "gts",
            SeriesSource::Chartserver => "chartserver",
        }
    }

    pub(crate) fn table(self) -> &'static str {
        match self {
            SeriesSource::Gts => "gts_up_time",
            SeriesSource::Chartserver => "chartserver_up_time",
        }
    }
}

impl std::fmt::Display for SeriesSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
