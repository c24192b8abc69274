//! Endpoint jobs.
//!
//! Each job probes its endpoint(s), always appends one record per probe to
//! the store and optionally renders the recent history. Probe and parse
//! failures stay inside the job; store and report failures propagate.

mod series;
mod status;

pub use series::*;
pub use status::*;

use crate::db::DbError;
use crate::report::ReportError;
use thiserror::Error;

/// Errors that abort a job invocation.
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// What to render after the probes have been recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputOptions {
    pub write_to_file: bool,
    pub make_plot: bool,
}

/// Samples per day at the expected 15 minute schedule.
pub const SAMPLES_PER_DAY: usize = 24 * 4;
