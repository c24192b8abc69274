//! Probe module for endpoint monitoring.
//!
//! A probe is one bounded-time HTTP GET. It never fails from the caller's
//! point of view: every exit path yields a [`ProbeOutcome`].

mod http;

pub use http::*;

use std::time::Duration;
use thiserror::Error;

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("request failed: {0}")]
    Request(String),
}

impl ProbeError {
    /// Short category name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::Connect(_) => "ConnectionError",
            ProbeError::Timeout(_) => "Timeout",
            ProbeError::Request(_) => "RequestError",
        }
    }
}

/// A response that made it all the way back, whatever its status code.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    /// Wall time from sending the request until the body was fully read
    pub latency: Duration,
    pub body: Vec<u8>,
}

impl ProbeResponse {
    pub fn latency_seconds(&self) -> f64 {
        self.latency.as_secs_f64()
    }

    pub fn size(&self) -> usize {
        self.body.len()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Tagged result of one probe.
#[derive(Debug)]
pub enum ProbeOutcome {
    Success(ProbeResponse),
    Failure(ProbeError),
}

impl From<Result<ProbeResponse, ProbeError>> for ProbeOutcome {
    fn from(result: Result<ProbeResponse, ProbeError>) -> Self {
        match result {
            Ok(response) => ProbeOutcome::Success(response),
            Err(e) => ProbeOutcome::Failure(e),
        }
    }
}
