//! HTTP probe implementation.

use std::time::{Duration, Instant};
use super::{ProbeError, ProbeOutcome, ProbeResponse};

/// Issue one GET against `url`, bounded by `timeout`.
///
/// Transport, timeout and body errors are folded into
/// [`ProbeOutcome::Failure`]; any status code the server answers with is a
/// [`ProbeOutcome::Success`].
pub async fn execute(url: &str, timeout: Duration) -> ProbeOutcome {
    fetch(url, timeout).await.into()
}

async fn fetch(url: &str, timeout: Duration) -> Result<ProbeResponse, ProbeError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProbeError::Request(e.to_string()))?;

    let start = Instant::now();

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| classify(e, timeout))?;

    let status = response.status().as_u16();

    // Read the full body to measure complete transfer time
    let body = response
        .bytes()
        .await
        .map_err(|e| classify(e, timeout))?;

    Ok(ProbeResponse {
        status,
        latency: start.elapsed(),
        body: body.to_vec(),
    })
}

fn classify(e: reqwest::Error, timeout: Duration) -> ProbeError {
    if e.is_timeout() {
        ProbeError::Timeout(timeout)
    } else if e.is_connect() {
        ProbeError::Connect(e.to_string())
    } else {
        ProbeError::Request(e.to_string())
    }
}
