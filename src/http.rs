use std::time::Duration;

use serde_json::Value;

const USER_AGENT_DEFAULT: &str = "bookvibe/0.1 (+https://github.com/bookvibe)";

/// Outcome of a single bounded GET. There is deliberately no retry here:
/// a failed provider call counts as a miss for the current resolution
/// attempt and the chain moves on.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("malformed JSON payload: {0}")]
    Payload(String),
}

/// Fetch a URL with query parameters and parse the body as JSON.
///
/// The timeout bounds the whole call (connect + read). Any failure mode is
/// collapsed into an `HttpError` for the caller to log and treat as a miss.
pub fn get_json(
    url: &str,
    query: &[(&str, &str)],
    timeout: Duration,
) -> Result<Value, HttpError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT_DEFAULT)
        .timeout(timeout)
        .build()
        .map_err(|e| HttpError::Request(e.to_string()))?;

    let resp = client
        .get(url)
        .query(query)
        .send()
        .map_err(|e| HttpError::Request(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(HttpError::Status(status.as_u16()));
    }

    resp.json::<Value>()
        .map_err(|e| HttpError::Payload(e.to_string()))
}
