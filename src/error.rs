//! Pipeline error taxonomy.
//!
//! Four failure classes with different handling at the call site:
//! - `Transport` — transient network failure, retried by the fetch policy
//! - `Status` — permanent HTTP failure (4xx/5xx), never retried
//! - `Decode` / `Shape` — the payload is unusable, skip the unit
//! - `Db` — persistence failure, logged and skipped per record

use reqwest::StatusCode;
use thiserror::Error;

// ---

#[derive(Error, Debug)]
pub enum EtlError {
    /// Transient network-level failure (timeout, connection refused/reset).
    /// Construct via [`EtlError::from_transport`] so the request URL (which
    /// carries the credential query parameter) never reaches the logs.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),

    /// Non-2xx HTTP response; treated as permanent.
    #[error("request failed with status {0}")]
    Status(StatusCode),

    /// Malformed request URL.
    #[error("invalid request URL: {0}")]
    Url(String),

    /// Response body was not valid JSON.
    #[error("failed to decode response body: {0}")]
    Decode(String),

    /// Payload is missing required structure (no location block, no day list).
    #[error("unexpected payload shape: {0}")]
    Shape(String),

    /// Persistence-layer failure.
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

impl EtlError {
    /// Wrap a transport-level [`reqwest::Error`], stripping the request URL
    /// from it first. The URL embeds the API key as a query parameter and
    /// these errors are rendered into retry and skip log lines.
    pub fn from_transport(e: reqwest::Error) -> Self {
        EtlError::Transport(e.without_url())
    }

    /// Whether the fetch policy may retry after this error.
    ///
    /// Only transport-level failures are expected to self-resolve; HTTP
    /// status errors and decode failures are permanent for the call.
    pub fn is_transient(&self) -> bool {
        match self {
            EtlError::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_are_permanent() {
        assert!(!EtlError::Status(StatusCode::NOT_FOUND).is_transient());
        assert!(!EtlError::Status(StatusCode::INTERNAL_SERVER_ERROR).is_transient());
    }

    #[test]
    fn shape_and_decode_are_permanent() {
        assert!(!EtlError::Shape("no location block".into()).is_transient());
        assert!(!EtlError::Decode("not json".into()).is_transient());
    }

    #[tokio::test]
    async fn transport_error_display_omits_request_url() {
        let client = reqwest::Client::new();
        let err = client
            .get("http://127.0.0.1:1/v1/forecast.json?key=SUPERSECRET&q=Paris")
            .send()
            .await
            .expect_err("connect to port 1 must fail");

        let msg = EtlError::from_transport(err).to_string();
        assert!(!msg.contains("SUPERSECRET"), "credential leaked: {msg}");
        assert!(!msg.contains("key="), "query string leaked: {msg}");
    }
}
