//! Weather API access: URL construction and the retrying fetch client.
//!
//! `UrlBuilder` is pure (no I/O); `ApiClient` composes it with the retry
//! policy from [`crate::retry`] and exposes the [`WeatherSource`] trait the
//! orchestrator drives. The API credential is embedded in the query string
//! and is never logged.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;

use crate::retry::{with_retry, RetryPolicy};
use crate::EtlError;

// ---

/// Builds forecast and history query URLs. Pure; holds the opaque credential.
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    base_url: String,
    api_key: String,
}

impl UrlBuilder {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// 3-day forecast window with air-quality data enabled, alerts disabled.
    pub fn forecast_url(&self, location: &str) -> Result<Url, EtlError> {
        self.build(
            "forecast.json",
            &[
                ("key", self.api_key.as_str()),
                ("q", location),
                ("days", "3"),
                ("aqi", "yes"),
                ("alerts", "no"),
            ],
        )
    }

    /// Single-day historical observation for the given ISO calendar date.
    pub fn history_url(&self, location: &str, date: NaiveDate) -> Result<Url, EtlError> {
        let dt = date.format("%Y-%m-%d").to_string();
        self.build(
            "history.json",
            &[
                ("key", self.api_key.as_str()),
                ("q", location),
                ("dt", dt.as_str()),
            ],
        )
    }

    fn build(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Url, EtlError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint);
        Url::parse_with_params(&url, params).map_err(|e| EtlError::Url(e.to_string()))
    }
}

// ---

/// Fetch seam between the orchestrator and the HTTP layer.
///
/// `Ok(None)` means the fetch exhausted its retries; the caller skips that
/// unit of work. `Err` is a permanent failure for the call.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn forecast(&self, location: &str) -> Result<Option<Value>, EtlError>;
    async fn history(&self, location: &str, date: NaiveDate) -> Result<Option<Value>, EtlError>;
}

/// HTTP client with bounded-retry fetch against the weather API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    urls: UrlBuilder,
    policy: RetryPolicy,
}

impl ApiClient {
    /// Build a client with a per-attempt timeout and the default retry
    /// schedule (3 attempts, 2s base delay, doubling).
    pub fn new(urls: UrlBuilder, http_timeout: Duration) -> Result<Self, EtlError> {
        let http = Client::builder()
            .timeout(http_timeout)
            .build()
            .map_err(EtlError::from_transport)?;
        Ok(Self {
            http,
            urls,
            policy: RetryPolicy::default(),
        })
    }

    #[cfg(test)]
    pub fn with_policy(urls: UrlBuilder, http_timeout: Duration, policy: RetryPolicy) -> Self {
        Self {
            http: Client::builder().timeout(http_timeout).build().unwrap(),
            urls,
            policy,
        }
    }

    /// Issue the GET under the retry policy and parse the body as JSON.
    ///
    /// Non-2xx statuses and body decode failures are permanent; only
    /// transport-level failures are retried.
    async fn fetch(&self, op_name: &str, url: Url) -> Result<Option<Value>, EtlError> {
        with_retry(&self.policy, op_name, || {
            let url = url.clone();
            async move {
                let response = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .map_err(EtlError::from_transport)?;

                let status = response.status();
                if !status.is_success() {
                    return Err(EtlError::Status(status));
                }

                // Strip the URL here too; decode errors go into skip logs.
                response
                    .json::<Value>()
                    .await
                    .map_err(|e| EtlError::Decode(e.without_url().to_string()))
            }
        })
        .await
    }
}

#[async_trait]
impl WeatherSource for ApiClient {
    async fn forecast(&self, location: &str) -> Result<Option<Value>, EtlError> {
        let url = self.urls.forecast_url(location)?;
        self.fetch("forecast fetch", url).await
    }

    async fn history(&self, location: &str, date: NaiveDate) -> Result<Option<Value>, EtlError> {
        let url = self.urls.history_url(location, date)?;
        self.fetch("history fetch", url).await
    }
}
