//! HTTP access to the sync gateway.
//!
//! Every call carries its own timeout. Timeouts are classified separately
//! from other failures because the discovery loop treats a timed-out poll
//! as a no-op while fetch/send treat it as a retryable failure.

use std::time::Duration;

use protocol::{Action, DiscoverResponse, FetchResponse, PostResponse, UsageResponse};
use serde::de::DeserializeOwned;

/// Timeout for discovery and fetch polls.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(2);

/// Timeout for action uploads.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request timed out")]
    Timeout,
    #[error("http request failed: {0}")]
    Http(reqwest::Error),
    #[error("server returned {0}")]
    Status(reqwest::StatusCode),
    #[error("invalid response body: {0}")]
    Decode(reqwest::Error),
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(error)
        }
    }
}

/// Thin typed wrapper over the gateway's single endpoint.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("{}/", base_url.trim_end_matches('/')),
        }
    }

    /// `GET ?since=` — list stroke ids newer than the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Timeout`] on a timed-out poll and other variants
    /// for network, status, or decode failures.
    pub async fn discover(&self, since: i64) -> Result<DiscoverResponse, ApiError> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&[("since", since)])
            .timeout(POLL_TIMEOUT)
            .send()
            .await?;
        Self::decode(res).await
    }

    /// `GET ?ids=` — fetch action payloads in one batch.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::discover`].
    pub async fn fetch_actions(&self, ids: &[String]) -> Result<FetchResponse, ApiError> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&[("ids", ids.join(","))])
            .timeout(POLL_TIMEOUT)
            .send()
            .await?;
        Self::decode(res).await
    }

    /// `POST` — upload one action.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::discover`].
    pub async fn post_action(&self, action: &Action) -> Result<PostResponse, ApiError> {
        let res = self
            .http
            .post(&self.base_url)
            .json(action)
            .timeout(SEND_TIMEOUT)
            .send()
            .await?;
        Self::decode(res).await
    }

    /// `DELETE` — reset the broadcast ledger.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::discover`].
    pub async fn reset_broadcast(&self) -> Result<(), ApiError> {
        let res = self
            .http
            .delete(&self.base_url)
            .timeout(SEND_TIMEOUT)
            .send()
            .await?;
        let status = res.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ApiError::Status(status))
        }
    }

    /// Bare `GET` — the gateway's usage help. Doubles as a liveness probe.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::discover`].
    pub async fn help(&self) -> Result<UsageResponse, ApiError> {
        let res = self.http.get(&self.base_url).timeout(POLL_TIMEOUT).send().await?;
        Self::decode(res).await
    }

    async fn decode<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, ApiError> {
        let status = res.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }
        res.json::<T>().await.map_err(ApiError::Decode)
    }
}
