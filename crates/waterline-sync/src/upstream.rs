//! # Upstream HTTP Client
//!
//! Talks to the utility-management API. Every reference endpoint is a POST
//! with an optional JSON body and the technician's token in a
//! `trongateToken` header; responses wrap their records in a per-entity
//! envelope key.
//!
//! The client sits behind the [`UpstreamApi`] trait so the reconciler's
//! tests can script responses without a live server.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};
use crate::schema::LoginPayload;

/// Header carrying the technician's upstream token.
const TOKEN_HEADER: &str = "trongateToken";

/// Upstream login endpoint. Unlike the reference endpoints it takes no
/// token header.
const LOGIN_PATH: &str = "gateman/login";

/// Abstraction over the upstream reference-data API.
///
/// `Ok(None)` means the endpoint produced no usable data (unreachable,
/// non-2xx, or an empty body). Callers treat that as an empty result set.
/// A 2xx response that is not JSON is an error, not `None`.
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    async fn fetch(
        &self,
        path: &str,
        token: &str,
        body: Option<Value>,
    ) -> SyncResult<Option<Value>>;
}

/// HTTP implementation of [`UpstreamApi`] backed by [`reqwest`].
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUpstream {
    /// Creates a client against `base_url` with the given request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(HttpUpstream {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Authenticates a technician against the upstream.
    ///
    /// Login failures are not tolerated the way reference fetches are:
    /// an unreachable upstream is [`SyncError::Transport`], a non-2xx
    /// status is [`SyncError::Unauthorized`], and a 2xx body that does
    /// not decode into the expected payload is a schema violation.
    pub async fn login(&self, username: &str, password: &str) -> SyncResult<LoginPayload> {
        let url = self.url(LOGIN_PATH);
        debug!(%url, %username, "Upstream login");

        let response = self
            .client
            .post(&url)
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            warn!(status = %response.status(), %username, "Upstream rejected login");
            return Err(SyncError::Unauthorized);
        }

        response
            .json::<LoginPayload>()
            .await
            .map_err(|e| SyncError::Schema {
                entity: "login response",
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl UpstreamApi for HttpUpstream {
    async fn fetch(
        &self,
        path: &str,
        token: &str,
        body: Option<Value>,
    ) -> SyncResult<Option<Value>> {
        let url = self.url(path);
        debug!(%url, "Fetching upstream data");

        let mut request = self.client.post(&url).header(TOKEN_HEADER, token);
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(%url, error = %e, "Upstream unreachable, treating as no data");
                return Ok(None);
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "Upstream returned error status, treating as no data");
            return Ok(None);
        }

        let text = response
            .text()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        if text.trim().is_empty() {
            debug!(%url, "Upstream returned empty body");
            return Ok(None);
        }

        let value = serde_json::from_str(&text).map_err(|e| SyncError::MalformedResponse {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let upstream = HttpUpstream::new("http://upstream.test/api/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            upstream.url("/api_get/get_service_areas"),
            "http://upstream.test/api/api_get/get_service_areas"
        );
        assert_eq!(upstream.url("gateman/login"), "http://upstream.test/api/gateman/login");
    }
}
