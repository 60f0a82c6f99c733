use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenManager;
use crate::error::DirectoryError;
use crate::models::graph::Endpoint;

/// Retries allowed after a 401, each preceded by a fresh token
const MAX_AUTH_RETRIES: u32 = 1;

/// Whether the token about to be sent has been accepted before
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenState {
    /// Cached token, presumed good
    Valid,
    /// Just invalidated; the next token comes from a fresh exchange
    Unknown,
}

/// HTTP client for the Graph directory API
pub struct GraphHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Token manager
    tokens: Arc<TokenManager>,

    /// Base URL, e.g. https://graph.microsoft.com
    base_url: String,
}

impl GraphHttpClient {
    /// Create a new HTTP client
    pub fn new(
        tokens: Arc<TokenManager>,
        base_url: impl Into<String>,
        max_connections: usize,
        connect_timeout: u64,
        request_timeout: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(max_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            tokens,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn configured(&self) -> bool {
        self.tokens.configured()
    }

    /// GET an endpoint and return its JSON body
    ///
    /// A 401 discards the cached token and the request is sent once more
    /// with a freshly acquired one. A second 401 is returned as an upstream
    /// error.
    pub async fn get(&self, endpoint: &Endpoint) -> std::result::Result<Value, DirectoryError> {
        if !self.tokens.configured() {
            return Err(DirectoryError::NotConfigured);
        }

        let url = format!("{}/v1.0{}", self.base_url, endpoint.path);
        let mut state = TokenState::Valid;
        let mut retries_left = MAX_AUTH_RETRIES;

        tracing::debug!(url = %url, endpoint = %endpoint, "Sending directory request");

        loop {
            let token = self.tokens.get_token().await.map_err(|e| {
                tracing::error!("Token acquisition failed: {:#}", e);
                DirectoryError::Auth(format!("{:#}", e))
            })?;

            let result = self
                .client
                .get(&url)
                .query(&endpoint.query)
                .bearer_auth(&token)
                .header("Accept", "application/json")
                .send()
                .await;

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    let error_kind = if e.is_timeout() {
                        "timeout"
                    } else if e.is_connect() {
                        "connection_failed"
                    } else {
                        "request_error"
                    };
                    tracing::warn!(
                        error_kind = error_kind,
                        error = %e,
                        url = %url,
                        "Directory request error"
                    );
                    return Err(DirectoryError::Upstream {
                        status: None,
                        message: e.to_string(),
                    });
                }
            };

            let status = response.status();
            tracing::debug!(status = %status, token_state = ?state, "Received directory response");

            if status.is_success() {
                return response.json::<Value>().await.map_err(|e| {
                    DirectoryError::Upstream {
                        status: Some(status.as_u16()),
                        message: format!("Failed to parse directory response: {}", e),
                    }
                });
            }

            if status == StatusCode::UNAUTHORIZED && retries_left > 0 {
                tracing::warn!("Received 401, refreshing directory token and retrying...");
                self.tokens.invalidate().await;
                state = TokenState::Unknown;
                retries_left -= 1;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            let message = error_message(status, &body);
            tracing::error!(
                status = status.as_u16(),
                url = %url,
                token_state = ?state,
                message = %message,
                "Directory request failed"
            );
            return Err(DirectoryError::Upstream {
                status: Some(status.as_u16()),
                message,
            });
        }
    }
}

/// Extract `error.message` from a Graph error body, falling back to the raw
/// body or the status reason
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            json.pointer("/error/message")
                .and_then(|v| v.as_str())
                .map(String::from)
        })
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| {
            format!(
                "Request failed with status {}",
                status.canonical_reason().unwrap_or(status.as_str())
            )
        })
}
