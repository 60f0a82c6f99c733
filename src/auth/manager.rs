use anyhow::{Context, Result};
use reqwest::Client;
use tokio::sync::RwLock;

use super::exchange;
use super::types::Credentials;

/// Token manager
/// Caches a single bearer token and discards it when the directory rejects it
pub struct TokenManager {
    /// Application credentials (None = unconfigured)
    credentials: Option<Credentials>,

    /// Current access token
    access_token: RwLock<Option<String>>,

    /// HTTP client for token requests
    client: Client,

    /// Identity provider host, e.g. https://login.microsoftonline.com
    authority: String,
}

impl TokenManager {
    /// Create a new TokenManager
    pub fn new(
        credentials: Option<Credentials>,
        authority: impl Into<String>,
        request_timeout: u64,
    ) -> Result<Self> {
        if credentials.is_none() {
            tracing::warn!("Directory credentials not configured. Graph queries will not work.");
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            credentials,
            access_token: RwLock::new(None),
            client,
            authority: authority.into(),
        })
    }

    /// True iff tenant, client id and secret were all supplied
    pub fn configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Get the cached token, acquiring one first if the slot is empty
    pub async fn get_token(&self) -> Result<String> {
        let creds = self
            .credentials
            .as_ref()
            .context("Directory client not configured")?;

        if let Some(token) = self.access_token.read().await.as_ref() {
            return Ok(token.clone());
        }

        // The exchange runs without holding the lock; the slot is only
        // written once a complete token is in hand.
        let token = exchange::exchange_client_credentials(&self.client, &self.authority, creds)
            .await
            .context("Failed to acquire directory token")?;

        *self.access_token.write().await = Some(token.clone());
        Ok(token)
    }

    /// Discard the cached token
    pub async fn invalidate(&self) {
        let mut slot = self.access_token.write().await;
        if slot.take().is_some() {
            tracing::debug!("Cached directory token discarded");
        }
    }

    #[cfg(test)]
    async fn has_token(&self) -> bool {
        self.access_token.read().await.is_some()
    }
}
