// Client-credential token exchange

use anyhow::{Context, Result};
use reqwest::Client;

use super::types::{ClientCredentialResponse, Credentials};

/// Scope requested for every directory token
const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Get the v2.0 token endpoint for a tenant
fn get_token_url(authority: &str, tenant_id: &str) -> String {
    format!(
        "{}/{}/oauth2/v2.0/token",
        authority.trim_end_matches('/'),
        tenant_id
    )
}

/// Exchange client credentials for an access token
pub async fn exchange_client_credentials(
    client: &Client,
    authority: &str,
    creds: &Credentials,
) -> Result<String> {
    let url = get_token_url(authority, &creds.tenant_id);

    tracing::debug!(
        "Client credential request: url={}, client_id={}...",
        url,
        creds.client_id.chars().take(8).collect::<String>()
    );

    let form = [
        ("grant_type", "client_credentials"),
        ("client_id", creds.client_id.as_str()),
        ("client_secret", creds.client_secret.as_str()),
        ("scope", GRAPH_SCOPE),
    ];

    let response = client
        .post(&url)
        .form(&form)
        .send()
        .await
        .context("Failed to send client credential request")?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        tracing::error!(
            "Client credential exchange failed: status={}, body={}",
            status,
            error_text
        );

        // Identity provider errors carry error + error_description
        if let Ok(error_json) = serde_json::from_str::<serde_json::Value>(&error_text) {
            if let Some(desc) = error_json.get("error_description").and_then(|v| v.as_str()) {
                anyhow::bail!("Token exchange failed: {} - {}", status, desc);
            }
        }

        anyhow::bail!("Token exchange failed: {} - {}", status, error_text);
    }

    let data: ClientCredentialResponse = response
        .json()
        .await
        .context("Failed to parse token response")?;

    if data.access_token.is_empty() {
        anyhow::bail!("Token response does not contain access_token");
    }

    tracing::info!(
        "Directory token acquired (expires_in: {}s)",
        data.expires_in.unwrap_or(0)
    );

    Ok(data.access_token)
}
