// Language model client used to format directory answers

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use crate::error::ApiError;
use crate::models::anthropic::{
    AnthropicMessage, AnthropicMessagesRequest, AnthropicMessagesResponse,
};
use crate::models::directory::QueryResult;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// What the directory layer produced for a chat message
#[derive(Debug)]
pub enum DirectoryOutcome {
    /// `analyze()` finished (possibly with an error value)
    Completed(QueryResult),
    /// `analyze()` did not finish within the timeout (seconds)
    TimedOut(u64),
    /// No directory credentials were configured
    NotConfigured,
}

/// Describe a directory outcome for the model prompt
pub fn context_message(outcome: &DirectoryOutcome) -> String {
    match outcome {
        DirectoryOutcome::Completed(QueryResult::Error { error, kind }) => format!(
            "Microsoft Graph API is configured but the query failed ({}): {}",
            kind.as_str(),
            error
        ),
        DirectoryOutcome::Completed(result) => format!(
            "Successfully retrieved data from Microsoft Graph API:\n{}",
            serde_json::to_string_pretty(result).unwrap_or_default()
        ),
        DirectoryOutcome::TimedOut(secs) => format!(
            "Microsoft Graph API is configured but did not respond within {} seconds.",
            secs
        ),
        DirectoryOutcome::NotConfigured => {
            "Microsoft Graph API is not configured. Please add your Azure credentials to .env file."
                .to_string()
        }
    }
}

/// Prompt sent to the model for one chat message
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        r#"You are a Microsoft Tenant Query Agent. You help users understand their Microsoft tenant data.

User question: "{question}"

Microsoft Graph API Context:
{context}

Instructions:
- If there's real Graph data, format it nicely and answer the user's question directly
- If there's an error, acknowledge it and suggest solutions
- If Graph API isn't configured, explain what data you would show and how to set it up
- Keep responses clear and helpful
- Focus on the user's specific question"#
    )
}

/// Client for the Anthropic Messages API
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(
        api_key: String,
        base_url: impl Into<String>,
        model: String,
        max_tokens: u32,
        request_timeout: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model,
            max_tokens,
        })
    }

    /// Send a single-turn prompt and return the first text block
    pub async fn complete(&self, prompt: String) -> std::result::Result<String, ApiError> {
        let request = AnthropicMessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt,
            }],
        };

        tracing::debug!(model = %self.model, "Calling model API");

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .context("Failed to send model request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::ModelApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let data: AnthropicMessagesResponse = response
            .json()
            .await
            .context("Failed to parse model response")?;

        tracing::info!(
            message_id = %data.id,
            stop_reason = ?data.stop_reason,
            "Model response received"
        );

        data.first_text()
            .map(String::from)
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("Model response had no text block")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DirectoryError;
    use crate::models::directory::Entity;

    #[test]
    fn test_context_message_kinds_are_distinct() {
        let unconfigured = context_message(&DirectoryOutcome::NotConfigured);
        let failing = context_message(&DirectoryOutcome::Completed(
            DirectoryError::Upstream {
                status: Some(503),
                message: "Service unavailable".to_string(),
            }
            .into(),
        ));
        let timed_out = context_message(&DirectoryOutcome::TimedOut(5));

        assert!(unconfigured.contains("not configured"));
        assert!(failing.contains("(upstream): Service unavailable"));
        assert!(timed_out.contains("within 5 seconds"));
        assert_ne!(unconfigured, failing);
    }

    #[test]
    fn test_context_message_with_data() {
        let mut user = Entity::new();
        user.insert("displayName".to_string(), "Adele Vance".into());
        let message =
            context_message(&DirectoryOutcome::Completed(QueryResult::collection(vec![user])));
        assert!(message.starts_with("Successfully retrieved data"));
        assert!(message.contains("Adele Vance"));
    }

    #[test]
    fn test_build_prompt() {
        let prompt = build_prompt("list users", "CONTEXT");
        assert!(prompt.contains("User question: \"list users\""));
        assert!(prompt.contains("Microsoft Graph API Context:\nCONTEXT"));
    }

    #[tokio::test]
    async fn test_complete_returns_first_text() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "sk-test")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .with_status(200)
            .with_body(r#"{"id":"msg_1","content":[{"type":"text","text":"Hello"}],"stop_reason":"end_turn"}"#)
            .create_async()
            .await;

        let client = AnthropicClient::new(
            "sk-test".to_string(),
            server.url(),
            "claude-3-5-sonnet-20241022".to_string(),
            1500,
            5,
        )
        .unwrap();
        assert_eq!(client.complete("hi".to_string()).await.unwrap(), "Hello");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_surfaces_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/messages")
            .with_status(401)
            .with_body(r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#)
            .create_async()
            .await;

        let client =
            AnthropicClient::new("bad".to_string(), server.url(), "m".to_string(), 10, 5).unwrap();
        match client.complete("hi".to_string()).await {
            Err(ApiError::ModelApiError { status, message }) => {
                assert_eq!(status, 401);
                assert!(message.contains("invalid x-api-key"));
            }
            other => panic!("expected model API error, got {:?}", other),
        }
    }
}
