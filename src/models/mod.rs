// Data models for directory results and external API formats

pub mod anthropic;
pub mod directory;
pub mod graph;

use serde::{Deserialize, Serialize};

/// Body of `POST /api/chat` and `POST /api/query`
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

/// Body returned by `POST /api/chat`
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
}
