use anyhow::{Context, Result};
use clap::Parser;

use crate::auth::Credentials;

/// Tenant Query Agent - natural-language directory queries
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Server host address
    #[arg(short = 'H', long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Server port
    #[arg(short, long, env = "SERVER_PORT", default_value = "3000")]
    pub port: u16,

    /// Azure AD tenant id
    #[arg(long, env = "AZURE_TENANT_ID")]
    pub tenant_id: Option<String>,

    /// Application (client) id
    #[arg(long, env = "AZURE_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Application client secret
    #[arg(long, env = "AZURE_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Anthropic API key for answer formatting
    #[arg(short = 'k', long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    /// Model used to format answers
    #[arg(long, env = "ANTHROPIC_MODEL", default_value = "claude-3-5-sonnet-20241022")]
    pub model: String,

    /// Upper bound for one directory query, in seconds
    #[arg(long, env = "QUERY_TIMEOUT_SECS", default_value = "5")]
    pub query_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    // Server settings
    pub server_host: String,
    pub server_port: u16,

    // Directory credentials (all three or nothing)
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,

    // Upstream hosts
    pub graph_base_url: String,
    pub authority_host: String,

    // Language model
    pub anthropic_api_key: String,
    pub anthropic_base_url: String,
    pub anthropic_model: String,
    pub anthropic_max_tokens: u32,

    // Timeouts
    pub query_timeout: u64,

    // HTTP client
    pub http_max_connections: usize,
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    // Router
    pub enrichment_concurrency: usize,

    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_args(CliArgs::parse())
    }

    fn from_args(args: CliArgs) -> Result<Self> {
        let config = Config {
            server_host: args.host,
            server_port: args.port,

            tenant_id: args.tenant_id,
            client_id: args.client_id,
            client_secret: args.client_secret,

            graph_base_url: env_or("GRAPH_BASE_URL", "https://graph.microsoft.com".to_string()),
            authority_host: env_or(
                "AZURE_AUTHORITY_HOST",
                "https://login.microsoftonline.com".to_string(),
            ),

            anthropic_api_key: args.anthropic_api_key.context(
                "ANTHROPIC_API_KEY is required (use -k or set ANTHROPIC_API_KEY env var)",
            )?,
            anthropic_base_url: env_or(
                "ANTHROPIC_BASE_URL",
                "https://api.anthropic.com".to_string(),
            ),
            anthropic_model: args.model,
            anthropic_max_tokens: env_or("ANTHROPIC_MAX_TOKENS", 1500),

            query_timeout: args.query_timeout,

            http_max_connections: env_or("HTTP_MAX_CONNECTIONS", 20),
            http_connect_timeout: env_or("HTTP_CONNECT_TIMEOUT", 10),
            http_request_timeout: env_or("HTTP_REQUEST_TIMEOUT", 30),

            enrichment_concurrency: env_or("ENRICHMENT_CONCURRENCY", 4),

            log_level: args.log_level,
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.anthropic_api_key.trim().is_empty() {
            anyhow::bail!("ANTHROPIC_API_KEY cannot be empty");
        }
        if self.query_timeout == 0 {
            anyhow::bail!("QUERY_TIMEOUT_SECS must be greater than 0");
        }
        if self.http_request_timeout == 0 || self.http_connect_timeout == 0 {
            anyhow::bail!("HTTP timeouts must be greater than 0");
        }
        if self.enrichment_concurrency == 0 {
            anyhow::bail!("ENRICHMENT_CONCURRENCY must be greater than 0");
        }

        Ok(())
    }

    /// Directory credentials, if all three fields are present
    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::from_parts(
            self.tenant_id.clone(),
            self.client_id.clone(),
            self.client_secret.clone(),
        )
    }
}

/// Read an optional setting from the environment, falling back on absence
/// or parse failure
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
