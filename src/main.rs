use anyhow::Result;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use tenant_query_agent::{
    auth::TokenManager,
    config::Config,
    http_client::GraphHttpClient,
    llm::AnthropicClient,
    middleware,
    router::DirectoryRouter,
    routes::{self, AppState},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let config = Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Tenant Query Agent starting...");
    tracing::info!(
        "Server configured: {}:{}",
        config.server_host,
        config.server_port
    );

    // Initialize token manager
    let tokens = Arc::new(TokenManager::new(
        config.credentials(),
        config.authority_host.clone(),
        config.http_request_timeout,
    )?);

    // The first directory query performs the first token exchange
    if tokens.configured() {
        tracing::info!("Directory credentials present, token will be acquired on first query");
    }

    let http_client = Arc::new(GraphHttpClient::new(
        tokens,
        config.graph_base_url.clone(),
        config.http_max_connections,
        config.http_connect_timeout,
        config.http_request_timeout,
    )?);

    let router = Arc::new(DirectoryRouter::new(
        http_client,
        config.enrichment_concurrency,
    ));

    let llm = Arc::new(AnthropicClient::new(
        config.anthropic_api_key.clone(),
        config.anthropic_base_url.clone(),
        config.anthropic_model.clone(),
        config.anthropic_max_tokens,
        config.http_request_timeout,
    )?);

    let app_state = AppState {
        router,
        llm,
        config: Arc::new(config.clone()),
    };

    let app = build_app(app_state);

    // Bind to configured host and port
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    print_startup_banner(&config);

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Health check: http://{}/api/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Build the application with all routes and middleware
fn build_app(state: AppState) -> axum::Router {
    axum::Router::new()
        .merge(routes::health_routes())
        .merge(routes::api_routes(state))
        .layer(middleware::cors_layer())
        .layer(axum::middleware::from_fn(middleware::request_log_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Print startup banner
fn print_startup_banner(config: &Config) {
    println!();
    println!("  Tenant Query Agent");
    println!("  Version:     {}", env!("CARGO_PKG_VERSION"));
    println!(
        "  Server:      http://{}:{}",
        config.server_host, config.server_port
    );
    println!(
        "  Directory:   {}",
        if config.credentials().is_some() {
            "configured"
        } else {
            "not configured"
        }
    );
    println!("  Model:       {}", config.anthropic_model);
    println!("  Log Level:   {}", config.log_level);
    println!();
}

/// Handle graceful shutdown signal
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown...");
        },
    }
}
