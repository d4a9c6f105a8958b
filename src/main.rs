mod common;
mod http_client;
mod model;
mod oauth;

use std::sync::Arc;

use clap::Parser;
use model::arg::Args;
use model::config::RelayConfig;

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load configuration (file, then environment, then CLI)
    let config_path = args
        .config
        .unwrap_or_else(|| RelayConfig::default_config_path().to_string());
    let mut config = RelayConfig::load(&config_path).unwrap_or_else(|e| {
        tracing::error!("Failed to load config: {:#}", e);
        std::process::exit(1);
    });
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    tracing::debug!("Loaded configuration: {:?}", config);

    // Missing secrets are reported, not fatal; the debug endpoint shows the same
    for warning in config.warnings() {
        tracing::warn!("{}", warning);
    }
    if config.validate_state {
        tracing::info!("State validation enabled");
    }
    if let Some(proxy_url) = &config.proxy_url {
        tracing::info!("HTTP proxy configured: {}", proxy_url);
    }

    let config = Arc::new(config);
    let relay = oauth::OAuthRelay::new(config.clone()).unwrap_or_else(|e| {
        tracing::error!("Failed to create HTTP client: {:#}", e);
        std::process::exit(1);
    });
    let app = oauth::create_relay_router(Arc::new(relay));

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let mount = config.mount_path();
    tracing::info!("Starting OAuth relay: {}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  {}", mount);
    tracing::info!("  GET  {}/callback", mount);
    tracing::info!("  GET  {}/token", mount);
    tracing::info!("  GET  {}/debug", mount);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
