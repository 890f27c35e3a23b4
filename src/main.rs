use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use calendar_relay::config::AppConfig;
use calendar_relay::handlers;
use calendar_relay::services::relay::RelayCore;
use calendar_relay::state::AppState;
use calendar_relay::tools::ToolRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    tracing::info!(
        environment = %config.environment,
        webhook = %config.relay.webhook_base_url,
        timeout = ?config.relay.timeout,
        "loaded configuration"
    );

    let relay = Arc::new(RelayCore::from_config(&config.relay)?);
    let tools = ToolRegistry::with_relay(relay);
    tracing::info!(tools = ?tools.names(), "tool table ready");

    let state = Arc::new(AppState {
        config: config.clone(),
        tools,
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/tools", get(handlers::tools::list_tools))
        .route("/tools/:name", post(handlers::tools::invoke_tool))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
