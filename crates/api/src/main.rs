use std::env;
use std::net::SocketAddr;

use anyhow::Result;
use skybot_agents::AssistantConfig;
use skybot_api::{build_router, build_state, ApiSettings};
use skybot_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("skybot_api");

    let config = AssistantConfig::from_env()?;
    let bind = env::var("SKYBOT_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let state = build_state(&config, ApiSettings::from_env()).await?;
    let assistant = state.assistant.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(bind = %bind, "skybot api started");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    assistant.store().close().await;
    tracing::info!("skybot api stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %error, "failed to listen for shutdown signal");
    }
}
