//! PromoReel API Server

use anyhow::Context;
use promoreel_api::{AppState, routes};
use promoreel_config::EngineConfig;
use promoreel_publisher::HttpPublisher;
use promoreel_renderer::CommandRenderer;
use promoreel_scheduler::Engine;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = EngineConfig::load(None).context("failed to load configuration")?;
    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            config.output_dir.display()
        )
    })?;

    let renderer = CommandRenderer::from_config(&config);
    let publisher = HttpPublisher::new(&config.publisher)?;
    let engine = Engine::from_config(&config, Arc::new(renderer), Arc::new(publisher));
    info!(
        max_workers = config.max_workers,
        output_dir = %config.output_dir.display(),
        "Job engine started"
    );

    // Build router
    let app = routes::router(AppState::new(&engine))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Starting server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped; waiting for running jobs");
    engine.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
