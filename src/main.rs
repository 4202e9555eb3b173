//! Pitwall session telemetry service
//!
//! REST API and CLI for ingesting and querying motorsport session results.

mod cli;
mod coerce;
mod config;
mod ingest;
mod jobs;
mod laps;
mod provider;
mod retry;
mod routes;
mod storage;
mod types;

use axum::{routing::get, routing::post, Router};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::jobs::JobRegistry;
use crate::provider::HttpProvider;
use crate::routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port } => run_server(Some(host), Some(port)).await,
        Commands::Load {
            year,
            round,
            session,
        } => cli::run_load(year, round, session).await,
        Commands::Schedule { year } => cli::run_schedule(year).await,
    }
}

/// Run the API server.
async fn run_server(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pitwall=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let mut config = AppConfig::load()?;

    // Override with CLI args
    if let Some(h) = host {
        config.server.host = h;
    }
    if let Some(p) = port {
        config.server.port = p;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("Database path: {}", config.database.path);
    tracing::info!("Provider base URL: {}", config.provider.base_url);

    // One provider per process; its response cache directory is shared by
    // every ingestion worker.
    let provider = Arc::new(HttpProvider::new(
        config.provider.base_url.as_str(),
        config.provider.cache_dir.as_str(),
    )?);

    // Create application state
    let state = Arc::new(AppState {
        config: config.clone(),
        provider,
        jobs: JobRegistry::new(),
    });

    // Build router
    let app = Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/years", get(routes::years))
        .route("/api/rounds", get(routes::rounds))
        .route("/api/session", get(routes::get_session))
        .route("/api/load-session", post(routes::load_session))
        .route("/api/jobs/:job_id", get(routes::job_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
