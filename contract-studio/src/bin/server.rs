//! Contract Studio server binary

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use studio::api::{create_router, ApiState};
use studio::pipeline::build_pipeline;
use studio::session::SessionStore;
use studio::StudioConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Contract Studio v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "studio.toml".to_string());

    let mut config = if Path::new(&config_path).exists() {
        StudioConfig::load(Path::new(&config_path))
            .with_context(|| format!("Failed to load config file: {}", config_path))?
    } else {
        warn!(config_path = config_path, "Config file not found, using defaults");
        StudioConfig::default()
    };
    config.apply_env_overrides(|key| std::env::var(key).ok());

    info!(
        config_path = config_path,
        backend = config.pipeline.backend,
        bind_addr = config.bind_addr,
        "Loaded configuration"
    );

    let pipeline = build_pipeline(&config.pipeline).context("Failed to set up pipeline backend")?;
    info!(pipeline = pipeline.name(), "Pipeline backend ready");

    let sessions = Arc::new(SessionStore::new(Duration::from_secs(config.session_ttl_secs)));
    let state = Arc::new(ApiState::new(sessions, pipeline, config.log_height_px));

    // Start sweep task for idle sessions and unclaimed runs
    state.clone().start_sweep_task(config.sweep_interval_secs);

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
