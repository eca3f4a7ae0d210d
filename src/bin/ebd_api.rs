use anyhow::{Context, Result};
use ebd::application::{init_logging_with_level, EbdApp};
use ebd::http::router;
use ebd::infrastructure::config::redact_url;
use ebd::infrastructure::{ApiConfig, ShutdownManager};
use ebd_server::bin_common::{load_config_from_env, BinaryRunner, ConfigType, RunConfig};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

struct ApiServer {
    config: ApiConfig,
    run_config: RunConfig,
    shutdown: ShutdownManager,
}

impl BinaryRunner for ApiServer {
    async fn run(&mut self) -> Result<()> {
        let app = Arc::new(EbdApp::connect(&self.config).await?);

        let address = self.config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .with_context(|| format!("Failed to bind {}", address))?;
        info!("Listening on {}", address);

        let shutdown = self.shutdown.clone();
        let served = axum::serve(listener, router(Arc::clone(&app)))
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await
            .context("HTTP server failed");

        app.store.close().await;
        served
    }

    fn config(&self) -> &RunConfig {
        &self.run_config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load config first (before logging is initialized)
    let config_path = load_config_from_env(ConfigType::Api);
    let config = ApiConfig::load(&config_path)?;

    // Initialize logging with configured level
    init_logging_with_level(&config.log_level);
    config.log();

    let shutdown = ShutdownManager::new();
    shutdown.spawn_signal_handler();

    let run_config = RunConfig::new("EBD Management API")
        .with_detail(format!("Listen address: {}", config.bind_address()))
        .with_detail(format!("Database: {}", redact_url(&config.database.url)));

    let mut server = ApiServer {
        config,
        run_config,
        shutdown,
    };
    server.execute().await
}
