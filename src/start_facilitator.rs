//! Startup helpers for the facilitator server.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::rate_limit::RateLimitSweeper;
use crate::server::{self, AppState};

/// Run the server (used by the `facilitator-server` binary).
///
/// `.env` is loaded before the subscriber is built so a `RUST_LOG` set there
/// takes effect.
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    let env_file = dotenvy::dotenv();
    init_tracing();

    match env_file {
        Ok(path) => tracing::info!(path = %path.display(), "Loaded environment file"),
        Err(e) => tracing::debug!("No .env file loaded: {e}"),
    }

    tracing::info!("Starting Discussion Facilitator v{}", env!("CARGO_PKG_VERSION"));

    match start() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Facilitator stopped with an error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt().with_env_filter(env_filter()).init();
}

/// `RUST_LOG` as currently set in the process environment, plus an INFO floor.
fn env_filter() -> EnvFilter {
    EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())
}

fn start() -> anyhow::Result<()> {
    let (config, state) = initialize().context("failed to initialize")?;
    let rt = tokio::runtime::Runtime::new().context("failed to create runtime")?;
    rt.block_on(serve(state, &config))
}

/// Load configuration and build application state without starting the server.
///
/// # Errors
/// Returns an error if configuration is invalid or state creation fails.
pub fn initialize() -> anyhow::Result<(AppConfig, Arc<AppState>)> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        model = %config.provider.model,
        credentials = config.provider.usable_keys(),
        port = config.server.port,
        "Configuration loaded"
    );

    let state = AppState::from_config(&config).context("failed to create state")?;
    Ok((config, state))
}

/// Serve until Ctrl+C, running the rate-limit sweeper alongside.
///
/// # Errors
/// Returns an error if the server fails.
pub async fn serve(state: Arc<AppState>, config: &AppConfig) -> anyhow::Result<()> {
    let sweeper = RateLimitSweeper::new(
        Arc::clone(&state.governor),
        Duration::from_secs(config.rate_limit.sweep_interval_secs),
    );
    let stop_sweeper = sweeper.shutdown_notifier();
    let sweeper_handle = sweeper.spawn();

    let result = server::run_server_with_shutdown(state, &config.server, shutdown_signal()).await;

    stop_sweeper.notify_one();
    if let Err(e) = sweeper_handle.await {
        tracing::warn!("Rate limit sweeper ended abnormally: {e}");
    }

    result.map_err(|e| anyhow::anyhow!(e))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_file_directives_reach_filter() {
        let path = std::env::temp_dir().join(format!("facilitator-{}.env", uuid::Uuid::new_v4()));
        std::fs::write(&path, "RUST_LOG=discussion_facilitator=trace\n")
            .unwrap_or_else(|e| unreachable!("{e}"));

        let loaded = dotenvy::from_path_override(&path);
        let _ = std::fs::remove_file(&path);
        assert!(loaded.is_ok());

        assert!(env_filter().to_string().contains("discussion_facilitator=trace"));
    }
}
