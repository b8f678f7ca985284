mod channels;
mod cli;
mod commands;
mod config;
mod signal;

use clap::Parser;
use cli::{Cli, Command};
use reaper_api::ApiState;
use reaper_config::{ReaperConfig, constants};
use reaper_store::Store;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut settings = reaper_config::load_config(&cli.config).await?;
    config::apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings.validate()?;

    match cli.command {
        Command::Serve => serve(settings).await,
        Command::Reap(args) => commands::reap(&settings, args).await,
        Command::Export(args) => commands::export(&settings, args).await,
    }
}

async fn serve(settings: ReaperConfig) -> anyhow::Result<()> {
    let store = Arc::new(Store::open(&settings.data_directory)?);
    tracing::info!(
        "Opened build store at {}",
        settings.data_directory.display()
    );

    let engine = Arc::new(config::create_policy_engine(&settings, store.clone())?);
    let channels = channels::create_channels();

    let api_router = reaper_api::router(ApiState {
        store,
        event_tx: channels.event_tx,
    });

    // Exits once the server drops the last event sender
    let consumer_handle = tokio::spawn(reaper_engine::run_consumer(channels.event_rx, engine));

    let api_addr = format!("{}:{}", settings.api_host, settings.api_port);
    tracing::info!("Starting API server on {api_addr}");
    let listener = TcpListener::bind(&api_addr).await?;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, api_router)
            .with_graceful_shutdown(signal::shutdown_signal())
            .await
        {
            tracing::error!("API server failed: {}", e);
        }
    });

    let _ = server_handle.await;

    tokio::select! {
        _ = tokio::time::sleep(constants::SHUTDOWN_TIMEOUT) => {
            tracing::warn!("Shutdown timeout reached, forcing exit");
        }
        _ = consumer_handle => {
            tracing::info!("All components shut down gracefully");
        }
    }

    tracing::info!("Reaper shutdown complete");

    Ok(())
}
