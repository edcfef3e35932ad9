use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gallery_intake::blob::S3BlobStore;
use gallery_intake::config::Config;
use gallery_intake::db::Database;
use gallery_intake::dedup::StoredFingerprintScan;
use gallery_intake::fetch::CommandFetcher;
use gallery_intake::intake::ImageIntake;
use gallery_intake::moderation::ModerationStore;
use gallery_intake::scrape::Scraper;
use gallery_intake::web;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Initialize logging
    init_tracing()?;

    info!("Starting gallery-intake");

    // Load and validate configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(bucket = %config.s3_bucket, "Configuration loaded");

    // Ensure data directories exist
    tokio::fs::create_dir_all(&config.work_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create work directory: {}",
                config.work_dir.display()
            )
        })?;

    if let Some(parent) = config.database_path.parent() {
        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }

    // Initialize database
    let db = Database::new(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    info!("Database initialized");

    // Initialize collaborators
    let blob = Arc::new(S3BlobStore::new(&config).context("Failed to initialize blob store")?);
    let fetcher = Arc::new(CommandFetcher::new(&config).context("Failed to initialize fetcher")?);
    let index = Arc::new(StoredFingerprintScan::new(db.clone()));

    // Assemble the pipeline
    let intake = ImageIntake::new(db.clone(), blob.clone(), index);
    let scraper = Arc::new(Scraper::new(
        intake.clone(),
        fetcher,
        config.work_dir.clone(),
        config.fetch_timeout,
    ));
    let moderation = Arc::new(ModerationStore::new(db, blob));

    let state = web::AppState {
        intake,
        scraper,
        moderation,
    };

    // Start web server in background
    let web_config = config.clone();
    let web_handle = tokio::spawn(async move {
        if let Err(e) = web::serve(&web_config, state).await {
            error!("Web server error: {e:#}");
        }
    });

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutting down...");

    web_handle.abort();

    info!("Shutdown complete");

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gallery_intake=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        // Pretty-printed logging for development
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
