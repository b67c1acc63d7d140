use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imgup_core::{
    build_http_client, load_config, load_config_from_env, validate_config, AdmissionQueue,
    Config, FetchStage, HtmlPageScraper, HttpFetcher, JobOrchestrator, JobStore, LogFormat,
    RealCuganUpscaler, SqliteJobStore, StagingStore, UpscaleStage, Upscaler,
};

use imgup_server::api::create_router;
use imgup_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        eprintln!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn load() -> Result<Config> {
    let config_path = std::env::var("IMGUP_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    let config = if config_path.exists() {
        load_config(&config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        load_config_from_env().context("Failed to load config from environment")?
    };

    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

async fn run() -> Result<()> {
    let config = load()?;
    init_logging(config.logging.format);

    info!(version = VERSION, "Starting imgup");
    info!("Database path: {:?}", config.database.path);
    info!("Process root: {:?}", config.storage.process_root);

    // Job store
    let job_store: Arc<dyn JobStore> = Arc::new(
        SqliteJobStore::new(&config.database.path).context("Failed to create job store")?,
    );
    info!("Job store initialized");

    // Outbound HTTP shared by downloads and page scraping
    let http_client =
        build_http_client(&config.fetcher).context("Failed to build HTTP client")?;
    if config.fetcher.proxy.is_some() {
        info!("Outbound requests go through the configured proxy");
    }

    // Upscaler
    let upscaler = Arc::new(RealCuganUpscaler::new(&config.upscaler));
    if let Err(e) = upscaler.validate().await {
        warn!("Upscaler check failed, jobs will fail until fixed: {}", e);
    }
    info!(
        "Using upscaler {:?} (scale {}, denoise {}, {} at a time)",
        config.upscaler.executable,
        config.upscaler.scale,
        config.upscaler.denoise,
        config.upscaler.concurrency
    );

    // Orchestrator
    let orchestrator = Arc::new(
        JobOrchestrator::new(
            Arc::clone(&job_store),
            StagingStore::new(&config.storage.process_root),
            FetchStage::new(
                Arc::new(HttpFetcher::with_client(http_client.clone())),
                config.fetcher.concurrency,
            ),
            UpscaleStage::new(upscaler, &config.upscaler),
            AdmissionQueue::new(config.queue.concurrency),
            config.server.public_url.clone(),
        )
        .with_scraper(Arc::new(HtmlPageScraper::new(
            http_client,
            config.scraper.clone(),
        ))),
    );

    let report = orchestrator
        .recover()
        .await
        .context("Failed to recover jobs from previous run")?;
    info!(
        "Recovery: {} interrupted, {} re-admitted",
        report.interrupted, report.readmitted
    );

    // Create app state and router
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::clone(&orchestrator),
        job_store,
    ));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    orchestrator.shutdown();
    info!("Admission queue stopped; queued jobs resume on next start");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
