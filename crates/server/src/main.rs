use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookhound_core::{
    create_authenticator, create_book_catalog, create_download_client, load_config,
    validate_config, AcquisitionPipeline, Authenticator, BookCatalog, Dispatcher,
    DownloadSettingsManager, IndexerFileWatcher, IndexerRegistry, ProwlarrSearcher,
    RequestFilter, RequestStore, Searcher, SettingsStore, SqliteRequestStore,
    SqliteSettingsStore,
};

use bookhound_server::api::create_router;
use bookhound_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    let json = std::env::var("BOOKHOUND_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn run() -> Result<()> {
    init_tracing();

    // Determine config path
    let config_path = std::env::var("BOOKHOUND_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);

    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    // SQLite stores
    let settings_store: Arc<dyn SettingsStore> = Arc::new(
        SqliteSettingsStore::new(&config.database.path)
            .context("Failed to create settings store")?,
    );
    let request_store: Arc<dyn RequestStore> = Arc::new(
        SqliteRequestStore::new(&config.database.path)
            .context("Failed to create request store")?,
    );

    let registry = Arc::new(
        IndexerRegistry::new(Arc::clone(&settings_store))
            .context("Failed to load indexer settings")?,
    );
    info!(
        enabled = registry.enabled_indexers().await.len(),
        "Indexer registry loaded"
    );

    let download_settings = Arc::new(
        DownloadSettingsManager::new(Arc::clone(&settings_store), config.download.clone())
            .context("Failed to load download settings")?,
    );

    // Search backend
    let searcher: Option<Arc<dyn Searcher>> = match &config.prowlarr {
        Some(prowlarr_config) => {
            info!("Initializing Prowlarr searcher at {}", prowlarr_config.url);
            let searcher = ProwlarrSearcher::new(prowlarr_config.clone(), Arc::clone(&registry))
                .context("Failed to create Prowlarr searcher")?;
            Some(Arc::new(searcher))
        }
        None => {
            warn!("No Prowlarr configured, requests will stay pending");
            None
        }
    };

    // Download client
    let dispatcher = match &config.download_client {
        Some(dc_config) => {
            let client = create_download_client(dc_config)
                .context("Failed to create download client")?;
            info!("Using download client: {}", client.name());
            Some(Arc::new(Dispatcher::new(client)))
        }
        None => {
            warn!("No download client configured, every request will need manual handling");
            None
        }
    };

    // Book metadata
    let catalog: Option<Arc<dyn BookCatalog>> = match create_book_catalog(&config.catalog) {
        Ok(catalog) => Some(catalog),
        Err(e) => {
            error!("Failed to create book catalog: {}", e);
            None
        }
    };

    let pipeline = searcher.as_ref().map(|searcher| {
        Arc::new(AcquisitionPipeline::new(
            Arc::clone(&request_store),
            Arc::clone(searcher),
            Arc::clone(&registry),
            dispatcher.clone(),
            Arc::clone(&download_settings),
        ))
    });

    // Pick up requests left behind by a previous run
    if let Some(pipeline) = &pipeline {
        let interrupted = pipeline
            .recover_interrupted()
            .context("Failed to recover interrupted requests")?;
        if interrupted > 0 {
            warn!(count = interrupted, "Interrupted dispatches need manual approval");
        }

        let pending = request_store
            .list(&RequestFilter {
                state: Some("pending".to_string()),
                limit: 1000,
                ..Default::default()
            })
            .context("Failed to list pending requests")?;
        if !pending.is_empty() {
            info!(count = pending.len(), "Resuming pending requests");
        }
        for request in pending {
            pipeline.spawn(request.id);
        }
    }

    // Indexer settings file watcher
    let watcher = config.indexer_file.as_ref().map(|file_config| {
        Arc::new(IndexerFileWatcher::new(
            file_config.path.clone(),
            Duration::from_secs(file_config.poll_interval_secs),
            Arc::clone(&registry),
        ))
    });
    if let Some(watcher) = &watcher {
        watcher.start().await;
    }

    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        registry,
        request_store,
        download_settings,
        searcher,
        catalog,
        pipeline,
    ));

    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    if let Some(watcher) = &watcher {
        watcher.stop().await;
    }

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
