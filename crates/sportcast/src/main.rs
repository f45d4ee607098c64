use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use sportcast::archive::{JsonlArchive, NoopArchive, SnapshotArchive};
use sportcast::config::Config;
use sportcast::scheduler::EventWatchScheduler;
use sportcast::{api, shutdown, AppState};
use sportcast_sports::nba::NbaAdapter;
use sportcast_sports::nhl::NhlAdapter;
use sportcast_sports::SportCatalog;

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sportcast=info,sportcast_broker=info,sportcast_sports=info".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() {
    let config = Config::parse();
    init_tracing(config.log_json);

    if let Err(e) = run(config).await {
        error!(error = %e, "sportcast failed");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!(listen_addr = %config.listen_addr, "sportcast starting");

    let settings = config.watch_settings()?;
    let io_timeout = config.io_timeout()?;
    let provider_timeout = config.provider_timeout()?;

    let catalog = SportCatalog::new()
        .with(Arc::new(NhlAdapter::with_timeout(
            config.nhl_base_url.clone(),
            provider_timeout,
        )?))
        .with(Arc::new(NbaAdapter::with_timeout(
            config.nba_base_url.clone(),
            provider_timeout,
        )?));
    info!(sports = ?catalog.names(), "adapters configured");

    let archive: Arc<dyn SnapshotArchive> = match &config.archive_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "archiving snapshots");
            Arc::new(JsonlArchive::new(dir))
        }
        None => Arc::new(NoopArchive),
    };

    let (state, tasks) = AppState::start(catalog.clone(), io_timeout);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = EventWatchScheduler::new(state.registry.clone(), catalog, archive, settings)
        .spawn(shutdown_rx);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "API server listening");

    axum::serve(listener, api::router(state.clone()))
        .with_graceful_shutdown(shutdown::shutdown_signal())
        .await?;

    info!("draining watchers");
    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler.await {
        error!(error = %e, "scheduler task failed");
    }

    state.registry.shutdown();
    if let Err(e) = tasks.registry.await {
        error!(error = %e, "registry task failed");
    }
    tasks.subscriptions.abort();

    info!("sportcast stopped");
    Ok(())
}
