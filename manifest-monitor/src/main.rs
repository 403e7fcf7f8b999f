use manifest_monitor::api::{ApiServer, AppState};
use manifest_monitor::{AppConfig, logging};
use mimalloc::MiMalloc;
use monitor_engine::{HttpFetcher, SessionStore};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env_or_default();
    let _log_guard = logging::init_logging(config.log_dir.as_deref())?;

    let fetcher = HttpFetcher::new(&config.client)?;
    let sessions = SessionStore::with_http(fetcher, config.monitor.clone());
    let state = AppState::new(sessions.clone());

    let server = ApiServer::new(config.api.clone(), state, config.frontend_dir.clone());
    let cancel_token = server.cancel_token();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        tracing::info!("Received Ctrl-C, shutting down");
        cancel_token.cancel();
    });

    tracing::info!(
        frontend_dir = %config.frontend_dir.display(),
        poll_interval = ?config.monitor.poll_interval,
        delay_threshold = config.monitor.delay_threshold,
        "manifest-monitor initialized"
    );

    let result = server.run().await;
    sessions.shutdown().await;
    result?;

    Ok(())
}
