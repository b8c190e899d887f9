pub mod api;
pub mod clock;
pub mod config;
pub mod db;
pub mod models;
pub mod notifications;
pub mod reminders;
pub mod session;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::{start_api_server, ApiContext};
use crate::clock::{Clock, SystemClock};
use crate::config::NotifyConfig;
use crate::notifications::{SqliteDismissalStore, SqliteFeed};
use crate::reminders::{AlertService, TracingAlertPlatform};
use crate::session::SessionServices;

pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(serve(NotifyConfig::from_env())) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

/// Build the shared services, serve the API until ctrl-c, then end every session.
pub async fn serve(config: NotifyConfig) -> Result<(), String> {
    let conn = db::sqlite::open_database(&config.database_path)
        .map_err(|e| format!("Failed to open {}: {e}", config.database_path.display()))?;
    let conn = db::sqlite::shared(conn);
    tracing::info!(path = %config.database_path.display(), "Database ready");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let services = SessionServices {
        clock: clock.clone(),
        dismissals: Arc::new(SqliteDismissalStore::new(conn.clone(), config.dismissal_cap)),
        feed: Arc::new(SqliteFeed::new(conn, clock)),
        alerts: Arc::new(AlertService::new(
            Arc::new(TracingAlertPlatform::new()),
            config.auto_dismiss,
        )),
        reminders: config.reminder_settings(),
    };

    let ctx = ApiContext::new(services);
    let mut server = start_api_server(ctx.clone(), config.bind_addr, config.port).await?;
    tracing::info!(addr = %server.info.server_addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }

    tracing::info!("Shutting down");
    ctx.end_all_sessions();
    server.shutdown();
    Ok(())
}
