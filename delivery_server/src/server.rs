use std::sync::Arc;

use delivery_engine::{events::EventHandlers, DeliveryDatabase, SqliteDatabase};
use log::*;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    notifications::{notification_hooks, LogNotificationGateway},
    workers::{start_interest_worker, start_overdue_worker},
};

/// Runs the background jobs until the process receives Ctrl-C.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    if config.database_url.trim().is_empty() {
        return Err(ServerError::ConfigurationError("DLV_DATABASE_URL is empty".into()));
    }
    let mut db = SqliteDatabase::new_with_url(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    }

    let hooks = notification_hooks(Arc::new(LogNotificationGateway));
    let handlers = EventHandlers::new(config.event_buffer_size, hooks);
    let producers = handlers.producers();
    handlers.start_handlers();

    let interest_worker = start_interest_worker(
        db.clone(),
        producers.clone(),
        config.interest_job_interval,
        config.accrual_options(),
    );
    let overdue_worker = start_overdue_worker(db.clone(), producers, config.overdue_job_interval, config.overdue_after);
    info!("🚀️ Delivery server is running. Press Ctrl-C to stop.");

    tokio::signal::ctrl_c().await?;
    info!("🚀️ Shutting down");
    interest_worker.abort();
    overdue_worker.abort();
    db.close().await?;
    Ok(())
}
