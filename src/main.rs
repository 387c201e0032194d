//! API server entry point

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use betbridge::auth::AuthService;
use betbridge::config::{AppConfig, environment};
use betbridge::coordinator::TransactionCoordinator;
use betbridge::db::Database;
use betbridge::gateway::state::AppState;
use betbridge::gateway::run_server;
use betbridge::lock::UserLockManager;
use betbridge::logging::init_logging;
use betbridge::outbox::OutboxProcessor;
use betbridge::wallet::{WalletApi, WalletClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = environment();
    let config = AppConfig::load(&env).context("failed to load configuration")?;
    let _log_guard = init_logging(&config);

    info!(environment = %env, "Starting betbridge broker");

    let db = Database::connect(&config.dsn(), &config.database)
        .await
        .context("failed to connect to database")?;
    let pool = db.pool().clone();

    let wallet: Arc<dyn WalletApi> =
        Arc::new(WalletClient::new(&config.wallet.url, &config.wallet.api_key));
    let locks = Arc::new(UserLockManager::new());
    let coordinator = Arc::new(TransactionCoordinator::new(
        pool.clone(),
        wallet.clone(),
        locks,
    ));

    let auth = Arc::new(AuthService::new(
        pool.clone(),
        config.jwt.secret.clone(),
        config.jwt.expiry,
    ));

    let outbox = Arc::new(OutboxProcessor::new(pool.clone(), coordinator.clone()));
    outbox.start();

    let state = Arc::new(AppState::new(pool, coordinator, auth, wallet));

    let shutdown_outbox = outbox.clone();
    run_server(state, &config.server_address(), async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received");
    })
    .await?;

    // Let the current outbox tick drain before exiting
    shutdown_outbox.stop().await;
    info!("Betbridge broker stopped");

    Ok(())
}
