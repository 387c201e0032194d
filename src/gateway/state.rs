use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::AuthService;
use crate::coordinator::TransactionCoordinator;
use crate::wallet::WalletApi;

/// Shared application state for the HTTP surface
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub coordinator: Arc<TransactionCoordinator>,
    pub auth: Arc<AuthService>,
    pub wallet: Arc<dyn WalletApi>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        coordinator: Arc<TransactionCoordinator>,
        auth: Arc<AuthService>,
        wallet: Arc<dyn WalletApi>,
    ) -> Self {
        Self {
            pool,
            coordinator,
            auth,
            wallet,
        }
    }
}
