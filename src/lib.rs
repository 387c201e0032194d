//! Betbridge - Game-Integration Transaction Broker
//!
//! Sits between a casino game provider and an unreliable external wallet
//! service, mediating bet placement, settlement, cancellation and
//! compensating reversals so the local ledger and the remote wallet
//! converge despite partial failures.
//!
//! # Modules
//!
//! - [`config`] - Environment-keyed YAML configuration
//! - [`db`] - PostgreSQL pool management
//! - [`error`] - Application error taxonomy
//! - [`ledger`] - Users, transactions and outbox persistence
//! - [`wallet`] - Typed wallet RPC with bounded retries
//! - [`lock`] - Per-user operation serializer
//! - [`coordinator`] - Saga orchestration of the four operations (core)
//! - [`outbox`] - Background compensation drainer
//! - [`auth`] - Credentials and JWT
//! - [`gateway`] - HTTP surface

pub mod auth;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod lock;
pub mod logging;
pub mod outbox;
pub mod seed;
pub mod wallet;

// Convenient re-exports at crate root
pub use config::AppConfig;
pub use coordinator::TransactionCoordinator;
pub use error::AppError;
pub use ledger::{Transaction, TransactionStatus, TransactionType};
pub use lock::UserLockManager;
pub use outbox::OutboxProcessor;
pub use wallet::{WalletApi, WalletClient};
