//! Ledger Store
//!
//! PostgreSQL persistence for users, transactions and outbox events.
//!
//! Repository methods take `impl PgExecutor<'_>` so they bind either to the
//! outer pool or to an open `sqlx::Transaction`. The `..._for_update`
//! variants issue `SELECT ... FOR UPDATE` and must run inside a transaction;
//! the row lock is held until that transaction commits or rolls back.

pub mod models;
pub mod outbox;
pub mod transactions;
pub mod users;

#[cfg(test)]
mod integration_tests;

pub use models::{EventStatus, OutboxEvent, Transaction, TransactionStatus, TransactionType, User};
pub use outbox::OutboxRepo;
pub use transactions::TransactionRepo;
pub use users::UserRepo;
