pub mod auth;
pub mod health;
pub mod transaction;
pub mod user;

pub use auth::login;
pub use health::health_check;
pub use transaction::{cancel, deposit, list_transactions, withdraw};
pub use user::me;
