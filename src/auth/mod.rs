//! Authentication
//!
//! Credential verification against the seeded SHA-256-hex passwords and
//! HS256 JWT issue/verify, plus the axum middleware that guards the
//! transaction routes.

pub mod middleware;
pub mod service;

pub use middleware::jwt_auth_middleware;
pub use service::{AuthService, Claims};
