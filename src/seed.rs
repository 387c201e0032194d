//! Database seeding
//!
//! Loads the fixture players the wallet service knows about. Existing users
//! are skipped so seeding is safe to re-run.

use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::auth::AuthService;
use crate::error::AppError;
use crate::ledger::{User, UserRepo};

/// Fixture players; ids and currencies are wallet-assigned
const SEED_USERS: &[(i64, &str, &str)] = &[
    (34633089486, "user1", "USD"),
    (34679664254, "user2", "EUR"),
    (34616761765, "user3", "KES"),
    (34673635133, "user4", "USD"),
];

const SEED_PASSWORD: &str = "password123";

/// Insert the fixture users, skipping any that already exist
pub async fn seed_users(pool: &PgPool) -> Result<(), AppError> {
    info!("Seeding users...");

    let password_hash = AuthService::hash_password(SEED_PASSWORD);

    for (id, username, currency) in SEED_USERS {
        if UserRepo::get(pool, *id).await?.is_some() {
            warn!(user_id = id, "User already exists, skipping");
            continue;
        }

        let user = User {
            id: *id,
            username: (*username).to_string(),
            password: password_hash.clone(),
            currency: (*currency).to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        UserRepo::create(pool, &user).await?;
        info!(user_id = id, username, currency, "Seeded user");
    }

    info!("User seeding completed");
    Ok(())
}
