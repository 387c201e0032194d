//! Fixture loader
//!
//! `seed --env development`

use anyhow::Context;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use betbridge::config::AppConfig;
use betbridge::seed::seed_users;

#[derive(Parser, Debug)]
#[command(name = "seed", about = "Load fixture users")]
struct Args {
    /// Environment (development, production)
    #[arg(long, default_value = "development")]
    env: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let args = Args::parse();
    let config = AppConfig::load(&args.env).context("failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.dsn())
        .await
        .context("failed to connect to database")?;

    seed_users(&pool).await.context("seeding failed")?;

    Ok(())
}
