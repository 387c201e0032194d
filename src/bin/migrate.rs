//! Migration runner
//!
//! `migrate --env development --action up|down`

use anyhow::Context;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use betbridge::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "migrate", about = "Run database migrations")]
struct Args {
    /// Environment (development, production)
    #[arg(long, default_value = "development")]
    env: String,

    /// Migration action: up applies all pending, down reverts everything
    #[arg(long, default_value = "up")]
    action: String,
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

    let migrator = sqlx::migrate!("./migrations");

    match args.action.as_str() {
        "up" => {
            migrator.run(&pool).await.context("migration up failed")?;
            tracing::info!("Migrations applied");
        }
        "down" => {
            migrator
                .undo(&pool, -1)
                .await
                .context("migration down failed")?;
            tracing::info!("Migrations reverted");
        }
        other => anyhow::bail!("unknown action '{}': expected up or down", other),
    }

    Ok(())
}
