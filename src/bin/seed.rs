use anyhow::{Context, Result};
use clap::Parser;
use estate_api::{config::ConfigLoader, db, seeds, telemetry};

/// Loads demo accounts and listings into the configured database.
#[derive(Debug, Parser)]
#[command(name = "seed", version)]
struct Args {
    /// Delete all existing marketplace data before seeding
    #[arg(long)]
    reset: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    telemetry::init_tracing(&config)?;

    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;
    db::run_migrations(&db).await.context("running migrations")?;

    if args.reset {
        seeds::reset_data(&db).await.context("resetting data")?;
    }

    let summary = seeds::seed_demo_data(&db).await?;
    println!(
        "Seeded {} user(s) and {} listing(s).",
        summary.users, summary.properties
    );

    Ok(())
}
