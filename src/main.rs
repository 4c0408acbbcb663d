//! # Estate API Main Entry Point

use anyhow::Context;
use estate_api::{config::ConfigLoader, db, seeds, server::run_server, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::new()
        .load()
        .context("failed to load configuration")?;

    telemetry::init_tracing(&config)?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }

    let db = db::init_pool(&config).await?;
    db::run_migrations(&db).await?;

    if config.seed_demo_data {
        let summary = seeds::seed_demo_data(&db).await?;
        tracing::info!(
            users = summary.users,
            properties = summary.properties,
            "Demo data seeding finished"
        );
    }

    run_server(config, db).await
}
