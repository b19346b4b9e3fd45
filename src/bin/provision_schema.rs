//! Provisions the relational trading-history schema and exits.

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use trading_history::config::LogSettings;
use trading_history::infrastructure::persistence::postgres::schema;
use trading_history::telemetry;

#[derive(Parser)]
#[clap(about = "Creates the trading-history tables and procedures if they are missing")]
struct Opts {
    /// The address of the database including username and password
    #[clap(long, env = "TRADING_HISTORY_DATABASE_URL")]
    database: String,

    /// Seconds to wait for a connection
    #[clap(long, default_value = "10")]
    connect_timeout_seconds: u64,

    /// If enabled logs will be in json format
    #[clap(short, long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts = Opts::parse();
    telemetry::init(&LogSettings {
        json: opts.json,
        filter: None,
    })?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(opts.connect_timeout_seconds))
        .connect(&opts.database)
        .await
        .context("Failed to connect to the database")?;

    schema::provision(&pool)
        .await
        .context("Failed to provision the schema")?;
    tracing::info!(objects = schema::SCHEMA.len(), "Schema provisioned");

    pool.close().await;
    Ok(())
}
