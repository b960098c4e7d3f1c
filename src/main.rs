use anyhow::Context;
use dotenvy::dotenv;
use log::info;
use std::sync::Arc;

use crmserver::core::config::AppConfig;
use crmserver::core::state::AppState;
use crmserver::core::utils::{create_conn, run_migrations};
use crmserver::main_module::run_server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;

    let pool = create_conn(&config.database_url).context("Failed to create database pool")?;
    run_migrations(&pool)
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {e}"))?;
    info!("Database ready");

    let state = Arc::new(AppState::new(pool, config));
    run_server(state).await.context("Server error")?;

    Ok(())
}
