use std::process::ExitCode;

use acb_db::{DbConfig, DbManager};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("acb_db=info".parse().unwrap())
                .add_directive("acb_migrate=info".parse().unwrap()),
        )
        .json()
        .init();

    match migrate().await {
        Ok(()) => {
            tracing::info!("Schema is up to date");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "Migration failed");
            ExitCode::FAILURE
        }
    }
}

async fn migrate() -> Result<(), acb_db::DbError> {
    let config = DbConfig::from_env()?;
    let manager = DbManager::connect(&config).await?;
    acb_db::run_migrations(manager.client()).await
}
