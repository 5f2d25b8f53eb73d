//! Start-up checks that fail fast instead of letting the scraper hang.
//!
//! Configuration has already been validated by the time these run; the
//! remaining checks are the log directory and database reachability.

use hespress_core::config::AppConfig;
use hespress_core::logs::{self, LogDirError};
use hespress_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum PreflightError {
    #[error(transparent)]
    LogDir(#[from] LogDirError),

    #[error(transparent)]
    Database(#[from] DbError),
}

/// Verify the log directory is writable and the database answers.
pub async fn run(config: &AppConfig) -> Result<(), PreflightError> {
    logs::ensure_writable(&config.logs.dir)?;
    tracing::info!(dir = %config.logs.dir.display(), "Log directory is writable");

    hespress_db::probe(&config.database).await?;
    tracing::info!(host = %config.database.host, "Database is reachable");

    Ok(())
}
