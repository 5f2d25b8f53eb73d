//! Dispatch of CLI commands against a loaded [`AppConfig`].

use tokio_util::sync::CancellationToken;

use hespress_core::config::AppConfig;
use hespress_core::launcher::{venv, LaunchError, ScriptLauncher};

use crate::cli::Command;
use crate::preflight::{self, PreflightError};
use crate::supervise::Supervisor;

/// Exit code for configuration and preflight failures.
pub const EXIT_CONFIG: u8 = 2;
/// Exit code for other supervisor failures.
pub const EXIT_FAILURE: u8 = 1;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Preflight failed: {0}")]
    Preflight(#[from] PreflightError),

    #[error(transparent)]
    Launch(#[from] LaunchError),
}

impl CommandError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Preflight(_) | Self::Launch(LaunchError::ScriptNotFound(_)) => EXIT_CONFIG,
            Self::Launch(_) => EXIT_FAILURE,
        }
    }
}

/// Build the launcher for `config`, forwarding the database variables.
pub fn launcher(config: &AppConfig) -> ScriptLauncher {
    ScriptLauncher::new(config.launch.clone(), config.database.child_env())
}

/// Execute `command`, returning the process exit code.
///
/// `cancel` signals an explicit stop for the commands that run a child.
pub async fn execute(
    command: Command,
    config: &AppConfig,
    cancel: CancellationToken,
) -> Result<i32, CommandError> {
    match command {
        Command::Run {
            script,
            skip_preflight,
        } => {
            if !skip_preflight {
                preflight::run(config).await?;
            }
            let supervisor = Supervisor::new(launcher(config), config.supervisor.clone());
            let exit = supervisor.run(script.as_deref(), cancel).await?;
            tracing::info!(
                exit_code = exit.exit_code(),
                restarts = exit.restarts(),
                "Supervisor finished",
            );
            Ok(exit.exit_code())
        }
        Command::Launch { script } => {
            let mut child = launcher(config).spawn(script.as_deref())?;
            let exit = child
                .wait_or_stop(&cancel, config.supervisor.stop_grace)
                .await?;
            Ok(exit.outcome().exit_code())
        }
        Command::Check => {
            preflight::run(config).await?;
            tracing::info!("All checks passed");
            Ok(0)
        }
        Command::Prepare => {
            let prepared = venv::prepare(&config.launch).await?;
            tracing::info!(
                venv = %prepared.dir.display(),
                reused = prepared.reused,
                requirements_hash = %prepared.requirements_hash,
                "Virtual environment ready",
            );
            Ok(0)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
