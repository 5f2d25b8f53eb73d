//! Scraper script launcher.
//!
//! Resolves the target script (the configured default when no argument is
//! given), activates the venv if one exists, forwards the database
//! variables and spawns the interpreter with inherited standard streams.
//! The child's exit code is reported unchanged.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use super::outcome::ExitOutcome;
use super::venv::Activation;
use super::LaunchError;
use crate::config::LaunchConfig;

/// Starts the scraper script with its environment.
#[derive(Debug, Clone)]
pub struct ScriptLauncher {
    config: LaunchConfig,
    /// Extra variables injected into every child (the `DB_*` set).
    env_vars: Vec<(String, String)>,
}

impl ScriptLauncher {
    pub fn new(config: LaunchConfig, env_vars: Vec<(String, String)>) -> Self {
        Self { config, env_vars }
    }

    pub fn config(&self) -> &LaunchConfig {
        &self.config
    }

    /// Path of the script to run: `script` if given, the default otherwise.
    pub fn resolve_script(&self, script: Option<&str>) -> Result<PathBuf, LaunchError> {
        let name = script.unwrap_or(&self.config.default_script);
        let path = self.config.resolve(name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(LaunchError::ScriptNotFound(path))
        }
    }

    /// Build the interpreter command for `script_path` without spawning it.
    pub fn command(&self, script_path: &std::path::Path) -> Command {
        let activation = Activation::detect(&self.config.venv_path());
        let mut cmd = match &activation {
            Some(venv) => {
                let mut cmd = Command::new(venv.python());
                venv.apply(&mut cmd);
                cmd
            }
            None => Command::new(&self.config.interpreter),
        };
        cmd.arg(script_path)
            .current_dir(&self.config.working_directory)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        cmd
    }

    /// Spawn the target script and return a handle to the running child.
    pub fn spawn(&self, script: Option<&str>) -> Result<LaunchedChild, LaunchError> {
        let script_path = self.resolve_script(script)?;
        let venv = self.config.venv_path();
        if Activation::detect(&venv).is_none() {
            tracing::warn!(
                venv = %venv.display(),
                interpreter = %self.config.interpreter,
                "No virtual environment found, using system interpreter",
            );
        }

        let mut cmd = self.command(&script_path);
        let program = cmd.as_std().get_program().to_string_lossy().into_owned();
        let child = cmd
            .spawn()
            .map_err(|source| LaunchError::Spawn { program, source })?;

        tracing::info!(
            script = %script_path.display(),
            pid = child.id(),
            "Launched script",
        );

        Ok(LaunchedChild {
            child,
            script: script_path,
            started: Instant::now(),
        })
    }

    /// Run the target script to completion and report how it exited.
    pub async fn run(&self, script: Option<&str>) -> Result<ExitOutcome, LaunchError> {
        self.spawn(script)?.wait().await
    }
}

/// How a [`LaunchedChild`] finished under [`LaunchedChild::wait_or_stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildExit {
    /// The child exited on its own.
    Exited(ExitOutcome),
    /// A stop was requested and forwarded; the outcome is [`ExitOutcome::Stopped`].
    Stopped(ExitOutcome),
}

impl ChildExit {
    pub fn outcome(&self) -> ExitOutcome {
        match *self {
            Self::Exited(outcome) | Self::Stopped(outcome) => outcome,
        }
    }
}

/// A running scraper process.
#[derive(Debug)]
pub struct LaunchedChild {
    child: Child,
    script: PathBuf,
    started: Instant,
}

impl LaunchedChild {
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn script(&self) -> &std::path::Path {
        &self.script
    }

    /// Time since the child was spawned.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub async fn wait(&mut self) -> Result<ExitOutcome, LaunchError> {
        let status = self.child.wait().await?;
        Ok(ExitOutcome::from_status(status))
    }

    /// Wait for the child, or stop it when `cancel` fires.
    pub async fn wait_or_stop(
        &mut self,
        cancel: &CancellationToken,
        grace: Duration,
    ) -> Result<ChildExit, LaunchError> {
        let exited = tokio::select! {
            status = self.child.wait() => Some(status?),
            () = cancel.cancelled() => None,
        };
        match exited {
            Some(status) => Ok(ChildExit::Exited(ExitOutcome::from_status(status))),
            None => Ok(ChildExit::Stopped(self.terminate(grace).await?)),
        }
    }

    /// Forward SIGTERM, wait up to `grace`, then kill.
    pub async fn terminate(&mut self, grace: Duration) -> Result<ExitOutcome, LaunchError> {
        if let Some(status) = self.child.try_wait()? {
            return Ok(ExitOutcome::stopped(status));
        }

        send_sigterm(&self.child);
        tracing::info!(pid = self.child.id(), grace_secs = grace.as_secs(), "Sent SIGTERM to script");

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(status) => Ok(ExitOutcome::stopped(status?)),
            Err(_elapsed) => {
                tracing::warn!(pid = self.child.id(), "Script ignored SIGTERM, killing");
                self.child.kill().await?;
                let status = self.child.wait().await?;
                Ok(ExitOutcome::stopped(status))
            }
        }
    }
}

#[cfg(unix)]
fn send_sigterm(child: &Child) {
    if let Some(pid) = child.id() {
        // SAFETY: `kill` has no memory-safety preconditions; the pid belongs
        // to a child we have not reaped yet.
        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if rc != 0 {
            tracing::warn!(pid, error = %std::io::Error::last_os_error(), "Failed to send SIGTERM");
        }
    }
}

#[cfg(not(unix))]
fn send_sigterm(_child: &Child) {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
