//! Supervisor loop: launch the scraper, restart it per policy.
//!
//! Runs one child at a time. Each exit goes through a
//! [`RestartTracker`], which bounds consecutive restarts and picks the
//! backoff. Cancelling the token is an explicit stop: the child gets
//! SIGTERM, then SIGKILL after the grace period, and is never restarted.
//! A cancel that arrives during the backoff sleep also ends the loop.

use tokio_util::sync::CancellationToken;

use hespress_core::config::SupervisorConfig;
use hespress_core::launcher::{ChildExit, ExitOutcome, LaunchError, ScriptLauncher};
use hespress_core::restart::{Decision, RestartTracker};

/// Why the supervisor loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorExit {
    /// An explicit stop was requested.
    Stopped { restarts: u32 },
    /// The child exited and the policy did not restart it.
    Completed { outcome: ExitOutcome, restarts: u32 },
    /// The restart cap was reached.
    GaveUp { last: ExitOutcome, restarts: u32 },
}

impl SupervisorExit {
    /// Process exit code for the supervisor itself.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Stopped { .. } => 0,
            Self::Completed { outcome, .. } | Self::GaveUp { last: outcome, .. } => {
                outcome.exit_code()
            }
        }
    }

    /// Restarts performed before the loop ended.
    pub fn restarts(&self) -> u32 {
        match *self {
            Self::Stopped { restarts }
            | Self::Completed { restarts, .. }
            | Self::GaveUp { restarts, .. } => restarts,
        }
    }
}

/// Drives a [`ScriptLauncher`] under a restart policy.
pub struct Supervisor {
    launcher: ScriptLauncher,
    config: SupervisorConfig,
}

impl Supervisor {
    pub fn new(launcher: ScriptLauncher, config: SupervisorConfig) -> Self {
        Self { launcher, config }
    }

    /// Run `script` (or the default script) until the policy, the restart
    /// cap or `cancel` ends the loop.
    ///
    /// A script that cannot be found or spawned is returned as an error
    /// rather than restarted.
    pub async fn run(
        &self,
        script: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<SupervisorExit, LaunchError> {
        let mut tracker = RestartTracker::new(
            self.config.policy,
            self.config.backoff,
            self.config.max_restarts,
            self.config.stable_after,
        );

        tracing::info!(
            policy = %self.config.policy,
            max_restarts = self.config.max_restarts,
            "Supervisor started",
        );

        loop {
            if cancel.is_cancelled() {
                return Ok(SupervisorExit::Stopped {
                    restarts: tracker.total(),
                });
            }

            let mut child = self.launcher.spawn(script)?;
            let exit = child.wait_or_stop(&cancel, self.config.stop_grace).await?;
            let ran_for = child.elapsed();

            let outcome = match exit {
                ChildExit::Stopped(outcome) => {
                    tracing::info!(
                        exit_code = outcome.exit_code(),
                        "Script stopped on request, not restarting",
                    );
                    return Ok(SupervisorExit::Stopped {
                        restarts: tracker.total(),
                    });
                }
                ChildExit::Exited(outcome) => outcome,
            };

            match tracker.record(&outcome, ran_for) {
                Decision::Exit => {
                    tracing::info!(
                        exit_code = outcome.exit_code(),
                        ran_for_secs = ran_for.as_secs(),
                        "Script exited, policy does not restart",
                    );
                    return Ok(SupervisorExit::Completed {
                        outcome,
                        restarts: tracker.total(),
                    });
                }
                Decision::GiveUp { restarts } => {
                    tracing::error!(
                        exit_code = outcome.exit_code(),
                        restarts,
                        "Script keeps failing, giving up",
                    );
                    return Ok(SupervisorExit::GaveUp {
                        last: outcome,
                        restarts: tracker.total(),
                    });
                }
                Decision::Restart { attempt, delay } => {
                    tracing::warn!(
                        exit_code = outcome.exit_code(),
                        ran_for_secs = ran_for.as_secs(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Script exited, restarting",
                    );
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = cancel.cancelled() => {
                            tracing::info!("Stop requested during restart backoff");
                            return Ok(SupervisorExit::Stopped {
                                restarts: tracker.total(),
                            });
                        }
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
