//! Restart policy and crash-loop accounting.
//!
//! [`RestartPolicy`] mirrors the container restart vocabulary (`no`,
//! `always`, `on-failure`, `unless-stopped`). [`RestartTracker`] bounds the
//! number of consecutive restarts and computes the backoff before each one.
//! The supervisor loop that drives these lives in the binary crate.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rand::Rng;

use crate::launcher::outcome::ExitOutcome;

/// When a finished child process should be started again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Never restart.
    No,
    /// Restart after any exit except an explicit stop.
    Always,
    /// Restart only after a non-zero exit or a fatal signal.
    OnFailure,
    /// Same as [`RestartPolicy::Always`] within a single supervisor process.
    UnlessStopped,
}

impl RestartPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::No => "no",
            Self::Always => "always",
            Self::OnFailure => "on-failure",
            Self::UnlessStopped => "unless-stopped",
        }
    }

    /// Whether a child that finished with `outcome` should be restarted.
    ///
    /// An explicit stop is never restarted, whatever the policy.
    pub fn should_restart(self, outcome: &ExitOutcome) -> bool {
        if matches!(outcome, ExitOutcome::Stopped { .. }) {
            return false;
        }
        match self {
            Self::No => false,
            Self::Always | Self::UnlessStopped => true,
            Self::OnFailure => !outcome.is_success(),
        }
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RestartPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "no" | "never" => Ok(Self::No),
            "always" => Ok(Self::Always),
            "on-failure" | "on_failure" => Ok(Self::OnFailure),
            "unless-stopped" | "unless_stopped" => Ok(Self::UnlessStopped),
            other => Err(format!(
                "unknown restart policy '{other}' (expected no, always, on-failure or unless-stopped)"
            )),
        }
    }
}

/// Exponential backoff between restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Backoff {
    /// Un-jittered delay before restart number `attempt` (0-based):
    /// `min(initial * 2^attempt, max)`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial
            .checked_mul(factor)
            .map_or(self.max, |d| d.min(self.max))
    }

    /// [`Backoff::delay`] with jitter, uniform in `[delay / 2, delay]`.
    pub fn jittered(&self, attempt: u32) -> Duration {
        let delay = self.delay(attempt);
        let half = delay / 2;
        let spread = delay.saturating_sub(half).as_millis() as u64;
        if spread == 0 {
            return delay;
        }
        let extra = rand::rng().random_range(0..=spread);
        half + Duration::from_millis(extra)
    }
}

/// What the supervisor should do after a child has exited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Start the child again after `delay`. `attempt` is 1-based.
    Restart { attempt: u32, delay: Duration },
    /// The policy does not restart this outcome.
    Exit,
    /// Too many consecutive restarts without a stable run.
    GiveUp { restarts: u32 },
}

/// Counts consecutive restarts and turns exit outcomes into [`Decision`]s.
#[derive(Debug, Clone)]
pub struct RestartTracker {
    policy: RestartPolicy,
    backoff: Backoff,
    /// `0` means unbounded.
    max_restarts: u32,
    /// A run at least this long resets the consecutive counter.
    stable_after: Duration,
    consecutive: u32,
    total: u32,
}

impl RestartTracker {
    pub fn new(
        policy: RestartPolicy,
        backoff: Backoff,
        max_restarts: u32,
        stable_after: Duration,
    ) -> Self {
        Self {
            policy,
            backoff,
            max_restarts,
            stable_after,
            consecutive: 0,
            total: 0,
        }
    }

    /// Restarts issued since the last stable run.
    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    /// Restarts issued over the tracker's lifetime.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Record a finished run that lasted `ran_for` and decide what happens next.
    pub fn record(&mut self, outcome: &ExitOutcome, ran_for: Duration) -> Decision {
        if ran_for >= self.stable_after {
            self.consecutive = 0;
        }

        if !self.policy.should_restart(outcome) {
            return Decision::Exit;
        }

        if self.max_restarts > 0 && self.consecutive >= self.max_restarts {
            return Decision::GiveUp {
                restarts: self.consecutive,
            };
        }

        let delay = self.backoff.jittered(self.consecutive);
        self.consecutive += 1;
        self.total += 1;
        Decision::Restart {
            attempt: self.consecutive,
            delay,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
