//! Classification of how a launched child process finished.

use std::process::ExitStatus;

/// Shell convention: a process killed by signal `n` reports `128 + n`.
const SIGNAL_EXIT_BASE: i32 = 128;

/// How a child process finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Exit code 0.
    Success,
    /// Non-zero exit code.
    Failed { code: i32 },
    /// Killed by a signal the supervisor did not send.
    Signaled { signal: i32 },
    /// Terminated because the supervisor was asked to stop. `code` is the
    /// child's own exit code after the stop was forwarded.
    Stopped { code: i32 },
}

impl ExitOutcome {
    /// Classify a raw [`ExitStatus`] for a child that exited on its own.
    pub fn from_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(0) => Self::Success,
            Some(code) => Self::Failed { code },
            None => Self::Signaled {
                signal: signal_of(status).unwrap_or(0),
            },
        }
    }

    /// Classify a status observed after forwarding an explicit stop.
    pub fn stopped(status: ExitStatus) -> Self {
        Self::Stopped {
            code: Self::from_status(status).exit_code(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Exit code to hand back to whoever started us.
    pub fn exit_code(&self) -> i32 {
        match *self {
            Self::Success => 0,
            Self::Failed { code } | Self::Stopped { code } => code,
            Self::Signaled { signal } => SIGNAL_EXIT_BASE + signal,
        }
    }
}

#[cfg(unix)]
fn signal_of(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_status: ExitStatus) -> Option<i32> {
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::process::ExitStatusExt;

    use super::*;

    #[test]
    fn zero_is_success() {
        let outcome = ExitOutcome::from_status(ExitStatus::from_raw(0));
        assert_eq!(outcome, ExitOutcome::Success);
        assert_eq!(outcome.exit_code(), 0);
    }

    #[test]
    fn nonzero_code_passes_through() {
        // Raw wait status encodes the exit code in the high byte.
        let outcome = ExitOutcome::from_status(ExitStatus::from_raw(42 << 8));
        assert_eq!(outcome, ExitOutcome::Failed { code: 42 });
        assert_eq!(outcome.exit_code(), 42);
    }

    #[test]
    fn signal_maps_to_128_plus_signal() {
        let outcome = ExitOutcome::from_status(ExitStatus::from_raw(libc::SIGKILL));
        assert_eq!(outcome, ExitOutcome::Signaled { signal: 9 });
        assert_eq!(outcome.exit_code(), 137);
    }

    #[test]
    fn stopped_keeps_child_code() {
        let outcome = ExitOutcome::stopped(ExitStatus::from_raw(libc::SIGTERM));
        assert_eq!(outcome, ExitOutcome::Stopped { code: 143 });
        assert!(!outcome.is_success());
    }
}
