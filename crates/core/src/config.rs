//! Process configuration loaded once from environment variables.
//!
//! | Env Var                       | Required | Default            |
//! |-------------------------------|----------|--------------------|
//! | `DB_HOST`                     | yes      | --                 |
//! | `DB_NAME`                     | yes      | --                 |
//! | `DB_USER`                     | yes      | --                 |
//! | `DB_PASSWORD`                 | yes      | --                 |
//! | `DB_PORT`                     | no       | `5432`             |
//! | `DB_CONNECT_TIMEOUT_SECS`     | no       | `5`                |
//! | `LOG_DIR`                     | no       | `logs`             |
//! | `PYTHON_BIN`                  | no       | `python3`          |
//! | `VENV_DIR`                    | no       | `venv`             |
//! | `SCRAPER_SCRIPT`              | no       | `scraper.py`       |
//! | `APP_DIR`                     | no       | `.`                |
//! | `REQUIREMENTS_FILE`           | no       | `requirements.txt` |
//! | `PREPARE_TIMEOUT_SECS`        | no       | `900`              |
//! | `RESTART_POLICY`              | no       | `unless-stopped`   |
//! | `RESTART_MAX`                 | no       | `10` (`0` = no cap)|
//! | `RESTART_BACKOFF_INITIAL_MS`  | no       | `1000`             |
//! | `RESTART_BACKOFF_MAX_SECS`    | no       | `60`               |
//! | `RESTART_STABLE_AFTER_SECS`   | no       | `300`              |
//! | `STOP_GRACE_SECS`             | no       | `10`               |
//!
//! `APP_DIR` is made absolute at load time; other relative paths are
//! resolved against it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::restart::{Backoff, RestartPolicy};

pub const DB_HOST: &str = "DB_HOST";
pub const DB_NAME: &str = "DB_NAME";
pub const DB_USER: &str = "DB_USER";
pub const DB_PASSWORD: &str = "DB_PASSWORD";

/// Variables forwarded verbatim into the child's environment.
pub const DATABASE_VARS: [&str; 4] = [DB_HOST, DB_NAME, DB_USER, DB_PASSWORD];

/// Source of environment values. Production uses [`std::env::var`]; tests
/// pass a closure over a fixed table.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Look a variable up in the process environment.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

/// Connection settings for the scraper's PostgreSQL database.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub name: String,
    pub user: String,
    password: String,
    pub port: u16,
    /// Upper bound on a single connection attempt.
    pub connect_timeout: Duration,
}

impl DatabaseConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            host: required(lookup, DB_HOST)?,
            name: required(lookup, DB_NAME)?,
            user: required(lookup, DB_USER)?,
            password: required(lookup, DB_PASSWORD)?,
            port: parsed(lookup, "DB_PORT", 5432)?,
            connect_timeout: Duration::from_secs(nonzero(lookup, "DB_CONNECT_TIMEOUT_SECS", 5)?),
        })
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// `(name, value)` pairs to inject into the child process.
    pub fn child_env(&self) -> Vec<(String, String)> {
        [
            (DB_HOST, &self.host),
            (DB_NAME, &self.name),
            (DB_USER, &self.user),
            (DB_PASSWORD, &self.password),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Launcher
// ---------------------------------------------------------------------------

/// How the scraper script is located and started.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Interpreter used to create the venv, and to run scripts when no
    /// venv is present.
    pub interpreter: String,
    /// Directory scripts run in; relative paths below resolve against it.
    pub working_directory: PathBuf,
    pub venv_dir: PathBuf,
    /// Script run when no script argument is given.
    pub default_script: String,
    pub requirements: PathBuf,
    /// Upper bound for venv creation and `pip install`.
    pub prepare_timeout: Duration,
}

impl LaunchConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            interpreter: optional(lookup, "PYTHON_BIN").unwrap_or_else(|| "python3".into()),
            working_directory: absolute_dir(lookup, "APP_DIR")?,
            venv_dir: optional(lookup, "VENV_DIR").map_or_else(|| "venv".into(), PathBuf::from),
            default_script: optional(lookup, "SCRAPER_SCRIPT")
                .unwrap_or_else(|| "scraper.py".into()),
            requirements: optional(lookup, "REQUIREMENTS_FILE")
                .map_or_else(|| "requirements.txt".into(), PathBuf::from),
            prepare_timeout: Duration::from_secs(nonzero(lookup, "PREPARE_TIMEOUT_SECS", 900)?),
        })
    }

    /// Resolve `path` against the working directory unless it is absolute.
    ///
    /// The result is absolute, so it stays valid after the child is started
    /// with the working directory as its `current_dir`.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let joined = self.working_directory.join(path);
        std::path::absolute(&joined).unwrap_or(joined)
    }

    pub fn venv_path(&self) -> PathBuf {
        self.resolve(&self.venv_dir)
    }

    pub fn requirements_path(&self) -> PathBuf {
        self.resolve(&self.requirements)
    }
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Shared with the child; mounted from the host in containers.
    pub dir: PathBuf,
}

impl LogConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            dir: optional(lookup, "LOG_DIR").map_or_else(|| "logs".into(), PathBuf::from),
        })
    }
}

// ---------------------------------------------------------------------------
// Supervisor
// ---------------------------------------------------------------------------

/// Restart behaviour of the supervisor loop.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub policy: RestartPolicy,
    /// Consecutive restarts allowed before giving up; `0` disables the cap.
    pub max_restarts: u32,
    pub backoff: Backoff,
    pub stable_after: Duration,
    /// Time a child gets to exit after SIGTERM before it is killed.
    pub stop_grace: Duration,
}

impl SupervisorConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            policy: parsed(lookup, "RESTART_POLICY", RestartPolicy::UnlessStopped)?,
            max_restarts: parsed(lookup, "RESTART_MAX", 10)?,
            backoff: Backoff {
                initial: Duration::from_millis(parsed(lookup, "RESTART_BACKOFF_INITIAL_MS", 1000)?),
                max: Duration::from_secs(parsed(lookup, "RESTART_BACKOFF_MAX_SECS", 60)?),
            },
            stable_after: Duration::from_secs(parsed(lookup, "RESTART_STABLE_AFTER_SECS", 300)?),
            stop_grace: Duration::from_secs(parsed(lookup, "STOP_GRACE_SECS", 10)?),
        })
    }
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

/// Everything the supervisor needs, validated up front.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub launch: LaunchConfig,
    pub logs: LogConfig,
    pub supervisor: SupervisorConfig,
}

impl AppConfig {
    /// Load from the process environment. Fails on the first invalid variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let launch = LaunchConfig::from_lookup(lookup)?;
        let mut logs = LogConfig::from_lookup(lookup)?;
        logs.dir = launch.resolve(&logs.dir);
        Ok(Self {
            database: DatabaseConfig::from_lookup(lookup)?,
            launch,
            logs,
            supervisor: SupervisorConfig::from_lookup(lookup)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn required(lookup: Lookup<'_>, var: &'static str) -> Result<String, ConfigError> {
    match lookup(var) {
        None => Err(ConfigError::Missing { var }),
        Some(value) if value.trim().is_empty() => Err(ConfigError::Empty { var }),
        Some(value) => Ok(value),
    }
}

/// `var` (default `.`) as an absolute directory, anchored at the process's
/// current directory.
fn absolute_dir(lookup: Lookup<'_>, var: &'static str) -> Result<PathBuf, ConfigError> {
    let value = optional(lookup, var).unwrap_or_else(|| ".".into());
    std::path::absolute(&value).map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
        value,
    })
}

/// A duration in seconds that must be greater than zero.
fn nonzero(lookup: Lookup<'_>, var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match parsed(lookup, var, default)? {
        0 => Err(ConfigError::Invalid {
            var,
            value: "0".into(),
            reason: "must be greater than zero".into(),
        }),
        secs => Ok(secs),
    }
}

/// Unset and blank values are both treated as absent.
fn optional(lookup: Lookup<'_>, var: &str) -> Option<String> {
    lookup(var).filter(|v| !v.trim().is_empty())
}

fn parsed<T>(lookup: Lookup<'_>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match optional(lookup, var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
