//! Log directory handling.
//!
//! The directory is shared with the scraper, which writes its own
//! `scraping_<date>.log` files there. The supervisor only makes sure the
//! directory exists and is writable, and opens its own daily file.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

/// File name prefix for the supervisor's own log file.
pub const SUPERVISOR_LOG_PREFIX: &str = "supervisor";

/// Name of the probe file written by [`ensure_writable`].
const PROBE_FILE: &str = ".write-probe";

#[derive(Debug, thiserror::Error)]
pub enum LogDirError {
    #[error("Cannot create log directory {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Log directory {} is not writable: {source}", path.display())]
    NotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// `<prefix>_<YYYY-MM-DD>.log`
pub fn daily_file_name(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}_{}.log", date.format("%Y-%m-%d"))
}

/// Create `dir` if needed and verify the current user can write to it.
pub fn ensure_writable(dir: &Path) -> Result<(), LogDirError> {
    fs::create_dir_all(dir).map_err(|source| LogDirError::Create {
        path: dir.to_path_buf(),
        source,
    })?;

    let probe = dir.join(PROBE_FILE);
    fs::write(&probe, b"ok").map_err(|source| LogDirError::NotWritable {
        path: dir.to_path_buf(),
        source,
    })?;
    let _ = fs::remove_file(&probe);
    Ok(())
}

/// Open (append) today's log file for `prefix` inside `dir`.
pub fn open_daily(dir: &Path, prefix: &str, date: NaiveDate) -> Result<File, LogDirError> {
    fs::create_dir_all(dir).map_err(|source| LogDirError::Create {
        path: dir.to_path_buf(),
        source,
    })?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(daily_file_name(prefix, date)))
        .map_err(|source| LogDirError::NotWritable {
            path: dir.to_path_buf(),
            source,
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
