//! Tracing subscriber setup.
//!
//! Logs go to stdout and, when a log directory is given, to
//! `supervisor_<date>.log` inside it (date taken at start-up).

use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hespress_core::logs::{self, SUPERVISOR_LOG_PREFIX};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "hespress_supervisor=info,hespress_core=info,hespress_db=info";

/// Install the global subscriber. Call once, early in `main`.
pub fn init(log_dir: Option<&Path>) {
    let opened = log_dir.map(|dir| {
        logs::open_daily(dir, SUPERVISOR_LOG_PREFIX, chrono::Local::now().date_naive())
    });
    let (file_layer, file_error) = match opened {
        Some(Ok(file)) => {
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (Some(layer), None)
        }
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    if let Some(e) = file_error {
        tracing::warn!(error = %e, "Supervisor log file unavailable, logging to stdout only");
    }
}
