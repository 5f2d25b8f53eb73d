//! Command-line interface.

use clap::{Parser, Subcommand};

/// Launch and supervise the hespress scraper.
#[derive(Debug, Parser)]
#[command(name = "hespress-supervisor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Defaults to `run` with the configured default script.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the script and restart it according to the restart policy
    Run {
        /// Script to run, relative to APP_DIR (default: SCRAPER_SCRIPT)
        script: Option<String>,

        /// Skip the log directory and database checks
        #[arg(long)]
        skip_preflight: bool,
    },

    /// Run the script once and exit with its exit code
    Launch {
        /// Script to run, relative to APP_DIR (default: SCRAPER_SCRIPT)
        script: Option<String>,
    },

    /// Check the log directory and database connection, then exit
    Check,

    /// Create or refresh the virtual environment from the requirements file
    Prepare,
}

impl Cli {
    /// The requested command, with `run` as the default.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run {
            script: None,
            skip_preflight: false,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
