//! `hespress-supervisor` -- launches and supervises the hespress scraper.
//!
//! Loads configuration from the environment (and `.env` if present),
//! checks the log directory and database, then runs the scraper script
//! inside its virtual environment, restarting it per `RESTART_POLICY`.
//! See `hespress_core::config` for the full variable table.

use std::process::ExitCode;

use clap::Parser;

use hespress_core::config::AppConfig;
use hespress_supervisor::cli::Cli;
use hespress_supervisor::commands::{self, EXIT_CONFIG};
use hespress_supervisor::{signal, telemetry};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            telemetry::init(None);
            tracing::error!(var = e.var(), error = %e, "Invalid configuration");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    telemetry::init(Some(&config.logs.dir));

    let command = cli.command();
    tracing::info!(
        ?command,
        app_dir = %config.launch.working_directory.display(),
        log_dir = %config.logs.dir.display(),
        db_host = %config.database.host,
        db_name = %config.database.name,
        "Starting hespress-supervisor",
    );

    let cancel = signal::stop_token();

    match commands::execute(command, &config, cancel).await {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(commands::EXIT_FAILURE)),
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::from(e.exit_code())
        }
    }
}
