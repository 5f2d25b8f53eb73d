use std::path::PathBuf;

/// Errors that can occur while preparing or launching the scraper script.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// The script file does not exist.
    #[error("Script not found: {}", .0.display())]
    ScriptNotFound(PathBuf),

    /// The requirements manifest could not be read.
    #[error("Cannot read requirements {}: {source}", path.display())]
    Requirements {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Creating the virtual environment or installing packages failed.
    #[error("Environment setup failed with exit code {exit_code}: {stderr}")]
    EnvironmentSetup { exit_code: i32, stderr: String },

    /// A build step exceeded its configured timeout and was killed.
    #[error("Command timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
