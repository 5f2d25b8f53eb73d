//! Launching the scraper script inside its Python environment.
//!
//! [`script::ScriptLauncher`] resolves the target script, activates the
//! virtual environment and spawns the interpreter with inherited standard
//! streams. [`venv`] builds that environment from the requirements
//! manifest, and [`subprocess`] holds the captured-output runner used for
//! the build steps.

pub mod error;
pub mod outcome;
pub mod script;
pub mod subprocess;
pub mod venv;

pub use error::LaunchError;
pub use outcome::ExitOutcome;
pub use script::{ChildExit, LaunchedChild, ScriptLauncher};

/// Shared test helpers for launcher tests.
#[cfg(test)]
pub(crate) mod test_helpers {
    use std::path::Path;
    use std::time::Duration;

    use crate::config::LaunchConfig;

    /// A [`LaunchConfig`] that runs scripts with `bash` from `dir`, with no venv.
    pub fn bash_config(dir: &Path) -> LaunchConfig {
        LaunchConfig {
            interpreter: "bash".to_string(),
            working_directory: dir.to_path_buf(),
            venv_dir: "venv".into(),
            default_script: "scraper.sh".to_string(),
            requirements: "requirements.txt".into(),
            prepare_timeout: Duration::from_secs(5),
        }
    }

    /// Write `body` to `dir/name` behind a bash shebang.
    pub fn write_script(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), format!("#!/bin/bash\n{body}\n")).expect("write script");
    }

    /// Make `path` executable.
    pub fn make_executable(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path).expect("metadata").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms).expect("chmod");
    }
}
