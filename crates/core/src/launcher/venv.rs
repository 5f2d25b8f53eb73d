//! Python virtual environment preparation and activation.
//!
//! The venv lives at a fixed location ([`LaunchConfig::venv_path`]). A
//! marker file inside it records the SHA-256 of the `requirements.txt` it
//! was built from: a matching hash reuses the venv, a different one
//! rebuilds it. A failed or timed-out build step removes the partial venv.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::process::Command;

use super::subprocess::{self, CapturedOutput};
use super::LaunchError;
use crate::config::LaunchConfig;

/// Records which requirements hash the venv was built from.
const MARKER_FILE: &str = ".requirements.sha256";

/// Result of [`prepare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedVenv {
    pub dir: PathBuf,
    pub requirements_hash: String,
    /// `true` if an up-to-date venv already existed.
    pub reused: bool,
}

/// An existing virtual environment that commands can be run inside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    dir: PathBuf,
}

impl Activation {
    /// Return the venv at `dir` if it contains a Python interpreter.
    pub fn detect(dir: &Path) -> Option<Self> {
        let activation = Self {
            dir: dir.to_path_buf(),
        };
        activation.python().is_file().then_some(activation)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.dir.join("bin")
    }

    pub fn python(&self) -> PathBuf {
        self.bin_dir().join("python")
    }

    pub fn pip(&self) -> PathBuf {
        self.bin_dir().join("pip")
    }

    /// Apply what `source bin/activate` does to `cmd`'s environment.
    pub fn apply(&self, cmd: &mut Command) {
        cmd.env("VIRTUAL_ENV", &self.dir)
            .env("PATH", self.path_with_bin(std::env::var_os("PATH")))
            .env_remove("PYTHONHOME");
    }

    /// `PATH` with the venv's `bin` directory prepended.
    fn path_with_bin(&self, current: Option<OsString>) -> OsString {
        let mut paths = vec![self.bin_dir()];
        if let Some(current) = current {
            paths.extend(std::env::split_paths(&current));
        }
        // Only fails if a path contains the separator; fall back to bin alone.
        std::env::join_paths(paths).unwrap_or_else(|_| self.bin_dir().into_os_string())
    }
}

/// Hex-encoded SHA-256 of the requirements manifest.
pub async fn hash_requirements(path: &Path) -> Result<String, LaunchError> {
    let contents = fs::read(path)
        .await
        .map_err(|source| LaunchError::Requirements {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(format!("{:x}", Sha256::digest(&contents)))
}

/// Ensure the venv at [`LaunchConfig::venv_path`] matches the requirements.
pub async fn prepare(config: &LaunchConfig) -> Result<PreparedVenv, LaunchError> {
    let requirements = config.requirements_path();
    let dir = config.venv_path();
    let requirements_hash = hash_requirements(&requirements).await?;

    if recorded_hash(&dir).await.as_deref() == Some(requirements_hash.as_str())
        && Activation::detect(&dir).is_some()
    {
        tracing::info!(venv = %dir.display(), "Virtual environment is up to date");
        return Ok(PreparedVenv {
            dir,
            requirements_hash,
            reused: true,
        });
    }

    if fs::metadata(&dir).await.is_ok() {
        tracing::info!(venv = %dir.display(), "Requirements changed, rebuilding virtual environment");
        fs::remove_dir_all(&dir).await?;
    }
    if let Some(parent) = dir.parent() {
        fs::create_dir_all(parent).await?;
    }

    tracing::info!(
        venv = %dir.display(),
        interpreter = %config.interpreter,
        "Creating virtual environment",
    );
    let mut create = Command::new(&config.interpreter);
    create.arg("-m").arg("venv").arg(&dir);
    let result = subprocess::run_captured(&mut create, config.prepare_timeout).await;
    checked(result, &dir).await?;

    let activation = Activation { dir: dir.clone() };
    tracing::info!(requirements = %requirements.display(), "Installing requirements");
    let mut install = Command::new(activation.pip());
    install.arg("install").arg("-r").arg(&requirements);
    activation.apply(&mut install);
    let result = subprocess::run_captured(&mut install, config.prepare_timeout).await;
    let output = checked(result, &dir).await?;

    fs::write(dir.join(MARKER_FILE), &requirements_hash).await?;
    tracing::info!(
        venv = %dir.display(),
        duration_ms = output.duration_ms,
        "Requirements installed",
    );

    Ok(PreparedVenv {
        dir,
        requirements_hash,
        reused: false,
    })
}

/// Pass a successful build step through; on any failure remove the partial
/// venv at `dir` and return the error.
async fn checked(
    result: Result<CapturedOutput, LaunchError>,
    dir: &Path,
) -> Result<CapturedOutput, LaunchError> {
    let err = match result {
        Ok(output) if output.success() => return Ok(output),
        Ok(output) => LaunchError::EnvironmentSetup {
            exit_code: output.exit_code,
            stderr: output.stderr.trim().to_string(),
        },
        Err(e) => e,
    };
    if let Err(e) = fs::remove_dir_all(dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(venv = %dir.display(), error = %e, "Failed to remove partial virtual environment");
        }
    }
    Err(err)
}

async fn recorded_hash(dir: &Path) -> Option<String> {
    fs::read_to_string(dir.join(MARKER_FILE))
        .await
        .ok()
        .map(|s| s.trim().to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;
    use crate::launcher::test_helpers::{bash_config, make_executable, write_script};

    /// Lay out a fake venv whose `python` and `pip` are bash shims.
    fn fake_venv(dir: &Path, pip_body: &str) {
        let bin = dir.join("bin");
        std::fs::create_dir_all(&bin).expect("mkdir bin");
        write_script(&bin, "python", "exec bash \"$@\"");
        write_script(&bin, "pip", pip_body);
        make_executable(&bin.join("python"));
        make_executable(&bin.join("pip"));
    }

    #[tokio::test]
    async fn hash_is_deterministic_and_content_sensitive() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "requests==2.31.0\npsycopg2==2.9.9\n").expect("write");
        std::fs::write(&b, "requests==2.31.0\n").expect("write");

        let first = hash_requirements(&a).await.expect("hash");
        let second = hash_requirements(&a).await.expect("hash");
        let other = hash_requirements(&b).await.expect("hash");
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert_ne!(first, other);
    }

    #[tokio::test]
    async fn missing_manifest_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = bash_config(dir.path());
        let result = prepare(&config).await;
        assert_matches!(result, Err(LaunchError::Requirements { .. }));
    }

    #[tokio::test]
    async fn reuses_venv_with_matching_hash() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = bash_config(dir.path());
        std::fs::write(config.requirements_path(), "requests\n").expect("write");
        let hash = hash_requirements(&config.requirements_path()).await.expect("hash");
        fake_venv(&config.venv_path(), "exit 0");
        std::fs::write(config.venv_path().join(MARKER_FILE), &hash).expect("marker");

        let prepared = prepare(&config).await.expect("prepare");
        assert!(prepared.reused);
        assert_eq!(prepared.requirements_hash, hash);
    }

    #[tokio::test]
    async fn failed_venv_creation_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = bash_config(dir.path());
        // `false -m venv <dir>` exits 1 without creating anything.
        config.interpreter = "false".to_string();
        std::fs::write(config.requirements_path(), "requests\n").expect("write");

        let result = prepare(&config).await;
        assert_matches!(result, Err(LaunchError::EnvironmentSetup { exit_code: 1, .. }));
        assert!(!config.venv_path().exists());
    }

    #[tokio::test]
    async fn failed_install_removes_partial_venv() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = bash_config(dir.path());
        std::fs::write(config.requirements_path(), "nosuchpackage==0.0.0\n").expect("write");

        // Interpreter shim: `-m venv <dir>` lays out a venv whose pip fails.
        let shim = dir.path().join("python-shim");
        write_script(
            dir.path(),
            "python-shim",
            "mkdir -p \"$3/bin\"\n\
             printf '#!/bin/bash\\necho \"No matching distribution found\" >&2\\nexit 1\\n' > \"$3/bin/pip\"\n\
             chmod +x \"$3/bin/pip\"",
        );
        make_executable(&shim);
        config.interpreter = shim.to_string_lossy().into_owned();

        let result = prepare(&config).await;
        assert_matches!(
            result,
            Err(LaunchError::EnvironmentSetup { exit_code: 1, ref stderr }) if stderr.contains("No matching distribution")
        );
        assert!(!config.venv_path().exists(), "partial venv must be removed");
    }

    #[tokio::test]
    async fn venv_creation_timeout_removes_partial_venv() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = bash_config(dir.path());
        config.prepare_timeout = Duration::from_millis(500);
        std::fs::write(config.requirements_path(), "requests\n").expect("write");

        // Lays out part of the venv, then hangs past the timeout.
        let shim = dir.path().join("python-shim");
        write_script(dir.path(), "python-shim", "mkdir -p \"$3/bin\"\nexec sleep 30");
        make_executable(&shim);
        config.interpreter = shim.to_string_lossy().into_owned();

        let result = prepare(&config).await;
        assert_matches!(result, Err(LaunchError::Timeout { .. }));
        assert!(!config.venv_path().exists(), "partial venv must be removed");
    }

    #[tokio::test]
    async fn missing_interpreter_is_spawn_error_and_leaves_no_venv() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = bash_config(dir.path());
        config.interpreter = "/nonexistent/python3".to_string();
        std::fs::write(config.requirements_path(), "requests\n").expect("write");
        // A stale venv from older requirements is discarded before the rebuild.
        fake_venv(&config.venv_path(), "exit 0");

        let result = prepare(&config).await;
        assert_matches!(result, Err(LaunchError::Spawn { .. }));
        assert!(!config.venv_path().exists());
    }

    #[test]
    fn detect_requires_interpreter() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(Activation::detect(dir.path()).is_none());
        fake_venv(dir.path(), "exit 0");
        let activation = Activation::detect(dir.path()).expect("detected");
        assert_eq!(activation.python(), dir.path().join("bin/python"));
    }

    #[test]
    fn path_prepends_bin_dir() {
        let activation = Activation {
            dir: PathBuf::from("/app/venv"),
        };
        let path = activation.path_with_bin(Some(OsString::from("/usr/bin:/bin")));
        assert_eq!(path, OsString::from("/app/venv/bin:/usr/bin:/bin"));
        let bare = activation.path_with_bin(None);
        assert_eq!(bare, OsString::from("/app/venv/bin"));
    }
}
