//! Shared helpers for supervisor integration tests.
//!
//! Scripts are run with `bash` instead of Python so the tests need no
//! interpreter beyond a POSIX shell.

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use hespress_core::config::{AppConfig, LaunchConfig, SupervisorConfig};
use hespress_core::launcher::ScriptLauncher;
use hespress_core::restart::{Backoff, RestartPolicy};

/// Script body that counts its runs in `runs.txt` and fails until run `n`.
pub fn succeed_on_run(n: u32) -> String {
    format!(
        "runs=$(cat runs.txt 2>/dev/null || echo 0)\n\
         runs=$((runs + 1))\n\
         echo $runs > runs.txt\n\
         if [ $runs -ge {n} ]; then exit 0; fi\n\
         exit 1"
    )
}

/// Script lines that count runs in `runs.txt`.
pub const RECORD_RUN: &str = "runs=$(cat runs.txt 2>/dev/null || echo 0)\necho $((runs + 1)) > runs.txt";

/// Script body that records the run and exits with `code`.
pub fn always_exit(code: i32) -> String {
    format!("{RECORD_RUN}\nexit {code}")
}

pub fn write_script(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), format!("#!/bin/bash\n{body}\n")).expect("write script");
}

pub fn runs(dir: &Path) -> u32 {
    std::fs::read_to_string(dir.join("runs.txt"))
        .map(|s| s.trim().parse().expect("numeric run count"))
        .unwrap_or(0)
}

pub fn launch_config(dir: &Path) -> LaunchConfig {
    LaunchConfig {
        interpreter: "bash".to_string(),
        working_directory: dir.to_path_buf(),
        venv_dir: "venv".into(),
        default_script: "scraper.sh".to_string(),
        requirements: "requirements.txt".into(),
        prepare_timeout: Duration::from_secs(5),
    }
}

pub fn launcher(dir: &Path) -> ScriptLauncher {
    ScriptLauncher::new(launch_config(dir), vec![])
}

/// Fast backoff so restart tests finish in milliseconds.
pub fn supervisor_config(policy: RestartPolicy, max_restarts: u32) -> SupervisorConfig {
    SupervisorConfig {
        policy,
        max_restarts,
        backoff: Backoff {
            initial: Duration::from_millis(10),
            max: Duration::from_millis(50),
        },
        stable_after: Duration::from_secs(300),
        stop_grace: Duration::from_secs(2),
    }
}

/// Full application config rooted at `dir`, with an unreachable database.
pub fn app_config(dir: &Path) -> AppConfig {
    let app_dir = dir.to_string_lossy().into_owned();
    let vars = [
        ("DB_HOST", "127.0.0.1"),
        ("DB_PORT", "1"),
        ("DB_NAME", "hespress"),
        ("DB_USER", "admin"),
        ("DB_PASSWORD", "admin_password"),
        ("DB_CONNECT_TIMEOUT_SECS", "1"),
        ("APP_DIR", app_dir.as_str()),
        ("PYTHON_BIN", "bash"),
        ("SCRAPER_SCRIPT", "scraper.sh"),
        ("RESTART_POLICY", "on-failure"),
        ("RESTART_MAX", "3"),
        ("RESTART_BACKOFF_INITIAL_MS", "10"),
        ("RESTART_BACKOFF_MAX_SECS", "1"),
        ("STOP_GRACE_SECS", "2"),
    ];
    let lookup = |name: &str| {
        vars.iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.to_string())
    };
    AppConfig::from_lookup(&lookup).expect("valid test config")
}
