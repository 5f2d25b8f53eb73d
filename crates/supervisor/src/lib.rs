//! `hespress-supervisor` library crate.
//!
//! Re-exports internal modules for integration testing. The binary
//! entrypoint lives in `main.rs`.

pub mod cli;
pub mod commands;
pub mod preflight;
pub mod signal;
pub mod supervise;
pub mod telemetry;
