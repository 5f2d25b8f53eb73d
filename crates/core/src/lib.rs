//! Domain logic for running the hespress scraper under supervision.
//!
//! Everything here is free of database access: configuration loading,
//! script launching, restart policy and log directory handling. The
//! database probe lives in `hespress-db` and the binary in
//! `hespress-supervisor`.

pub mod config;
pub mod error;
pub mod launcher;
pub mod logs;
pub mod restart;
