//! Infrastructure layer - filesystem side effects of a run
//!
//! This module contains the per-run output directory: log file location and
//! the snapshot of the resolved configuration.

pub mod run_dir;

pub use run_dir::RunDir;
