//! Command-line interface
//!
//! Positional arguments are config overrides (`key=value`, `+key=value`,
//! `++key=value`, `~key`, `group=option`).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use clap::Parser;

use crate::config::LoaderOptions;
use crate::infrastructure::RunDir;

/// Base directory for timestamped run directories
pub const OUTPUTS_DIR: &str = "outputs";

#[derive(Parser, Debug)]
#[command(name = "layered-config")]
#[command(about = "Compose, resolve and validate a layered project configuration", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config overrides, applied in order
    #[arg(value_name = "OVERRIDE")]
    pub overrides: Vec<String>,

    /// Directory holding the primary config and its group directories
    #[arg(short = 'd', long, default_value = "config", env = "LAYERED_CONFIG_DIR")]
    pub config_dir: PathBuf,

    /// Primary config name, without extension
    #[arg(short = 'n', long, default_value = "cla")]
    pub config_name: String,

    /// Print the resolved config as YAML and exit without validating
    #[arg(long)]
    pub cfg: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    pub verbose: bool,

    /// Use this run directory instead of a timestamped one
    #[arg(long, conflicts_with = "no_run_dir")]
    pub run_dir: Option<PathBuf>,

    /// Do not create a run directory (no log file, no snapshot)
    #[arg(long)]
    pub no_run_dir: bool,
}

impl Cli {
    pub fn loader_options(&self) -> LoaderOptions {
        LoaderOptions {
            config_dir: self.config_dir.clone(),
            config_name: self.config_name.clone(),
            overrides: self.overrides.clone(),
        }
    }

    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Run directory for this invocation, if any
    pub fn run_dir_path(&self, now: DateTime<Local>) -> Option<PathBuf> {
        if self.no_run_dir {
            return None;
        }
        Some(
            self.run_dir
                .clone()
                .unwrap_or_else(|| RunDir::timestamped(Path::new(OUTPUTS_DIR), now)),
        )
    }
}
