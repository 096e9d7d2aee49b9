//! Per-run output directory
//!
//! Holds the run's log file and a snapshot of the resolved configuration
//! and the overrides that produced it.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde_json::Value;
use tracing::debug;

use crate::config::to_yaml;
use crate::shared::error::{AppError, AppResult};

/// Subdirectory holding the config snapshot
pub const SNAPSHOT_DIR: &str = ".snapshot";

/// Run directory created for one invocation
#[derive(Debug, Clone)]
pub struct RunDir {
    path: PathBuf,
}

impl RunDir {
    /// `<base>/<YYYY-MM-DD>/<HH-MM-SS>` for the given start time
    pub fn timestamped(base: &Path, now: DateTime<Local>) -> PathBuf {
        base.join(now.format("%Y-%m-%d").to_string())
            .join(now.format("%H-%M-%S").to_string())
    }

    /// Create the directory (and its snapshot subdirectory)
    pub fn create(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let snapshot = path.join(SNAPSHOT_DIR);
        fs::create_dir_all(&snapshot).map_err(|e| AppError::io(&snapshot, e))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Log file for a config name, e.g. `cla.log`
    pub fn log_file(&self, config_name: &str) -> PathBuf {
        self.path.join(format!("{config_name}.log"))
    }

    /// Write `config.yaml` and `overrides.yaml`, replacing earlier snapshots
    pub fn write_snapshot(&self, tree: &Value, overrides: &[String]) -> AppResult<()> {
        let snapshot = self.path.join(SNAPSHOT_DIR);
        let overrides = Value::from(overrides.to_vec());
        for (name, content) in [("config.yaml", tree), ("overrides.yaml", &overrides)] {
            let file = snapshot.join(name);
            fs::write(&file, to_yaml(content)?).map_err(|e| AppError::io(&file, e))?;
            debug!(path = %file.display(), "Wrote config snapshot");
        }
        Ok(())
    }
}
