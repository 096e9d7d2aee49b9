//! Test fixtures: an on-disk config directory with valid data inputs

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::config::LoaderOptions;

/// Primary config name used by the fixture
pub const CONFIG_NAME: &str = "cla";

/// Temporary workspace with `config/` and `data/` directories
///
/// Default load: `data: db`, `model: forest`, giving `data.window == 30`
/// and `model.max_depth == 8`.
pub struct ConfigFixture {
    dir: TempDir,
}

impl ConfigFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let fixture = Self { dir };

        fs::create_dir_all(fixture.data_dir().join("db")).expect("Failed to create data dir");
        fixture.write("data/export.csv", "day,value\n2023-06-01,1\n");

        let data_dir = fixture.data_dir();
        fixture.write(
            "config/cla.yaml",
            "defaults:\n  - data: db\n  - model: forest\n  - _self_\n",
        );
        fixture.write(
            "config/data/db.yaml",
            &format!(
                "data_format: DB\ninput_path: {}/db\nstart_date: '2023-01-01'\nwindow: 30\n",
                data_dir.display()
            ),
        );
        fixture.write(
            "config/data/sap.yaml",
            &format!(
                "data_format: SAP\ninput_path: {}/export.csv\nstart_date: '2023-06-01'\nwindow: ${{model.max_depth}}\n",
                data_dir.display()
            ),
        );
        fixture.write("config/model/forest.yaml", "num_estimators: 100\nmax_depth: 8\n");
        fixture.write("config/model/stump.yaml", "num_estimators: 1\nmax_depth: 1\n");
        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root().join("config")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root().join("data")
    }

    /// Loader options for the fixture's primary config
    pub fn options(&self, overrides: &[&str]) -> LoaderOptions {
        LoaderOptions {
            config_dir: self.config_dir(),
            config_name: CONFIG_NAME.to_string(),
            overrides: overrides.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Write a file relative to the fixture root
    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create fixture dir");
        }
        fs::write(path, contents).expect("Failed to write fixture file");
    }
}

impl Default for ConfigFixture {
    fn default() -> Self {
        Self::new()
    }
}
