//! Configuration loading module
//!
//! Composes the primary config with its config-group files, applies
//! command-line overrides and resolves interpolations into one untyped tree.

pub mod compose;
pub mod error;
pub mod interpolation;
pub mod overrides;
pub mod text;

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

pub use compose::{ConfigFile, DefaultsList};
pub use error::LoadError;
pub use interpolation::MISSING;
pub use overrides::{Override, OverrideKind};
pub use text::{from_yaml, to_yaml};

/// Where to find the configuration and what to change in it
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub config_dir: PathBuf,
    pub config_name: String,
    pub overrides: Vec<String>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("config"),
            config_name: "cla".to_string(),
            overrides: Vec::new(),
        }
    }
}

/// Result of a load: the resolved tree and how it was built
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub tree: Value,
    /// Files merged into the tree, in merge order
    pub sources: Vec<PathBuf>,
    /// Overrides as given on the command line
    pub overrides: Vec<String>,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    pub fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Compose, override and resolve
    pub fn load(&self) -> Result<LoadedConfig, LoadError> {
        let (tree, sources) = self.compose()?;
        let tree = interpolation::resolve(&tree)?;
        Ok(LoadedConfig {
            tree,
            sources,
            overrides: self.options.overrides.clone(),
        })
    }

    /// Compose files and apply overrides, leaving interpolations in place
    ///
    /// Precedence (lowest to highest):
    /// 1. files of the defaults list, in list order
    /// 2. the primary file (at its `_self_` position, or last)
    /// 3. value overrides, in command-line order
    pub fn compose(&self) -> Result<(Value, Vec<PathBuf>), LoadError> {
        let dir = self.options.config_dir.as_path();
        let primary = ConfigFile::locate(dir, &self.options.config_name).ok_or_else(|| {
            LoadError::MissingPrimary {
                name: self.options.config_name.clone(),
                dir: dir.to_path_buf(),
            }
        })?;
        debug!(path = %primary.path.display(), "Loading primary config");

        let mut defaults = DefaultsList::from_tree(&primary.read()?)?;
        let mut value_overrides = Vec::new();
        for item in Override::parse_all(&self.options.overrides)? {
            if !self.apply_group_override(&mut defaults, &item)? {
                value_overrides.push(item);
            }
        }

        let (mut tree, sources) = compose::Composer::new(dir, &primary).compose(&defaults)?;
        for item in &value_overrides {
            debug!(input = %item.input, "Applying override");
            item.apply(&mut tree)?;
        }
        Ok((tree, sources))
    }

    /// Apply an override that targets a config group; returns false for value overrides
    fn apply_group_override(&self, defaults: &mut DefaultsList, item: &Override) -> Result<bool, LoadError> {
        let group = compose::normalize_group(&item.key);
        let declared = defaults.contains_group(&group);
        if !declared && !is_group_dir(&self.options.config_dir, &group) {
            return Ok(false);
        }

        let option = match &item.value {
            None | Some(Value::Null) => None,
            Some(Value::String(option)) => Some(option.clone()),
            Some(other) => {
                return Err(LoadError::invalid_override(
                    &item.input,
                    format!("option for group '{group}' must be a name, found {other}"),
                ))
            }
        };

        match (item.kind, declared) {
            (OverrideKind::Set, true) | (OverrideKind::ForceAdd, true) => {
                defaults.select(&group, option);
            }
            (OverrideKind::Add, false) | (OverrideKind::ForceAdd, false) => {
                defaults.append(&group, option);
            }
            (OverrideKind::Set, false) => {
                return Err(LoadError::invalid_override(
                    &item.input,
                    format!("group '{group}' is not in the defaults list; use '+{}' to add it", item.input),
                ))
            }
            (OverrideKind::Add, true) => {
                return Err(LoadError::invalid_override(
                    &item.input,
                    format!("group '{group}' is already in the defaults list"),
                ))
            }
            (OverrideKind::Delete, true) => {
                if let Some(expected) = &option {
                    if defaults.group_option(&group).flatten() != Some(expected.as_str()) {
                        return Err(LoadError::invalid_override(
                            &item.input,
                            format!("group '{group}' does not select '{expected}'"),
                        ));
                    }
                }
                defaults.remove(&group);
            }
            (OverrideKind::Delete, false) => {
                return Err(LoadError::invalid_override(
                    &item.input,
                    format!("group '{group}' is not in the defaults list"),
                ))
            }
        }
        debug!(group = %group, input = %item.input, "Applied group override");
        Ok(true)
    }
}

fn is_group_dir(config_dir: &Path, group: &str) -> bool {
    config_dir.join(group).is_dir()
}
