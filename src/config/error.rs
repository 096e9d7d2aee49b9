//! Loader error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while composing, overriding or resolving a configuration tree
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Cannot find primary config '{name}' in {} (tried .yaml, .yml, .toml, .json)", dir.display())]
    MissingPrimary { name: String, dir: PathBuf },

    #[error("Config file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid defaults list: {0}")]
    Defaults(String),

    #[error("Failed to compose configuration: {0}")]
    Compose(String),

    #[error("Invalid override '{input}': {reason}")]
    Override { input: String, reason: String },

    #[error("Interpolation error at '{node}': {reason}")]
    Interpolation { node: String, reason: String },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl LoadError {
    pub(crate) fn parse(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        LoadError::Parse {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn interpolation(node: impl Into<String>, reason: impl Into<String>) -> Self {
        LoadError::Interpolation {
            node: node.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_override(input: impl Into<String>, reason: impl Into<String>) -> Self {
        LoadError::Override {
            input: input.into(),
            reason: reason.into(),
        }
    }
}
