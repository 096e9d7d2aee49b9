//! Layered Config - hierarchical configuration loading with schema validation
//!
//! This library composes a primary YAML config with its config-group files,
//! applies command-line overrides, resolves `${...}` interpolations and
//! validates the result against typed records that stay valid under mutation.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod shared;

pub use application::LoadAndValidateUseCase;
pub use config::{ConfigLoader, LoadError, LoaderOptions};
pub use domain::{DataConfig, DataFormat, ModelConfig, ProjectConfig, Schema, SchemaError};
pub use shared::error::{AppError, AppResult};

/// Application result type
pub type Result<T> = std::result::Result<T, shared::error::AppError>;

#[cfg(test)]
mod tests;
