//! Domain layer - typed configuration records and their schema validation
//!
//! This module is independent of how the untyped tree was produced: it only
//! sees a `serde_json::Value` and either returns a validated record or every
//! violation found in it.

pub mod project;
pub mod validation;

pub use project::{DataConfig, DataFormat, ModelConfig, ProjectConfig};
pub use validation::{Schema, SchemaError, Violation};
