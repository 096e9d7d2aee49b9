//! Error handling module
//!
//! This module provides centralized error handling for the application.

use thiserror::Error;

use crate::config::LoadError;
use crate::domain::validation::SchemaError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] LoadError),

    #[error("{0}")]
    Validation(#[from] SchemaError),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl AppError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Application result type
pub type AppResult<T> = Result<T, AppError>;
