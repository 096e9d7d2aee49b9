//! Logging utilities module
//!
//! This module provides centralized logging functionality and utilities.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{
    self,
    format::{DefaultFields, Format},
    MakeWriter,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::domain::ProjectConfig;
use crate::shared::error::{AppError, AppResult};

/// How the global subscriber is set up
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Default filter when `RUST_LOG` is not set
    pub level: String,
    /// Optional file receiving the same lines as the console
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_file: None,
        }
    }
}

/// Logging utilities for the application
pub struct LoggingUtils;

impl LoggingUtils {
    /// Install the global subscriber; call once at process start
    pub fn initialize(options: &LoggingOptions) -> AppResult<()> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&options.level))
            .map_err(|e| AppError::Logging(format!("Invalid log level '{}': {}", options.level, e)))?;

        let file = options.log_file.as_deref().map(file_layer).transpose()?;

        tracing_subscriber::registry()
            .with(filter)
            .with(text_layer(std::io::stderr))
            .with(file)
            .try_init()
            .map_err(|e| AppError::Logging(format!("Failed to initialize logging: {}", e)))?;

        Ok(())
    }

    /// Log the resolved configuration tree in its text form
    pub fn log_config_tree(yaml: &str) {
        info!("Loaded Config:\n{}", yaml);
    }

    /// Log the validated record
    pub fn log_project_config(config: &ProjectConfig) {
        info!("Validated config: {}", config);
    }

    /// Emit the fixed example messages, from most to least severe
    pub fn log_examples() {
        error!(severity = "critical", "I am a Critical Message!");
        error!("I am an Error Message!");
        warn!("I am a Warning Message!");
        debug!("I am a Debug Message.");
    }
}

/// Plain-text layer shared by the console and the log file
fn text_layer<S, W>(writer: W) -> fmt::Layer<S, DefaultFields, Format, W>
where
    W: for<'w> MakeWriter<'w> + 'static,
{
    fmt::layer().with_writer(writer).with_target(false).with_ansi(false)
}

/// Layer appending to `path`; the file is created if needed
fn file_layer<S>(path: &Path) -> AppResult<fmt::Layer<S, DefaultFields, Format, RollingFileAppender>> {
    let (dir, name) = split_log_path(path)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)
        .map_err(|e| AppError::Logging(format!("Failed to open log file {}: {}", path.display(), e)))?;
    Ok(text_layer(appender))
}

fn split_log_path(path: &Path) -> AppResult<(PathBuf, String)> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::Logging(format!("Invalid log file path: {}", path.display())))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, name.to_string()))
}
