//! Test suite for the configuration pipeline
//!
//! Unit tests live next to the code they cover; this tree holds shared
//! fixtures and end-to-end tests that run the loader and the validator
//! together.

pub mod fixtures;
pub mod integration;

/// Test result type
pub type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;
