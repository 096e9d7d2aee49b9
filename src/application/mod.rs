//! Application layer - Use cases
//!
//! This module sequences the loader, the schema validator and logging into
//! the program's single flow.

pub mod use_cases;

pub use use_cases::LoadAndValidateUseCase;
