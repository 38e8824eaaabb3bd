//! Vigil core: shared types, error taxonomy, configuration, and utilities.
//!
//! - [`types`]: requests, responses, guardrail findings, disclosures, model cards
//! - [`error`]: `GenerationError`, `ProviderError`, `PersistenceError`
//! - [`config`]: JSON config schema, loader, and env var overrides
//! - [`utils`]: data paths and string helpers

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use error::{FailureSummary, GenerationError, PersistenceError, ProviderError};
