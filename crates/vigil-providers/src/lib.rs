//! LLM provider layer for Vigil.
//!
//! # Architecture
//!
//! - [`traits::ProviderClient`]: the single capability every provider implements
//! - [`registry`]: known provider kinds + the priority-ordered `ProviderRegistry`
//! - [`http_provider::HttpProvider`]: OpenAI-compatible HTTP client
//! - [`http_provider::create_clients`]: one client per registry entry

pub mod http_provider;
pub mod registry;
pub mod traits;

// Re-export main types for convenience
pub use http_provider::{create_clients, HttpProvider};
pub use registry::{ProviderConfig, ProviderKind, ProviderRegistry, PROVIDER_KINDS};
pub use traits::{call_with_deadline, CompletionOptions, ProviderClient};
