//! Configuration system: schema, loading, and env var overrides.
//!
//! # Usage
//! ```no_run
//! use vigil_core::config;
//!
//! let cfg = config::load_config(None);
//! println!("Failure threshold: {}", cfg.breaker.failure_threshold);
//! ```

pub mod loader;
pub mod schema;

// Re-export key types
pub use loader::{get_config_path, load_config, save_config};
pub use schema::{
    BreakerConfig, CacheConfig, Config, GovernanceConfig, GuardrailsConfig, ProviderConfig,
    StorageConfig,
};
