//! Configuration schema.
//!
//! Hierarchy: `Config` → `providers[]`, `BreakerConfig`, `CacheConfig`,
//! `GuardrailsConfig`, `StorageConfig`, `GovernanceConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration: loaded from `~/.vigil/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub providers: Vec<ProviderConfig>,
    pub breaker: BreakerConfig,
    pub cache: CacheConfig,
    pub guardrails: GuardrailsConfig,
    pub storage: StorageConfig,
    pub governance: GovernanceConfig,
}

impl Config {
    /// Providers that are enabled and have credentials (or are local).
    pub fn configured_providers(&self) -> Vec<ProviderConfig> {
        self.providers
            .iter()
            .filter(|p| p.enabled && p.is_configured())
            .cloned()
            .collect()
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// One entry in the provider fallback chain.
///
/// Immutable after load; owned by the provider registry.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// Unique id, e.g. `"openai-primary"`. Recorded in disclosures.
    pub id: String,
    pub display_name: String,
    /// Known provider kind (`openai`, `anthropic`, `openrouter`, ...).
    pub kind: String,
    pub model_name: String,
    /// Lower is tried first.
    pub priority: u32,
    /// Largest prompt (estimated tokens) this provider accepts.
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
    /// USD per token, used for the disclosure cost estimate.
    pub cost_per_token: f64,
    #[serde(default)]
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_headers: Option<HashMap<String, String>>,
    /// Local providers (vLLM) need no API key.
    pub local: bool,
    pub enabled: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            display_name: String::new(),
            kind: "openai".to_string(),
            model_name: String::new(),
            priority: 100,
            max_tokens: 8192,
            request_timeout_secs: 30,
            cost_per_token: 0.0,
            api_key: String::new(),
            api_base: None,
            extra_headers: None,
            local: false,
            enabled: true,
        }
    }
}

impl ProviderConfig {
    /// Whether this provider can be called (has a key, or is local).
    pub fn is_configured(&self) -> bool {
        self.local || !self.api_key.is_empty()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Name for logs and status output.
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.id
        } else {
            &self.display_name
        }
    }
}

// ─────────────────────────────────────────────
// Resilience
// ─────────────────────────────────────────────

/// Circuit breaker thresholds, shared by every provider's breaker.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BreakerConfig {
    /// Consecutive failures that open a closed breaker.
    pub failure_threshold: u32,
    /// Cooldown before an open breaker admits a trial request.
    pub recovery_timeout_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout_secs: 30,
        }
    }
}

impl BreakerConfig {
    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_secs(self.recovery_timeout_secs)
    }
}

/// Last-known-good response cache.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            max_entries: 512,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

// ─────────────────────────────────────────────
// Guardrails
// ─────────────────────────────────────────────

/// Tunables for the guardrail validators. Rule wording is built in.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GuardrailsConfig {
    /// Injection score at or above which the input is flagged.
    pub injection_warn_score: u32,
    /// Injection score at or above which the input is rejected.
    pub injection_block_score: u32,
    /// Extra case-insensitive terms that reject a provider's output.
    pub blocked_output_terms: Vec<String>,
}

impl Default for GuardrailsConfig {
    fn default() -> Self {
        Self {
            injection_warn_score: 2,
            injection_block_score: 4,
            blocked_output_terms: Vec::new(),
        }
    }
}

// ─────────────────────────────────────────────
// Storage & governance
// ─────────────────────────────────────────────

/// Where disclosures and model cards live.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    /// Overrides `~/.vigil` when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
}

/// Defaults applied to disclosures when the caller gives no user context.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GovernanceConfig {
    pub default_user_id: String,
    pub human_oversight: bool,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            default_user_id: "local-user".to_string(),
            human_oversight: true,
        }
    }
}
