//! Provider registry: known provider kinds and the priority-ordered
//! fallback chain.
//!
//! Each `ProviderKind` describes how to reach one family of provider:
//! env var for the API key, default API base, whether it is self-hosted.
//! The `ProviderRegistry` is the immutable, explicitly constructed list of
//! configured providers, always iterated in ascending `priority`.

use std::collections::HashSet;

use tracing::{debug, info, warn};
use vigil_core::config::Config;

/// Re-export the provider config from core: single source of truth.
pub use vigil_core::config::ProviderConfig;

// ─────────────────────────────────────────────
// ProviderKind: static metadata for one provider family
// ─────────────────────────────────────────────

/// Static specification describing one provider family.
#[derive(Clone, Debug)]
pub struct ProviderKind {
    /// Internal name (e.g. `"openrouter"`), matched against `ProviderConfig::kind`.
    pub name: &'static str,
    /// Human-readable name for logs. E.g. `"OpenRouter"`.
    pub display_name: &'static str,
    /// Conventional environment variable for the API key.
    pub env_key: &'static str,
    /// Default API base URL.
    pub default_api_base: &'static str,
    /// Whether this is a local/self-hosted provider (no key required).
    pub is_local: bool,
}

/// Supported provider kinds. All speak the OpenAI chat completions format.
pub static PROVIDER_KINDS: &[ProviderKind] = &[
    ProviderKind {
        name: "openai",
        display_name: "OpenAI",
        env_key: "OPENAI_API_KEY",
        default_api_base: "https://api.openai.com/v1",
        is_local: false,
    },
    // Anthropic's OpenAI-compatible endpoint
    ProviderKind {
        name: "anthropic",
        display_name: "Anthropic",
        env_key: "ANTHROPIC_API_KEY",
        default_api_base: "https://api.anthropic.com/v1",
        is_local: false,
    },
    ProviderKind {
        name: "openrouter",
        display_name: "OpenRouter",
        env_key: "OPENROUTER_API_KEY",
        default_api_base: "https://openrouter.ai/api/v1",
        is_local: false,
    },
    ProviderKind {
        name: "deepseek",
        display_name: "DeepSeek",
        env_key: "DEEPSEEK_API_KEY",
        default_api_base: "https://api.deepseek.com/v1",
        is_local: false,
    },
    ProviderKind {
        name: "groq",
        display_name: "Groq",
        env_key: "GROQ_API_KEY",
        default_api_base: "https://api.groq.com/openai/v1",
        is_local: false,
    },
    ProviderKind {
        name: "vllm",
        display_name: "vLLM",
        env_key: "HOSTED_VLLM_API_KEY",
        default_api_base: "http://localhost:8000/v1",
        is_local: true,
    },
];

/// Find a provider kind by exact name.
pub fn find_kind(name: &str) -> Option<&'static ProviderKind> {
    PROVIDER_KINDS.iter().find(|kind| kind.name == name)
}

/// Fill in display name, API key, and local flag from the provider's kind.
///
/// Explicit config values always win over kind defaults.
pub fn apply_kind_defaults(mut config: ProviderConfig) -> ProviderConfig {
    let Some(kind) = find_kind(&config.kind) else {
        warn!(
            provider = %config.id,
            kind = %config.kind,
            "Unknown provider kind, treating as OpenAI-compatible"
        );
        return config;
    };

    if config.display_name.is_empty() {
        config.display_name = kind.display_name.to_string();
    }
    if config.api_key.is_empty() {
        if let Ok(key) = std::env::var(kind.env_key) {
            config.api_key = key;
        }
    }
    if kind.is_local {
        config.local = true;
    }
    config
}

/// Resolve the API base: config > kind default > standard OpenAI path.
pub fn resolve_api_base(config: &ProviderConfig) -> String {
    config
        .api_base
        .clone()
        .or_else(|| find_kind(&config.kind).map(|k| k.default_api_base.to_string()))
        .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
}

// ─────────────────────────────────────────────
// ProviderRegistry
// ─────────────────────────────────────────────

/// Immutable, priority-ordered catalog of configured providers.
#[derive(Clone, Debug, Default)]
pub struct ProviderRegistry {
    providers: Vec<ProviderConfig>,
}

impl ProviderRegistry {
    /// Build a registry from explicit provider configs.
    ///
    /// Sorted ascending by `priority`; equal priorities keep their input
    /// order. Entries with a duplicate `id` are dropped.
    pub fn new(providers: Vec<ProviderConfig>) -> Self {
        let mut seen = HashSet::new();
        let mut providers: Vec<ProviderConfig> = providers
            .into_iter()
            .filter(|p| {
                let fresh = seen.insert(p.id.clone());
                if !fresh {
                    warn!(provider = %p.id, "Duplicate provider id, ignoring later entry");
                }
                fresh
            })
            .collect();
        providers.sort_by_key(|p| p.priority);

        debug!(
            providers = ?providers.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            "Provider registry built"
        );
        ProviderRegistry { providers }
    }

    /// Build a registry from the loaded configuration.
    ///
    /// Kind defaults are applied first; providers that are disabled or
    /// lack credentials are left out.
    pub fn from_config(config: &Config) -> Self {
        let providers: Vec<ProviderConfig> = config
            .providers
            .iter()
            .cloned()
            .map(apply_kind_defaults)
            .filter(|p| {
                if !p.enabled {
                    debug!(provider = %p.id, "Provider disabled, skipping");
                    return false;
                }
                if !p.is_configured() {
                    info!(provider = %p.id, "Provider has no API key, skipping");
                    return false;
                }
                true
            })
            .collect();

        if providers.is_empty() {
            warn!("No LLM providers configured - every request will fall back to the cache");
        }

        Self::new(providers)
    }

    /// Providers in the order they are tried.
    pub fn candidates(&self) -> &[ProviderConfig] {
        &self.providers
    }

    /// Look up a provider by id.
    pub fn get(&self, id: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(id: &str, priority: u32) -> ProviderConfig {
        ProviderConfig {
            id: id.to_string(),
            model_name: format!("{id}-model"),
            priority,
            api_key: "key".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_candidates_sorted_by_priority() {
        let registry = ProviderRegistry::new(vec![
            provider("c", 30),
            provider("a", 10),
            provider("b", 20),
        ]);
        let ids: Vec<&str> = registry.candidates().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_equal_priority_keeps_input_order() {
        let registry = ProviderRegistry::new(vec![
            provider("second", 5),
            provider("first", 1),
            provider("third", 5),
        ]);
        let ids: Vec<&str> = registry.candidates().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_duplicate_ids_dropped() {
        let registry = ProviderRegistry::new(vec![provider("a", 2), provider("a", 1)]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("a").unwrap().priority, 2);
    }

    #[test]
    fn test_get_unknown() {
        let registry = ProviderRegistry::new(vec![provider("a", 1)]);
        assert!(registry.get("zzz").is_none());
    }

    #[test]
    fn test_find_kind() {
        let kind = find_kind("deepseek").unwrap();
        assert_eq!(kind.display_name, "DeepSeek");
        assert_eq!(kind.env_key, "DEEPSEEK_API_KEY");
        assert!(find_kind("nope").is_none());
    }

    #[test]
    fn test_kind_defaults_fill_display_name_and_local() {
        let config = apply_kind_defaults(ProviderConfig {
            id: "local".into(),
            kind: "vllm".into(),
            ..Default::default()
        });
        assert_eq!(config.display_name, "vLLM");
        assert!(config.local);
        assert!(config.is_configured());
    }

    #[test]
    fn test_kind_defaults_keep_explicit_values() {
        let config = apply_kind_defaults(ProviderConfig {
            id: "p".into(),
            kind: "openai".into(),
            display_name: "Primary".into(),
            api_key: "explicit".into(),
            ..Default::default()
        });
        assert_eq!(config.display_name, "Primary");
        assert_eq!(config.api_key, "explicit");
    }

    #[test]
    fn test_resolve_api_base() {
        let mut config = ProviderConfig {
            kind: "openrouter".into(),
            ..Default::default()
        };
        assert_eq!(resolve_api_base(&config), "https://openrouter.ai/api/v1");
        config.api_base = Some("https://proxy.internal/v1".into());
        assert_eq!(resolve_api_base(&config), "https://proxy.internal/v1");
    }

    #[test]
    fn test_from_config_filters_unusable() {
        let config = Config {
            providers: vec![
                provider("b", 2),
                ProviderConfig {
                    enabled: false,
                    ..provider("disabled", 0)
                },
                ProviderConfig {
                    id: "keyless".into(),
                    kind: "groq-unknown".into(),
                    ..Default::default()
                },
                provider("a", 1),
            ],
            ..Default::default()
        };

        let registry = ProviderRegistry::from_config(&config);
        let ids: Vec<&str> = registry.candidates().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_all_kinds_have_unique_names() {
        let names: Vec<&str> = PROVIDER_KINDS.iter().map(|k| k.name).collect();
        let mut unique = names.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(names.len(), unique.len(), "Duplicate provider kinds found");
    }
}
