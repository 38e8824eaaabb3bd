//! Config loader: reads `~/.vigil/config.json`, merges env vars, and
//! applies legacy migrations.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.vigil/config.json`
//! 3. Environment variables `VIGIL_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::{Config, ProviderConfig};

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    load_config_from_path(&config_path)
}

/// Load config from a specific file path. Any read or parse failure
/// falls back to defaults; env overrides apply either way.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default());
    }

    debug!("Loading config from {}", path.display());
    let config = read_config_file(path).unwrap_or_else(|reason| {
        warn!("Ignoring config file {}: {}", path.display(), reason);
        Config::default()
    });
    apply_env_overrides(config)
}

fn read_config_file(path: &Path) -> Result<Config, String> {
    let content = std::fs::read_to_string(path).map_err(|e| format!("unreadable ({e})"))?;
    let mut raw: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| format!("invalid JSON ({e})"))?;
    migrate_config(&mut raw);
    serde_json::from_value(raw).map_err(|e| format!("does not match the schema ({e})"))
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply legacy config migrations.
///
/// Moves `fallbackCache.{ttl,size}` → `cache.{ttlSecs,maxEntries}`.
fn migrate_config(raw: &mut serde_json::Value) {
    let Some(legacy) = raw.get("fallbackCache").cloned() else {
        return;
    };
    let Some(root) = raw.as_object_mut() else {
        return;
    };

    let cache = root
        .entry("cache")
        .or_insert_with(|| serde_json::json!({}));
    if let Some(cache) = cache.as_object_mut() {
        if let Some(ttl) = legacy.get("ttl") {
            if !cache.contains_key("ttlSecs") {
                cache.insert("ttlSecs".to_string(), ttl.clone());
                debug!("Migrated fallbackCache.ttl → cache.ttlSecs");
            }
        }
        if let Some(size) = legacy.get("size") {
            if !cache.contains_key("maxEntries") {
                cache.insert("maxEntries".to_string(), size.clone());
                debug!("Migrated fallbackCache.size → cache.maxEntries");
            }
        }
    }
    root.remove("fallbackCache");
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `VIGIL_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `VIGIL_BREAKER__FAILURE_THRESHOLD` → `breaker.failure_threshold`
/// - `VIGIL_BREAKER__RECOVERY_TIMEOUT_SECS` → `breaker.recovery_timeout_secs`
/// - `VIGIL_CACHE__TTL_SECS` → `cache.ttl_secs`
/// - `VIGIL_CACHE__MAX_ENTRIES` → `cache.max_entries`
/// - `VIGIL_PROVIDERS__<ID>__API_KEY` → `providers[id].api_key`
/// - `VIGIL_PROVIDERS__<ID>__API_BASE` → `providers[id].api_base`
/// - `VIGIL_STORAGE__DATA_DIR` → `storage.data_dir`
/// - `VIGIL_GOVERNANCE__DEFAULT_USER_ID` → `governance.default_user_id`
fn apply_env_overrides(mut config: Config) -> Config {
    if let Some(n) = env_parse::<u32>("VIGIL_BREAKER__FAILURE_THRESHOLD") {
        config.breaker.failure_threshold = n;
    }
    if let Some(n) = env_parse::<u64>("VIGIL_BREAKER__RECOVERY_TIMEOUT_SECS") {
        config.breaker.recovery_timeout_secs = n;
    }
    if let Some(n) = env_parse::<u64>("VIGIL_CACHE__TTL_SECS") {
        config.cache.ttl_secs = n;
    }
    if let Some(n) = env_parse::<usize>("VIGIL_CACHE__MAX_ENTRIES") {
        config.cache.max_entries = n;
    }

    for provider in &mut config.providers {
        apply_provider_env(provider);
    }

    if let Ok(val) = std::env::var("VIGIL_STORAGE__DATA_DIR") {
        config.storage.data_dir = Some(val);
    }
    if let Ok(val) = std::env::var("VIGIL_GOVERNANCE__DEFAULT_USER_ID") {
        config.governance.default_user_id = val;
    }

    config
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let val = std::env::var(name).ok()?;
    match val.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring {}: cannot parse {:?}", name, val);
            None
        }
    }
}

/// Env var segment for a provider id: `openai-primary` → `OPENAI_PRIMARY`.
fn provider_env_segment(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Apply env var overrides for a single provider.
fn apply_provider_env(provider: &mut ProviderConfig) {
    let name = provider_env_segment(&provider.id);
    if let Ok(val) = std::env::var(format!("VIGIL_PROVIDERS__{name}__API_KEY")) {
        provider.api_key = val;
    }
    if let Ok(val) = std::env::var(format!("VIGIL_PROVIDERS__{name}__API_BASE")) {
        provider.api_base = Some(val);
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
