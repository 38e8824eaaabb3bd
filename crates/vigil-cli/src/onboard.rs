//! `vigil onboard`: initialize configuration and the data directory.
//!
//! - Creates `~/.vigil/config.json` with a starter provider chain
//! - Creates an empty model card catalog and the history directory

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use vigil_core::config::{get_config_path, load_config, save_config, Config, ProviderConfig};
use vigil_orchestrator::orchestrator::{data_dir, model_cards_path};

use crate::helpers::display_path;

/// Run the onboard command.
pub fn run() -> Result<()> {
    println!();
    println!("{}", "Vigil Setup".cyan().bold());
    println!();

    // 1. Config
    let config_path = get_config_path();
    if config_path.exists() {
        println!(
            "  {} config already exists at {}",
            "✓".green(),
            display_path(&config_path)
        );
    } else {
        save_config(&starter_config(), Some(&config_path))?;
        println!(
            "  {} created config at {}",
            "✓".green(),
            display_path(&config_path)
        );
    }

    // 2. Data directory (honors storage.dataDir)
    let config = load_config(Some(&config_path));
    let data = data_dir(&config);
    std::fs::create_dir_all(&data)?;
    println!("  {} data dir at {}", "✓".green(), display_path(&data));

    // 3. Model card catalog
    create_if_missing(&model_cards_path(&config), "[]\n")?;

    // 4. REPL history
    std::fs::create_dir_all(data.join("history"))?;

    println!();
    println!(
        "{}",
        "  Setup complete! Set OPENAI_API_KEY / ANTHROPIC_API_KEY, then run `vigil chat`.".green()
    );
    println!();
    Ok(())
}

/// Default config with an OpenAI primary and an Anthropic fallback.
/// Keys come from the kinds' env vars unless written into the file.
fn starter_config() -> Config {
    Config {
        providers: vec![
            ProviderConfig {
                id: "openai-primary".into(),
                kind: "openai".into(),
                model_name: "gpt-4o-mini".into(),
                priority: 10,
                max_tokens: 16_000,
                cost_per_token: 0.000_000_6,
                ..Default::default()
            },
            ProviderConfig {
                id: "anthropic-fallback".into(),
                kind: "anthropic".into(),
                model_name: "claude-3-5-haiku-latest".into(),
                priority: 20,
                max_tokens: 32_000,
                cost_per_token: 0.000_004,
                ..Default::default()
            },
        ],
        ..Default::default()
    }
}

/// Write `content` to `path` unless the file already exists.
fn create_if_missing(path: &Path, content: &str) -> Result<()> {
    let name = path.file_name().unwrap_or_default().to_string_lossy();
    if path.exists() {
        println!("  {} {} already exists", "✓".green(), name);
    } else {
        std::fs::write(path, content)?;
        println!("  {} created {}", "✓".green(), name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_if_missing_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_cards.json");
        create_if_missing(&path, "[]\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]\n");
    }

    #[test]
    fn create_if_missing_keeps_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_cards.json");
        std::fs::write(&path, "[{}]").unwrap();
        create_if_missing(&path, "[]\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[{}]");
    }

    #[test]
    fn starter_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        save_config(&starter_config(), Some(&path)).unwrap();

        let loaded = load_config(Some(&path));
        assert_eq!(loaded.providers.len(), 2);
        assert_eq!(loaded.providers[0].id, "openai-primary");
        assert!(loaded.providers[0].priority < loaded.providers[1].priority);
    }
}
