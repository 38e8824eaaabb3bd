//! `vigil status`: show configuration, providers, and governance data.

use anyhow::Result;
use colored::Colorize;

use vigil_core::config::{get_config_path, load_config};
use vigil_orchestrator::orchestrator::{data_dir, disclosures_path, model_cards_path};
use vigil_orchestrator::store::read_disclosures;
use vigil_orchestrator::{BreakerState, JsonModelCardStore};
use vigil_providers::registry::{apply_kind_defaults, find_kind};

use crate::helpers::display_path;

/// Run the status command.
pub fn run() -> Result<()> {
    let config = load_config(None);
    let config_path = get_config_path();

    println!();
    println!("{}", "Vigil Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        display_path(&config_path),
        found_marker(config_path.exists())
    );
    let data = data_dir(&config);
    println!(
        "  {:<18} {} {}",
        "Data dir:".bold(),
        display_path(&data),
        found_marker(data.exists())
    );

    // Resilience settings
    println!(
        "  {:<18} {}",
        "Breaker:".bold(),
        format!(
            "opens after {} failures, retries after {}s",
            config.breaker.failure_threshold, config.breaker.recovery_timeout_secs
        )
        .dimmed()
    );
    println!(
        "  {:<18} {}",
        "Fallback cache:".bold(),
        format!(
            "ttl {}s, {} entries max",
            config.cache.ttl_secs, config.cache.max_entries
        )
        .dimmed()
    );

    // Providers, in fallback order
    println!();
    println!("  {}", "Providers:".bold());
    if config.providers.is_empty() {
        println!("    {}", "· none configured (run `vigil onboard`)".dimmed());
    }
    let mut providers: Vec<_> = config
        .providers
        .iter()
        .cloned()
        .map(apply_kind_defaults)
        .collect();
    providers.sort_by_key(|p| p.priority);

    let orchestrator = crate::build_orchestrator(&config)?;
    let states: std::collections::HashMap<String, BreakerState> =
        orchestrator.breaker_status().into_iter().collect();

    for p in &providers {
        let kind = find_kind(&p.kind)
            .map(|k| k.display_name)
            .unwrap_or(p.kind.as_str());
        let status = if !p.enabled {
            format!("{}", "· disabled".dimmed())
        } else if !p.is_configured() {
            format!("{}", "· no API key".dimmed())
        } else {
            match states.get(&p.id) {
                Some(BreakerState::Closed) => format!("{} CLOSED", "✓".green()),
                Some(state) => format!("{} {state}", "!".yellow()),
                None => format!("{}", "· no client".dimmed()),
            }
        };
        println!(
            "    {:<3} {:<20} {:<12} {:<24} {}",
            p.priority,
            p.id,
            kind,
            p.model_name,
            status
        );
    }

    // Governance data
    println!();
    let cards = JsonModelCardStore::open(model_cards_path(&config))
        .map(|s| s.cards().len().to_string())
        .unwrap_or_else(|e| format!("{} ({e})", "unreadable".red()));
    println!("  {:<18} {}", "Model cards:".bold(), cards);

    let disclosures = read_disclosures(&disclosures_path(&config))
        .map(|d| d.len().to_string())
        .unwrap_or_else(|e| format!("{} ({e})", "unreadable".red()));
    println!("  {:<18} {}", "Disclosures:".bold(), disclosures);

    println!();
    Ok(())
}

fn found_marker(exists: bool) -> String {
    if exists {
        "✓".green().to_string()
    } else {
        "(not found)".red().to_string()
    }
}
