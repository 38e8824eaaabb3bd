//! `vigil audit`: print the tail of the usage disclosure log.

use anyhow::{Context, Result};
use colored::Colorize;

use vigil_core::config::load_config;
use vigil_core::types::UsageDisclosure;
use vigil_core::utils::truncate_string;
use vigil_orchestrator::orchestrator::disclosures_path;
use vigil_orchestrator::store::read_disclosures;

use crate::helpers::display_path;

/// Run the audit command.
pub fn run(limit: usize) -> Result<()> {
    let config = load_config(None);
    let path = disclosures_path(&config);
    let records = read_disclosures(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    println!();
    println!(
        "{}  {}",
        "Usage disclosures".cyan().bold(),
        display_path(&path).dimmed()
    );
    println!();

    if records.is_empty() {
        println!("  {}", "(no disclosures recorded)".dimmed());
        println!();
        return Ok(());
    }

    for record in tail(&records, limit) {
        println!("  {}", format_row(record));
    }
    println!();
    println!(
        "  {}",
        format!("showing {} of {}", records.len().min(limit), records.len()).dimmed()
    );
    println!();
    Ok(())
}

/// Last `n` records, oldest first.
fn tail(records: &[UsageDisclosure], n: usize) -> &[UsageDisclosure] {
    &records[records.len().saturating_sub(n)..]
}

fn format_row(d: &UsageDisclosure) -> String {
    let consent = if d.user_consented { "consent" } else { "no-consent" };
    let source = if d.served_from_cache { "cache" } else { "live" };
    format!(
        "{}  {:<20} {:<16} {:<28} {:<10} {:<5} ${}",
        d.created_at.format("%Y-%m-%d %H:%M:%S"),
        d.action_type,
        truncate_string(&d.user_id, 16),
        truncate_string(&format!("{}/{}", d.model_provider, d.model_name), 28),
        consent,
        source,
        d.cost_estimate
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vigil_core::types::AiContribution;

    fn disclosure(id: &str, from_cache: bool) -> UsageDisclosure {
        UsageDisclosure {
            id: id.into(),
            request_id: id.into(),
            user_id: "auditor".into(),
            action_type: "document_generation".into(),
            model_provider: "openai-primary".into(),
            model_name: "gpt-4o-mini".into(),
            model_card_id: None,
            purpose_description: "Compliance document draft".into(),
            ai_contribution: AiContribution::Partial,
            user_consented: false,
            consented_at: None,
            human_oversight: true,
            cost_estimate: "0.000210".into(),
            data_used: vec![],
            served_from_cache: from_cache,
            guardrail_finding_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn tail_keeps_most_recent() {
        let records: Vec<_> = (0..5).map(|i| disclosure(&i.to_string(), false)).collect();
        let last = tail(&records, 2);
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].id, "3");
        assert_eq!(last[1].id, "4");
        assert_eq!(tail(&records, 50).len(), 5);
        assert!(tail(&records, 0).is_empty());
    }

    #[test]
    fn row_shows_source_and_consent() {
        let row = format_row(&disclosure("d", true));
        assert!(row.contains("document_generation"));
        assert!(row.contains("no-consent"));
        assert!(row.contains("cache"));
        assert!(row.ends_with("$0.000210"));
    }
}
