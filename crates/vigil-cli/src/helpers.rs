//! Shared CLI helpers: response printing, banner, path display.

use std::path::Path;

use colored::Colorize;

use vigil_core::types::{ChatReply, GenerationResponse};

/// Show `path` with the home directory collapsed to `~`.
pub fn display_path(path: &Path) -> String {
    if let Some(home) = dirs_next::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            if rest.as_os_str().is_empty() {
                return "~".to_string();
            }
            return format!("~/{}", rest.display());
        }
    }
    path.display().to_string()
}

/// One-line provenance: provider, model, confidence, cache flag.
pub fn provenance(response: &GenerationResponse) -> String {
    let mut line = format!(
        "{} · {} · confidence {}",
        response.provider_id, response.model_name, response.confidence
    );
    if response.from_cache {
        line.push_str(" · cached fallback");
    }
    line
}

/// Print a generation response to stdout.
pub fn print_response(response: &GenerationResponse) {
    println!();
    println!("{}", "Vigil".cyan().bold());
    if response.content.is_empty() {
        println!("{}", "(no response)".dimmed());
    } else {
        println!("{}", response.content);
    }
    println!();
    let meta = provenance(response);
    if response.from_cache {
        println!("{}", meta.yellow());
    } else {
        println!("{}", meta.dimmed());
    }
    print_list("Sources", &response.sources);
    println!();
}

/// Print a chat reply, with the framework's suggestions and follow-ups.
pub fn print_reply(reply: &ChatReply) {
    println!();
    println!("{}", "Vigil".cyan().bold());
    println!("{}", reply.content);
    println!();
    println!("{}", format!("confidence {}", reply.confidence).dimmed());
    print_list("Sources", &reply.sources);
    print_list("Try next", &reply.suggestions);
    print_list("Questions to consider", &reply.follow_up_questions);
    println!();
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("{}", format!("{title}:").bold());
    for item in items {
        println!("  • {item}");
    }
}

/// Print the banner shown at REPL start.
pub fn print_banner(framework: Option<&str>) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "Vigil".cyan().bold(), version.dimmed());
    if let Some(f) = framework {
        println!("{}", format!("Framework: {f}").dimmed());
    }
    println!(
        "{}",
        "Type a message, \"/framework <key>\", \"/status\", or \"exit\" to quit.".dimmed()
    );
    println!();
}

/// Print a "thinking" placeholder.
pub fn print_thinking() {
    eprint!("{}", "⠿ thinking...".dimmed());
}

/// Clear the "thinking" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn response(from_cache: bool) -> GenerationResponse {
        GenerationResponse {
            content: "ok".into(),
            confidence: 60,
            sources: vec![],
            provider_id: "openai-primary".into(),
            model_name: "gpt-4o-mini".into(),
            from_cache,
            guardrail_findings: vec![],
        }
    }

    #[test]
    fn provenance_marks_cache() {
        assert_eq!(
            provenance(&response(false)),
            "openai-primary · gpt-4o-mini · confidence 60"
        );
        assert!(provenance(&response(true)).ends_with("cached fallback"));
    }

    #[test]
    fn display_path_outside_home() {
        assert_eq!(display_path(&PathBuf::from("/etc/vigil")), "/etc/vigil");
    }

    #[test]
    fn display_path_under_home() {
        if let Some(home) = dirs_next::home_dir() {
            assert_eq!(display_path(&home.join(".vigil")), "~/.vigil");
        }
    }
}
