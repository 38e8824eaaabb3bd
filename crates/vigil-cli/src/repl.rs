//! Interactive chat REPL.
//!
//! Uses `rustyline` for readline-style editing with persistent history.

use anyhow::Result;
use colored::Colorize;
use rustyline::config::Configurer;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use vigil_core::types::{ChatRequest, UserContext};
use vigil_orchestrator::Orchestrator;

use crate::helpers;

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

/// A parsed line of REPL input.
#[derive(Debug, PartialEq)]
enum Input<'a> {
    Exit,
    /// `/framework <key>`; `None` clears the hint.
    Framework(Option<&'a str>),
    Status,
    Message(&'a str),
}

fn parse_input(line: &str) -> Option<Input<'_>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if EXIT_COMMANDS.contains(&trimmed.to_lowercase().as_str()) {
        return Some(Input::Exit);
    }
    if trimmed == "/status" {
        return Some(Input::Status);
    }
    if trimmed == "/framework" {
        return Some(Input::Framework(None));
    }
    if let Some(rest) = trimmed.strip_prefix("/framework ") {
        return Some(Input::Framework(Some(rest.trim())));
    }
    Some(Input::Message(trimmed))
}

/// Run the interactive REPL loop.
pub async fn run(
    orchestrator: Orchestrator,
    user: UserContext,
    mut framework: Option<String>,
) -> Result<()> {
    helpers::print_banner(framework.as_deref());

    let session_id = new_session_id();
    let mut editor = create_editor()?;

    loop {
        let line = match editor.readline("You: ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted) => break,
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let Some(input) = parse_input(&line) else {
            continue;
        };
        let _ = editor.add_history_entry(line.as_str());

        match input {
            Input::Exit => {
                println!("\nGoodbye!");
                break;
            }
            Input::Status => print_breakers(&orchestrator),
            Input::Framework(key) => {
                framework = key.map(str::to_string);
                match &framework {
                    Some(f) => println!("{}", format!("Framework set to {f}").dimmed()),
                    None => println!("{}", "Framework cleared".dimmed()),
                }
            }
            Input::Message(message) => {
                debug!(session = %session_id, "processing input");
                let request = ChatRequest {
                    message: message.to_string(),
                    framework: framework.clone(),
                    session_id: Some(session_id.clone()),
                    attachments: Vec::new(),
                };

                helpers::print_thinking();
                let outcome = orchestrator.chat(request, &user).await;
                helpers::clear_thinking();
                match outcome {
                    Ok(reply) => helpers::print_reply(&reply),
                    Err(e) => eprintln!("\n{} {e}\n", "Error:".red().bold()),
                }
            }
        }
    }

    save_history(&mut editor);
    Ok(())
}

fn print_breakers(orchestrator: &Orchestrator) {
    println!();
    for snapshot in orchestrator.breaker_snapshots() {
        println!(
            "  {:<24} {:<10} failures {}/{}",
            snapshot.provider_id,
            snapshot.state.to_string(),
            snapshot.consecutive_failures,
            snapshot.failure_threshold
        );
    }
    let gaps = orchestrator.persistence_failures();
    if gaps > 0 {
        println!("  {}", format!("{gaps} disclosure write(s) failed").red());
    }
    println!();
}

/// Session id for one REPL run.
fn new_session_id() -> String {
    format!("cli:{}", chrono::Utc::now().format("%Y%m%dT%H%M%S"))
}

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let history_path = history_path();
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
        debug!("loaded REPL history from {}", history_path.display());
    }

    Ok(editor)
}

/// Save history to disk.
fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

/// Path to the history file.
fn history_path() -> std::path::PathBuf {
    vigil_core::utils::get_data_path()
        .join("history")
        .join("chat_history")
}
