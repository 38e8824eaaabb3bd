//! Vigil CLI: entry point.
//!
//! # Commands
//!
//! - `vigil generate -m MESSAGE [-f FRAMEWORK]`: one request through the orchestrator
//! - `vigil chat [-f FRAMEWORK]`: interactive compliance chat (REPL)
//! - `vigil status`: configuration, providers, breakers, governance data
//! - `vigil audit [-n N]`: most recent usage disclosures
//! - `vigil onboard`: initialize config and data directory

mod audit;
mod helpers;
mod onboard;
mod repl;
mod status;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::info;

use vigil_core::config::{load_config, Config};
use vigil_core::types::{GenerationKind, GenerationRequest, UserContext};
use vigil_orchestrator::Orchestrator;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Vigil: resilient AI generation for compliance workflows
#[derive(Parser)]
#[command(name = "vigil", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one generation request and print the response
    Generate {
        /// The prompt
        #[arg(short, long)]
        message: String,

        /// Framework hint (iso27001, soc2, fedramp, nist-csf, nist-800-53)
        #[arg(short, long)]
        framework: Option<String>,

        /// What is being generated (recorded in the disclosure)
        #[arg(long, value_enum, default_value_t = KindArg::Chat)]
        kind: KindArg,

        /// User id recorded in the disclosure (defaults to governance.defaultUserId)
        #[arg(long)]
        user: Option<String>,

        /// Record that the user consented to AI processing
        #[arg(long, default_value_t = false)]
        consent: bool,

        /// Print the full response as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Interactive chat (REPL)
    Chat {
        /// Framework hint for every turn (change with `/framework <key>`)
        #[arg(short, long)]
        framework: Option<String>,

        /// User id recorded in disclosures
        #[arg(long)]
        user: Option<String>,

        /// Record that the user consented to AI processing
        #[arg(long, default_value_t = false)]
        consent: bool,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Show configuration, providers, and breaker states
    Status,

    /// Show the most recent usage disclosures
    Audit {
        /// Number of records to show
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },

    /// Initialize configuration and data directory
    Onboard,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Chat,
    Document,
    Risk,
}

impl From<KindArg> for GenerationKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Chat => GenerationKind::Chat,
            KindArg::Document => GenerationKind::DocumentDraft,
            KindArg::Risk => GenerationKind::RiskAnalysis,
        }
    }
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            message,
            framework,
            kind,
            user,
            consent,
            json,
            logs,
        } => {
            init_logging(logs);
            let request = GenerationRequest::new(message).with_kind(kind.into());
            let request = match framework {
                Some(f) => request.with_framework(f),
                None => request,
            };
            run_generate(request, user, consent, json).await
        }
        Commands::Chat {
            framework,
            user,
            consent,
            logs,
        } => {
            init_logging(logs);
            let config = load_config(None);
            let orchestrator = build_orchestrator(&config)?;
            let user = user_context(&orchestrator, user, consent);
            repl::run(orchestrator, user, framework).await
        }
        Commands::Status => {
            init_logging(false);
            status::run()
        }
        Commands::Audit { limit } => audit::run(limit),
        Commands::Onboard => onboard::run(),
    }
}

// ─────────────────────────────────────────────
// Generate command
// ─────────────────────────────────────────────

async fn run_generate(
    request: GenerationRequest,
    user: Option<String>,
    consent: bool,
    json: bool,
) -> Result<()> {
    let config = load_config(None);
    let orchestrator = build_orchestrator(&config)?;
    let user = user_context(&orchestrator, user, consent);

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());
    let request = request.with_cancel(cancel);

    info!(request_id = %request.id, "processing single request");
    let response = orchestrator
        .generate(request, &user)
        .await
        .context("generation failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        helpers::print_response(&response);
    }
    Ok(())
}

/// Build an `Orchestrator` from the loaded configuration.
pub fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    Orchestrator::from_config(config).context("failed to open governance stores")
}

/// Default user context, with CLI overrides applied.
fn user_context(orchestrator: &Orchestrator, user: Option<String>, consent: bool) -> UserContext {
    let mut context = orchestrator.default_user().clone();
    if let Some(id) = user {
        context.user_id = id;
    }
    context.with_consent(consent)
}

/// Cancel `token` on the first Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("vigil=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_generate() {
        let cli = Cli::parse_from([
            "vigil", "generate", "-m", "draft a policy", "-f", "soc2", "--kind", "document",
            "--consent",
        ]);
        match cli.command {
            Commands::Generate {
                message,
                framework,
                kind,
                consent,
                json,
                ..
            } => {
                assert_eq!(message, "draft a policy");
                assert_eq!(framework.as_deref(), Some("soc2"));
                assert_eq!(GenerationKind::from(kind), GenerationKind::DocumentDraft);
                assert!(consent);
                assert!(!json);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn parse_audit_limit() {
        let cli = Cli::parse_from(["vigil", "audit", "-n", "3"]);
        assert!(matches!(cli.command, Commands::Audit { limit: 3 }));
    }
}
