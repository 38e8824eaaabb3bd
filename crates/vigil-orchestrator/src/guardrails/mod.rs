//! Guardrails: ordered, stateless validators over request and response text.
//!
//! Fixed order:
//! 1. [`PromptInjectionDetector`]: input; `BLOCK` aborts before any provider call
//! 2. [`PiiRedactor`]: input; never blocks, rewrites the payload with placeholders
//! 3. [`TokenLimitEnforcer`]: per candidate; `BLOCK` skips that candidate only
//! 4. [`OutputModerator`]: provider output; `BLOCK` counts as a provider failure

mod injection;
mod moderation;
mod pii;
mod token_limit;

pub use injection::PromptInjectionDetector;
pub use moderation::OutputModerator;
pub use pii::PiiRedactor;
pub use token_limit::TokenLimitEnforcer;

use tracing::{debug, warn};

use vigil_core::config::GuardrailsConfig;
use vigil_core::types::{GuardrailFinding, GuardrailSeverity};

/// Where in the request lifecycle a validator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardrailStage {
    /// Once per request, before any candidate is considered.
    Input,
    /// Once per candidate, before dispatch.
    Candidate,
    /// After a provider returned text.
    Output,
}

/// Facts a validator may need beyond the payload itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuardrailContext {
    /// Prompt limit of the candidate being considered.
    pub max_tokens: Option<u32>,
}

/// A single stateless validator.
pub trait Guardrail: Send + Sync {
    /// Name recorded in findings.
    fn name(&self) -> &'static str;

    fn stage(&self) -> GuardrailStage;

    /// Inspect `payload`. A finding with `redacted_text` replaces the
    /// payload for the validators that follow.
    fn inspect(&self, payload: &str, ctx: &GuardrailContext) -> GuardrailFinding;
}

/// Result of running one stage of the pipeline.
#[derive(Debug, Clone)]
pub struct GuardrailOutcome {
    /// Payload after any rewrites.
    pub payload: String,
    pub findings: Vec<GuardrailFinding>,
}

impl GuardrailOutcome {
    /// The blocking finding, if any. The pipeline stops at the first one.
    pub fn blocked_by(&self) -> Option<&GuardrailFinding> {
        self.findings.iter().find(|f| f.is_block())
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked_by().is_some()
    }
}

/// Rough token estimate: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count();
    u32::try_from(chars.div_ceil(4)).unwrap_or(u32::MAX)
}

// ─────────────────────────────────────────────
// GuardrailsPipeline
// ─────────────────────────────────────────────

/// Ordered validator list. Holds no per-request state.
pub struct GuardrailsPipeline {
    validators: Vec<Box<dyn Guardrail>>,
}

impl GuardrailsPipeline {
    /// Build a pipeline from an explicit validator list (kept in order).
    pub fn new(validators: Vec<Box<dyn Guardrail>>) -> Self {
        Self { validators }
    }

    /// The standard four-validator pipeline.
    pub fn standard(config: &GuardrailsConfig) -> Self {
        Self::new(vec![
            Box::new(PromptInjectionDetector::new(
                config.injection_warn_score,
                config.injection_block_score,
            )),
            Box::new(PiiRedactor::new()),
            Box::new(TokenLimitEnforcer),
            Box::new(OutputModerator::new(&config.blocked_output_terms)),
        ])
    }

    /// Run input validators over the composed request payload.
    pub fn check_input(&self, payload: &str) -> GuardrailOutcome {
        self.run(GuardrailStage::Input, payload, &GuardrailContext::default())
    }

    /// Run per-candidate validators against one provider's limits.
    pub fn check_candidate(&self, payload: &str, max_tokens: u32) -> GuardrailOutcome {
        let ctx = GuardrailContext {
            max_tokens: Some(max_tokens),
        };
        self.run(GuardrailStage::Candidate, payload, &ctx)
    }

    /// Run output validators over a provider's raw response.
    pub fn check_output(&self, content: &str) -> GuardrailOutcome {
        self.run(GuardrailStage::Output, content, &GuardrailContext::default())
    }

    fn run(&self, stage: GuardrailStage, payload: &str, ctx: &GuardrailContext) -> GuardrailOutcome {
        let mut current = payload.to_string();
        let mut findings = Vec::new();

        for validator in self.validators.iter().filter(|v| v.stage() == stage) {
            let mut finding = validator.inspect(&current, ctx);
            if let Some(redacted) = finding.redacted_text.take() {
                current = redacted;
            }

            let blocked = finding.is_block();
            match finding.severity {
                GuardrailSeverity::Pass => {}
                GuardrailSeverity::Warn => {
                    debug!(validator = validator.name(), stage = ?stage, "guardrail warning");
                }
                GuardrailSeverity::Block => {
                    warn!(validator = validator.name(), stage = ?stage, "guardrail block");
                }
            }
            findings.push(finding);
            if blocked {
                break;
            }
        }

        GuardrailOutcome {
            payload: current,
            findings,
        }
    }
}
