//! Error taxonomy for the generation pipeline.
//!
//! Only [`GenerationError`] ever reaches a caller. [`ProviderError`] stays
//! local to one candidate attempt and is folded into a [`FailureSummary`];
//! [`PersistenceError`] is logged and counted, never propagated.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced to callers of `Orchestrator::generate`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    /// Malformed request, rejected before any guardrail or provider work.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Input or output failed a blocking validator. The message is sanitized.
    #[error("request blocked: {message}")]
    GuardrailBlocked { message: String },

    /// Every candidate was skipped or failed and the fallback cache missed.
    #[error("AI service unavailable: {summary}")]
    ServiceUnavailable { summary: FailureSummary },

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,
}

impl GenerationError {
    /// Build a `GuardrailBlocked` error with the standard sanitized wording.
    pub fn blocked(stage: &str) -> Self {
        GenerationError::GuardrailBlocked {
            message: format!("the {stage} did not pass content safety policy"),
        }
    }
}

/// Aggregated, provider-agnostic outcome counts for an exhausted fallback chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureSummary {
    /// Candidates not attempted (open breaker, token limit).
    pub skipped: usize,
    /// Candidates that failed with a transport or status error.
    pub failed: usize,
    /// Candidates that exceeded their request timeout.
    pub timed_out: usize,
    /// Candidates whose output was rejected by the moderator.
    pub blocked: usize,
}

impl FailureSummary {
    /// Total number of candidates considered.
    pub fn total(&self) -> usize {
        self.skipped + self.failed + self.timed_out + self.blocked
    }
}

impl fmt::Display for FailureSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total() == 0 {
            return write!(f, "no providers configured");
        }
        write!(
            f,
            "{} provider(s) tried: {} skipped, {} failed, {} timed out, {} rejected",
            self.total(),
            self.skipped,
            self.failed,
            self.timed_out,
            self.blocked
        )
    }
}

/// Failure of a single provider call.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("provider returned HTTP {code}")]
    Status { code: u16 },

    #[error("could not parse provider response: {0}")]
    Parse(String),

    /// Caller-initiated; never counted against the provider.
    #[error("call cancelled by caller")]
    Cancelled,
}

impl ProviderError {
    /// Whether this failure is attributable to the provider.
    pub fn counts_against_provider(&self) -> bool {
        !matches!(self, ProviderError::Cancelled)
    }
}

/// Failure of the disclosure store or the model-card lookup.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The write task was aborted before finishing (runtime shutdown).
    #[error("write abandoned before completion")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_display_has_no_provider_names() {
        let summary = FailureSummary {
            skipped: 1,
            failed: 1,
            timed_out: 0,
            blocked: 1,
        };
        let err = GenerationError::ServiceUnavailable { summary };
        let text = err.to_string();
        assert!(text.contains("3 provider(s) tried"));
        assert!(text.contains("1 rejected"));
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(
            FailureSummary::default().to_string(),
            "no providers configured"
        );
    }

    #[test]
    fn test_blocked_message_is_sanitized() {
        let err = GenerationError::blocked("input");
        assert_eq!(
            err.to_string(),
            "request blocked: the input did not pass content safety policy"
        );
    }

    #[test]
    fn test_cancel_does_not_count_against_provider() {
        assert!(!ProviderError::Cancelled.counts_against_provider());
        assert!(ProviderError::Status { code: 503 }.counts_against_provider());
        assert!(ProviderError::Timeout(std::time::Duration::from_secs(1))
            .counts_against_provider());
    }
}
