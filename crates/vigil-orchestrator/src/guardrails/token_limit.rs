//! Token limit check against one candidate's `maxTokens`.

use vigil_core::types::GuardrailFinding;

use super::{estimate_tokens, Guardrail, GuardrailContext, GuardrailStage};

const NAME: &str = "token_limit";

/// Blocks a payload whose estimated size exceeds the candidate's limit.
/// A block skips that candidate only.
pub struct TokenLimitEnforcer;

impl Guardrail for TokenLimitEnforcer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn stage(&self) -> GuardrailStage {
        GuardrailStage::Candidate
    }

    fn inspect(&self, payload: &str, ctx: &GuardrailContext) -> GuardrailFinding {
        let Some(limit) = ctx.max_tokens else {
            return GuardrailFinding::pass(NAME);
        };
        let estimated = estimate_tokens(payload);
        if estimated > limit {
            GuardrailFinding::block(NAME, format!("~{estimated} tokens exceeds limit {limit}"))
        } else {
            GuardrailFinding::pass(NAME)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::types::GuardrailSeverity;

    fn check(payload: &str, limit: Option<u32>) -> GuardrailSeverity {
        TokenLimitEnforcer
            .inspect(payload, &GuardrailContext { max_tokens: limit })
            .severity
    }

    #[test]
    fn test_within_limit() {
        assert_eq!(check(&"a".repeat(40), Some(10)), GuardrailSeverity::Pass);
    }

    #[test]
    fn test_over_limit() {
        assert_eq!(check(&"a".repeat(41), Some(10)), GuardrailSeverity::Block);
    }

    #[test]
    fn test_no_limit_known() {
        assert_eq!(check(&"a".repeat(10_000), None), GuardrailSeverity::Pass);
    }
}
