//! PII redaction: replaces personal data with placeholders before the
//! payload leaves the system. Never blocks.

use regex::Regex;
use vigil_core::types::GuardrailFinding;

use super::{Guardrail, GuardrailContext, GuardrailStage};

const NAME: &str = "pii_redactor";

/// `(label, pattern, placeholder)`, applied in order.
/// SSN and card numbers run before phone numbers so digit runs are
/// claimed by the more specific pattern.
const PATTERNS: &[(&str, &str, &str)] = &[
    (
        "email",
        r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
        "[REDACTED_EMAIL]",
    ),
    ("ssn", r"\b\d{3}-\d{2}-\d{4}\b", "[REDACTED_SSN]"),
    ("card", r"\b(?:\d{4}[ -]?){3}\d{4}\b", "[REDACTED_CARD]"),
    (
        "phone",
        r"(?:\+?1[-. ]?)?\(?\b\d{3}\)?[-. ]\d{3}[-. ]\d{4}\b",
        "[REDACTED_PHONE]",
    ),
];

/// Pattern-based PII detection and redaction.
pub struct PiiRedactor {
    patterns: Vec<(&'static str, Regex, &'static str)>,
}

impl PiiRedactor {
    pub fn new() -> Self {
        let patterns = PATTERNS
            .iter()
            .filter_map(|(label, p, placeholder)| {
                Regex::new(p).ok().map(|re| (*label, re, *placeholder))
            })
            .collect();
        Self { patterns }
    }

    /// Redact every match; returns the rewritten text and the labels found.
    pub fn redact(&self, text: &str) -> (String, Vec<&'static str>) {
        let mut current = text.to_string();
        let mut found = Vec::new();
        for (label, re, placeholder) in &self.patterns {
            if re.is_match(&current) {
                found.push(*label);
                current = re.replace_all(&current, *placeholder).into_owned();
            }
        }
        (current, found)
    }
}

impl Default for PiiRedactor {
    fn default() -> Self {
        Self::new()
    }
}

impl Guardrail for PiiRedactor {
    fn name(&self) -> &'static str {
        NAME
    }

    fn stage(&self) -> GuardrailStage {
        GuardrailStage::Input
    }

    fn inspect(&self, payload: &str, _ctx: &GuardrailContext) -> GuardrailFinding {
        let (redacted, found) = self.redact(payload);
        if found.is_empty() {
            GuardrailFinding::pass(NAME)
        } else {
            GuardrailFinding::warn(NAME, format!("redacted: {}", found.join(", ")))
                .with_redaction(redacted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::types::GuardrailSeverity;

    #[test]
    fn test_no_pii_passes_untouched() {
        let finding = PiiRedactor::new().inspect(
            "Map CC6.1 to ISO 27001 Annex A",
            &GuardrailContext::default(),
        );
        assert_eq!(finding.severity, GuardrailSeverity::Pass);
        assert!(finding.redacted_text.is_none());
    }

    #[test]
    fn test_email_and_ssn() {
        let (text, found) =
            PiiRedactor::new().redact("Owner: jane.doe@example.com, SSN 123-45-6789.");
        assert_eq!(text, "Owner: [REDACTED_EMAIL], SSN [REDACTED_SSN].");
        assert_eq!(found, vec!["email", "ssn"]);
    }

    #[test]
    fn test_card_number() {
        let (text, found) = PiiRedactor::new().redact("card 4111 1111 1111 1111 on file");
        assert_eq!(text, "card [REDACTED_CARD] on file");
        assert_eq!(found, vec!["card"]);
    }

    #[test]
    fn test_phone_number() {
        let (text, found) = PiiRedactor::new().redact("call 555-867-5309 today");
        assert_eq!(text, "call [REDACTED_PHONE] today");
        assert_eq!(found, vec!["phone"]);
    }

    #[test]
    fn test_never_blocks() {
        let finding = PiiRedactor::new().inspect(
            "a@b.io 111-22-3333 4111-1111-1111-1111",
            &GuardrailContext::default(),
        );
        assert_eq!(finding.severity, GuardrailSeverity::Warn);
        let redacted = finding.redacted_text.unwrap();
        assert!(!redacted.contains("a@b.io"));
        assert!(!redacted.contains("111-22-3333"));
        assert!(!redacted.contains("4111"));
    }
}
