//! Provider router: walks the fallback chain for one request.
//!
//! Candidates are tried strictly one at a time in ascending priority.
//! Only when every candidate is skipped or failed is the fallback cache
//! consulted.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use vigil_core::config::BreakerConfig;
use vigil_core::types::{GenerationRequest, GenerationResponse, GuardrailFinding, GuardrailSeverity};
use vigil_core::{FailureSummary, GenerationError, ProviderError};
use vigil_providers::{call_with_deadline, CompletionOptions, ProviderClient, ProviderRegistry};

use crate::breaker::{BreakerSnapshot, BreakerState, CircuitBreaker};
use crate::cache::{fingerprint, ResponseCache};
use crate::frameworks::{find_framework, sources_for};
use crate::guardrails::GuardrailsPipeline;

/// Confidence assigned to a clean live response.
const BASE_CONFIDENCE: i32 = 90;
const WARN_PENALTY: i32 = 10;
const SHORT_CONTENT_PENALTY: i32 = 15;
const SHORT_CONTENT_CHARS: usize = 40;
/// Subtracted when a response is served from the fallback cache.
pub const CACHE_CONFIDENCE_PENALTY: u8 = 30;

/// Build the payload sent to providers: the prompt, a framework hint
/// line, then each attachment's text under a header.
pub fn compose_prompt(request: &GenerationRequest) -> String {
    let mut payload = request.prompt.trim().to_string();

    if let Some(framework) = request.framework.as_deref().filter(|f| !f.trim().is_empty()) {
        let name = find_framework(framework)
            .map(|f| f.display_name)
            .unwrap_or(framework);
        payload.push_str(&format!("\n\nFramework: {name}"));
    }

    for attachment in &request.attachments {
        payload.push_str(&format!(
            "\n\n--- Attachment: {} ({}) ---\n{}",
            attachment.name,
            attachment.mime_type,
            attachment.extracted_text.trim()
        ));
    }
    payload
}

/// Heuristic confidence for a live response, 0–100.
pub fn live_confidence(findings: &[GuardrailFinding], content: &str) -> u8 {
    let warnings = findings
        .iter()
        .filter(|f| f.severity == GuardrailSeverity::Warn)
        .count();
    let warnings = i32::try_from(warnings).unwrap_or(i32::MAX / WARN_PENALTY);

    let mut score = BASE_CONFIDENCE - warnings.saturating_mul(WARN_PENALTY);
    if content.trim().chars().count() < SHORT_CONTENT_CHARS {
        score -= SHORT_CONTENT_PENALTY;
    }
    u8::try_from(score.clamp(0, 100)).unwrap_or(0)
}

// ─────────────────────────────────────────────
// ProviderRouter
// ─────────────────────────────────────────────

pub struct ProviderRouter {
    registry: ProviderRegistry,
    clients: HashMap<String, Arc<dyn ProviderClient>>,
    breakers: HashMap<String, Arc<CircuitBreaker>>,
    guardrails: GuardrailsPipeline,
    cache: ResponseCache,
}

impl ProviderRouter {
    /// One breaker is created per registry entry.
    pub fn new(
        registry: ProviderRegistry,
        clients: HashMap<String, Arc<dyn ProviderClient>>,
        breaker_config: &BreakerConfig,
        guardrails: GuardrailsPipeline,
        cache: ResponseCache,
    ) -> Self {
        let breakers = registry
            .candidates()
            .iter()
            .map(|p| {
                (
                    p.id.clone(),
                    Arc::new(CircuitBreaker::from_config(p.id.clone(), breaker_config)),
                )
            })
            .collect();

        for provider in registry.candidates() {
            if !clients.contains_key(&provider.id) {
                warn!(provider = %provider.id, "No client for provider, it will always be skipped");
            }
        }

        Self {
            registry,
            clients,
            breakers,
            guardrails,
            cache,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn breaker(&self, provider_id: &str) -> Option<&Arc<CircuitBreaker>> {
        self.breakers.get(provider_id)
    }

    /// `(provider id, state)` in registry order.
    pub fn breaker_status(&self) -> Vec<(String, BreakerState)> {
        self.registry
            .candidates()
            .iter()
            .filter_map(|p| self.breakers.get(&p.id).map(|b| (p.id.clone(), b.state())))
            .collect()
    }

    pub fn breaker_snapshots(&self) -> Vec<BreakerSnapshot> {
        self.registry
            .candidates()
            .iter()
            .filter_map(|p| self.breakers.get(&p.id).map(|b| b.snapshot()))
            .collect()
    }

    /// Serve `request` from the first healthy candidate, or from the
    /// fallback cache once every candidate is exhausted.
    pub async fn dispatch(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let composed = compose_prompt(request);

        let input = self.guardrails.check_input(&composed);
        if let Some(finding) = input.blocked_by() {
            // Only the validator name is logged; never the payload.
            warn!(request_id = %request.id, validator = %finding.validator, "Input blocked");
            return Err(GenerationError::blocked("input"));
        }
        let payload = input.payload;
        let key = fingerprint(&composed, request.framework.as_deref());
        let mut summary = FailureSummary::default();

        for provider in self.registry.candidates() {
            if request.cancel.is_cancelled() {
                return Err(GenerationError::Cancelled);
            }

            // Checked before the breaker so a Half-Open trial is never
            // granted to a candidate that cannot take the payload.
            let candidate = self.guardrails.check_candidate(&payload, provider.max_tokens);
            if candidate.is_blocked() {
                debug!(provider = %provider.id, limit = provider.max_tokens, "Skipping: payload over token limit");
                summary.skipped += 1;
                continue;
            }

            let (Some(client), Some(breaker)) =
                (self.clients.get(&provider.id), self.breakers.get(&provider.id))
            else {
                summary.skipped += 1;
                continue;
            };

            // Held across the call: dropping this future mid-call releases
            // a Half-Open trial instead of leaving it outstanding.
            let Some(permit) = breaker.allow_request() else {
                debug!(provider = %provider.id, "Skipping: breaker open");
                summary.skipped += 1;
                continue;
            };

            let options = CompletionOptions {
                model: provider.model_name.clone(),
                timeout: provider.request_timeout(),
                ..Default::default()
            };
            debug!(request_id = %request.id, provider = %provider.id, model = %provider.model_name, trial = permit.is_trial(), "Calling provider");

            let content =
                match call_with_deadline(client.as_ref(), &payload, &options, &request.cancel).await {
                    Ok(content) => content,
                    Err(e) if !e.counts_against_provider() => {
                        drop(permit);
                        info!(request_id = %request.id, provider = %provider.id, "Request cancelled by caller");
                        return Err(GenerationError::Cancelled);
                    }
                    Err(e) => {
                        permit.record_failure();
                        warn!(provider = %provider.id, error = %e, "Provider call failed");
                        match e {
                            ProviderError::Timeout(_) => summary.timed_out += 1,
                            _ => summary.failed += 1,
                        }
                        continue;
                    }
                };

            let output = self.guardrails.check_output(&content);
            if let Some(finding) = output.blocked_by() {
                permit.record_failure();
                warn!(provider = %provider.id, validator = %finding.validator, "Provider output blocked");
                summary.blocked += 1;
                continue;
            }
            permit.record_success();

            let mut findings = input.findings.clone();
            findings.extend(candidate.findings);
            findings.extend(output.findings);

            let response = GenerationResponse {
                confidence: live_confidence(&findings, &content),
                content,
                sources: sources_for(request.framework.as_deref()),
                provider_id: provider.id.clone(),
                model_name: provider.model_name.clone(),
                from_cache: false,
                guardrail_findings: findings,
            };
            self.cache.store(key.as_str(), &response);

            info!(
                request_id = %request.id,
                provider = %provider.id,
                confidence = response.confidence,
                "Response served"
            );
            return Ok(response);
        }

        if let Some(mut cached) = self.cache.lookup(&key) {
            cached.from_cache = true;
            cached.confidence = cached.confidence.saturating_sub(CACHE_CONFIDENCE_PENALTY);
            cached.guardrail_findings = input.findings;
            info!(
                request_id = %request.id,
                provider = %cached.provider_id,
                %summary,
                "All providers exhausted, serving cached response"
            );
            return Ok(cached);
        }

        warn!(request_id = %request.id, %summary, "All providers exhausted, cache miss");
        Err(GenerationError::ServiceUnavailable { summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::types::Attachment;

    #[test]
    fn test_compose_prompt() {
        let request = GenerationRequest::new("  Summarize the policy  ")
            .with_framework("iso27001")
            .with_attachment(Attachment {
                name: "policy.pdf".into(),
                mime_type: "application/pdf".into(),
                extracted_text: "Access is reviewed quarterly.\n".into(),
            });
        let payload = compose_prompt(&request);
        assert!(payload.starts_with("Summarize the policy\n\nFramework: ISO/IEC 27001:2022"));
        assert!(payload.contains("--- Attachment: policy.pdf (application/pdf) ---"));
        assert!(payload.ends_with("Access is reviewed quarterly."));
    }

    #[test]
    fn test_compose_unknown_framework_kept_verbatim() {
        let request = GenerationRequest::new("hello").with_framework("hipaa");
        assert_eq!(compose_prompt(&request), "hello\n\nFramework: hipaa");
    }

    #[test]
    fn test_compose_plain_prompt() {
        assert_eq!(compose_prompt(&GenerationRequest::new("hi")), "hi");
    }

    #[test]
    fn test_live_confidence() {
        let long = "x".repeat(80);
        assert_eq!(live_confidence(&[], &long), 90);

        let findings = vec![
            GuardrailFinding::pass("a"),
            GuardrailFinding::warn("b", "w"),
            GuardrailFinding::warn("c", "w"),
        ];
        assert_eq!(live_confidence(&findings, &long), 70);
        assert_eq!(live_confidence(&findings, "short"), 55);
    }

    #[test]
    fn test_live_confidence_clamped() {
        let findings: Vec<_> = (0..20).map(|_| GuardrailFinding::warn("w", "w")).collect();
        assert_eq!(live_confidence(&findings, "x"), 0);
    }
}
