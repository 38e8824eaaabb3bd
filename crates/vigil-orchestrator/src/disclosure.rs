//! Usage disclosure recording.
//!
//! One `UsageDisclosure` per served response. Recording is best-effort:
//! store failures are logged and counted, never returned to the caller.
//!
//! Once a response exists its disclosure write is not cancellable. The
//! insert runs on its own task, so neither the request's cancel token nor
//! dropping the caller's future can leave a served response unrecorded or
//! a store write half-done.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info};
use uuid::Uuid;

use vigil_core::types::{
    GenerationKind, GenerationRequest, GenerationResponse, UsageDisclosure, UserContext,
};
use vigil_core::PersistenceError;
use vigil_providers::ProviderRegistry;

use crate::frameworks::find_framework;
use crate::guardrails::estimate_tokens;
use crate::router::compose_prompt;
use crate::store::{DisclosureStore, ModelCardStore};

/// Deterministic disclosure id for a request id.
///
/// A replayed request maps to the same disclosure id, so the store can
/// reject the duplicate.
pub fn disclosure_id(request_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, request_id.as_bytes()).to_string()
}

/// Fixed-point USD cost, six decimals.
pub fn format_cost(tokens: u32, cost_per_token: f64) -> String {
    let cost = f64::from(tokens) * cost_per_token;
    if cost.is_finite() && cost > 0.0 {
        format!("{cost:.6}")
    } else {
        "0.000000".to_string()
    }
}

fn purpose_description(kind: GenerationKind, framework: Option<&str>) -> String {
    let base = match kind {
        GenerationKind::Chat => "Compliance assistant chat response",
        GenerationKind::DocumentDraft => "Compliance document draft",
        GenerationKind::RiskAnalysis => "Risk analysis",
    };
    match framework.filter(|f| !f.trim().is_empty()) {
        Some(key) => {
            let name = find_framework(key).map(|f| f.display_name).unwrap_or(key);
            format!("{base} ({name})")
        }
        None => base.to_string(),
    }
}

// ─────────────────────────────────────────────
// DisclosureRecorder
// ─────────────────────────────────────────────

pub struct DisclosureRecorder {
    registry: ProviderRegistry,
    model_cards: Arc<dyn ModelCardStore>,
    disclosures: Arc<dyn DisclosureStore>,
    failures: AtomicU64,
}

impl DisclosureRecorder {
    /// `registry` supplies per-provider pricing for the cost estimate.
    pub fn new(
        registry: ProviderRegistry,
        model_cards: Arc<dyn ModelCardStore>,
        disclosures: Arc<dyn DisclosureStore>,
    ) -> Self {
        Self {
            registry,
            model_cards,
            disclosures,
            failures: AtomicU64::new(0),
        }
    }

    /// Failed lookups and writes since startup.
    pub fn persistence_failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Build and persist the disclosure for a served response.
    ///
    /// Returns the record that was built, whether or not it was stored.
    pub async fn record(
        &self,
        request: &GenerationRequest,
        response: &GenerationResponse,
        user: &UserContext,
    ) -> UsageDisclosure {
        let model_card_id = match self
            .model_cards
            .find(&response.provider_id, &response.model_name)
            .await
        {
            Ok(card) => card.map(|c| c.id),
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                error!(request_id = %request.id, error = %e, "Model card lookup failed");
                None
            }
        };

        let disclosure = self.build(request, response, user, model_card_id);

        let store = Arc::clone(&self.disclosures);
        let pending = disclosure.clone();
        let outcome = match tokio::spawn(async move { store.insert(&pending).await }).await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(PersistenceError::Cancelled),
            Err(e) => Err(PersistenceError::Io(std::io::Error::other(e))),
        };

        match outcome {
            Ok(true) => {
                info!(
                    request_id = %request.id,
                    disclosure_id = %disclosure.id,
                    provider = %disclosure.model_provider,
                    "Usage disclosure recorded"
                );
            }
            Ok(false) => {
                debug!(request_id = %request.id, "Disclosure already recorded, skipping");
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    request_id = %request.id,
                    disclosure_id = %disclosure.id,
                    error = %e,
                    "Disclosure not persisted; audit gap"
                );
            }
        }
        disclosure
    }

    fn build(
        &self,
        request: &GenerationRequest,
        response: &GenerationResponse,
        user: &UserContext,
        model_card_id: Option<String>,
    ) -> UsageDisclosure {
        let now = Utc::now();

        let cost_estimate = if response.from_cache {
            format_cost(0, 0.0)
        } else {
            let tokens = estimate_tokens(&compose_prompt(request))
                .saturating_add(estimate_tokens(&response.content));
            let rate = self
                .registry
                .get(&response.provider_id)
                .map(|p| p.cost_per_token)
                .unwrap_or(0.0);
            format_cost(tokens, rate)
        };

        let mut data_used = user.data_used.clone();
        data_used.extend(
            request
                .attachments
                .iter()
                .map(|a| format!("attachment:{}", a.name)),
        );

        UsageDisclosure {
            id: disclosure_id(&request.id),
            request_id: request.id.clone(),
            user_id: user.user_id.clone(),
            action_type: request.kind.action_type().to_string(),
            model_provider: response.provider_id.clone(),
            model_name: response.model_name.clone(),
            model_card_id,
            purpose_description: purpose_description(request.kind, request.framework.as_deref()),
            ai_contribution: user
                .ai_contribution
                .unwrap_or_else(|| request.kind.default_contribution()),
            user_consented: user.consented,
            consented_at: user.consented.then_some(now),
            human_oversight: user.human_oversight,
            cost_estimate,
            data_used,
            served_from_cache: response.from_cache,
            guardrail_finding_count: response.flagged_findings(),
            created_at: now,
        }
    }
}
