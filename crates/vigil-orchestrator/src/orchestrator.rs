//! The `Orchestrator` façade: validation, routing, disclosure.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use vigil_core::config::Config;
use vigil_core::types::{
    ChatReply, ChatRequest, GenerationRequest, GenerationResponse, UserContext,
};
use vigil_core::utils::{expand_home, get_data_path};
use vigil_core::{GenerationError, PersistenceError};
use vigil_providers::{create_clients, ProviderClient, ProviderRegistry};

use crate::breaker::{BreakerSnapshot, BreakerState};
use crate::cache::ResponseCache;
use crate::disclosure::DisclosureRecorder;
use crate::frameworks::find_framework;
use crate::guardrails::GuardrailsPipeline;
use crate::router::ProviderRouter;
use crate::store::{DisclosureStore, JsonModelCardStore, JsonlDisclosureStore, ModelCardStore};

const DISCLOSURES_FILE: &str = "disclosures.jsonl";
const MODEL_CARDS_FILE: &str = "model_cards.json";

/// Directory holding the disclosure log and model cards.
pub fn data_dir(config: &Config) -> PathBuf {
    config
        .storage
        .data_dir
        .as_deref()
        .map(expand_home)
        .unwrap_or_else(get_data_path)
}

pub fn disclosures_path(config: &Config) -> PathBuf {
    data_dir(config).join(DISCLOSURES_FILE)
}

pub fn model_cards_path(config: &Config) -> PathBuf {
    data_dir(config).join(MODEL_CARDS_FILE)
}

/// Entry point for generation requests. Holds no request-scoped state,
/// so one instance serves concurrent requests.
pub struct Orchestrator {
    router: ProviderRouter,
    recorder: DisclosureRecorder,
    default_user: UserContext,
}

impl Orchestrator {
    pub fn new(router: ProviderRouter, recorder: DisclosureRecorder) -> Self {
        Self {
            router,
            recorder,
            default_user: UserContext::new("local-user"),
        }
    }

    /// Wire every component from `config` around the given clients and stores.
    pub fn assemble(
        config: &Config,
        registry: ProviderRegistry,
        clients: HashMap<String, Arc<dyn ProviderClient>>,
        model_cards: Arc<dyn ModelCardStore>,
        disclosures: Arc<dyn DisclosureStore>,
    ) -> Self {
        let router = ProviderRouter::new(
            registry.clone(),
            clients,
            &config.breaker,
            GuardrailsPipeline::standard(&config.guardrails),
            ResponseCache::from_config(&config.cache),
        );
        let recorder = DisclosureRecorder::new(registry, model_cards, disclosures);

        let mut default_user = UserContext::new(config.governance.default_user_id.clone());
        default_user.human_oversight = config.governance.human_oversight;

        Self {
            router,
            recorder,
            default_user,
        }
    }

    /// Production wiring: HTTP clients for every configured provider and
    /// file-backed stores under the data directory.
    pub fn from_config(config: &Config) -> Result<Self, PersistenceError> {
        let registry = ProviderRegistry::from_config(config);
        let clients = create_clients(&registry);
        let model_cards = JsonModelCardStore::open(model_cards_path(config))?;
        let disclosures = JsonlDisclosureStore::open(disclosures_path(config))?;
        info!(
            providers = registry.len(),
            data_dir = %data_dir(config).display(),
            "Orchestrator ready"
        );
        Ok(Self::assemble(
            config,
            registry,
            clients,
            Arc::new(model_cards),
            Arc::new(disclosures),
        ))
    }

    /// User context used when the caller supplies none.
    pub fn default_user(&self) -> &UserContext {
        &self.default_user
    }

    /// Serve one request and record its disclosure.
    ///
    /// A disclosure is written for every response returned, live or
    /// cached. Errors produce no disclosure.
    pub async fn generate(
        &self,
        request: GenerationRequest,
        user: &UserContext,
    ) -> Result<GenerationResponse, GenerationError> {
        validate(&request)?;
        debug!(request_id = %request.id, kind = request.kind.action_type(), "Generation requested");

        let response = self.router.dispatch(&request).await?;
        self.recorder.record(&request, &response, user).await;
        Ok(response)
    }

    /// Chat endpoint: maps the inbound contract onto `generate` and
    /// enriches the reply from the framework catalog.
    pub async fn chat(
        &self,
        chat: ChatRequest,
        user: &UserContext,
    ) -> Result<ChatReply, GenerationError> {
        let request = GenerationRequest::from(chat);
        let framework = request.framework.as_deref().and_then(find_framework);
        let response = self.generate(request, user).await?;

        let (suggestions, follow_up_questions): (Vec<String>, Vec<String>) = framework
            .map(|f| {
                (
                    f.suggestions.iter().map(|s| s.to_string()).collect(),
                    f.follow_up_questions.iter().map(|s| s.to_string()).collect(),
                )
            })
            .unwrap_or_default();

        Ok(ChatReply {
            content: response.content,
            confidence: response.confidence,
            sources: response.sources,
            suggestions,
            follow_up_questions,
        })
    }

    /// `(provider id, breaker state)` in priority order.
    pub fn breaker_status(&self) -> Vec<(String, BreakerState)> {
        self.router.breaker_status()
    }

    pub fn breaker_snapshots(&self) -> Vec<BreakerSnapshot> {
        self.router.breaker_snapshots()
    }

    /// Disclosure writes and model-card lookups that failed since startup.
    pub fn persistence_failures(&self) -> u64 {
        self.recorder.persistence_failures()
    }

    pub fn router(&self) -> &ProviderRouter {
        &self.router
    }
}

fn validate(request: &GenerationRequest) -> Result<(), GenerationError> {
    if request.id.trim().is_empty() {
        return Err(GenerationError::Validation("request id is empty".into()));
    }
    if request.prompt.trim().is_empty() {
        return Err(GenerationError::Validation("prompt is empty".into()));
    }
    if let Some(a) = request.attachments.iter().find(|a| a.name.trim().is_empty()) {
        return Err(GenerationError::Validation(format!(
            "attachment of type {} has no name",
            a.mime_type
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::config::StorageConfig;
    use vigil_core::types::Attachment;

    #[test]
    fn test_validate() {
        assert!(validate(&GenerationRequest::new("hello")).is_ok());
        assert!(matches!(
            validate(&GenerationRequest::new("   ")),
            Err(GenerationError::Validation(_))
        ));
        assert!(matches!(
            validate(&GenerationRequest::new("hi").with_id("")),
            Err(GenerationError::Validation(_))
        ));
        let unnamed = GenerationRequest::new("hi").with_attachment(Attachment {
            name: " ".into(),
            mime_type: "text/plain".into(),
            extracted_text: "x".into(),
        });
        assert!(validate(&unnamed).is_err());
    }

    #[test]
    fn test_data_dir_override() {
        let config = Config {
            storage: StorageConfig {
                data_dir: Some("/var/lib/vigil".into()),
            },
            ..Default::default()
        };
        assert_eq!(disclosures_path(&config), PathBuf::from("/var/lib/vigil/disclosures.jsonl"));
        assert_eq!(model_cards_path(&config), PathBuf::from("/var/lib/vigil/model_cards.json"));
    }

    #[tokio::test]
    async fn test_from_config_with_no_providers() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            storage: StorageConfig {
                data_dir: Some(tmp.path().to_string_lossy().into_owned()),
            },
            ..Default::default()
        };
        let orchestrator = Orchestrator::from_config(&config).unwrap();
        assert!(orchestrator.breaker_status().is_empty());
        assert_eq!(orchestrator.default_user().user_id, "local-user");

        let err = orchestrator
            .generate(GenerationRequest::new("hello"), &UserContext::new("u"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::ServiceUnavailable { .. }));
        assert_eq!(err.to_string(), "AI service unavailable: no providers configured");
    }
}
