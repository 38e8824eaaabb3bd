//! Generic HTTP-based LLM provider for OpenAI-compatible APIs.
//!
//! Talks directly to any `/chat/completions` endpoint via `reqwest`.
//! Covers every kind in [`crate::registry::PROVIDER_KINDS`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use vigil_core::types::{ChatCompletionRequest, ChatCompletionResponse, Message};
use vigil_core::ProviderError;

use crate::registry::{resolve_api_base, ProviderConfig, ProviderRegistry};
use crate::traits::{CompletionOptions, ProviderClient};

/// System prompt framing every compliance generation request.
const SYSTEM_PROMPT: &str = "You are a compliance assistant for information security \
programs (ISO 27001, SOC 2, FedRAMP, NIST). Answer precisely, cite control identifiers \
where relevant, and say so when you are unsure.";

// ─────────────────────────────────────────────
// HttpProvider
// ─────────────────────────────────────────────

/// A provider client that talks to any OpenAI-compatible HTTP API.
pub struct HttpProvider {
    client: reqwest::Client,
    /// Resolved base URL, without the `/chat/completions` suffix.
    api_base: String,
    /// Bearer token; empty for local kinds.
    api_key: String,
    extra_headers: HeaderMap,
    display_name: String,
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("api_base", &self.api_base)
            .field("provider", &self.display_name)
            .finish()
    }
}

impl HttpProvider {
    /// Create a new HttpProvider from a provider config.
    pub fn new(config: &ProviderConfig) -> Result<Self, String> {
        let api_base = resolve_api_base(config);

        let extra_headers = config
            .extra_headers
            .as_ref()
            .map(|headers| header_map(&config.id, headers))
            .unwrap_or_default();

        // The router enforces the per-attempt deadline; this is a backstop
        // for connections that never resolve.
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout() * 2)
            .build()
            .map_err(|e| format!("failed to build HTTP client for '{}': {}", config.id, e))?;

        Ok(HttpProvider {
            client,
            api_base,
            api_key: config.api_key.clone(),
            extra_headers,
            display_name: config.label().to_string(),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }

    async fn send(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, ProviderError> {
        let request_body = ChatCompletionRequest {
            model: options.model.clone(),
            messages: vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)],
            max_tokens: Some(options.max_tokens),
            temperature: Some(options.temperature),
        };

        let mut builder = self
            .client
            .post(self.completions_url())
            .headers(self.extra_headers.clone())
            .json(&request_body);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await.map_err(|e| {
            error!(provider = %self.display_name, error = %e, "HTTP request failed");
            if e.is_timeout() {
                ProviderError::Timeout(options.timeout)
            } else {
                ProviderError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(
                provider = %self.display_name,
                status = %status,
                body = %error_text,
                "API error"
            );
            return Err(ProviderError::Status {
                code: status.as_u16(),
            });
        }

        let chat_resp = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| {
                error!(
                    provider = %self.display_name,
                    error = %e,
                    "Failed to parse LLM response"
                );
                ProviderError::Parse(e.to_string())
            })?;

        let text = chat_resp
            .into_text()
            .ok_or_else(|| ProviderError::Parse("no content in response".to_string()))?;

        debug!(
            provider = %self.display_name,
            chars = text.len(),
            "LLM response received"
        );
        Ok(text)
    }
}

#[async_trait]
impl ProviderClient for HttpProvider {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
        cancel: &CancellationToken,
    ) -> Result<String, ProviderError> {
        debug!(
            provider = %self.display_name,
            model = %options.model,
            prompt_chars = prompt.len(),
            "Calling LLM"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProviderError::Cancelled),
            result = self.send(prompt, options) => result,
        }
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }
}

// ─────────────────────────────────────────────
// Builder (convenience)
// ─────────────────────────────────────────────

/// Convert configured extra headers, dropping any that are not valid HTTP.
fn header_map(provider_id: &str, headers: &HashMap<String, String>) -> HeaderMap {
    headers
        .iter()
        .filter_map(|(key, value)| {
            match (
                HeaderName::from_bytes(key.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => Some((name, value)),
                _ => {
                    warn!(provider = %provider_id, header = %key, "Dropping invalid extra header");
                    None
                }
            }
        })
        .collect()
}

/// Build one HttpProvider per registry entry, keyed by provider id.
///
/// Providers whose client cannot be constructed are logged and left out;
/// the router treats a missing client as a skipped candidate.
pub fn create_clients(registry: &ProviderRegistry) -> HashMap<String, Arc<dyn ProviderClient>> {
    let mut clients: HashMap<String, Arc<dyn ProviderClient>> = HashMap::new();
    for config in registry.candidates() {
        match HttpProvider::new(config) {
            Ok(provider) => {
                debug!(
                    provider = %config.id,
                    api_base = %provider.api_base,
                    "Creating LLM provider"
                );
                clients.insert(config.id.clone(), Arc::new(provider));
            }
            Err(e) => error!(provider = %config.id, error = %e, "Skipping provider"),
        }
    }
    clients
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
