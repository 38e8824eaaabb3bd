//! Core types for Vigil.
//!
//! Two families live here: the OpenAI-compatible wire format spoken to
//! providers, and the domain model of a generation request as it moves
//! through guardrails, routing, and disclosure recording.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

// ─────────────────────────────────────────────
// Wire format (OpenAI chat completions)
// ─────────────────────────────────────────────

/// A chat message in the OpenAI format. Each variant maps to a `role` value.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role")]
pub enum Message {
    #[serde(rename = "system")]
    System { content: String },

    #[serde(rename = "user")]
    User { content: String },

    #[serde(rename = "assistant")]
    Assistant { content: String },
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }
}

/// Request body for an OpenAI-compatible chat completion API.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// Raw chat completion response. Used internally for deserialization.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: Option<String>,
    pub choices: Vec<ChatChoice>,
    pub usage: Option<UsageInfo>,
}

/// A single choice in a chat completion response.
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: AssistantMessage,
    pub finish_reason: Option<String>,
}

/// The assistant message within a chat completion choice.
#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    pub content: Option<String>,
}

/// Token usage statistics from the provider.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UsageInfo {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if any.
    pub fn into_text(self) -> Option<String> {
        self.choices.into_iter().next().and_then(|c| c.message.content)
    }
}

// ─────────────────────────────────────────────
// Generation request
// ─────────────────────────────────────────────

/// What the user is asking the AI to do. Drives disclosure metadata.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    #[default]
    Chat,
    DocumentDraft,
    RiskAnalysis,
}

impl GenerationKind {
    /// Value stored in `UsageDisclosure::action_type`.
    pub fn action_type(&self) -> &'static str {
        match self {
            GenerationKind::Chat => "chat",
            GenerationKind::DocumentDraft => "document_generation",
            GenerationKind::RiskAnalysis => "risk_analysis",
        }
    }

    /// Default share of the output attributable to the model.
    pub fn default_contribution(&self) -> AiContribution {
        match self {
            GenerationKind::Chat => AiContribution::Assisted,
            GenerationKind::DocumentDraft | GenerationKind::RiskAnalysis => {
                AiContribution::Partial
            }
        }
    }
}

/// A file attached to a request, with text already extracted upstream.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    pub extracted_text: String,
}

/// One generation request (chat turn, document draft, risk analysis).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Idempotency key. Disclosure recording is deduplicated on it.
    pub id: String,
    pub prompt: String,
    /// Topic hint, e.g. `"iso27001"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub kind: GenerationKind,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub requested_at: DateTime<Utc>,
    /// Cancelled by the caller to abandon in-flight provider calls.
    #[serde(skip)]
    pub cancel: CancellationToken,
}

impl GenerationRequest {
    /// Create a chat request with a fresh id.
    pub fn new(prompt: impl Into<String>) -> Self {
        GenerationRequest {
            id: uuid::Uuid::new_v4().to_string(),
            prompt: prompt.into(),
            framework: None,
            session_id: None,
            kind: GenerationKind::Chat,
            attachments: Vec::new(),
            requested_at: Utc::now(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_framework(mut self, framework: impl Into<String>) -> Self {
        self.framework = Some(framework.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_kind(mut self, kind: GenerationKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

// ─────────────────────────────────────────────
// Guardrail findings
// ─────────────────────────────────────────────

/// Outcome severity of one validator run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuardrailSeverity {
    Pass,
    Warn,
    Block,
}

/// Result of running one validator over a payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardrailFinding {
    pub validator: String,
    pub severity: GuardrailSeverity,
    pub detail: String,
    /// Replacement payload when the validator rewrote it (PII redaction).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redacted_text: Option<String>,
}

impl GuardrailFinding {
    pub fn pass(validator: &str) -> Self {
        Self::new(validator, GuardrailSeverity::Pass, "ok")
    }

    pub fn warn(validator: &str, detail: impl Into<String>) -> Self {
        Self::new(validator, GuardrailSeverity::Warn, detail)
    }

    pub fn block(validator: &str, detail: impl Into<String>) -> Self {
        Self::new(validator, GuardrailSeverity::Block, detail)
    }

    fn new(validator: &str, severity: GuardrailSeverity, detail: impl Into<String>) -> Self {
        GuardrailFinding {
            validator: validator.to_string(),
            severity,
            detail: detail.into(),
            redacted_text: None,
        }
    }

    pub fn with_redaction(mut self, text: String) -> Self {
        self.redacted_text = Some(text);
        self
    }

    pub fn is_block(&self) -> bool {
        self.severity == GuardrailSeverity::Block
    }
}

// ─────────────────────────────────────────────
// Generation response
// ─────────────────────────────────────────────

/// A served answer, either live from a provider or from the fallback cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub content: String,
    /// 0–100.
    pub confidence: u8,
    pub sources: Vec<String>,
    pub provider_id: String,
    pub model_name: String,
    pub from_cache: bool,
    pub guardrail_findings: Vec<GuardrailFinding>,
}

impl GenerationResponse {
    /// Number of findings that were not a plain pass.
    pub fn flagged_findings(&self) -> usize {
        self.guardrail_findings
            .iter()
            .filter(|f| f.severity != GuardrailSeverity::Pass)
            .count()
    }
}

// ─────────────────────────────────────────────
// Governance: usage disclosures and model cards
// ─────────────────────────────────────────────

/// How much of the served output the model produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiContribution {
    Assisted,
    Partial,
    Autonomous,
}

/// Who is asking, and what they agreed to. Supplied by the session layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserContext {
    pub user_id: String,
    pub consented: bool,
    pub human_oversight: bool,
    /// Overrides the request kind's default contribution level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_contribution: Option<AiContribution>,
    pub data_used: Vec<String>,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        UserContext {
            user_id: user_id.into(),
            human_oversight: true,
            ..Default::default()
        }
    }

    pub fn with_consent(mut self, consented: bool) -> Self {
        self.consented = consented;
        self
    }
}

/// Append-only audit record: which model served which user action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageDisclosure {
    pub id: String,
    pub request_id: String,
    pub user_id: String,
    pub action_type: String,
    pub model_provider: String,
    pub model_name: String,
    /// Weak reference to a `ModelCard`, lookup only.
    pub model_card_id: Option<String>,
    pub purpose_description: String,
    pub ai_contribution: AiContribution,
    pub user_consented: bool,
    pub consented_at: Option<DateTime<Utc>>,
    pub human_oversight: bool,
    /// Fixed-point decimal string, e.g. `"0.000420"`.
    pub cost_estimate: String,
    #[serde(default)]
    pub data_used: Vec<String>,
    pub served_from_cache: bool,
    pub guardrail_finding_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle status of a model card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelCardStatus {
    Active,
    Deprecated,
}

/// Metadata describing one provider/model/version combination.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCard {
    pub id: String,
    pub model_provider: String,
    pub model_name: String,
    pub model_version: String,
    pub description: String,
    pub intended_use: String,
    pub limitations: String,
    pub status: ModelCardStatus,
    pub published_at: DateTime<Utc>,
    pub last_reviewed_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────
// Inbound chat contract (consumed by the web layer)
// ─────────────────────────────────────────────

/// An attachment as posted by the chat UI.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatAttachment {
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub content: String,
}

/// Body of the chat endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub attachments: Vec<ChatAttachment>,
}

impl From<ChatRequest> for GenerationRequest {
    fn from(chat: ChatRequest) -> Self {
        let mut request = GenerationRequest::new(chat.message);
        request.framework = chat.framework;
        request.session_id = chat.session_id;
        request.attachments = chat
            .attachments
            .into_iter()
            .map(|a| Attachment {
                name: a.name,
                mime_type: a.mime_type,
                extracted_text: a.content,
            })
            .collect();
        request
    }
}

/// Response body of the chat endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub content: String,
    pub confidence: u8,
    pub sources: Vec<String>,
    pub suggestions: Vec<String>,
    pub follow_up_questions: Vec<String>,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_message_serialization() {
        let json = serde_json::to_value(Message::user("Hello")).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "Hello");
    }

    #[test]
    fn test_completion_response_first_choice() {
        let raw = json!({
            "id": "chatcmpl-1",
            "choices": [
                { "message": { "content": "first" }, "finish_reason": "stop" },
                { "message": { "content": "second" }, "finish_reason": "stop" }
            ],
            "usage": null
        });
        let resp: ChatCompletionResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(resp.into_text().as_deref(), Some("first"));
    }

    #[test]
    fn test_completion_response_no_choices() {
        let raw = json!({ "id": null, "choices": [], "usage": null });
        let resp: ChatCompletionResponse = serde_json::from_value(raw).unwrap();
        assert!(resp.into_text().is_none());
    }

    #[test]
    fn test_request_builder() {
        let req = GenerationRequest::new("draft a policy")
            .with_id("req-1")
            .with_framework("iso27001")
            .with_kind(GenerationKind::DocumentDraft);
        assert_eq!(req.id, "req-1");
        assert_eq!(req.framework.as_deref(), Some("iso27001"));
        assert_eq!(req.kind.action_type(), "document_generation");
        assert!(!req.cancel.is_cancelled());
    }

    #[test]
    fn test_fresh_requests_get_distinct_ids() {
        let a = GenerationRequest::new("x");
        let b = GenerationRequest::new("x");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_kind_default_contribution() {
        assert_eq!(
            GenerationKind::Chat.default_contribution(),
            AiContribution::Assisted
        );
        assert_eq!(
            GenerationKind::RiskAnalysis.default_contribution(),
            AiContribution::Partial
        );
    }

    #[test]
    fn test_severity_ordering() {
        assert!(GuardrailSeverity::Block > GuardrailSeverity::Warn);
        assert!(GuardrailSeverity::Warn > GuardrailSeverity::Pass);
        let json = serde_json::to_value(GuardrailSeverity::Block).unwrap();
        assert_eq!(json, "BLOCK");
    }

    #[test]
    fn test_chat_request_conversion() {
        let chat: ChatRequest = serde_json::from_value(json!({
            "message": "summarize this",
            "framework": "soc2",
            "attachments": [
                { "name": "policy.pdf", "type": "application/pdf", "content": "Access is reviewed." }
            ]
        }))
        .unwrap();

        let req: GenerationRequest = chat.into();
        assert_eq!(req.prompt, "summarize this");
        assert_eq!(req.framework.as_deref(), Some("soc2"));
        assert_eq!(req.kind, GenerationKind::Chat);
        assert_eq!(req.attachments.len(), 1);
        assert_eq!(req.attachments[0].mime_type, "application/pdf");
        assert_eq!(req.attachments[0].extracted_text, "Access is reviewed.");
    }

    #[test]
    fn test_chat_reply_uses_camel_case() {
        let reply = ChatReply {
            content: "ok".into(),
            confidence: 80,
            sources: vec![],
            suggestions: vec![],
            follow_up_questions: vec!["next?".into()],
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["followUpQuestions"][0], "next?");
    }

    #[test]
    fn test_disclosure_consent_serializes_null() {
        let d = UsageDisclosure {
            id: "d1".into(),
            request_id: "r1".into(),
            user_id: "u1".into(),
            action_type: "chat".into(),
            model_provider: "A".into(),
            model_name: "gpt-4o".into(),
            model_card_id: None,
            purpose_description: "chat".into(),
            ai_contribution: AiContribution::Assisted,
            user_consented: false,
            consented_at: None,
            human_oversight: true,
            cost_estimate: "0.000000".into(),
            data_used: vec![],
            served_from_cache: false,
            guardrail_finding_count: 0,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&d).unwrap();
        assert!(json["consentedAt"].is_null());
        assert!(json["modelCardId"].is_null());
        assert_eq!(json["aiContribution"], "assisted");
    }
}
