//! Provider orchestration and resilience for Vigil.
//!
//! # Architecture
//!
//! - [`breaker::CircuitBreaker`]: per-provider Closed/Open/Half-Open state machine
//! - [`guardrails::GuardrailsPipeline`]: ordered input/candidate/output validators
//! - [`cache::ResponseCache`]: last-known-good fallback, TTL + LRU
//! - [`router::ProviderRouter`]: sequential fallback chain across providers
//! - [`disclosure::DisclosureRecorder`]: one audit record per served response
//! - [`orchestrator::Orchestrator`]: the façade callers use

pub mod breaker;
pub mod cache;
pub mod disclosure;
pub mod frameworks;
pub mod guardrails;
pub mod orchestrator;
pub mod router;
pub mod store;

// Re-export main types for convenience
pub use breaker::{BreakerPermit, BreakerSnapshot, BreakerState, CircuitBreaker};
pub use cache::{fingerprint, ResponseCache};
pub use disclosure::DisclosureRecorder;
pub use frameworks::{find_framework, FrameworkSpec, FRAMEWORKS};
pub use guardrails::{Guardrail, GuardrailStage, GuardrailsPipeline};
pub use orchestrator::Orchestrator;
pub use router::ProviderRouter;
pub use store::{
    DisclosureStore, InMemoryDisclosureStore, InMemoryModelCardStore, JsonModelCardStore,
    JsonlDisclosureStore, ModelCardStore,
};
