//! Provider capability trait.
//!
//! Every LLM backend is a value implementing [`ProviderClient`]; the router
//! iterates over a list of these instead of branching on provider identity.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use vigil_core::ProviderError;

/// Options passed to each completion call.
#[derive(Clone, Debug)]
pub struct CompletionOptions {
    /// Model identifier sent to the provider.
    pub model: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    /// Per-attempt deadline.
    pub timeout: Duration,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_tokens: 2048,
            temperature: 0.3,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Trait that all LLM providers must implement.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Send one prompt and return the generated text.
    ///
    /// Implementations should stop work promptly when `cancel` fires and
    /// report it as [`ProviderError::Cancelled`].
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
        cancel: &CancellationToken,
    ) -> Result<String, ProviderError>;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}

/// Run `client.complete` bounded by `options.timeout` and the caller's token.
///
/// Cancellation wins over a simultaneous timeout so that caller-initiated
/// aborts are never charged to the provider.
pub async fn call_with_deadline(
    client: &dyn ProviderClient,
    prompt: &str,
    options: &CompletionOptions,
    cancel: &CancellationToken,
) -> Result<String, ProviderError> {
    if cancel.is_cancelled() {
        return Err(ProviderError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ProviderError::Cancelled),
        outcome = tokio::time::timeout(options.timeout, client.complete(prompt, options, cancel)) => {
            match outcome {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(options.timeout)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowClient {
        delay: Duration,
    }

    #[async_trait]
    impl ProviderClient for SlowClient {
        async fn complete(
            &self,
            _prompt: &str,
            _options: &CompletionOptions,
            _cancel: &CancellationToken,
        ) -> Result<String, ProviderError> {
            tokio::time::sleep(self.delay).await;
            Ok("done".to_string())
        }

        fn display_name(&self) -> &str {
            "slow"
        }
    }

    fn options(timeout_ms: u64) -> CompletionOptions {
        CompletionOptions {
            timeout: Duration::from_millis(timeout_ms),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_completes_within_deadline() {
        let client = SlowClient {
            delay: Duration::from_millis(5),
        };
        let result =
            call_with_deadline(&client, "hi", &options(500), &CancellationToken::new()).await;
        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test]
    async fn test_timeout() {
        let client = SlowClient {
            delay: Duration::from_secs(5),
        };
        let result =
            call_with_deadline(&client, "hi", &options(20), &CancellationToken::new()).await;
        assert!(matches!(result, Err(ProviderError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_cancel_in_flight() {
        let client = SlowClient {
            delay: Duration::from_secs(5),
        };
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let result = call_with_deadline(&client, "hi", &options(10_000), &cancel).await;
        assert_eq!(result, Err(ProviderError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_already_cancelled_skips_call() {
        let client = SlowClient {
            delay: Duration::from_secs(5),
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = call_with_deadline(&client, "hi", &options(10_000), &cancel).await;
        assert_eq!(result, Err(ProviderError::Cancelled));
    }
}
