//! Provider Router
//!
//! Orders the configured chat providers (the configured default first,
//! then the rest in registration order) and tries them in turn with a
//! per-attempt timeout. The loop sees a single `call` surface and does
//! not care which provider answered; the provider name is returned
//! alongside the turn for logging.

use super::{ChatProvider, LLMError, Message, ModelTurn, ToolSpec};
use std::time::Duration;

pub struct ProviderRouter {
    /// Available chat providers
    providers: Vec<Box<dyn ChatProvider>>,

    /// Name of the provider to try first
    default_provider: String,

    /// Per-attempt timeout
    attempt_timeout: Duration,
}

impl ProviderRouter {
    /// Create a new provider router
    ///
    /// # Arguments
    /// * `providers` - List of available chat providers
    /// * `default_provider` - Name of the provider to try first
    /// * `timeout_secs` - Per-attempt timeout in seconds
    pub fn new(
        providers: Vec<Box<dyn ChatProvider>>,
        default_provider: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            providers,
            default_provider: default_provider.into(),
            attempt_timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Providers in attempt order: the configured default first, then
    /// the rest in registration order.
    fn ordered(&self) -> Vec<&dyn ChatProvider> {
        let mut ordered: Vec<&dyn ChatProvider> =
            self.providers.iter().map(|b| b.as_ref()).collect();
        ordered.sort_by_key(|p| p.name() != self.default_provider);
        ordered
    }

    /// Call the chat providers with automatic failover
    ///
    /// Each provider gets one attempt under the configured timeout. The
    /// first success wins; if every provider fails the router reports
    /// `ProviderUnavailable`.
    pub async fn call(
        &self,
        system: &str,
        tools: &[ToolSpec],
        messages: &[Message],
    ) -> super::Result<(ModelTurn, String)> {
        if self.providers.is_empty() {
            return Err(LLMError::ProviderUnavailable(
                "No chat providers configured".to_string(),
            ));
        }

        for provider in self.ordered() {
            tracing::debug!(
                "Attempting provider: {} (timeout: {:?})",
                provider.name(),
                self.attempt_timeout
            );

            let result = tokio::time::timeout(
                self.attempt_timeout,
                provider.generate(system, tools, messages),
            )
            .await;

            match result {
                Ok(Ok(turn)) => {
                    tracing::debug!("Provider {} succeeded", provider.name());
                    return Ok((turn, provider.name().to_string()));
                }
                Ok(Err(e)) => {
                    tracing::warn!("Provider {} failed: {}", provider.name(), e);
                }
                Err(_) => {
                    tracing::warn!(
                        "Provider {} timed out after {:?}",
                        provider.name(),
                        self.attempt_timeout
                    );
                }
            }
        }

        tracing::error!("All chat providers exhausted");
        Err(LLMError::ProviderUnavailable(
            "All chat providers failed".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Result;
    use async_trait::async_trait;

    struct MockProvider {
        name: String,
        fail: bool,
    }

    #[async_trait]
    impl ChatProvider for MockProvider {
        fn name(&self) -> &str {
            &self.name
        }

        async fn generate(
            &self,
            _system: &str,
            _tools: &[ToolSpec],
            _messages: &[Message],
        ) -> Result<ModelTurn> {
            if self.fail {
                Err(LLMError::NetworkError("connection refused".to_string()))
            } else {
                Ok(ModelTurn::answer(format!("answer from {}", self.name)))
            }
        }
    }

    fn provider(name: &str, fail: bool) -> Box<dyn ChatProvider> {
        Box::new(MockProvider {
            name: name.to_string(),
            fail,
        })
    }

    #[tokio::test]
    async fn test_default_provider_tried_first() {
        let router = ProviderRouter::new(
            vec![provider("gemini", false), provider("openai", false)],
            "openai",
            5,
        );

        let (turn, name) = router.call("sys", &[], &[Message::user("hi")]).await.unwrap();
        assert_eq!(name, "openai");
        assert_eq!(turn.text.unwrap(), "answer from openai");
    }

    #[tokio::test]
    async fn test_failover_to_secondary() {
        let router = ProviderRouter::new(
            vec![provider("gemini", true), provider("openai", false)],
            "gemini",
            5,
        );

        let (_, name) = router.call("sys", &[], &[Message::user("hi")]).await.unwrap();
        assert_eq!(name, "openai");
    }

    #[tokio::test]
    async fn test_all_providers_failing() {
        let router = ProviderRouter::new(
            vec![provider("gemini", true), provider("openai", true)],
            "gemini",
            5,
        );

        let err = router.call("sys", &[], &[]).await.unwrap_err();
        match err {
            LLMError::ProviderUnavailable(msg) => {
                assert!(msg.contains("All chat providers failed"));
            }
            other => panic!("Expected ProviderUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_providers_configured() {
        let router = ProviderRouter::new(vec![], "gemini", 5);
        assert!(router.call("sys", &[], &[]).await.is_err());
    }
}
