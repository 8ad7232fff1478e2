//! LLM Router
//!
//! Holds the configured providers and tries them in rank order until one
//! answers. The configured default provider always goes first; the rest are
//! ordered local-before-cloud, then by estimated cost.
//!
//! The router is the engine's implementation of the sdk `LanguageModel`
//! capability, so the conversation core never sees individual providers.

use super::{LLMError, LLMProvider, Message};
use async_trait::async_trait;
use sdk::capabilities::{CapabilityError, LanguageModel};
use std::time::Duration;

/// Timeout for local providers (model loading + generation)
const LOCAL_TIMEOUT_SECS: u64 = 120;

/// Timeout for cloud providers
const CLOUD_TIMEOUT_SECS: u64 = 30;

/// LLM Router that fails over between providers
pub struct LLMRouter {
    /// Available LLM providers
    providers: Vec<Box<dyn LLMProvider>>,

    /// Name of the provider to try first
    default_provider: String,
}

impl LLMRouter {
    /// Create a new LLM router
    ///
    /// # Arguments
    /// * `providers` - List of available LLM providers
    /// * `default_provider` - Provider name to prefer (e.g. "ollama")
    pub fn new(providers: Vec<Box<dyn LLMProvider>>, default_provider: impl Into<String>) -> Self {
        Self {
            providers,
            default_provider: default_provider.into(),
        }
    }

    /// Names of the registered providers, in registration order
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Estimate token count for the conversation
    ///
    /// Uses a simple heuristic: ~4 characters per token
    fn estimate_tokens(messages: &[Message]) -> usize {
        let total_chars: usize = messages.iter().map(|m| m.content.len()).sum();
        total_chars / 4
    }

    /// Rank providers for a request of the given size
    ///
    /// Returns a sorted list of providers (best first): the default provider,
    /// then local providers, then the cheapest. The request size only breaks
    /// ties between providers of the same kind. The sort is stable, so equal
    /// providers keep their registration order.
    pub fn rank_providers(&self, estimated_tokens: usize) -> Vec<&dyn LLMProvider> {
        let mut providers: Vec<&dyn LLMProvider> =
            self.providers.iter().map(|b| b.as_ref()).collect();

        let is_default = |p: &dyn LLMProvider| p.name() == self.default_provider;

        providers.sort_by(|a, b| {
            is_default(*b)
                .cmp(&is_default(*a))
                .then_with(|| b.is_local().cmp(&a.is_local()))
                .then_with(|| {
                    a.estimated_cost(estimated_tokens)
                        .partial_cmp(&b.estimated_cost(estimated_tokens))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        });

        providers
    }

    /// Call LLM providers with automatic failover
    ///
    /// Returns the generated text and the name of the provider that produced it.
    pub async fn call(&self, messages: &[Message]) -> super::Result<(String, String)> {
        if self.providers.is_empty() {
            return Err(LLMError::ProviderUnavailable(
                "No LLM providers configured".to_string(),
            ));
        }

        let ranked_providers = self.rank_providers(Self::estimate_tokens(messages));
        let mut last_error = None;

        for provider in ranked_providers {
            let timeout_secs = if provider.is_local() {
                LOCAL_TIMEOUT_SECS
            } else {
                CLOUD_TIMEOUT_SECS
            };
            tracing::debug!(
                "Attempting provider: {} (timeout: {}s)",
                provider.name(),
                timeout_secs
            );

            let result = tokio::time::timeout(
                Duration::from_secs(timeout_secs),
                provider.generate(messages),
            )
            .await;

            match result {
                Ok(Ok(text)) => {
                    tracing::info!("Provider {} succeeded", provider.name());
                    return Ok((text, provider.name().to_string()));
                }
                Ok(Err(e)) => {
                    tracing::warn!("Provider {} failed: {}", provider.name(), e);
                    last_error = Some(e);
                }
                Err(_) => {
                    tracing::warn!(
                        "Provider {} timed out after {}s",
                        provider.name(),
                        timeout_secs
                    );
                    last_error = Some(LLMError::Timeout);
                }
            }
        }

        tracing::error!("All LLM providers exhausted");
        // A single provider's failure is more useful than a generic message
        match (self.providers.len(), last_error) {
            (1, Some(e)) => Err(e),
            _ => Err(LLMError::ProviderUnavailable(
                "All LLM providers failed".to_string(),
            )),
        }
    }

    /// Check the health of all registered providers
    /// Returns a list of (provider_name, is_healthy)
    pub async fn check_health(&self) -> Vec<(&str, bool)> {
        let mut results = Vec::new();
        for provider in &self.providers {
            let is_healthy = provider.check_health().await;
            results.push((provider.name(), is_healthy));
        }
        results
    }
}

#[async_trait]
impl LanguageModel for LLMRouter {
    async fn generate(&self, prompt: &str) -> Result<String, CapabilityError> {
        let (text, _provider) = self.call(&[Message::user(prompt)]).await?;
        Ok(text)
    }
}
