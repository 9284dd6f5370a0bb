//! Provider registry.
//!
//! The gateway talks to exactly one configured LLM endpoint, shared by the
//! planner, the executor sub-agent, and the replanner (C8). The registry's
//! job is limited to constructing that one adapter from [`LlmConfig`] at
//! startup so callers depend on [`LlmProvider`] rather than the concrete
//! `OpenAiCompatProvider` type.

use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::LlmProvider;
use dbmcp_domain::config::LlmConfig;
use dbmcp_domain::error::Result;
use std::sync::Arc;

pub struct ProviderRegistry {
    provider: Arc<dyn LlmProvider>,
}

impl ProviderRegistry {
    /// Build the registry from the application's [`LlmConfig`].
    ///
    /// Resolves the API key eagerly; returns an error if the configured
    /// env var is unset so the gateway fails fast at startup rather than on
    /// the first `data_agent` call.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let provider = OpenAiCompatProvider::from_config(config)?;
        tracing::info!(model = %config.model, base_url = %config.base_url, "registered LLM provider");
        Ok(Self {
            provider: Arc::new(provider),
        })
    }

    /// The single configured provider.
    pub fn provider(&self) -> Arc<dyn LlmProvider> {
        self.provider.clone()
    }
}
