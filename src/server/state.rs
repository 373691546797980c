//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::config::{AppConfig, ConfigError};
use crate::discussion::{DiscussionService, PromptComposer};
use crate::error::FacilitatorResult;
use crate::llm::{CompletionGateway, CompletionProvider, CredentialPool, OpenRouterClient};
use crate::rate_limit::RateGovernor;

/// Shared application state.
pub struct AppState {
    /// Facilitation and conclusion use cases.
    pub service: DiscussionService,
    /// Per-client rate governor.
    pub governor: Arc<RateGovernor>,
    /// Site name reported by the health check.
    pub site_name: String,
}

impl AppState {
    /// Assemble state from already-built parts.
    #[must_use]
    pub fn new(
        service: DiscussionService,
        governor: Arc<RateGovernor>,
        site_name: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            service,
            governor,
            site_name: site_name.into(),
        })
    }

    /// Build state from configuration using the `OpenRouter` client.
    ///
    /// # Errors
    /// Returns an error if no credential is configured or the HTTP client
    /// cannot be created.
    pub fn from_config(config: &AppConfig) -> FacilitatorResult<Arc<Self>> {
        let client = OpenRouterClient::new(&config.provider)
            .map_err(|e| ConfigError::Invalid(format!("failed to create provider client: {e}")))?;
        tracing::info!(endpoint = client.endpoint(), "Provider endpoint");

        Self::with_provider(config, Arc::new(client))
    }

    /// Build state from configuration with an explicit provider.
    ///
    /// # Errors
    /// Returns an error if no credential is configured.
    pub fn with_provider(
        config: &AppConfig,
        provider: Arc<dyn CompletionProvider>,
    ) -> FacilitatorResult<Arc<Self>> {
        let pool = CredentialPool::from_keys(&config.provider.api_keys)?;
        tracing::info!(credentials = pool.len(), "Loaded provider credentials");

        let gateway = CompletionGateway::new(Arc::new(pool), provider);
        let composer = PromptComposer::new(&config.provider.model, config.prompt.clone());
        let governor = Arc::new(RateGovernor::new(&config.rate_limit));

        Ok(Self::new(
            DiscussionService::new(composer, gateway),
            governor,
            &config.provider.site_name,
        ))
    }
}
