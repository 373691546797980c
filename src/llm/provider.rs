//! Transport seam between the gateway and a concrete provider.

use async_trait::async_trait;

use super::credentials::Credential;
use super::error::ProviderError;
use super::types::CompletionRequest;

/// One completion exchange with the provider using one credential.
///
/// Implementations must bound each call with a finite timeout and must not
/// retry internally; failover across credentials belongs to the gateway.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send the request and return the raw reply content.
    ///
    /// # Errors
    /// Returns a `ProviderError` describing why this credential failed.
    async fn complete(
        &self,
        credential: &Credential,
        request: CompletionRequest<'_>,
    ) -> Result<String, ProviderError>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}
