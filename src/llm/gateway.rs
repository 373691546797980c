//! Credential failover over a single completion provider.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::credentials::CredentialPool;
use super::error::ProviderError;
use super::provider::CompletionProvider;
use super::types::{CompletionRequest, CompletionResult, GenerationParams, Message};
use crate::error::{FacilitatorError, FacilitatorResult};

/// Result of one pass over the credential pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailoverOutcome {
    /// A credential produced non-blank content.
    Success(CompletionResult),
    /// Every credential was tried and none succeeded.
    Exhausted {
        /// Number of credentials tried.
        attempts: usize,
    },
}

/// Issues logical completion requests against an ordered credential pool.
///
/// Credentials are tried strictly one after another in pool order, one
/// attempt each. The first credential returning non-blank content wins.
pub struct CompletionGateway {
    pool: Arc<CredentialPool>,
    provider: Arc<dyn CompletionProvider>,
}

impl CompletionGateway {
    /// Create a gateway over a pool and provider.
    #[must_use]
    pub fn new(pool: Arc<CredentialPool>, provider: Arc<dyn CompletionProvider>) -> Self {
        Self { pool, provider }
    }

    /// Credential pool backing this gateway.
    #[must_use]
    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    /// Run one failover pass and report the tagged outcome.
    pub async fn try_complete(
        &self,
        messages: &[Message],
        system_prompt: &str,
        params: &GenerationParams,
    ) -> FailoverOutcome {
        let request = CompletionRequest {
            system_prompt,
            messages,
            params,
        };
        let mut attempts = 0;

        for credential in self.pool.iter() {
            attempts += 1;
            debug!(
                provider = self.provider.name(),
                credential = credential.ordinal(),
                "Attempting completion"
            );

            let reply = self.provider.complete(credential, request).await;
            if let Some(content) = usable_content(credential.ordinal(), reply) {
                info!(
                    credential = credential.ordinal(),
                    attempts, "Completion succeeded"
                );
                return FailoverOutcome::Success(CompletionResult {
                    content,
                    credential: credential.ordinal(),
                    attempts,
                });
            }
        }

        error!(attempts, "All credentials failed");
        FailoverOutcome::Exhausted { attempts }
    }

    /// Complete a request, surfacing pool exhaustion as an error.
    ///
    /// # Errors
    /// Returns `FacilitatorError::ProviderExhausted` if no credential succeeded.
    pub async fn complete(
        &self,
        messages: &[Message],
        system_prompt: &str,
        params: &GenerationParams,
    ) -> FacilitatorResult<CompletionResult> {
        match self.try_complete(messages, system_prompt, params).await {
            FailoverOutcome::Success(result) => Ok(result),
            FailoverOutcome::Exhausted { attempts } => {
                Err(FacilitatorError::ProviderExhausted { attempts })
            }
        }
    }
}

/// Keep non-blank content; log anything else as a failed attempt.
fn usable_content(ordinal: usize, reply: Result<String, ProviderError>) -> Option<String> {
    let err = match reply {
        Ok(content) if !content.trim().is_empty() => return Some(content),
        Ok(_) => ProviderError::EmptyContent,
        Err(err) => err,
    };
    warn!(credential = ordinal, error = %err, "Credential failed, trying next credential");
    None
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::llm::credentials::Credential;
    use crate::llm::error::ProviderError;
    use crate::llm::provider::CompletionProvider;
    use crate::llm::types::CompletionRequest;

    /// Scripted reply for one credential key.
    #[derive(Clone)]
    pub enum Scripted {
        Reply(String),
        Status(u16),
        Malformed,
        Timeout,
    }

    /// In-memory provider replaying scripted replies per key.
    #[derive(Default)]
    pub struct ScriptedProvider {
        replies: HashMap<String, Scripted>,
        calls: Mutex<Vec<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(mut self, key: &str, reply: Scripted) -> Self {
            self.replies.insert(key.to_string(), reply);
            self
        }

        pub fn reply(self, key: &str, text: &str) -> Self {
            self.with(key, Scripted::Reply(text.to_string()))
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn complete(
            &self,
            credential: &Credential,
            request: CompletionRequest<'_>,
        ) -> Result<String, ProviderError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(credential.key().to_string());
            }
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(request.system_prompt.to_string());
            }
            match self.replies.get(credential.key()) {
                Some(Scripted::Reply(text)) => Ok(text.clone()),
                Some(Scripted::Status(status)) => Err(ProviderError::Status {
                    status: *status,
                    body: String::new(),
                }),
                Some(Scripted::Malformed) => {
                    Err(ProviderError::MalformedPayload("no choices".to_string()))
                }
                Some(Scripted::Timeout) | None => Err(ProviderError::Timeout),
            }
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }
}
