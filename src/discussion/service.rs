//! Facilitation and conclusion use cases.

use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

use super::conclusion::{self, ConclusionSections};
use super::prompt::{Mode, PromptComposer};
use super::request::DiscussionRequest;
use crate::error::{FacilitatorError, FacilitatorResult};
use crate::llm::CompletionGateway;

/// A validated conclusion and its parsed structure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conclusion {
    /// Raw markdown returned by the model.
    pub text: String,
    /// Parsed sections.
    pub sections: ConclusionSections,
}

/// Validates requests, composes prompts and runs them through the gateway.
pub struct DiscussionService {
    composer: PromptComposer,
    gateway: CompletionGateway,
}

impl DiscussionService {
    /// Create the service.
    #[must_use]
    pub const fn new(composer: PromptComposer, gateway: CompletionGateway) -> Self {
        Self { composer, gateway }
    }

    /// Model identifier sent to the provider.
    #[must_use]
    pub fn model(&self) -> &str {
        self.composer.model()
    }

    /// Number of usable provider credentials.
    #[must_use]
    pub fn available_keys(&self) -> usize {
        self.gateway.pool().len()
    }

    /// Produce a facilitation reply for the transcript.
    ///
    /// # Errors
    /// Returns `InvalidRequest` for a malformed request or
    /// `ProviderExhausted` if no credential succeeded.
    pub async fn facilitate(&self, request: &DiscussionRequest) -> FacilitatorResult<String> {
        request.validate(Mode::Facilitate)?;

        let span = info_span!("facilitate", request_id = %Uuid::new_v4());
        async {
            let composed = self.composer.compose(Mode::Facilitate, &request.title, None);
            debug!(messages = request.messages.len(), "Requesting facilitation reply");

            let result = self
                .gateway
                .complete(&request.messages, &composed.system_prompt, &composed.params)
                .await?;
            Ok::<_, FacilitatorError>(result.content)
        }
        .instrument(span)
        .await
    }

    /// Produce a structured conclusion for the transcript.
    ///
    /// # Errors
    /// Returns `InvalidRequest` for a malformed or too-short request,
    /// `ProviderExhausted` if no credential succeeded, or
    /// `StructuralValidationFailed` if the reply misses a required section.
    pub async fn conclude(&self, request: &DiscussionRequest) -> FacilitatorResult<Conclusion> {
        request.validate(Mode::Conclude)?;

        let span = info_span!("conclude", request_id = %Uuid::new_v4());
        async {
            let composed = self.composer.compose(
                Mode::Conclude,
                &request.title,
                request.focus_areas.as_deref(),
            );
            debug!(messages = request.messages.len(), "Requesting conclusion");

            let result = self
                .gateway
                .complete(&request.messages, &composed.system_prompt, &composed.params)
                .await?;

            if let Err(err) = conclusion::validate(&result.content) {
                warn!(error = %err, "Conclusion failed structural validation");
                return Err(err);
            }

            let sections = conclusion::parse(&result.content);
            Ok::<_, FacilitatorError>(Conclusion {
                text: result.content,
                sections,
            })
        }
        .instrument(span)
        .await
    }
}
