//! Wire-level types shared by the completion provider and gateway.

use serde::{Deserialize, Serialize};

/// Role of a transcript message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// System instruction.
    System,
    /// Participant input.
    User,
    /// Model reply.
    Assistant,
}

impl Role {
    /// Stable string form used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single message of a discussion transcript.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who authored the message.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl Message {
    /// Build a message with an explicit role.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Build a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Build an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Sampling parameters sent with every completion call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Provider model identifier.
    pub model: String,
    /// Sampling temperature, `0.0..=2.0`.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Nucleus sampling, `0.0..=1.0`.
    pub top_p: f32,
    /// Penalty for repeated tokens.
    pub frequency_penalty: f32,
    /// Penalty for already-present topics.
    pub presence_penalty: f32,
}

/// Borrowed view of one logical completion request.
#[derive(Clone, Copy, Debug)]
pub struct CompletionRequest<'a> {
    /// Composed system prompt, sent ahead of the transcript.
    pub system_prompt: &'a str,
    /// Transcript in conversational order.
    pub messages: &'a [Message],
    /// Sampling parameters.
    pub params: &'a GenerationParams,
}

/// Successful reply from the provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompletionResult {
    /// Non-blank reply text.
    pub content: String,
    /// Ordinal of the credential that served the request.
    pub credential: usize,
    /// Number of credentials tried, including the successful one.
    pub attempts: usize,
}
