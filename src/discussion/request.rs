//! Inbound discussion request and its shape validation.

use serde::{Deserialize, Serialize};

use super::prompt::Mode;
use crate::error::{FacilitatorError, FacilitatorResult};
use crate::llm::Message;

/// Shortest accepted title, in characters after trimming.
pub const MIN_TITLE_CHARS: usize = 2;
/// Longest accepted title, in characters after trimming.
pub const MAX_TITLE_CHARS: usize = 100;
/// Transcript length needed before a conclusion can be generated.
pub const MIN_CONCLUSION_MESSAGES: usize = 3;

/// Transcript plus topic, as posted by the discussion client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionRequest {
    /// Transcript in conversational order.
    pub messages: Vec<Message>,
    /// Discussion title or topic.
    #[serde(rename = "discussionTitle", alias = "discussion_topic", alias = "discussionTopic")]
    pub title: String,
    /// Optional caller-supplied user identifier.
    #[serde(default, rename = "userId", alias = "user_id", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Optional areas to emphasise in a conclusion.
    #[serde(
        default,
        rename = "focusAreas",
        alias = "focus_areas",
        skip_serializing_if = "Option::is_none"
    )]
    pub focus_areas: Option<Vec<String>>,
}

impl DiscussionRequest {
    /// Build a request with only a transcript and title.
    #[must_use]
    pub fn new(messages: Vec<Message>, title: impl Into<String>) -> Self {
        Self {
            messages,
            title: title.into(),
            user_id: None,
            focus_areas: None,
        }
    }

    /// Attach focus areas.
    #[must_use]
    pub fn with_focus_areas<I, S>(mut self, areas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.focus_areas = Some(areas.into_iter().map(Into::into).collect());
        self
    }

    /// Check the request shape for `mode`.
    ///
    /// # Errors
    /// Returns `FacilitatorError::InvalidRequest` describing the first
    /// violated rule.
    pub fn validate(&self, mode: Mode) -> FacilitatorResult<()> {
        if self.messages.is_empty() {
            return Err(invalid("messages must contain at least one message"));
        }

        if let Some(index) = self.messages.iter().position(|m| m.content.trim().is_empty()) {
            return Err(invalid(format!("message {index} has empty content")));
        }

        let title_chars = self.title.trim().chars().count();
        if !(MIN_TITLE_CHARS..=MAX_TITLE_CHARS).contains(&title_chars) {
            return Err(invalid(format!(
                "discussion title must be between {MIN_TITLE_CHARS} and {MAX_TITLE_CHARS} characters"
            )));
        }

        if self.user_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return Err(invalid("userId must not be empty"));
        }

        if self
            .focus_areas
            .as_deref()
            .is_some_and(|areas| areas.is_empty() || areas.iter().any(|a| a.trim().is_empty()))
        {
            return Err(invalid("focusAreas must contain at least one non-empty entry"));
        }

        if mode == Mode::Conclude && self.messages.len() < MIN_CONCLUSION_MESSAGES {
            return Err(invalid(format!(
                "insufficient transcript: at least {MIN_CONCLUSION_MESSAGES} messages are required to generate a conclusion"
            )));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> FacilitatorError {
    FacilitatorError::InvalidRequest(message.into())
}
