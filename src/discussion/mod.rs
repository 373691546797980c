//! Discussion facilitation and conclusion pipeline.
//!
//! This module provides:
//! - Request shape validation
//! - Mode-specific prompt composition with input sanitization
//! - Structural validation and parsing of generated conclusions
//! - The service tying these to the completion gateway

pub mod conclusion;
pub mod prompt;
pub mod request;
pub mod service;

pub use conclusion::{ConclusionSections, REQUIRED_SECTIONS};
pub use prompt::{ComposedPrompt, Mode, PromptComposer};
pub use request::DiscussionRequest;
pub use service::{Conclusion, DiscussionService};
