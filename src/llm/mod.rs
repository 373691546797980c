//! Completion provider access with ordered credential failover.
//!
//! - `credentials`: the static, ordered key pool
//! - `provider`: the per-credential transport trait
//! - `openrouter`: the HTTP implementation of that trait
//! - `gateway`: one logical completion across the whole pool

pub mod credentials;
pub mod error;
pub mod gateway;
pub mod openrouter;
pub mod provider;
pub mod types;

pub use credentials::{Credential, CredentialPool};
pub use error::ProviderError;
pub use gateway::{CompletionGateway, FailoverOutcome};
pub use openrouter::OpenRouterClient;
pub use provider::CompletionProvider;
pub use types::{CompletionRequest, CompletionResult, GenerationParams, Message, Role};
