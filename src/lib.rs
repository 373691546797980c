//! Server-side mediator between a discussion platform and a hosted LLM provider.

// Forbid dangerous or non-idiomatic practices
#![deny(warnings)] // Every warning is an error
#![deny(unsafe_code)] // No unsafe code
#![deny(missing_docs)] // Every public item must be documented
#![deny(dead_code)] // No unused code
#![deny(non_camel_case_types)] // Types follow CamelCase
#![deny(unused_imports)]
#![deny(unused_variables)]
#![deny(unused_must_use)] // Results and Options must be handled
#![deny(non_snake_case)] // Variables and functions in snake_case
#![deny(non_upper_case_globals)] // Constants and globals in UPPER_CASE
#![deny(nonstandard_style)]
#![forbid(unsafe_op_in_unsafe_fn)]

// Clippy discipline
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
#![deny(clippy::unwrap_used)] // No unwrap()
#![deny(clippy::expect_used)] // No expect()
#![deny(clippy::panic)] // No panic!()
#![deny(clippy::print_stdout)] // No println!() in production
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::missing_const_for_fn)] // const wherever possible
#![deny(clippy::unwrap_in_result)]
#![deny(clippy::module_inception)]
#![deny(clippy::redundant_clone)]
#![deny(clippy::shadow_unrelated)]
#![deny(clippy::too_many_arguments)]
#![deny(clippy::cognitive_complexity)]
#![deny(overflowing_literals)]

/// Process configuration loaded from the environment.
pub mod config;
/// Prompt composition, request validation and conclusion handling.
#[allow(clippy::module_name_repetitions)]
pub mod discussion;
/// Error taxonomy returned to callers.
pub mod error;
/// Completion provider access with credential failover.
pub mod llm;
/// Per-client request-rate governance.
pub mod rate_limit;
/// HTTP server and API routes.
#[allow(
    clippy::missing_errors_doc,
    clippy::missing_const_for_fn,
    clippy::unused_async
)]
pub mod server;
/// Entry helpers to start the facilitator server.
pub mod start_facilitator;

pub use error::{FacilitatorError, FacilitatorResult};
