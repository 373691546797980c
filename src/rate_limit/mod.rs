//! Per-client request-rate governance.
//!
//! Ceilings are enforced over sliding windows keyed by client identity (the
//! remote IP address). Idle identities are evicted by a background sweeper.

pub mod governor;
pub mod sweeper;

pub use governor::{Admission, RateGovernor, WindowLimit};
pub use sweeper::RateLimitSweeper;

use std::fmt;

use serde::Serialize;

/// Rate-limited endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `POST /api/chat`.
    Chat,
    /// `POST /api/generate-conclusion`.
    Conclusion,
}

/// One of the overlapping rate windows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    /// Rolling 24 hours, all endpoints.
    Daily,
    /// Rolling hour, all endpoints.
    Hourly,
    /// Rolling minute, chat only.
    ChatPerMinute,
    /// Rolling minute, conclusions only.
    ConclusionPerMinute,
}

impl WindowKind {
    /// Stable label for logs and payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Hourly => "hourly",
            Self::ChatPerMinute => "chat_per_minute",
            Self::ConclusionPerMinute => "conclusion_per_minute",
        }
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
