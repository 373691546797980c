//! Error taxonomy surfaced to callers of the facilitator.

use thiserror::Error;

use crate::config::ConfigError;
use crate::rate_limit::WindowKind;

/// Errors returned by the discussion service and HTTP handlers.
#[derive(Debug, Error)]
pub enum FacilitatorError {
    /// Request body is malformed or out of range.
    #[error("{0}")]
    InvalidRequest(String),

    /// A rate window for this client is full.
    #[error("rate limit exceeded for {window} window, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Window that rejected the request.
        window: WindowKind,
        /// Seconds until a slot frees up.
        retry_after_secs: u64,
    },

    /// Every configured credential failed.
    #[error("all AI services are currently unavailable ({attempts} credentials tried)")]
    ProviderExhausted {
        /// Number of credentials tried.
        attempts: usize,
    },

    /// Generated conclusion is missing required sections.
    #[error("generated conclusion is missing sections: {}", missing.join(", "))]
    StructuralValidationFailed {
        /// Section names that were not found.
        missing: Vec<String>,
    },

    /// Startup configuration problem.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl FacilitatorError {
    /// Whether the caller should try again later rather than fix the request.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::ProviderExhausted { .. }
                | Self::StructuralValidationFailed { .. }
        )
    }

    /// Seconds the caller should wait, if known.
    #[must_use]
    pub const fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimited {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// HTTP status code used when rendering this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) => 400,
            Self::RateLimited { .. } => 429,
            Self::ProviderExhausted { .. } => 503,
            Self::StructuralValidationFailed { .. } | Self::Config(_) => 500,
        }
    }
}

/// Convenience result alias for facilitator operations.
pub type FacilitatorResult<T> = Result<T, FacilitatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(!FacilitatorError::InvalidRequest("bad".to_string()).is_retryable());
        assert!(FacilitatorError::ProviderExhausted { attempts: 2 }.is_retryable());
        assert!(
            FacilitatorError::StructuralValidationFailed {
                missing: vec!["Action Plan".to_string()]
            }
            .is_retryable()
        );
        let limited = FacilitatorError::RateLimited {
            window: WindowKind::Hourly,
            retry_after_secs: 12,
        };
        assert!(limited.is_retryable());
        assert_eq!(limited.retry_after(), Some(12));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(FacilitatorError::InvalidRequest(String::new()).status_code(), 400);
        assert_eq!(
            FacilitatorError::ProviderExhausted { attempts: 1 }.status_code(),
            503
        );
        assert_eq!(
            FacilitatorError::StructuralValidationFailed { missing: vec![] }.status_code(),
            500
        );
    }

    #[test]
    fn test_structural_message_lists_sections() {
        let err = FacilitatorError::StructuralValidationFailed {
            missing: vec!["Major Insights".to_string(), "Action Plan".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "generated conclusion is missing sections: Major Insights, Action Plan"
        );
    }
}
