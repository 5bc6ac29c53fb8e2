//! Error types for the Kaskada sync tooling.
//!
//! This module provides the error hierarchy for every phase of a sync run:
//! reading the spec file, talking to the Kaskada API, planning, and applying.

use std::path::PathBuf;
use thiserror::Error;

use crate::resource::ResourceRef;

/// The main error type for the Kaskada sync tooling.
#[derive(Debug, Error)]
pub enum KaskadaError {
    /// The sync spec file could not be read, parsed or validated.
    #[error("Spec error: {0}")]
    Spec(#[from] SpecError),

    /// Invalid command-line or environment settings.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Looking up the live version of a resource failed while planning.
    #[error("Failed to fetch {target} from the system: {source}")]
    Fetch {
        /// The resource (or `kind=... inventory`) that could not be fetched.
        target: String,
        /// Underlying API error.
        #[source]
        source: ApiError,
    },

    /// Kaskada API errors outside of planning.
    #[error("Kaskada API error: {0}")]
    Api(#[from] ApiError),

    /// Planning errors.
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    /// Apply errors.
    #[error("Apply error: {0}")]
    Apply(#[from] ApplyError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while loading the declarative sync spec.
#[derive(Debug, Error)]
pub enum SpecError {
    /// The spec file was not found.
    #[error("Spec file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The spec file could not be parsed.
    #[error("Failed to parse spec: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Spec validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// The same resource was declared twice.
    #[error("Duplicate {kind} name: {name}")]
    DuplicateName {
        /// Kind of resource (table, view, materialization).
        kind: String,
        /// The duplicated name.
        name: String,
    },
}

/// Invalid settings supplied on the command line or through the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The API endpoint is not a usable URL.
    #[error("Invalid endpoint '{endpoint}': {message}")]
    InvalidEndpoint {
        /// The endpoint as given.
        endpoint: String,
        /// Why it was rejected.
        message: String,
    },

    /// A numeric setting is out of range.
    #[error("Invalid value for {name}: {message}")]
    InvalidValue {
        /// Name of the setting.
        name: String,
        /// Why it was rejected.
        message: String,
    },

    /// The .env file exists but could not be loaded.
    #[error("Failed to load environment file {path}: {message}")]
    DotEnv {
        /// Path of the .env file.
        path: PathBuf,
        /// Loader message.
        message: String,
    },
}

/// Kaskada API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Authentication failed.
    #[error("authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// API request failed.
    #[error("request failed: {status} - {message}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Rate limited.
    #[error("rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Network error.
    #[error("network error: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from the API.
    #[error("invalid response: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Planning errors.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Planned creates/replaces reference each other in a loop.
    #[error("dependency cycle between {}", format_members(.members))]
    Cycle {
        /// Members of the cycle, in reference order.
        members: Vec<ResourceRef>,
    },
}

/// Apply errors.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// A create/replace/delete call failed; remaining actions were not run.
    #[error(
        "{action} failed: {reason} (completed before failure: {})",
        format_succeeded(.succeeded)
    )]
    MutationFailed {
        /// Description of the failed action.
        action: String,
        /// Error returned by the API.
        reason: String,
        /// Actions that were applied before the failure.
        succeeded: Vec<String>,
    },

    /// The plan was computed against a different spec than the one being applied.
    #[error("plan fingerprint mismatch: expected {expected}, found {found}")]
    FingerprintMismatch {
        /// Fingerprint the caller expected.
        expected: String,
        /// Fingerprint of the plan at hand.
        found: String,
    },
}

fn format_members(members: &[ResourceRef]) -> String {
    members
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn format_succeeded(succeeded: &[String]) -> String {
    if succeeded.is_empty() {
        String::from("none")
    } else {
        succeeded.join(", ")
    }
}

/// Result type alias for Kaskada sync operations.
pub type Result<T> = std::result::Result<T, KaskadaError>;

impl KaskadaError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Wraps an API error raised while fetching `target`.
    #[must_use]
    pub fn fetch(target: impl Into<String>, source: ApiError) -> Self {
        Self::Fetch {
            target: target.into(),
            source,
        }
    }
}

impl SpecError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a parse error with an optional source location.
    #[must_use]
    pub fn parse(message: impl Into<String>, location: Option<String>) -> Self {
        Self::ParseError {
            message: message.into(),
            location,
        }
    }
}

impl ApiError {
    /// Creates a request error.
    #[must_use]
    pub fn request(status: u16, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Returns true if this error is worth retrying.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::NetworkError { .. } => true,
            Self::RequestFailed { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns the suggested retry delay in seconds, if applicable.
    #[must_use]
    pub const fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            Self::NetworkError { .. } | Self::RequestFailed { .. } => Some(1),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceKind;

    #[test]
    fn test_cycle_lists_members_in_order() {
        let err = PlanError::Cycle {
            members: vec![
                ResourceRef::new(ResourceKind::View, "a"),
                ResourceRef::new(ResourceKind::View, "b"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "dependency cycle between kind=*kaskadav1alpha.View name=a -> kind=*kaskadav1alpha.View name=b"
        );
    }

    #[test]
    fn test_mutation_failed_reports_progress() {
        let err = ApplyError::MutationFailed {
            action: String::from("create kind=*kaskadav1alpha.View name=v"),
            reason: String::from("boom"),
            succeeded: vec![],
        };
        assert!(err.to_string().ends_with("(completed before failure: none)"));
    }

    #[test]
    fn test_retryable() {
        assert!(ApiError::network("reset").is_retryable());
        assert!(ApiError::request(503, "unavailable").is_retryable());
        assert!(!ApiError::request(400, "bad").is_retryable());
        assert!(
            !ApiError::AuthenticationFailed {
                message: String::from("no")
            }
            .is_retryable()
        );
    }
}
