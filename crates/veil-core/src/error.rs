//! Unified error type for Veil operations
//!
//! A single workspace-wide error enum with constructor helpers. Retry policy
//! is driven by [`VeilError::is_transient`]: transient failures may be retried
//! against a different snode under the caller's remaining budget, terminal
//! failures must surface immediately.

use serde::{Deserialize, Serialize};

/// Unified error type for all Veil operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum VeilError {
    /// A crypto operation was handed the wrong config-object variant
    #[error("Invalid config object: {message}")]
    InvalidConfigObject {
        /// What was expected and what was supplied
        message: String,
    },

    /// Key derivation failed (malformed key length, curve failure)
    #[error("Key generation failed: {message}")]
    KeyGenerationFailed {
        /// Description of the malformed input or failure
        message: String,
    },

    /// Signature computation failed
    #[error("Signature generation failed: {message}")]
    SignatureGenerationFailed {
        /// Description of the signing failure
        message: String,
    },

    /// Sub-account token or auth-data derivation failed
    #[error("Failed to create subaccount: {message}")]
    FailedToCreateSubaccount {
        /// Description of the underlying failure
        message: String,
    },

    /// No swarm nodes could be obtained for an account
    #[error("Swarm unavailable: {message}")]
    SwarmUnavailable {
        /// Account or bootstrap context
        message: String,
    },

    /// The retry budget reached zero with no further candidate nodes
    #[error("Retry budget exhausted: {message}")]
    RetryBudgetExhausted {
        /// Operation context
        message: String,
    },

    /// An onion path could not be built (retryable, distinct from resolution)
    #[error("Path build failed: {message}")]
    PathBuildFailed {
        /// Description of the path-build failure
        message: String,
    },

    /// Malformed server response or missing required field
    #[error("Decode error: {message}")]
    Decode {
        /// Offending field or payload description
        message: String,
    },

    /// ONS lookup response could not be decrypted or parsed
    #[error("Name resolution failed: {message}")]
    NameResolution {
        /// Name or decryption context
        message: String,
    },

    /// Transport-level failure (connection reset, unreachable, 5xx)
    #[error("Network error: {message}")]
    Network {
        /// Description of the transport failure
        message: String,
    },

    /// Path-build or round-trip deadline exceeded
    #[error("Timed out: {message}")]
    Timeout {
        /// Operation that timed out
        message: String,
    },

    /// The server rejected the request terminally (auth, malformed request)
    #[error("Request rejected ({status}): {message}")]
    Rejected {
        /// HTTP-style status code reported by the server
        status: u16,
        /// Server-provided or derived description
        message: String,
    },

    /// Internal invariant violation
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error
        message: String,
    },
}

impl VeilError {
    /// Create an invalid-config-object error
    pub fn invalid_config_object(message: impl Into<String>) -> Self {
        Self::InvalidConfigObject {
            message: message.into(),
        }
    }

    /// Create a key-generation error
    pub fn key_generation_failed(message: impl Into<String>) -> Self {
        Self::KeyGenerationFailed {
            message: message.into(),
        }
    }

    /// Create a signature-generation error
    pub fn signature_generation_failed(message: impl Into<String>) -> Self {
        Self::SignatureGenerationFailed {
            message: message.into(),
        }
    }

    /// Create a subaccount-creation error
    pub fn failed_to_create_subaccount(message: impl Into<String>) -> Self {
        Self::FailedToCreateSubaccount {
            message: message.into(),
        }
    }

    /// Create a swarm-unavailable error
    pub fn swarm_unavailable(message: impl Into<String>) -> Self {
        Self::SwarmUnavailable {
            message: message.into(),
        }
    }

    /// Create a retry-budget-exhausted error
    pub fn retry_budget_exhausted(message: impl Into<String>) -> Self {
        Self::RetryBudgetExhausted {
            message: message.into(),
        }
    }

    /// Create a path-build error
    pub fn path_build_failed(message: impl Into<String>) -> Self {
        Self::PathBuildFailed {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a name-resolution error
    pub fn name_resolution(message: impl Into<String>) -> Self {
        Self::NameResolution {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a terminal rejection error
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this failure may succeed against a different snode or path.
    ///
    /// Transient failures consume retry budget; everything else terminates
    /// the logical operation immediately since a retry would repeat the same
    /// failure.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } | Self::PathBuildFailed { .. } => true,
            Self::Rejected { status, .. } => is_transient_status(*status),
            _ => false,
        }
    }
}

/// Server status codes worth retrying against another node.
///
/// 421 means the target snode no longer serves the account's swarm; 5xx
/// covers node-local overload or restart.
pub fn is_transient_status(status: u16) -> bool {
    matches!(status, 421 | 500 | 502 | 503 | 504)
}

/// Standard Result type for Veil operations
pub type Result<T> = std::result::Result<T, VeilError>;

impl From<serde_json::Error> for VeilError {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(err.to_string())
    }
}
