use thiserror::Error;

/// Detailed error type for callback action token operations
///
/// Every verification failure maps onto one of these variants so callers can
/// log the precise cause. User-facing handling should not branch on them: an
/// expired token and a forged token both end in the same "button no longer
/// valid" notice.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    // ===== Format Errors =====
    /// The wire string is not a wrapped action token
    #[error("Malformed action token: {reason}")]
    Malformed { reason: String },

    /// The version tag is not one of the known tags
    #[error("Unsupported token version: {actual}")]
    UnsupportedVersion { actual: String },

    // ===== Signature Errors =====
    /// Recomputed signature does not match the carried one
    #[error("Invalid token signature: {details}")]
    InvalidSignature { details: String },

    /// The carried signature cannot be interpreted as digest characters
    #[error("Malformed token signature: {reason}")]
    MalformedSignature { reason: String },

    /// The signing secret is unusable
    #[error("Invalid signing key: {reason}")]
    InvalidKey { reason: String },

    // ===== Expiry Errors =====
    /// Token has expired
    #[error("Token expired at {expired_at}, current time is {current_time}")]
    Expired {
        /// When the token expired (Unix timestamp)
        expired_at: i64,
        /// Current time when verification was attempted (Unix timestamp)
        current_time: i64,
    },

    /// The expiry field is missing or cannot be decoded on a token that requires one
    #[error("Invalid token expiry: {}", value.as_deref().unwrap_or("<missing>"))]
    InvalidExpiry { value: Option<String> },

    // ===== Binding Errors =====
    /// Token is bound to a different user than the one presenting it
    #[error("Binding mismatch: token bound to user '{expected}', presented by '{actual}'")]
    BindingMismatch {
        /// Encoded user carried by the token
        expected: String,
        /// Encoded user of the presser (empty when it could not be resolved)
        actual: String,
    },

    /// Token is bound but no presser identity was supplied
    #[error("Token is bound to user '{user}' but no presser identity was provided")]
    BindingRequired { user: String },

    // ===== Surrogate Errors =====
    /// No store entry backs the surrogate token
    #[error("Surrogate token '{token}' has no backing entry")]
    SurrogateNotFound { token: String },

    /// The surrogate store failed
    #[error("Surrogate store error: {reason}")]
    Store { reason: String },

    // ===== Configuration Errors =====
    /// Configuration is not usable
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // ===== Generic Errors =====
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

impl TokenError {
    // ===== Helper Methods for Common Error Checks =====

    /// Check if this error is due to token expiration
    pub fn is_expired(&self) -> bool {
        matches!(
            self,
            TokenError::Expired { .. } | TokenError::InvalidExpiry { .. }
        )
    }

    /// Check if this error is a signature/format error
    pub fn is_signature_error(&self) -> bool {
        matches!(
            self,
            TokenError::InvalidSignature { .. }
                | TokenError::MalformedSignature { .. }
                | TokenError::Malformed { .. }
                | TokenError::UnsupportedVersion { .. }
        )
    }

    /// Check if this error is due to a binding mismatch
    pub fn is_binding_mismatch(&self) -> bool {
        matches!(
            self,
            TokenError::BindingMismatch { .. } | TokenError::BindingRequired { .. }
        )
    }

    /// Get the expiration time if this is an expiration error
    pub fn get_expiration_time(&self) -> Option<i64> {
        match self {
            TokenError::Expired { expired_at, .. } => Some(*expired_at),
            _ => None,
        }
    }

    /// Short, stable label for structured logging
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::Malformed { .. } => "malformed",
            TokenError::UnsupportedVersion { .. } => "unsupported_version",
            TokenError::InvalidSignature { .. } => "invalid_signature",
            TokenError::MalformedSignature { .. } => "malformed_signature",
            TokenError::InvalidKey { .. } => "invalid_key",
            TokenError::Expired { .. } => "expired",
            TokenError::InvalidExpiry { .. } => "invalid_expiry",
            TokenError::BindingMismatch { .. } => "binding_mismatch",
            TokenError::BindingRequired { .. } => "binding_required",
            TokenError::SurrogateNotFound { .. } => "surrogate_not_found",
            TokenError::Store { .. } => "store",
            TokenError::InvalidConfig { .. } => "invalid_config",
            TokenError::Internal(_) => "internal",
            TokenError::Generic(_) => "generic",
        }
    }

    // ===== Constructor Helper Methods =====

    /// Create a generic error
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        TokenError::Generic(msg.into())
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        TokenError::Internal(msg.into())
    }

    /// Create a malformed token error
    pub fn malformed<S: Into<String>>(reason: S) -> Self {
        TokenError::Malformed {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config<S: Into<String>>(reason: S) -> Self {
        TokenError::InvalidConfig {
            reason: reason.into(),
        }
    }
}

impl From<&str> for TokenError {
    fn from(err: &str) -> Self {
        TokenError::Generic(err.to_string())
    }
}

impl From<String> for TokenError {
    fn from(err: String) -> Self {
        TokenError::Generic(err)
    }
}
