use action_token_core::{Expiry, TokenError, TokenVersion, decode};
use chrono::Utc;

/// Result of inspecting an action token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectResult {
    /// The action string carried by the token
    pub raw: String,
    pub version: TokenVersion,
    /// Encoded user the token is bound to (if bound)
    pub bound_user: Option<String>,
    /// Unix timestamp when the token expires (if extractable)
    pub expiry: Option<i64>,
    /// Whether the token is currently expired, or has an expiry that cannot be read
    pub is_expired: bool,
}

/// Inspects a wire string without verifying its signature.
///
/// Intended for audit logging; never use the result to authorize an action.
pub fn inspect_action_token(data: &str) -> Result<InspectResult, TokenError> {
    let token = decode(data)?;
    let now = Utc::now().timestamp();

    let (expiry, is_expired) = match (token.version, token.expiry_state()) {
        (TokenVersion::Legacy, _) => (None, false),
        (TokenVersion::Current, Expiry::At(at)) => (Some(at), at < now),
        (TokenVersion::Current, Expiry::Never | Expiry::Malformed) => (None, true),
    };

    Ok(InspectResult {
        bound_user: token
            .binding
            .is_bound()
            .then(|| token.binding.user().to_string()),
        raw: token.raw,
        version: token.version,
        expiry,
        is_expired,
    })
}
