//! Callback entry point: decode, then verify against the presser
//!
//! Data that does not decode as a wrapped token is passed through untouched.
//! That covers buttons issued before tokens were wrapped and identifiers
//! generated by other systems.

use action_token_core::{ActionToken, TokenError, decode};
use tracing::{debug, info, warn};

use crate::binding::{Presser, check_binding};
use crate::verify::ActionVerifier;

/// Result of handling a button press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PressOutcome {
    /// Not a wrapped token; the data is the action itself
    Passthrough(String),
    /// Wrapped token that verified for this presser
    Verified(ActionToken),
    /// Wrapped token that failed verification
    Rejected { data: String, reason: TokenError },
}

impl PressOutcome {
    /// The action to dispatch, if the press is acceptable
    pub fn action(&self) -> Option<&str> {
        match self {
            PressOutcome::Passthrough(data) => Some(data),
            PressOutcome::Verified(token) => Some(&token.raw),
            PressOutcome::Rejected { .. } => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, PressOutcome::Rejected { .. })
    }

    /// Failure reason for rejected presses
    pub fn reason(&self) -> Option<&TokenError> {
        match self {
            PressOutcome::Rejected { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// Resolve the data of a pressed button.
///
/// Bound tokens are checked against the identity of whoever pressed the
/// button, never against the user the button was rendered for. A bound token
/// pressed without a known presser is rejected.
///
/// # Arguments
/// * `data` - The button data delivered by the transport
/// * `secret` - The deployment signing secret
/// * `presser` - The user who pressed the button, when known
pub fn resolve_press(data: &str, secret: &[u8], presser: Option<&Presser>) -> PressOutcome {
    let token = match decode(data) {
        Ok(token) => token,
        Err(e) => {
            debug!(reason = e.kind(), "callback data is not a wrapped token, passing through");
            return PressOutcome::Passthrough(data.to_string());
        }
    };

    let result = ActionVerifier::new(&token, secret)
        .verify()
        .and_then(|()| check_binding(&token, presser));

    match result {
        Ok(()) => PressOutcome::Verified(token),
        Err(reason) => {
            if reason.is_expired() {
                info!(raw = %token.raw, reason = reason.kind(), "expired action token pressed");
            } else {
                warn!(
                    raw = %token.raw,
                    reason = reason.kind(),
                    user_id = presser.map(|p| p.user_id.as_str()),
                    "invalid action token pressed: {reason}"
                );
            }
            PressOutcome::Rejected {
                data: data.to_string(),
                reason,
            }
        }
    }
}
