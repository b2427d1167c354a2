//! Per-user binding material
//!
//! A bound token carries the presser's encoded user id and a short nonce. At
//! press time the same material is re-derived from the pressing user and both
//! values must match.
//!
//! The nonce should come from the user record (`keyboard_nonce`), so that
//! rotating it invalidates every bound button previously issued to that user.
//! When no nonce is stored, a deterministic one is derived from the user id.
//! The derived value is stable across resolutions but it is not a secret and
//! cannot be rotated; it only keeps binding working for users without a
//! stored nonce.

use std::fmt;

use action_token_core::{ActionToken, Binding, TokenError, contains_reserved, digits_to_base36};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::warn;

/// Prefix hashed together with the user id when no nonce is stored
pub const DERIVED_NONCE_PREFIX: &str = "keyboard-nonce:";
/// Maximum length of a stored nonce once hyphens are removed
pub const STORED_NONCE_LEN: usize = 10;
/// Length of the derived fallback nonce
pub const DERIVED_NONCE_LEN: usize = 16;

/// Encode a numeric user id for the `u` field.
///
/// Non-digit characters are dropped and the remaining digits are rendered in
/// base-36. Returns `None` when the id has no digits.
pub fn encode_user_id(user_id: &str) -> Option<String> {
    digits_to_base36(user_id)
}

/// Resolve the nonce for a user.
///
/// Uses the stored nonce (hyphens removed, truncated) when one exists,
/// otherwise derives one from the user id. Returns `None` when the stored
/// nonce would corrupt the wire form.
pub fn derive_nonce(user_id: &str, stored_nonce: Option<&str>) -> Option<String> {
    let stored = stored_nonce
        .map(|n| {
            n.chars()
                .filter(|c| *c != '-')
                .take(STORED_NONCE_LEN)
                .collect::<String>()
        })
        .filter(|n| !n.is_empty());

    match stored {
        Some(nonce) if contains_reserved(&nonce) => {
            warn!(user_id, "stored keyboard nonce contains reserved characters");
            None
        }
        Some(nonce) => Some(nonce),
        None => {
            let digest = Sha256::digest(format!("{DERIVED_NONCE_PREFIX}{user_id}").as_bytes());
            let mut nonce = hex::encode(digest);
            nonce.truncate(DERIVED_NONCE_LEN);
            Some(nonce)
        }
    }
}

/// Resolve the full binding material for a user, if any
pub fn resolve_binding(user_id: &str, stored_nonce: Option<&str>) -> Option<Binding> {
    let user = encode_user_id(user_id)?;
    let nonce = derive_nonce(user_id, stored_nonce)?;
    Some(Binding::Bound { user, nonce })
}

/// The user pressing (or being shown) a button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presser {
    /// Numeric user id as known to the chat transport
    pub user_id: String,
    /// Rotatable per-user nonce from the user record
    pub keyboard_nonce: Option<String>,
}

impl Presser {
    pub fn new(user_id: impl fmt::Display) -> Self {
        Self {
            user_id: user_id.to_string(),
            keyboard_nonce: None,
        }
    }

    pub fn with_keyboard_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.keyboard_nonce = Some(nonce.into());
        self
    }

    /// Binding material for this user, `None` when it cannot be resolved
    pub fn binding(&self) -> Option<Binding> {
        resolve_binding(&self.user_id, self.keyboard_nonce.as_deref())
    }
}

/// Check a token's binding against the presser.
///
/// Unbound tokens pass for anyone. Bound tokens require a presser whose
/// resolved user and nonce both equal the carried values.
pub fn check_binding(token: &ActionToken, presser: Option<&Presser>) -> Result<(), TokenError> {
    let Binding::Bound { user, nonce } = &token.binding else {
        return Ok(());
    };

    let Some(presser) = presser else {
        return Err(TokenError::BindingRequired { user: user.clone() });
    };

    let Some(Binding::Bound {
        user: presser_user,
        nonce: presser_nonce,
    }) = presser.binding()
    else {
        return Err(TokenError::BindingMismatch {
            expected: user.clone(),
            actual: String::new(),
        });
    };

    let user_ok = user.as_bytes().ct_eq(presser_user.as_bytes());
    let nonce_ok = nonce.as_bytes().ct_eq(presser_nonce.as_bytes());
    if bool::from(user_ok & nonce_ok) {
        Ok(())
    } else {
        Err(TokenError::BindingMismatch {
            expected: user.clone(),
            actual: presser_user,
        })
    }
}

/// Boolean form of [`check_binding`] for a known presser
pub fn verify_binding(token: &ActionToken, presser: &Presser) -> bool {
    check_binding(token, Some(presser)).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_token_core::TokenVersion;

    fn bound_token(binding: Binding) -> ActionToken {
        ActionToken {
            raw: "order:accept:42".to_string(),
            version: TokenVersion::Current,
            binding,
            expiry: Some("zz".to_string()),
            signature: "AbCdEf_-12".to_string(),
        }
    }

    #[test]
    fn test_encode_user_id() {
        assert_eq!(encode_user_id("123456").as_deref(), Some("2n9c"));
        assert_eq!(encode_user_id("tg:123456").as_deref(), Some("2n9c"));
        assert_eq!(encode_user_id("nobody"), None);
    }

    #[test]
    fn test_stored_nonce_normalized() {
        assert_eq!(derive_nonce("1", Some("abc-123")).as_deref(), Some("abc123"));
        assert_eq!(
            derive_nonce("1", Some("0123-4567-89ab-cdef")).as_deref(),
            Some("0123456789")
        );
    }

    #[test]
    fn test_derived_nonce_is_stable() {
        let first = derive_nonce("123456", None).expect("Should derive nonce");
        let second = derive_nonce("123456", None).expect("Should derive nonce");
        assert_eq!(first, second);
        assert_eq!(first.len(), DERIVED_NONCE_LEN);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));

        let other = derive_nonce("654321", None).expect("Should derive nonce");
        assert_ne!(first, other);

        // Hyphen-only stored nonce falls back to derivation
        assert_eq!(derive_nonce("123456", Some("---")), Some(first));
    }

    #[test]
    fn test_reserved_stored_nonce_disables_binding() {
        assert_eq!(derive_nonce("1", Some("ab|cd")), None);
        assert!(Presser::new(1).with_keyboard_nonce("x#y").binding().is_none());
    }

    #[test]
    fn test_presser_binding() {
        let presser = Presser::new(123456).with_keyboard_nonce("abc-123");
        assert_eq!(presser.binding(), Binding::bound("2n9c", "abc123").ok());
        assert_eq!(Presser::new("guest").binding(), None);
    }

    #[test]
    fn test_unbound_token_passes_for_anyone() {
        let token = bound_token(Binding::Unbound);
        assert!(check_binding(&token, None).is_ok());
        assert!(verify_binding(&token, &Presser::new(1)));
    }

    #[test]
    fn test_bound_token_matches_only_its_user() {
        let alice = Presser::new(111).with_keyboard_nonce("alice-n");
        let bob = Presser::new(222).with_keyboard_nonce("bob-n");
        let token = bound_token(alice.binding().expect("Alice should resolve"));

        assert!(verify_binding(&token, &alice));
        assert!(!verify_binding(&token, &bob));

        // Same user, rotated nonce
        let rotated = Presser::new(111).with_keyboard_nonce("fresh");
        assert!(!verify_binding(&token, &rotated));
    }

    #[test]
    fn test_bound_token_requires_presser() {
        let token = bound_token(Binding::bound("2n9c", "abc123").expect("Valid binding"));
        let err = check_binding(&token, None).expect_err("Should require a presser");
        assert!(err.is_binding_mismatch());

        let err = check_binding(&token, Some(&Presser::new("guest")))
            .expect_err("Unresolvable presser should not match");
        assert!(matches!(err, TokenError::BindingMismatch { .. }));
    }
}
