//! Keyed digest over the canonical signing input
//!
//! The digest is HMAC-SHA256 rendered as unpadded base64url and truncated to
//! [`SIGNATURE_LEN`] characters. The truncated signature is a tamper check;
//! expiry and user binding are enforced as separate factors on top of it.

use action_token_core::{ActionToken, Binding, FIELD_SEPARATOR, TokenError, TokenVersion};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Length of the encoded signature carried on the wire
pub const SIGNATURE_LEN: usize = 10;

/// Build the canonical byte sequence a token's signature covers.
///
/// Current tokens sign `raw|user|nonce|expiry`; legacy tokens sign
/// `raw|user|nonce`. Absent fields keep their position as empty strings.
pub fn signing_input(
    raw: &str,
    version: TokenVersion,
    binding: &Binding,
    expiry: Option<&str>,
) -> String {
    let mut input = String::with_capacity(raw.len() + 40);
    input.push_str(raw);
    input.push(FIELD_SEPARATOR);
    input.push_str(binding.user());
    input.push(FIELD_SEPARATOR);
    input.push_str(binding.nonce());
    if version == TokenVersion::Current {
        input.push(FIELD_SEPARATOR);
        input.push_str(expiry.unwrap_or_default());
    }
    input
}

/// Compute the truncated signature for `input`
pub fn compute_signature(secret: &[u8], input: &str) -> Result<String, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::InvalidKey {
            reason: "signing secret must not be empty".to_string(),
        });
    }

    let mut mac = HmacSha256::new_from_slice(secret).map_err(|e| TokenError::InvalidKey {
        reason: e.to_string(),
    })?;
    mac.update(input.as_bytes());
    let digest = mac.finalize().into_bytes();

    let mut encoded = URL_SAFE_NO_PAD.encode(digest);
    encoded.truncate(SIGNATURE_LEN);
    Ok(encoded)
}

/// Compute the signature a token should carry
pub fn sign_token(token: &ActionToken, secret: &[u8]) -> Result<String, TokenError> {
    let input = signing_input(
        &token.raw,
        token.version,
        &token.binding,
        token.expiry.as_deref(),
    );
    compute_signature(secret, &input)
}

/// Check a token's signature in constant time.
///
/// Fails closed with `MalformedSignature` when the carried value is not
/// exactly [`SIGNATURE_LEN`] base64url characters.
pub fn check_signature(token: &ActionToken, secret: &[u8]) -> Result<(), TokenError> {
    let provided = token.signature.as_bytes();
    if provided.len() != SIGNATURE_LEN {
        return Err(TokenError::MalformedSignature {
            reason: format!(
                "expected {SIGNATURE_LEN} characters, got {}",
                provided.len()
            ),
        });
    }
    if !provided
        .iter()
        .all(|b| b.is_ascii_alphanumeric() || *b == b'-' || *b == b'_')
    {
        return Err(TokenError::MalformedSignature {
            reason: "signature is not base64url".to_string(),
        });
    }

    let expected = sign_token(token, secret)?;
    if bool::from(expected.as_bytes().ct_eq(provided)) {
        Ok(())
    } else {
        Err(TokenError::InvalidSignature {
            details: "digest mismatch".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unsigned(version: TokenVersion, binding: Binding, expiry: Option<&str>) -> ActionToken {
        ActionToken {
            raw: "order:accept:42".to_string(),
            version,
            binding,
            expiry: expiry.map(str::to_string),
            signature: String::new(),
        }
    }

    #[test]
    fn test_signing_input_layout() {
        let bound = Binding::bound("2n9c", "abc123").expect("Valid binding");
        assert_eq!(
            signing_input("a", TokenVersion::Current, &bound, Some("zz")),
            "a|2n9c|abc123|zz"
        );
        assert_eq!(
            signing_input("a", TokenVersion::Current, &Binding::Unbound, Some("zz")),
            "a|||zz"
        );
        assert_eq!(
            signing_input("a", TokenVersion::Legacy, &Binding::Unbound, Some("zz")),
            "a||"
        );
        assert_eq!(
            signing_input("a", TokenVersion::Legacy, &bound, None),
            "a|2n9c|abc123"
        );
    }

    #[test]
    fn test_signature_shape_and_determinism() {
        let first = compute_signature(b"s", "a|||zz").expect("Should sign");
        let second = compute_signature(b"s", "a|||zz").expect("Should sign");
        assert_eq!(first.len(), SIGNATURE_LEN);
        assert_eq!(first, second);
        assert!(
            first
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        );

        let other_key = compute_signature(b"wrong", "a|||zz").expect("Should sign");
        assert_ne!(first, other_key);
    }

    #[test]
    fn test_empty_secret_rejected() {
        let result = compute_signature(b"", "a|||zz");
        assert!(matches!(result, Err(TokenError::InvalidKey { .. })));
    }

    #[test]
    fn test_check_signature() {
        let mut token = unsigned(TokenVersion::Current, Binding::Unbound, Some("zz"));
        token.signature = sign_token(&token, b"s").expect("Should sign");

        assert!(check_signature(&token, b"s").is_ok());
        assert!(matches!(
            check_signature(&token, b"wrong"),
            Err(TokenError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn test_malformed_signature_fails_closed() {
        let mut token = unsigned(TokenVersion::Current, Binding::Unbound, Some("zz"));
        token.signature = "short".to_string();
        assert!(matches!(
            check_signature(&token, b"s"),
            Err(TokenError::MalformedSignature { .. })
        ));

        token.signature = "abc!efghij".to_string();
        assert!(matches!(
            check_signature(&token, b"s"),
            Err(TokenError::MalformedSignature { .. })
        ));
    }
}
