use action_token_core::{ActionToken, Expiry, TokenError, TokenVersion};
use chrono::Utc;
use tracing::debug;

use crate::binding::{Presser, check_binding};
use crate::sign::check_signature;

/// Builder for verifying callback action tokens.
///
/// Verification checks, in order: the signature, the expiry (current-version
/// tokens only) and, when a presser is supplied, the user binding.
///
/// # Example
/// ```rust
/// use action_token::{ActionVerifier, CallbackAction, Presser};
/// use action_token_core::TokenTimeConfig;
///
/// let presser = Presser::new(123456).with_keyboard_nonce("abc-123");
/// let token = CallbackAction::new("order:accept:42", TokenTimeConfig::default())
///     .bound_to_presser(&presser)
///     .issue_token(b"secret")
///     .expect("Failed to create token");
///
/// ActionVerifier::new(&token, b"secret")
///     .with_presser(&presser)
///     .verify()
///     .expect("Should verify for the bound user");
/// ```
pub struct ActionVerifier<'a> {
    token: &'a ActionToken,
    secret: &'a [u8],
    presser: Option<&'a Presser>,
    now: Option<i64>,
}

impl<'a> ActionVerifier<'a> {
    /// Creates a new verifier.
    ///
    /// # Arguments
    /// * `token` - The decoded token to verify
    /// * `secret` - The signing secret the token was issued with
    pub fn new(token: &'a ActionToken, secret: &'a [u8]) -> Self {
        Self {
            token,
            secret,
            presser: None,
            now: None,
        }
    }

    /// Adds a binding check against the user pressing the button.
    pub fn with_presser(mut self, presser: &'a Presser) -> Self {
        self.presser = Some(presser);
        self
    }

    /// Overrides the current time (Unix seconds) used for the expiry check.
    pub fn at(mut self, now: i64) -> Self {
        self.now = Some(now);
        self
    }

    /// Performs the verification with the configured parameters.
    ///
    /// # Returns
    /// * `Ok(())` - If the token is valid for this presser
    /// * `Err(TokenError)` - The first check that failed
    pub fn verify(self) -> Result<(), TokenError> {
        check_signature(self.token, self.secret)?;

        let now = self.now.unwrap_or_else(|| Utc::now().timestamp());
        check_expiry(self.token, now)?;

        if let Some(presser) = self.presser {
            check_binding(self.token, Some(presser))?;
        }
        Ok(())
    }
}

/// Apply the version-specific expiry rule.
///
/// Legacy tokens predate the expiry field and never expire. Current tokens
/// must carry a decodable expiry that is not before `now`; a missing or
/// undecodable expiry is rejected rather than read as "never expires".
pub fn check_expiry(token: &ActionToken, now: i64) -> Result<(), TokenError> {
    if token.version == TokenVersion::Legacy {
        return Ok(());
    }

    match token.expiry_state() {
        Expiry::At(expired_at) if expired_at < now => Err(TokenError::Expired {
            expired_at,
            current_time: now,
        }),
        Expiry::At(_) => Ok(()),
        Expiry::Never | Expiry::Malformed => Err(TokenError::InvalidExpiry {
            value: token.expiry.clone(),
        }),
    }
}

/// Verify signature and expiry, ignoring binding.
///
/// Returns `false` for any failure; the reason is logged at debug level.
pub fn verify_token(token: &ActionToken, secret: &[u8]) -> bool {
    log_outcome(ActionVerifier::new(token, secret).verify(), token)
}

/// Verify signature, expiry and binding against the presser.
pub fn verify_bound_token(token: &ActionToken, secret: &[u8], presser: &Presser) -> bool {
    log_outcome(
        ActionVerifier::new(token, secret)
            .with_presser(presser)
            .verify(),
        token,
    )
}

fn log_outcome(result: Result<(), TokenError>, token: &ActionToken) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            debug!(reason = e.kind(), raw = %token.raw, "action token rejected: {e}");
            false
        }
    }
}
