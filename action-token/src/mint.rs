use action_token_core::{
    ActionToken, Binding, TokenError, TokenTimeConfig, TokenVersion, encode_base36,
};
use tracing::debug;

use crate::binding::Presser;
use crate::sign::sign_token;

/// Builder for signed callback action tokens.
///
/// # Example
/// ```rust
/// use action_token::{CallbackAction, Presser};
/// use action_token_core::TokenTimeConfig;
///
/// let presser = Presser::new(123456).with_keyboard_nonce("abc-123");
///
/// // Unbound token, valid for any presser until it expires
/// let data = CallbackAction::new("order:accept:42", TokenTimeConfig::default())
///     .issue(b"secret")
///     .expect("Failed to create token");
///
/// // Token bound to one user
/// let data = CallbackAction::new("order:accept:42", TokenTimeConfig::default())
///     .bound_to_presser(&presser)
///     .issue(b"secret")
///     .expect("Failed to create token");
/// assert!(data.len() <= 64);
/// ```
pub struct CallbackAction {
    raw: String,
    time_config: TokenTimeConfig,
    binding: Binding,
    version: TokenVersion,
}

impl CallbackAction {
    /// Creates a new unbound, current-version token builder.
    ///
    /// # Arguments
    /// * `raw` - The action string (e.g., "order:accept:42")
    /// * `time_config` - Time configuration for token expiration
    pub fn new(raw: impl Into<String>, time_config: TokenTimeConfig) -> Self {
        Self {
            raw: raw.into(),
            time_config,
            binding: Binding::Unbound,
            version: TokenVersion::Current,
        }
    }

    /// Binds the token to explicit binding material.
    pub fn bound_to(mut self, binding: Binding) -> Self {
        self.binding = binding;
        self
    }

    /// Binds the token to a user, when their binding material resolves.
    ///
    /// Users without digits in their id stay unbound.
    pub fn bound_to_presser(self, presser: &Presser) -> Self {
        match presser.binding() {
            Some(binding) => self.bound_to(binding),
            None => {
                debug!(user_id = %presser.user_id, "binding unavailable, issuing unbound token");
                self
            }
        }
    }

    /// Issues a legacy (version 1) token without an expiry.
    ///
    /// Only needed to interoperate with buttons from before expiry was signed.
    pub fn legacy(mut self) -> Self {
        self.version = TokenVersion::Legacy;
        self
    }

    /// Builds and signs the token.
    ///
    /// Fails with [`TokenError::InvalidConfig`] when the binding has an empty
    /// or unencodable field.
    ///
    /// # Arguments
    /// * `secret` - The deployment-wide signing secret
    pub fn issue_token(self, secret: &[u8]) -> Result<ActionToken, TokenError> {
        self.binding.validate()?;

        let expiry = match self.version {
            TokenVersion::Current => {
                let expiration = self.time_config.expiration();
                Some(encode_base36(u64::try_from(expiration).unwrap_or_default()))
            }
            TokenVersion::Legacy => None,
        };

        let mut token = ActionToken {
            raw: self.raw,
            version: self.version,
            binding: self.binding,
            expiry,
            signature: String::new(),
        };
        token.signature = sign_token(&token, secret)?;
        Ok(token)
    }

    /// Builds and signs the token, returning its wire form.
    pub fn issue(self, secret: &[u8]) -> Result<String, TokenError> {
        self.issue_token(secret).map(|token| token.encode())
    }
}
