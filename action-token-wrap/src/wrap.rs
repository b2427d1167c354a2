//! Degradation cascade for fitting an action into a button
//!
//! Attempts, richest first, each only when the previous one is too long:
//!
//! 1. signed and bound to the user (when requested and resolvable)
//! 2. signed, unbound
//! 3. the bare action, unsigned
//! 4. a surrogate token whose payload is persisted in a [`SurrogateStore`]
//!
//! Step 3 gives up tamper protection entirely. Handlers for actions that must
//! always be verified should keep those actions short enough for step 2.

use std::fmt;
use std::sync::Arc;

use action_token::{CallbackAction, Presser};
use action_token_core::{TokenError, TokenTimeConfig};
use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use tokio::runtime::Handle;
use tracing::{debug, error, warn};

use crate::config::{SURROGATE_DELIMITER, WrapConfig};
use crate::store::{SurrogatePayload, SurrogateStore};

/// How a wrap attempt resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapStatus {
    /// A signed token was used
    Wrapped { bound: bool },
    /// No signed form fits; the bare action was used
    Skipped,
    /// Even the bare action is too long; a surrogate token was used
    Surrogate,
}

/// Why the richest form was not used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradeReason {
    /// Binding was requested but the presser's material does not resolve
    BindingUnavailable,
    /// A richer signed form exceeded the ceiling
    Oversize,
    /// The action itself exceeds the ceiling
    RawTooLong,
}

impl fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegradeReason::BindingUnavailable => write!(f, "binding-unavailable"),
            DegradeReason::Oversize => write!(f, "oversize"),
            DegradeReason::RawTooLong => write!(f, "raw-too-long"),
        }
    }
}

/// Decision record of one wrap call. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapOutcome {
    pub status: WrapStatus,
    /// Length in bytes of the returned wire string
    pub length: usize,
    /// Length in bytes of the action
    pub raw_length: usize,
    pub reason: Option<DegradeReason>,
}

impl WrapOutcome {
    /// True when the caller asked for binding and did not get it, or got no
    /// signature at all
    pub fn is_degraded(&self) -> bool {
        self.reason.is_some()
    }
}

/// Wire string plus how it was chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wrapped {
    pub data: String,
    pub outcome: WrapOutcome,
}

/// Per-call wrapping options
#[derive(Debug, Clone, Default)]
pub struct WrapOptions {
    pub time_config: TokenTimeConfig,
    /// The user the button is rendered for
    pub presser: Option<Presser>,
    /// Attempt to bind the token to `presser`
    pub bind_to_user: bool,
}

impl WrapOptions {
    pub fn new(time_config: TokenTimeConfig) -> Self {
        Self {
            time_config,
            presser: None,
            bind_to_user: false,
        }
    }

    /// Request binding to `presser`
    pub fn bind_to(mut self, presser: Presser) -> Self {
        self.presser = Some(presser);
        self.bind_to_user = true;
        self
    }
}

/// Produces size-bounded wire strings for actions.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use action_token::Presser;
/// use action_token_core::TokenTimeConfig;
/// use action_token_wrap::{MemorySurrogateStore, WrapConfig, WrapOptions, WrapStatus, Wrapper};
///
/// let wrapper = Wrapper::new(WrapConfig::default(), Arc::new(MemorySurrogateStore::new()))
///     .expect("default config is valid");
///
/// let options = WrapOptions::new(TokenTimeConfig::default())
///     .bind_to(Presser::new(123456).with_keyboard_nonce("abc-123"));
/// let wrapped = wrapper
///     .wrap("order:accept:42", b"secret", &options)
///     .expect("Failed to wrap action");
///
/// assert_eq!(wrapped.outcome.status, WrapStatus::Wrapped { bound: true });
/// assert!(wrapped.data.len() <= 64);
/// ```
#[derive(Clone)]
pub struct Wrapper {
    config: WrapConfig,
    store: Arc<dyn SurrogateStore>,
}

impl fmt::Debug for Wrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wrapper")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Wrapper {
    /// Creates a wrapper, validating `config`.
    pub fn new(config: WrapConfig, store: Arc<dyn SurrogateStore>) -> Result<Self, TokenError> {
        config.validate()?;
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &WrapConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SurrogateStore> {
        &self.store
    }

    /// Wrap `action` into the richest wire form that fits the ceiling.
    ///
    /// Only fails when the secret is unusable. A surrogate entry is written in
    /// the background on the current tokio runtime; the write is never awaited
    /// and its failure is only logged.
    ///
    /// # Arguments
    /// * `action` - The action string
    /// * `secret` - The deployment signing secret
    /// * `options` - Binding and lifetime options
    pub fn wrap(
        &self,
        action: &str,
        secret: &[u8],
        options: &WrapOptions,
    ) -> Result<Wrapped, TokenError> {
        let max_len = self.config.max_data_len;
        // Pin the issue time so every attempt and the surrogate share one expiry
        let time_config = TokenTimeConfig {
            start_time: Some(
                options
                    .time_config
                    .start_time
                    .unwrap_or_else(|| Utc::now().timestamp()),
            ),
            duration: options.time_config.duration,
        };

        let mut reason = None;
        let mut best = None;

        if options.bind_to_user {
            match options.presser.as_ref().and_then(Presser::binding) {
                Some(binding) => {
                    let data = CallbackAction::new(action, time_config)
                        .bound_to(binding)
                        .issue(secret)?;
                    if data.len() <= max_len {
                        return Ok(self.finish(
                            action,
                            data,
                            WrapStatus::Wrapped { bound: true },
                            None,
                        ));
                    }
                    warn!(
                        length = data.len(),
                        max_len,
                        raw_length = action.len(),
                        "bound action token exceeds ceiling, dropping user binding"
                    );
                    reason = Some(DegradeReason::Oversize);
                    best = Some(data);
                }
                None => {
                    warn!(
                        user_id = options.presser.as_ref().map(|p| p.user_id.as_str()),
                        raw_length = action.len(),
                        "user binding requested but not resolvable, signing unbound"
                    );
                    reason = Some(DegradeReason::BindingUnavailable);
                }
            }
        }

        let unbound = CallbackAction::new(action, time_config).issue(secret)?;
        if unbound.len() <= max_len {
            return Ok(self.finish(
                action,
                unbound,
                WrapStatus::Wrapped { bound: false },
                reason,
            ));
        }

        if action.len() <= max_len {
            warn!(
                length = unbound.len(),
                max_len,
                raw_length = action.len(),
                "signed action token exceeds ceiling, sending action unsigned"
            );
            return Ok(self.finish(
                action,
                action.to_string(),
                WrapStatus::Skipped,
                Some(DegradeReason::Oversize),
            ));
        }

        let token = self.mint_surrogate();
        warn!(
            raw_length = action.len(),
            max_len,
            surrogate = %token,
            "action exceeds ceiling, using surrogate token"
        );
        let payload = SurrogatePayload {
            raw: action.to_string(),
            wrapped: best.unwrap_or(unbound),
        };
        self.persist(token.clone(), payload, time_config.expiration());

        Ok(self.finish(
            action,
            token,
            WrapStatus::Surrogate,
            Some(DegradeReason::RawTooLong),
        ))
    }

    fn finish(
        &self,
        action: &str,
        data: String,
        status: WrapStatus,
        reason: Option<DegradeReason>,
    ) -> Wrapped {
        let outcome = WrapOutcome {
            status,
            length: data.len(),
            raw_length: action.len(),
            reason,
        };
        Wrapped { data, outcome }
    }

    fn mint_surrogate(&self) -> String {
        format!(
            "{}{}{}",
            self.config.surrogate_prefix,
            SURROGATE_DELIMITER,
            random_id(self.config.surrogate_id_len)
        )
    }

    fn persist(&self, token: String, payload: SurrogatePayload, expiration: i64) {
        let Some(expires_at) = DateTime::<Utc>::from_timestamp(expiration, 0) else {
            error!(surrogate = %token, expiration, "surrogate expiry out of range, entry not stored");
            return;
        };

        let Ok(handle) = Handle::try_current() else {
            error!(surrogate = %token, "no async runtime available, surrogate entry not stored");
            return;
        };

        let store = Arc::clone(&self.store);
        handle.spawn(async move {
            match store.put(&token, payload, expires_at).await {
                Ok(()) => debug!(surrogate = %token, %expires_at, "surrogate entry stored"),
                Err(e) => error!(surrogate = %token, "failed to store surrogate entry: {e}"),
            }
        });
    }
}

/// Random alphanumeric id of `len` characters
fn random_id(len: usize) -> String {
    assert!(len > 0, "surrogate id length must be positive");
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
