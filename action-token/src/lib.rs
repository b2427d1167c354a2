//! # Action Token
//!
//! Signed callback action tokens for chat buttons.
//!
//! A token wraps an action string with a truncated HMAC-SHA256 signature, an
//! absolute expiry and, optionally, a binding to the user it was shown to:
//!
//! ```text
//! order:accept:42#2|u=2n9c|n=abc123|e=t3x0k0|s=Q2xh1dBv_c
//! ```
//!
//! Verification is stateless: the deployment secret and the presser's
//! identity are all that is needed.
//!
//! ## Example
//!
//! ```rust
//! use action_token::{CallbackAction, Presser, PressOutcome, resolve_press};
//! use action_token_core::TokenTimeConfig;
//!
//! let secret = b"deployment-secret";
//! let alice = Presser::new(123456).with_keyboard_nonce("abc-123");
//!
//! let data = CallbackAction::new("order:accept:42", TokenTimeConfig::default())
//!     .bound_to_presser(&alice)
//!     .issue(secret)
//!     .expect("Failed to create token");
//!
//! match resolve_press(&data, secret, Some(&alice)) {
//!     PressOutcome::Verified(token) => assert_eq!(token.raw, "order:accept:42"),
//!     other => panic!("unexpected outcome: {other:?}"),
//! }
//! ```

mod binding;
mod inspect;
mod mint;
mod press;
pub mod sign;
mod verify;

pub use binding::{
    DERIVED_NONCE_LEN, DERIVED_NONCE_PREFIX, Presser, STORED_NONCE_LEN, check_binding,
    derive_nonce, encode_user_id, resolve_binding, verify_binding,
};
pub use inspect::{InspectResult, inspect_action_token};
pub use mint::CallbackAction;
pub use press::{PressOutcome, resolve_press};
pub use verify::{ActionVerifier, check_expiry, verify_bound_token, verify_token};

// Re-export commonly needed types from core
pub use action_token_core::{
    ActionToken, Binding, Expiry, MAX_CALLBACK_DATA_LEN, TokenError, TokenTimeConfig,
    TokenVersion, decode, encode, try_decode,
};
