//! # Action Token Core
//!
//! Core types shared by the callback action token crates.
//!
//! A callback action token is an action string (e.g. `"order:accept:42"`)
//! carried in a chat button's opaque data field, wrapped with a truncated
//! keyed signature, an optional per-user binding and an expiry. This crate
//! provides:
//!
//! - The wire codec ([`encode`], [`decode`], [`try_decode`])
//! - Time configuration for token validity
//! - Common error types
//! - Compact base-36 helpers used by the wire format

pub mod codec;
pub mod error;
pub mod time;
pub mod utils;

pub use codec::{
    ActionToken, Binding, Expiry, FIELD_SEPARATOR, KV_SEPARATOR, MAX_CALLBACK_DATA_LEN,
    TOKEN_SEPARATOR, TokenVersion, contains_reserved, decode, encode, try_decode,
};
pub use error::TokenError;
pub use time::{DEFAULT_TOKEN_DURATION, TokenTimeConfig};
pub use utils::{decode_base36, digits_to_base36, encode_base36};
