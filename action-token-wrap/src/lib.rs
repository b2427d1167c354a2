//! # Action Token Wrap
//!
//! Fits callback actions into a chat button's 64-byte data field.
//!
//! [`Wrapper::wrap`] tries the richest signed form first and degrades step by
//! step: dropping the user binding, then the signature, and finally replacing
//! the action with a short surrogate token backed by a [`SurrogateStore`].
//! Every call reports a [`WrapOutcome`] so degraded buttons can be noticed.
//!
//! [`Wrapper::resolve_press`] is the matching press-time entry point: it
//! resolves surrogate tokens through the store and verifies signed data
//! against the user who pressed the button.

mod config;
mod resolve;
mod store;
mod wrap;

pub use config::{SURROGATE_DELIMITER, WrapConfig};
pub use resolve::resolve_surrogate_press;
pub use store::{
    DEFAULT_PURGE_THRESHOLD, MemorySurrogateStore, StoreError, SurrogatePayload, SurrogateStore,
};
pub use wrap::{DegradeReason, WrapOptions, WrapOutcome, WrapStatus, Wrapped, Wrapper};
