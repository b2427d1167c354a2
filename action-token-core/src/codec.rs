//! Wire codec for callback action tokens
//!
//! A wrapped token travels as a single string:
//!
//! ```text
//! <raw>#<version>|u=<user>|n=<nonce>|e=<expiry>|s=<signature>
//! ```
//!
//! The action itself may contain `#`; only the last occurrence is structural.
//! The codec knows nothing about signatures or expiry policy, it only moves
//! fields between the wire form and [`ActionToken`].

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::TokenError;
use crate::utils::decode_base36;

/// Separates the raw action from the token metadata
pub const TOKEN_SEPARATOR: char = '#';
/// Separates metadata fields
pub const FIELD_SEPARATOR: char = '|';
/// Separates a field key from its value
pub const KV_SEPARATOR: char = '=';

/// Hard ceiling on the button data field, in bytes
pub const MAX_CALLBACK_DATA_LEN: usize = 64;

const USER_KEY: &str = "u";
const NONCE_KEY: &str = "n";
const EXPIRY_KEY: &str = "e";
const SIGNATURE_KEY: &str = "s";

/// Returns true if `value` contains a character reserved by the wire format
pub fn contains_reserved(value: &str) -> bool {
    value.contains([TOKEN_SEPARATOR, FIELD_SEPARATOR, KV_SEPARATOR])
}

/// Token format version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenVersion {
    /// Original format: no expiry field, never expires
    Legacy,
    /// Current format: signs and enforces an absolute expiry
    Current,
}

impl TokenVersion {
    /// Tag written on the wire
    pub fn tag(&self) -> &'static str {
        match self {
            TokenVersion::Legacy => "1",
            TokenVersion::Current => "2",
        }
    }
}

impl fmt::Display for TokenVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for TokenVersion {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(TokenVersion::Legacy),
            "2" => Ok(TokenVersion::Current),
            other => Err(TokenError::UnsupportedVersion {
                actual: other.to_string(),
            }),
        }
    }
}

/// Per-user binding carried by a token
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Binding {
    /// Valid for any presser
    #[default]
    Unbound,
    /// Valid only for the user whose resolved material matches
    Bound {
        /// Base-36 encoded numeric user id
        user: String,
        /// Short per-user nonce
        nonce: String,
    },
}

impl Binding {
    /// Bound binding material, checked with [`Binding::validate`]
    pub fn bound(user: impl Into<String>, nonce: impl Into<String>) -> Result<Self, TokenError> {
        let binding = Binding::Bound {
            user: user.into(),
            nonce: nonce.into(),
        };
        binding.validate()?;
        Ok(binding)
    }

    /// Both bound fields must be non-empty and free of reserved characters,
    /// otherwise the wire form would lose or split them.
    pub fn validate(&self) -> Result<(), TokenError> {
        let Binding::Bound { user, nonce } = self else {
            return Ok(());
        };
        for (name, value) in [("user", user), ("nonce", nonce)] {
            if value.is_empty() {
                return Err(TokenError::invalid_config(format!(
                    "bound {name} must not be empty"
                )));
            }
            if contains_reserved(value) {
                return Err(TokenError::invalid_config(format!(
                    "bound {name} contains a reserved character: {value:?}"
                )));
            }
        }
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, Binding::Bound { .. })
    }

    /// Encoded user, empty when unbound
    pub fn user(&self) -> &str {
        match self {
            Binding::Bound { user, .. } => user,
            Binding::Unbound => "",
        }
    }

    /// Nonce, empty when unbound
    pub fn nonce(&self) -> &str {
        match self {
            Binding::Bound { nonce, .. } => nonce,
            Binding::Unbound => "",
        }
    }
}

/// Typed view of a token's expiry field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// No expiry field
    Never,
    /// Absolute Unix timestamp
    At(i64),
    /// Field present but not valid base-36
    Malformed,
}

/// A decoded (not yet verified) wrapped action token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionToken {
    /// The action string, verbatim
    pub raw: String,
    pub version: TokenVersion,
    pub binding: Binding,
    /// Base-36 expiry exactly as carried on the wire
    pub expiry: Option<String>,
    /// Truncated keyed digest
    pub signature: String,
}

impl ActionToken {
    /// Interpret the expiry field
    pub fn expiry_state(&self) -> Expiry {
        match self.expiry.as_deref() {
            None => Expiry::Never,
            Some(encoded) => decode_base36(encoded).map_or(Expiry::Malformed, Expiry::At),
        }
    }

    /// Wire form of this token
    pub fn encode(&self) -> String {
        encode(self)
    }
}

impl fmt::Display for ActionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(self))
    }
}

impl FromStr for ActionToken {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}

/// Serialize a token into its wire form.
///
/// Fields are written in the fixed order `u`, `n`, `e`, `s`; fields with an
/// empty value are left out entirely.
pub fn encode(token: &ActionToken) -> String {
    let fields = [
        (USER_KEY, token.binding.user()),
        (NONCE_KEY, token.binding.nonce()),
        (EXPIRY_KEY, token.expiry.as_deref().unwrap_or_default()),
        (SIGNATURE_KEY, token.signature.as_str()),
    ];

    let mut out = String::with_capacity(token.raw.len() + 48);
    out.push_str(&token.raw);
    out.push(TOKEN_SEPARATOR);
    out.push_str(token.version.tag());
    for (key, value) in fields {
        if value.is_empty() {
            continue;
        }
        out.push(FIELD_SEPARATOR);
        out.push_str(key);
        out.push(KV_SEPARATOR);
        out.push_str(value);
    }
    out
}

/// Parse a wire string into an [`ActionToken`].
///
/// Fails when there is no `#`, the version tag is unknown, or there is no
/// signature field. Unknown field keys are ignored. A token carrying only one
/// of `u`/`n` decodes as unbound; its signature will then no longer match.
pub fn decode(data: &str) -> Result<ActionToken, TokenError> {
    let (raw, meta) = data
        .rsplit_once(TOKEN_SEPARATOR)
        .ok_or_else(|| TokenError::malformed("missing token separator"))?;

    let mut parts = meta.split(FIELD_SEPARATOR);
    let version: TokenVersion = parts.next().unwrap_or_default().parse()?;

    let mut user = None;
    let mut nonce = None;
    let mut expiry = None;
    let mut signature = None;

    for field in parts {
        let Some((key, value)) = field.split_once(KV_SEPARATOR) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        let slot = match key {
            USER_KEY => &mut user,
            NONCE_KEY => &mut nonce,
            EXPIRY_KEY => &mut expiry,
            SIGNATURE_KEY => &mut signature,
            _ => continue,
        };
        *slot = Some(value.to_string());
    }

    let signature = signature.ok_or_else(|| TokenError::malformed("missing signature field"))?;

    let binding = match (user, nonce) {
        (Some(user), Some(nonce)) => Binding::Bound { user, nonce },
        (None, None) => Binding::Unbound,
        (user, nonce) => {
            debug!(
                has_user = user.is_some(),
                has_nonce = nonce.is_some(),
                "partial binding on action token, treating as unbound"
            );
            Binding::Unbound
        }
    };

    Ok(ActionToken {
        raw: raw.to_string(),
        version,
        binding,
        expiry,
        signature,
    })
}

/// Parse a wire string, returning `None` when it is not a wrapped token.
///
/// Callers treat `None` as a plain action string issued without a wrapper.
pub fn try_decode(data: &str) -> Option<ActionToken> {
    decode(data).ok()
}
