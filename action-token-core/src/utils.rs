//! Compact text encodings used inside the wire format

use num_bigint::BigUint;

const BASE36: u32 = 36;

/// Render an unsigned value in lowercase base-36
pub fn encode_base36(value: u64) -> String {
    BigUint::from(value).to_str_radix(BASE36)
}

/// Parse a lowercase base-36 value.
///
/// Returns `None` for empty input, characters outside `[0-9a-z]` or values
/// that do not fit an `i64`. Never panics.
pub fn decode_base36(encoded: &str) -> Option<i64> {
    if encoded.is_empty()
        || !encoded
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
    {
        return None;
    }
    i64::from_str_radix(encoded, BASE36).ok()
}

/// Keep only the decimal digits of `value` and render them, read as one
/// arbitrary-size integer, in base-36.
///
/// Returns `None` when `value` contains no digits.
pub fn digits_to_base36(value: &str) -> Option<String> {
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    BigUint::parse_bytes(digits.as_bytes(), 10).map(|n| n.to_str_radix(BASE36))
}
