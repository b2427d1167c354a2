use action_token_core::{MAX_CALLBACK_DATA_LEN, TokenError, contains_reserved};
use serde::Deserialize;

/// Delimiter between the surrogate prefix and its random id
pub const SURROGATE_DELIMITER: char = ':';

/// Wrapping configuration, usually embedded in the application's config file.
///
/// ```rust
/// use action_token_wrap::WrapConfig;
///
/// let config = WrapConfig::default();
/// assert_eq!(config.max_data_len, 64);
/// config.validate().expect("defaults are valid");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WrapConfig {
    /// Ceiling on the wire string, in bytes
    pub max_data_len: usize,
    /// Prefix of surrogate tokens
    pub surrogate_prefix: String,
    /// Length of the random part of surrogate tokens
    pub surrogate_id_len: usize,
}

impl Default for WrapConfig {
    fn default() -> Self {
        Self {
            max_data_len: MAX_CALLBACK_DATA_LEN,
            surrogate_prefix: "cbs".to_string(),
            surrogate_id_len: 12,
        }
    }
}

impl WrapConfig {
    /// Check the configuration can produce valid surrogate tokens.
    pub fn validate(&self) -> Result<(), TokenError> {
        if self.max_data_len == 0 {
            return Err(TokenError::invalid_config("max_data_len must be positive"));
        }
        if self.surrogate_prefix.is_empty() {
            return Err(TokenError::invalid_config("surrogate_prefix must not be empty"));
        }
        if contains_reserved(&self.surrogate_prefix)
            || self.surrogate_prefix.contains(SURROGATE_DELIMITER)
        {
            return Err(TokenError::invalid_config(format!(
                "surrogate_prefix '{}' contains a reserved character",
                self.surrogate_prefix
            )));
        }
        if self.surrogate_id_len == 0 {
            return Err(TokenError::invalid_config("surrogate_id_len must be positive"));
        }
        if self.surrogate_token_len() > self.max_data_len {
            return Err(TokenError::invalid_config(format!(
                "surrogate tokens ({} bytes) exceed max_data_len ({})",
                self.surrogate_token_len(),
                self.max_data_len
            )));
        }
        Ok(())
    }

    /// Length in bytes of every surrogate token this config produces
    pub fn surrogate_token_len(&self) -> usize {
        self.surrogate_prefix.len() + SURROGATE_DELIMITER.len_utf8() + self.surrogate_id_len
    }

    /// Returns true if `data` looks like a surrogate token of this config
    pub fn is_surrogate(&self, data: &str) -> bool {
        data.strip_prefix(self.surrogate_prefix.as_str())
            .and_then(|rest| rest.strip_prefix(SURROGATE_DELIMITER))
            .is_some_and(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric()))
    }
}
