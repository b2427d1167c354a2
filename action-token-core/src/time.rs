//! Time configuration for token validity

use chrono::Utc;

/// Default token lifetime in seconds (10 minutes)
pub const DEFAULT_TOKEN_DURATION: i64 = 600;

/// Controls when a token is considered issued and how long it stays valid.
///
/// `start_time` defaults to the current Unix time at issuance. The resulting
/// expiry is absolute, so a token issued with `start_time: Some(0)` is expired
/// the moment it is minted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTimeConfig {
    /// Unix timestamp the token is issued at (None = now)
    pub start_time: Option<i64>,
    /// Lifetime in seconds
    pub duration: i64,
}

impl Default for TokenTimeConfig {
    fn default() -> Self {
        Self {
            start_time: None,
            duration: DEFAULT_TOKEN_DURATION,
        }
    }
}

impl TokenTimeConfig {
    /// Config that issues now and lives for `duration` seconds
    pub fn with_duration(duration: i64) -> Self {
        Self {
            start_time: None,
            duration,
        }
    }

    /// Absolute expiry as a Unix timestamp
    pub fn expiration(&self) -> i64 {
        let start_time = self.start_time.unwrap_or_else(|| Utc::now().timestamp());
        start_time.saturating_add(self.duration)
    }
}
