//! Lockout configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for failed-login lockout behavior.
///
/// The defaults allow 5 failed attempts within a rolling 60 second window
/// before a key is blocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutConfig {
    /// Whether lockout tracking is active. When `false` the tracker records
    /// nothing and never blocks.
    pub enabled: bool,

    /// Number of failed attempts within the window that triggers a block.
    pub max_attempts: u32,

    /// How long a key stays blocked after its most recent failure.
    pub lock_window: Duration,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 5,
            lock_window: Duration::from_secs(60),
        }
    }
}

impl LockoutConfig {
    /// Configuration with lockout tracking turned off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Check that the configuration is usable.
    ///
    /// A zero `max_attempts` would block every key on its first failure
    /// check, and a zero `lock_window` would expire records the instant they
    /// are written; both are rejected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroMaxAttempts);
        }
        if self.lock_window.is_zero() {
            return Err(ConfigError::ZeroLockWindow);
        }
        Ok(())
    }
}
