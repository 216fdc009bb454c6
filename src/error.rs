use thiserror::Error;

/// Failure outcomes of a gated login attempt.
///
/// Both credential-failure causes (unknown identity, wrong secret) surface as
/// [`AuthError::InvalidCredentials`]; callers cannot distinguish them, which
/// prevents user enumeration via differing responses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Too many login attempts. Please try again in {retry_after_seconds} seconds")]
    LockedOut { retry_after_seconds: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max_attempts must be at least 1")]
    ZeroMaxAttempts,

    #[error("lock_window must be non-zero")]
    ZeroLockWindow,
}

impl AuthError {
    /// Seconds until the caller may retry, when known.
    pub fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            AuthError::LockedOut {
                retry_after_seconds,
            } => Some(*retry_after_seconds),
            AuthError::InvalidCredentials => None,
        }
    }
}
