//! Login orchestration: lockout check composed with credential verification.
//!
//! [`AuthGate`] sits between the login endpoint and whatever service actually
//! verifies credentials. It consults the [`AttemptTracker`] before the
//! verifier runs, short-circuits with a lockout outcome when the key is
//! blocked, and reports the verification result back into the tracker.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AuthError;
use crate::tracker::AttemptTracker;

/// Verifies credentials for an identity key.
///
/// Implemented by the surrounding authentication layer (user lookup plus
/// password comparison, typically). Returning `Option` rather than a cause
/// keeps "unknown identity" and "wrong secret" structurally
/// indistinguishable, so callers cannot enumerate which identities exist.
#[async_trait]
pub trait CredentialVerifier: Send + Sync + 'static {
    /// The secret material presented by the caller; opaque to the gate.
    type Credentials: Send + Sync;

    /// The verified identity returned on success.
    type Identity: Send;

    async fn verify(
        &self,
        key: &str,
        credentials: &Self::Credentials,
    ) -> Option<Self::Identity>;
}

/// Outcome of a gated login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome<I> {
    /// Credentials verified; attempt state for the key has been cleared.
    Success(I),
    /// Verification failed (unknown identity or wrong secret — deliberately
    /// not distinguished); the failure has been recorded against the key.
    InvalidCredentials,
    /// The key is locked out; the verifier was not invoked and the failure
    /// counter was not advanced.
    LockedOut { retry_after_seconds: u64 },
}

impl<I> AuthOutcome<I> {
    /// Convert into a `Result` for callers that propagate with `?`.
    pub fn into_result(self) -> Result<I, AuthError> {
        match self {
            AuthOutcome::Success(identity) => Ok(identity),
            AuthOutcome::InvalidCredentials => Err(AuthError::InvalidCredentials),
            AuthOutcome::LockedOut {
                retry_after_seconds,
            } => Err(AuthError::LockedOut {
                retry_after_seconds,
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Success(_))
    }
}

/// Gate that guards a credential verifier with lockout tracking.
///
/// # Thread Safety
///
/// The gate is safe to share across tasks; it holds the tracker and the
/// verifier behind `Arc` and keeps no per-attempt state of its own.
pub struct AuthGate<V: CredentialVerifier> {
    tracker: Arc<AttemptTracker>,
    verifier: Arc<V>,
}

impl<V: CredentialVerifier> AuthGate<V> {
    pub fn new(tracker: Arc<AttemptTracker>, verifier: Arc<V>) -> Self {
        Self { tracker, verifier }
    }

    /// Get the tracker this gate reports into.
    pub fn tracker(&self) -> &Arc<AttemptTracker> {
        &self.tracker
    }

    /// Run one login attempt for `key`.
    ///
    /// The lockout check runs first and short-circuits: while a key is
    /// blocked the verifier is never invoked, so a locked attempt costs no
    /// verification work, leaks no timing signal about whether the identity
    /// exists, and does not extend the lock window.
    pub async fn attempt(
        &self,
        key: &str,
        credentials: &V::Credentials,
    ) -> AuthOutcome<V::Identity> {
        if self.tracker.is_blocked(key) {
            let retry_after_seconds = self.tracker.remaining_lock_seconds(key);
            tracing::warn!(key, retry_after_seconds, "Login attempt rejected while locked out");
            return AuthOutcome::LockedOut {
                retry_after_seconds,
            };
        }

        match self.verifier.verify(key, credentials).await {
            Some(identity) => {
                self.tracker.record_success(key);
                tracing::debug!(key, "Login succeeded");
                AuthOutcome::Success(identity)
            }
            None => {
                self.tracker.record_failure(key);
                tracing::debug!(key, "Login failed");
                AuthOutcome::InvalidCredentials
            }
        }
    }
}
