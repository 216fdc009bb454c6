//! Brute-force lockout guard for authentication flows
//!
//! This crate tracks failed login attempts per identity key in process
//! memory and blocks a key once it accumulates too many failures within a
//! rolling time window. Blocked keys unlock automatically when the window
//! elapses; no background job is required.
//!
//! It does not hash or verify passwords, persist state across restarts, or
//! coordinate between service instances. The credential check itself is
//! supplied by the application through the [`CredentialVerifier`] trait, and
//! [`AuthGate`] composes the two: lockout check first, then verification,
//! then the result is reported back into the [`AttemptTracker`].
//!
//! See [`AttemptTracker`] for the tracking core and [`AuthGate`] for the
//! login orchestration.
//!
//! ```rust
//! use std::sync::Arc;
//! use portcullis::{AttemptTracker, AuthGate, AuthOutcome, CredentialVerifier, LockoutConfig};
//!
//! struct Verifier;
//!
//! #[async_trait::async_trait]
//! impl CredentialVerifier for Verifier {
//!     type Credentials = String;
//!     type Identity = u64;
//!
//!     async fn verify(&self, key: &str, credentials: &String) -> Option<u64> {
//!         // User lookup and password comparison live here.
//!         (key == "admin" && credentials == "hunter2").then_some(1)
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let tracker = Arc::new(AttemptTracker::new(LockoutConfig::default()));
//! let gate = AuthGate::new(tracker, Arc::new(Verifier));
//!
//! match gate.attempt("admin", &"hunter2".to_string()).await {
//!     AuthOutcome::Success(user_id) => assert_eq!(user_id, 1),
//!     AuthOutcome::InvalidCredentials => unreachable!(),
//!     AuthOutcome::LockedOut { .. } => unreachable!(),
//! }
//! # }
//! ```
pub mod clock;
pub mod config;
pub mod error;
pub mod gate;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LockoutConfig;
pub use error::{AuthError, ConfigError};
pub use gate::{AuthGate, AuthOutcome, CredentialVerifier};
pub use tracker::{AttemptTracker, LockoutStatus};
