//! Authentication module for acquiring and keeping session tokens.
//!
//! This module provides:
//! - `Authenticator`: the two-step login (password, then TOTP) that yields
//!   a `SessionToken`, retried a bounded number of times
//! - `Credentials`, `SessionToken`: the inputs and output of the handshake
//! - `CredentialStore`: OS-level storage of password and TOTP secret via keyring
//! - `Session`: the acquired token persisted to disk, encrypted
//!
//! Tokens are not renewed automatically. When an authenticated call fails
//! with `ApiError::Unauthorized`, run the handshake again.

pub mod authenticator;
pub mod credentials;
pub mod error;
pub mod session;
pub mod totp;

pub use authenticator::{acquire_token, Authenticator, RetryPolicy};
pub use credentials::{CredentialStore, Credentials, SessionToken};
pub use error::AuthError;
pub use session::{Session, SessionCipher, SessionData};
pub use totp::TotpGenerator;
