//! Time-based one-time codes for the two-factor step.
//!
//! Standard RFC 6238 parameters: SHA-1, 6 digits, 30-second step.

use std::fmt;

use totp_rs::{Algorithm, Secret, TOTP};

use super::AuthError;

const DIGITS: usize = 6;
const STEP_SECS: u64 = 30;

pub struct TotpGenerator {
    totp: TOTP,
}

impl TotpGenerator {
    /// Build a generator from a base32 shared secret.
    ///
    /// Whitespace, padding and lowercase letters are accepted, since secrets
    /// are often copied from a setup page in grouped or lowercase form.
    pub fn from_base32(secret: &str) -> Result<Self, AuthError> {
        let normalized: String = secret
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '=')
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if normalized.is_empty() {
            return Err(AuthError::InvalidSecret("secret is empty".to_string()));
        }

        let bytes = Secret::Encoded(normalized)
            .to_bytes()
            .map_err(|e| AuthError::InvalidSecret(format!("{:?}", e)))?;

        // new_unchecked: shared secrets shorter than 128 bits are still issued
        // by some providers and must keep working.
        let totp = TOTP::new_unchecked(Algorithm::SHA1, DIGITS, 1, STEP_SECS, bytes);
        Ok(Self { totp })
    }

    /// Code for the current 30-second window.
    pub fn current(&self) -> Result<String, AuthError> {
        self.totp
            .generate_current()
            .map_err(|e| AuthError::InvalidSecret(format!("system clock error: {}", e)))
    }

    /// Code for the window containing `unix_secs`.
    pub fn at(&self, unix_secs: u64) -> String {
        self.totp.generate(unix_secs)
    }
}

impl fmt::Debug for TotpGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TotpGenerator").finish_non_exhaustive()
    }
}
