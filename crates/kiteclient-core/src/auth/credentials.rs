use std::fmt;

use anyhow::{Context, Result};
use keyring::Entry;
use serde::{Deserialize, Serialize};

const SERVICE_NAME: &str = "kiteclient";

/// Keyring account suffixes, one entry per secret.
const PASSWORD_SUFFIX: &str = "password";
const TOTP_SUFFIX: &str = "totp";
const SESSION_KEY_SUFFIX: &str = "session-key";

/// Every entry kept per user, removed together on `delete`
const FORGET_SUFFIXES: [&str; 3] = [PASSWORD_SUFFIX, TOTP_SUFFIX, SESSION_KEY_SUFFIX];

/// Everything the two-factor handshake needs.
#[derive(Clone)]
pub struct Credentials {
    pub user_id: String,
    pub password: String,
    /// Base32 shared secret used to derive one-time codes
    pub totp_secret: String,
}

impl Credentials {
    pub fn new(
        user_id: impl Into<String>,
        password: impl Into<String>,
        totp_secret: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            password: password.into(),
            totp_secret: totp_secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("password", &"<redacted>")
            .field("totp_secret", &"<redacted>")
            .finish()
    }
}

/// Opaque token issued by the twofa step, never empty.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionToken(String);

impl SessionToken {
    /// Returns `None` for an empty token.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value of the `Authorization` header for authenticated calls.
    pub fn authorization(&self) -> String {
        format!("enctoken {}", self.0)
    }
}

impl TryFrom<String> for SessionToken {
    type Error = &'static str;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SessionToken::new(value).ok_or("session token is empty")
    }
}

impl From<SessionToken> for String {
    fn from(token: SessionToken) -> Self {
        token.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

pub struct CredentialStore;

impl CredentialStore {
    fn entry(user_id: &str, suffix: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &format!("{}:{}", user_id, suffix))
            .context("Failed to create keyring entry")
    }

    /// Store password and TOTP secret in the OS keychain
    pub fn store(credentials: &Credentials) -> Result<()> {
        Self::entry(&credentials.user_id, PASSWORD_SUFFIX)?
            .set_password(&credentials.password)
            .context("Failed to store password in keychain")?;
        Self::entry(&credentials.user_id, TOTP_SUFFIX)?
            .set_password(&credentials.totp_secret)
            .context("Failed to store TOTP secret in keychain")?;
        Ok(())
    }

    /// Retrieve the full credentials for a user from the OS keychain
    pub fn get(user_id: &str) -> Result<Credentials> {
        let password = Self::entry(user_id, PASSWORD_SUFFIX)?
            .get_password()
            .context("Failed to retrieve password from keychain")?;
        let totp_secret = Self::entry(user_id, TOTP_SUFFIX)?
            .get_password()
            .context("Failed to retrieve TOTP secret from keychain")?;
        Ok(Credentials::new(user_id, password, totp_secret))
    }

    /// Delete stored credentials for a user
    /// Remove the stored credentials and session key. Entries that were
    /// never stored are skipped.
    pub fn delete(user_id: &str) -> Result<()> {
        for suffix in FORGET_SUFFIXES {
            match Self::entry(user_id, suffix)?.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => {}
                Err(e) => return Err(e).context("Failed to delete credential from keychain"),
            }
        }
        Ok(())
    }

    /// Check if credentials exist for a user
    pub fn has_credentials(user_id: &str) -> bool {
        [PASSWORD_SUFFIX, TOTP_SUFFIX].iter().all(|suffix| {
            Self::entry(user_id, suffix)
                .map(|e| e.get_password().is_ok())
                .unwrap_or(false)
        })
    }

    /// Key used to encrypt the persisted session, created on first use.
    pub fn session_key(user_id: &str) -> Result<[u8; 32]> {
        let entry = Self::entry(user_id, SESSION_KEY_SUFFIX)?;
        match entry.get_secret() {
            Ok(secret) => secret
                .try_into()
                .map_err(|_| anyhow::anyhow!("Stored session key has the wrong length")),
            Err(keyring::Error::NoEntry) => {
                let key = super::session::SessionCipher::generate_key();
                entry
                    .set_secret(&key)
                    .context("Failed to store session key in keychain")?;
                Ok(key)
            }
            Err(e) => Err(e).context("Failed to retrieve session key from keychain"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_rejects_empty() {
        assert!(SessionToken::new("").is_none());
        let token = SessionToken::new("TOK123").unwrap();
        assert_eq!(token.as_str(), "TOK123");
        assert_eq!(token.authorization(), "enctoken TOK123");
    }

    #[test]
    fn test_session_token_serde() {
        let token: SessionToken = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"abc\"");
        assert!(serde_json::from_str::<SessionToken>("\"\"").is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::new("AB1234", "hunter2", "JBSWY3DPEHPK3PXP");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("AB1234"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("JBSWY3DPEHPK3PXP"));

        let token = SessionToken::new("secret-token").unwrap();
        assert!(!format!("{:?}", token).contains("secret-token"));
    }

    #[test]
    fn test_forget_covers_session_key() {
        for suffix in [PASSWORD_SUFFIX, TOTP_SUFFIX, SESSION_KEY_SUFFIX] {
            assert!(FORGET_SUFFIXES.contains(&suffix), "{} is never deleted", suffix);
        }
    }

    #[test]
    fn test_delete_skips_missing_entries() {
        // Mock entries start empty, so every delete reports NoEntry
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
        assert!(CredentialStore::delete("AB1234").is_ok());
    }
}
