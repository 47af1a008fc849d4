//! Two-factor login against the Kite web login service.
//!
//! One attempt is two form posts on a single cookie-carrying session:
//! `/api/login` with user id and password, then `/api/twofa` with the
//! request id from the first response and a fresh TOTP code. The session
//! token comes back as the `enctoken` cookie of the second response.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{AuthError, Credentials, SessionToken, TotpGenerator};
use crate::config::{Config, DEFAULT_REQUEST_TIMEOUT_SECS};

// ============================================================================
// Constants
// ============================================================================

/// Root of the web login service
pub const DEFAULT_LOGIN_ROOT: &str = "https://kite.zerodha.com";

const LOGIN_PATH: &str = "/api/login";
const TWOFA_PATH: &str = "/api/twofa";

/// Cookie carrying the session token after a successful twofa step
const TOKEN_COOKIE: &str = "enctoken";

/// Attempts before giving up, counting the first one.
/// A code generated right before a window boundary may be rejected once,
/// but five rejections in a row mean the credentials are wrong.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Constant delay between attempts in seconds
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 1;

/// Bounded constant-interval retry for the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    status: Option<String>,
    message: Option<String>,
    data: Option<LoginData>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    request_id: Option<String>,
    user_id: Option<String>,
}

/// Output of the first step, consumed by the second.
struct LoginAttempt {
    request_id: String,
    user_id: String,
}

/// Acquires session tokens. Holds configuration only, so one instance can
/// serve any number of concurrent logins.
#[derive(Debug, Clone)]
pub struct Authenticator {
    login_root: String,
    retry: RetryPolicy,
    timeout: Duration,
}

impl Default for Authenticator {
    fn default() -> Self {
        Self::new()
    }
}

impl Authenticator {
    pub fn new() -> Self {
        Self {
            login_root: DEFAULT_LOGIN_ROOT.to_string(),
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            login_root: config.login_root.clone(),
            retry: RetryPolicy {
                max_attempts: config.login_max_attempts,
                interval: Duration::from_secs(config.login_retry_interval_secs),
            },
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// Point the handshake at a different login service root.
    pub fn with_login_root(mut self, login_root: impl Into<String>) -> Self {
        self.login_root = login_root.into();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Run the two-step handshake until it yields a token or attempts run out.
    ///
    /// Only an attempt that completes without an `enctoken` cookie is retried.
    /// Transport failures, a rejected password and malformed login responses
    /// are returned immediately.
    pub async fn acquire_token(&self, credentials: &Credentials) -> Result<SessionToken, AuthError> {
        let totp = TotpGenerator::from_base32(&credentials.totp_secret)?;
        let max_attempts = self.retry.max_attempts.max(1);

        let mut attempt = 1;
        loop {
            if let Some(token) = self.attempt(credentials, &totp).await? {
                info!(user_id = %credentials.user_id, attempt, "Session token acquired");
                return Ok(token);
            }

            if attempt >= max_attempts {
                warn!(user_id = %credentials.user_id, attempts = attempt, "Giving up on login");
                return Err(AuthError::InvalidCredentials { attempts: attempt });
            }

            warn!(
                user_id = %credentials.user_id,
                attempt,
                retry_in_ms = self.retry.interval.as_millis() as u64,
                "No session token in twofa response, retrying"
            );
            tokio::time::sleep(self.retry.interval).await;
            attempt += 1;
        }
    }

    /// One full handshake. `Ok(None)` means the service answered but issued
    /// no token.
    async fn attempt(
        &self,
        credentials: &Credentials,
        totp: &TotpGenerator,
    ) -> Result<Option<SessionToken>, AuthError> {
        // Fresh cookie jar per attempt: nothing leaks between logins.
        let client = Client::builder()
            .cookie_store(true)
            .timeout(self.timeout)
            .build()?;

        let login = self.login(&client, credentials).await?;
        let twofa_value = totp.current()?;

        let response = client
            .post(self.url(TWOFA_PATH))
            .form(&[
                ("request_id", login.request_id.as_str()),
                ("twofa_value", twofa_value.as_str()),
                ("user_id", login.user_id.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let token = response
            .cookies()
            .find(|c| c.name() == TOKEN_COOKIE)
            .and_then(|c| SessionToken::new(c.value()));

        if token.is_none() {
            debug!(status = %status, "twofa response carried no {} cookie", TOKEN_COOKIE);
        }
        Ok(token)
    }

    async fn login(&self, client: &Client, credentials: &Credentials) -> Result<LoginAttempt, AuthError> {
        debug!(user_id = %credentials.user_id, "Submitting login");

        let response = client
            .post(self.url(LOGIN_PATH))
            .form(&[
                ("user_id", credentials.user_id.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        Self::parse_login(status, &body, &credentials.user_id)
    }

    fn parse_login(
        status: reqwest::StatusCode,
        body: &str,
        submitted_user_id: &str,
    ) -> Result<LoginAttempt, AuthError> {
        let parsed: LoginResponse = serde_json::from_str(body).map_err(|e| {
            AuthError::UpstreamFormat(format!("login response ({}) is not JSON: {}", status, e))
        })?;

        if parsed.status.as_deref() == Some("error") {
            return Err(AuthError::LoginRejected(
                parsed.message.unwrap_or_else(|| format!("status {}", status)),
            ));
        }

        let data = parsed
            .data
            .ok_or_else(|| AuthError::UpstreamFormat("login response has no data".to_string()))?;

        let request_id = data
            .request_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AuthError::UpstreamFormat("login response has no request_id".to_string()))?;

        // The service may normalize the id (e.g. case); fall back to what was sent.
        let user_id = data
            .user_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| submitted_user_id.to_string());

        Ok(LoginAttempt { request_id, user_id })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.login_root.trim_end_matches('/'), path)
    }
}

/// Acquire a session token with the default login service and retry policy.
pub async fn acquire_token(
    user_id: &str,
    password: &str,
    totp_secret: &str,
) -> Result<SessionToken, AuthError> {
    Authenticator::new()
        .acquire_token(&Credentials::new(user_id, password, totp_secret))
        .await
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    #[test]
    fn test_default_retry_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.interval, Duration::from_secs(1));
    }

    #[test]
    fn test_parse_login_success() {
        let body = r#"{"status":"success","data":{"user_id":"U1","request_id":"R1","twofa_type":"totp"}}"#;
        let login = Authenticator::parse_login(StatusCode::OK, body, "u1").unwrap();
        assert_eq!(login.request_id, "R1");
        assert_eq!(login.user_id, "U1");
    }

    #[test]
    fn test_parse_login_falls_back_to_submitted_user_id() {
        let body = r#"{"data":{"request_id":"R1"}}"#;
        let login = Authenticator::parse_login(StatusCode::OK, body, "AB1234").unwrap();
        assert_eq!(login.user_id, "AB1234");
    }

    #[test]
    fn test_parse_login_missing_request_id() {
        let body = r#"{"data":{"user_id":"U1"}}"#;
        assert!(matches!(
            Authenticator::parse_login(StatusCode::OK, body, "U1"),
            Err(AuthError::UpstreamFormat(_))
        ));
    }

    #[test]
    fn test_parse_login_not_json() {
        assert!(matches!(
            Authenticator::parse_login(StatusCode::BAD_GATEWAY, "<html>502</html>", "U1"),
            Err(AuthError::UpstreamFormat(_))
        ));
    }

    #[test]
    fn test_parse_login_rejected() {
        let body = r#"{"status":"error","message":"Invalid `user_id` or `password`.","data":null,"error_type":"InputException"}"#;
        match Authenticator::parse_login(StatusCode::BAD_REQUEST, body, "U1") {
            Err(AuthError::LoginRejected(msg)) => assert!(msg.contains("password")),
            other => panic!("expected LoginRejected, got {:?}", other.map(|l| l.request_id)),
        }
    }

    #[test]
    fn test_url_join() {
        let auth = Authenticator::new().with_login_root("http://127.0.0.1:8080/");
        assert_eq!(auth.url(LOGIN_PATH), "http://127.0.0.1:8080/api/login");
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            login_max_attempts: 3,
            login_retry_interval_secs: 2,
            ..Config::default()
        };
        let auth = Authenticator::from_config(&config);
        assert_eq!(auth.retry_policy().max_attempts, 3);
        assert_eq!(auth.retry_policy().interval, Duration::from_secs(2));
    }
}
