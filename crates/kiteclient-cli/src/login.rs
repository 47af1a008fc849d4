//! Credential resolution and session handling for the CLI.

use std::future::Future;
use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use kiteclient_core::auth::{CredentialStore, Session, SessionCipher, SessionData};
use kiteclient_core::{ApiError, Authenticator, Config, Credentials, KiteClient, SessionToken};

use crate::commands::Command;

pub const USER_ID_VAR: &str = "KITE_USER_ID";
const PASSWORD_VAR: &str = "KITE_PASSWORD";
const TOTP_SECRET_VAR: &str = "KITE_TOTP_SECRET";

fn prompt_line(label: &str) -> Result<String> {
    eprint!("{}: ", label);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let line = line.trim().to_string();
    if line.is_empty() {
        bail!("{} is required", label);
    }
    Ok(line)
}

/// Environment first, then the keychain, then interactive prompts.
fn resolve_credentials(config: &Config) -> Result<Credentials> {
    let user_id = match config.user_id.clone() {
        Some(user_id) => user_id,
        None => prompt_line("User ID")?,
    };

    if let (Ok(password), Ok(secret)) = (std::env::var(PASSWORD_VAR), std::env::var(TOTP_SECRET_VAR)) {
        return Ok(Credentials::new(user_id, password, secret));
    }

    if CredentialStore::has_credentials(&user_id) {
        return CredentialStore::get(&user_id);
    }

    let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;
    let secret = rpassword::prompt_password("TOTP secret: ").context("Failed to read TOTP secret")?;
    Ok(Credentials::new(user_id, password, secret))
}

fn open_session(config: &Config, user_id: &str) -> Result<Session> {
    let key = CredentialStore::session_key(user_id)?;
    Ok(Session::new(config.cache_dir()?, SessionCipher::new(&key)))
}

/// Run the handshake and persist the resulting session.
async fn fresh_login(config: &mut Config, save_credentials: bool) -> Result<SessionToken> {
    let credentials = resolve_credentials(config)?;

    // Remember the user so the next run finds its session
    if config.user_id.as_deref() != Some(credentials.user_id.as_str()) {
        config.user_id = Some(credentials.user_id.clone());
        config.save()?;
    }

    let token = Authenticator::from_config(config)
        .acquire_token(&credentials)
        .await
        .context("Login failed")?;

    persist_session(
        || open_session(config, &credentials.user_id),
        SessionData::new(token.clone(), credentials.user_id.clone()),
    );

    if save_credentials {
        CredentialStore::store(&credentials)?;
        info!(user_id = %credentials.user_id, "Credentials saved to keychain");
    }
    Ok(token)
}

/// Save the session if the store is usable. A token that cannot be cached is
/// still good for this run, so failures are only logged.
fn persist_session<F>(open: F, data: SessionData) -> bool
where
    F: FnOnce() -> Result<Session>,
{
    let saved = open().and_then(|mut session| {
        session.update(data);
        session.save()
    });
    if let Err(e) = &saved {
        warn!(error = %e, "Could not save session, continuing without it");
    }
    saved.is_ok()
}

fn cached_token(config: &Config) -> Option<SessionToken> {
    let user_id = config.user_id.as_deref()?;
    let mut session = match open_session(config, user_id) {
        Ok(session) => session,
        Err(e) => {
            warn!(error = %e, "Could not open session store");
            return None;
        }
    };
    match session.load() {
        Ok(true) => session.token().cloned(),
        Ok(false) => None,
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable session file");
            None
        }
    }
}

pub async fn login(config: &mut Config, save_credentials: bool) -> Result<()> {
    fresh_login(config, save_credentials).await?;
    eprintln!(
        "Logged in as {}",
        config.user_id.as_deref().unwrap_or_default()
    );
    Ok(())
}

pub fn logout(config: &Config, forget: bool) -> Result<()> {
    let Some(user_id) = config.user_id.as_deref() else {
        bail!("No user configured - nothing to log out");
    };

    open_session(config, user_id)?.clear()?;
    if forget {
        CredentialStore::delete(user_id)?;
    }
    eprintln!("Logged out {}", user_id);
    Ok(())
}

fn is_auth_failure(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<ApiError>()
        .map(ApiError::is_auth_failure)
        .unwrap_or(false)
}

/// Run `execute` with `token`. If a cached token is rejected as expired,
/// log in through `login` and run it once more with the new token.
async fn with_relogin<T, E, EFut, L, LFut>(
    token: SessionToken,
    fresh: bool,
    execute: E,
    login: L,
) -> Result<T>
where
    E: Fn(SessionToken) -> EFut,
    EFut: Future<Output = Result<T>>,
    L: FnOnce() -> LFut,
    LFut: Future<Output = Result<SessionToken>>,
{
    match execute(token).await {
        Err(e) if !fresh && is_auth_failure(&e) => {
            warn!("Session token rejected, logging in again");
            let token = login().await?;
            execute(token).await
        }
        result => result,
    }
}

/// Execute an API command, logging in first if there is no stored session
/// and once more if the stored token turns out to be expired.
pub async fn run_authenticated(config: &mut Config, command: &Command) -> Result<Value> {
    let (token, fresh) = match cached_token(config) {
        Some(token) => (token, false),
        None => (fresh_login(config, false).await?, true),
    };
    let client = KiteClient::from_config(token.clone(), config)?;

    with_relogin(
        token,
        fresh,
        |token| {
            let client = client.with_token(token);
            async move { command.execute(&client).await }
        },
        move || fresh_login(config, false),
    )
    .await
}
