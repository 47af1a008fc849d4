use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials - no session token after {attempts} attempts")]
    InvalidCredentials { attempts: u32 },

    #[error("Login rejected: {0}")]
    LoginRejected(String),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response from login service: {0}")]
    UpstreamFormat(String),

    #[error("Invalid TOTP secret: {0}")]
    InvalidSecret(String),
}
