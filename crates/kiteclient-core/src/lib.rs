//! Client library for the Kite trading API.
//!
//! - `auth`: two-factor login producing a `SessionToken`, plus credential
//!   and session persistence helpers
//! - `api`: `KiteClient`, the authenticated wrapper around the REST endpoints
//! - `models`: request parameters, response types and constant tables
//! - `config`: on-disk configuration
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use kiteclient_core::{acquire_token, KiteClient};
//!
//! let token = acquire_token("AB1234", "password", "JBSWY3DPEHPK3PXP").await?;
//! let client = KiteClient::new(token)?;
//! let positions = client.positions().await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiError, KiteClient};
pub use auth::{acquire_token, AuthError, Authenticator, Credentials, RetryPolicy, SessionToken};
pub use config::Config;
