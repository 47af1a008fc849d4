//! REST API client module for the Kite order management service.
//!
//! This module provides the `KiteClient` for quotes, orders, positions and
//! margins. Every request is authenticated with an `enctoken` obtained
//! through `auth::Authenticator`.

pub mod client;
pub mod error;

pub use client::KiteClient;
pub use error::ApiError;
