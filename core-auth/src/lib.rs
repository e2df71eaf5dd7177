//! # Authentication Module
//!
//! Explicit catalog session with token refresh and re-authentication.
//!
//! ## Overview
//!
//! This module signs in to the ScienceBase identity provider with a
//! username and password and hands out bearer tokens to the catalog
//! connector. There is no process-wide session: a [`CatalogSession`] is
//! created once per run and passed to whatever needs catalog access.
//!
//! ## Features
//!
//! - Resource-owner password grant against the Keycloak token endpoint
//! - Refresh before expiry, with a full sign-in when refresh is rejected
//! - Forced re-authentication after the catalog answers 401
//! - Tokens and passwords redacted from `Debug` output

pub mod error;
pub mod oauth;
pub mod session;
pub mod types;

pub use error::{AuthError, Result};
pub use oauth::{TokenClient, TokenEndpoint};
pub use session::CatalogSession;
pub use types::{Credentials, OAuthTokens};
