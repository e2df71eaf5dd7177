//! Catalog session
//!
//! Holds the credentials and the current token set for one run. Callers ask
//! for a bearer token before every catalog request; the session signs in on
//! first use, refreshes shortly before expiry, and signs in again when the
//! refresh is rejected. After the catalog itself answers 401 the caller
//! invalidates the session so the next token request re-authenticates.

use crate::error::{AuthError, Result};
use crate::oauth::TokenClient;
use crate::types::{Credentials, OAuthTokens};
use bridge_traits::time::Clock;
use core_runtime::logging::redact_if_sensitive;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// Refresh this many seconds before the access token expires
pub const DEFAULT_REFRESH_BUFFER_SECS: i64 = 60;

pub struct CatalogSession {
    token_client: TokenClient,
    credentials: Credentials,
    clock: Arc<dyn Clock>,
    refresh_buffer_secs: i64,
    tokens: Mutex<Option<OAuthTokens>>,
}

impl CatalogSession {
    pub fn new(token_client: TokenClient, credentials: Credentials, clock: Arc<dyn Clock>) -> Self {
        Self {
            token_client,
            credentials,
            clock,
            refresh_buffer_secs: DEFAULT_REFRESH_BUFFER_SECS,
            tokens: Mutex::new(None),
        }
    }

    pub fn with_refresh_buffer(mut self, seconds: i64) -> Self {
        self.refresh_buffer_secs = seconds;
        self
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// Sign in now instead of on first use
    #[instrument(
        skip(self),
        fields(username = %redact_if_sensitive("username", &self.credentials.username))
    )]
    pub async fn login(&self) -> Result<()> {
        if self.credentials.password.is_empty() {
            return Err(AuthError::MissingCredentials(
                "password is empty".to_string(),
            ));
        }
        let tokens = self.token_client.password_grant(&self.credentials).await?;
        *self.tokens.lock().await = Some(tokens);
        info!("Signed in to catalog");
        Ok(())
    }

    /// A bearer token valid for at least the refresh buffer
    pub async fn access_token(&self) -> Result<String> {
        let mut guard = self.tokens.lock().await;
        let now = self.clock.now();

        if let Some(tokens) = guard.as_ref() {
            if !tokens.is_expired_with_buffer(now, self.refresh_buffer_secs) {
                return Ok(tokens.access_token.clone());
            }
        }

        let refresh_token = guard.as_ref().and_then(|t| t.refresh_token.clone());
        let fresh = match refresh_token {
            Some(refresh_token) => match self.token_client.refresh(&refresh_token).await {
                Ok(tokens) => tokens,
                Err(e) => {
                    warn!(error = %e, "Refresh failed, signing in again");
                    self.token_client.password_grant(&self.credentials).await?
                }
            },
            None => self.token_client.password_grant(&self.credentials).await?,
        };

        let access_token = fresh.access_token.clone();
        *guard = Some(fresh);
        Ok(access_token)
    }

    /// Drop the current tokens so the next request signs in again
    pub async fn invalidate(&self) {
        *self.tokens.lock().await = None;
        info!("Catalog session invalidated");
    }

    pub async fn is_authenticated(&self) -> bool {
        self.tokens.lock().await.is_some()
    }
}

impl std::fmt::Debug for CatalogSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogSession")
            .field("credentials", &self.credentials)
            .field("refresh_buffer_secs", &self.refresh_buffer_secs)
            .finish()
    }
}
