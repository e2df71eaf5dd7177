//! Token endpoint client
//!
//! Implements the two grants the catalog's Keycloak realm accepts for a
//! command-line client: resource-owner password and refresh token.
//!
//! # Security
//!
//! - Passwords and tokens are sent only in form bodies, never in URLs
//! - Never logs sensitive values

use crate::error::{AuthError, Result};
use crate::types::{Credentials, OAuthTokens};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::time::Clock;
use core_runtime::logging::redact_if_sensitive;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub const SCIENCEBASE_TOKEN_URL: &str =
    "https://www.sciencebase.gov/auth/realms/ScienceBase/protocol/openid-connect/token";
pub const SCIENCEBASE_CLIENT_ID: &str = "catalog";

/// Where and as whom to request tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEndpoint {
    pub token_url: String,
    pub client_id: String,
}

impl Default for TokenEndpoint {
    fn default() -> Self {
        Self {
            token_url: SCIENCEBASE_TOKEN_URL.to_string(),
            client_id: SCIENCEBASE_CLIENT_ID.to_string(),
        }
    }
}

pub struct TokenClient {
    endpoint: TokenEndpoint,
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
}

impl TokenClient {
    pub fn new(
        endpoint: TokenEndpoint,
        http_client: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            endpoint,
            http_client,
            clock,
        }
    }

    /// Sign in with username and password
    #[instrument(
        skip(self, credentials),
        fields(username = %redact_if_sensitive("username", &credentials.username))
    )]
    pub async fn password_grant(&self, credentials: &Credentials) -> Result<OAuthTokens> {
        debug!("Requesting token with password grant");
        let request = HttpRequest::new(HttpMethod::Post, self.endpoint.token_url.clone())
            .form(&[
                ("grant_type", "password"),
                ("client_id", self.endpoint.client_id.as_str()),
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        if !response.is_success() {
            let reason = error_body(&response);
            warn!(status = response.status, "Password grant rejected");
            return Err(AuthError::AuthenticationFailed {
                username: credentials.username.clone(),
                reason,
            });
        }

        self.parse_tokens(&response, None)
    }

    /// Exchange a refresh token for a new token set
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<OAuthTokens> {
        debug!("Refreshing access token");
        let request = HttpRequest::new(HttpMethod::Post, self.endpoint.token_url.clone())
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.endpoint.client_id.as_str()),
                ("refresh_token", refresh_token),
            ])
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| AuthError::TokenRefreshFailed(e.to_string()))?;

        if !response.is_success() {
            warn!(status = response.status, "Token refresh rejected");
            return Err(AuthError::TokenRefreshFailed(format!(
                "Token endpoint returned {}: {}",
                response.status,
                error_body(&response)
            )));
        }

        self.parse_tokens(&response, Some(refresh_token))
    }

    fn parse_tokens(
        &self,
        response: &HttpResponse,
        previous_refresh: Option<&str>,
    ) -> Result<OAuthTokens> {
        let token_response: TokenResponse = response
            .json()
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        debug!(expires_in = token_response.expires_in, "Received access token");

        Ok(OAuthTokens::new(
            token_response.access_token,
            token_response
                .refresh_token
                .or_else(|| previous_refresh.map(str::to_string)),
            token_response.expires_in,
            self.clock.now(),
        ))
    }
}

fn error_body(response: &HttpResponse) -> String {
    response
        .text()
        .unwrap_or_else(|_| "Unable to read error response".to_string())
}

/// Token response from the token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    300
}
