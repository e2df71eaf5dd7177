//! Error types for the ScienceBase provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// ScienceBase provider errors
#[derive(Error, Debug)]
pub enum ScienceBaseError {
    /// Could not obtain a bearer token
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API request returned an error status
    #[error("ScienceBase API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Item does not exist or is not visible to this account
    #[error("Item not found: {item_id}")]
    ItemNotFound { item_id: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Local file given for upload is unusable
    #[error("Invalid upload file: {0}")]
    InvalidFile(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for ScienceBase operations
pub type Result<T> = std::result::Result<T, ScienceBaseError>;

impl From<core_auth::AuthError> for ScienceBaseError {
    fn from(error: core_auth::AuthError) -> Self {
        ScienceBaseError::AuthenticationFailed(error.to_string())
    }
}

impl From<ScienceBaseError> for BridgeError {
    fn from(error: ScienceBaseError) -> Self {
        match error {
            ScienceBaseError::AuthenticationFailed(msg) => BridgeError::Unauthorized(msg),
            ScienceBaseError::ApiError {
                status_code: 401 | 403,
                message,
            } => BridgeError::Unauthorized(message),
            ScienceBaseError::ApiError {
                status_code,
                message,
            } => BridgeError::OperationFailed(format!(
                "API error (status {}): {}",
                status_code, message
            )),
            ScienceBaseError::ItemNotFound { item_id } => BridgeError::NotFound(item_id),
            ScienceBaseError::ParseError(msg) => {
                BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            ScienceBaseError::InvalidFile(msg) => {
                BridgeError::OperationFailed(format!("Invalid upload file: {}", msg))
            }
            ScienceBaseError::BridgeError(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ScienceBaseError::ApiError {
            status_code: 500,
            message: "Internal error".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "ScienceBase API error (status 500): Internal error"
        );
    }

    #[test]
    fn test_error_conversion() {
        let not_found: BridgeError = ScienceBaseError::ItemNotFound {
            item_id: "abc".to_string(),
        }
        .into();
        assert!(matches!(not_found, BridgeError::NotFound(id) if id == "abc"));

        let denied: BridgeError = ScienceBaseError::ApiError {
            status_code: 401,
            message: "expired".to_string(),
        }
        .into();
        assert!(matches!(denied, BridgeError::Unauthorized(_)));

        let auth: BridgeError =
            ScienceBaseError::AuthenticationFailed("bad password".to_string()).into();
        assert!(matches!(auth, BridgeError::Unauthorized(_)));
    }
}
