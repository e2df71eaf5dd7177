use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    /// An element the operation needs as a container is missing
    #[error("Structural error at '{path}': {message}")]
    Structural { path: String, message: String },

    #[error("Element not found: {0}")]
    NotFound(String),

    #[error("Failed to parse metadata document: {0}")]
    Parse(String),

    #[error("Failed to serialize metadata document: {0}")]
    Serialize(String),

    #[error("Invalid element path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

impl MetadataError {
    pub(crate) fn structural(path: impl Into<String>, message: impl Into<String>) -> Self {
        MetadataError::Structural {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;
