use bridge_traits::error::BridgeError;
use core_metadata::MetadataError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("No catalog page found for {path}")]
    NotFound { path: String },

    #[error("Metadata structure error at '{path}': {message}")]
    Structural { path: String, message: String },

    #[error("Metadata error: {0}")]
    Metadata(MetadataError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] BridgeError),

    #[error("Parent of '{path}' is not mapped to a catalog page")]
    OrphanPath { path: String },

    #[error("Run state error: {0}")]
    State(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Whether retrying the same step later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Catalog(e) if e.is_transient())
    }
}

impl From<MetadataError> for SyncError {
    fn from(error: MetadataError) -> Self {
        match error {
            MetadataError::Structural { path, message } => SyncError::Structural { path, message },
            MetadataError::Bridge(e) => SyncError::Catalog(e),
            other => SyncError::Metadata(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
