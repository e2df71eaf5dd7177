//! File System Abstraction
//!
//! Provides a platform-agnostic trait for the file I/O the sync engine needs:
//! reading and rewriting metadata documents, taking one-time backups and
//! walking the dataset tree.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File metadata information
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub created_at: Option<i64>,
    /// Last modification, Unix seconds
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// File system access trait
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn backup(fs: &dyn FileSystemAccess, doc: &Path) -> Result<bool> {
///     let backup = doc.with_extension("xml_orig");
///     fs.copy_file_new(doc, &backup).await
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write data to a file, creating or truncating it
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Copy a file, overwriting the destination
    async fn copy_file(&self, from: &Path, to: &Path) -> Result<()>;

    /// Copy a file only if the destination does not exist yet
    ///
    /// The destination is opened with an exclusive create, so two writers
    /// racing on the same path cannot both succeed. Returns `true` when the
    /// copy was made and `false` when the destination already existed.
    async fn copy_file_new(&self, from: &Path, to: &Path) -> Result<bool>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// List all entries in a directory
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;
}
