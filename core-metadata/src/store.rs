//! File-backed metadata documents
//!
//! A [`MetadataFile`] is a parsed record plus the path it came from. The
//! first edit in a session copies the untouched file to a sibling with the
//! [`BACKUP_SUFFIX`]; that copy is created with an exclusive create and is
//! never overwritten, so it always holds the record as it was before this
//! tool first touched it.

use bridge_traits::storage::FileSystemAccess;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::document::MetadataDocument;
use crate::error::Result;
use crate::text::{TextEditOutcome, TextEdits};

pub const BACKUP_SUFFIX: &str = "_orig";

/// `meta.xml` -> `meta.xml_orig`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Whether a path is a backup made by [`MetadataFile`]
pub fn is_backup(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(BACKUP_SUFFIX))
        .unwrap_or(false)
}

pub struct MetadataFile {
    fs: Arc<dyn FileSystemAccess>,
    path: PathBuf,
    document: MetadataDocument,
    backed_up: bool,
}

impl MetadataFile {
    #[instrument(skip(fs, path), fields(path = %path.display()))]
    pub async fn open(fs: Arc<dyn FileSystemAccess>, path: &Path) -> Result<Self> {
        let bytes = fs.read_file(path).await?;
        let document = MetadataDocument::parse(&bytes)?;
        Ok(Self {
            fs,
            path: path.to_path_buf(),
            document,
            backed_up: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &MetadataDocument {
        &self.document
    }

    /// Copy the file to its backup path unless a backup already exists.
    /// Returns `true` when this call created the backup.
    pub async fn ensure_backup(&mut self) -> Result<bool> {
        if self.backed_up {
            return Ok(false);
        }
        let created = self
            .fs
            .copy_file_new(&self.path, &backup_path(&self.path))
            .await?;
        self.backed_up = true;
        if created {
            debug!(path = %self.path.display(), "Saved original metadata");
        }
        Ok(created)
    }

    /// Apply `edit` to the in-memory document, backing the file up first
    pub async fn edit<F, T>(&mut self, edit: F) -> Result<T>
    where
        F: FnOnce(&mut MetadataDocument) -> Result<T>,
    {
        self.ensure_backup().await?;
        edit(&mut self.document)
    }

    /// Serialize the whole document back to its path, optionally passing
    /// the text through `text_edits` first
    pub async fn save(&self, text_edits: Option<&TextEdits>) -> Result<Option<TextEditOutcome>> {
        let xml = self.document.to_xml_string()?;
        let (xml, outcome) = match text_edits {
            Some(edits) if !edits.is_empty() => {
                let outcome = edits.apply(&xml);
                (outcome.text.clone(), Some(outcome))
            }
            _ => (xml, None),
        };
        self.fs.write_file(&self.path, Bytes::from(xml)).await?;
        debug!(path = %self.path.display(), "Wrote metadata");
        Ok(outcome)
    }

    pub fn into_document(self) -> MetadataDocument {
        self.document
    }
}
