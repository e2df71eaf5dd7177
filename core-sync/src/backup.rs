//! Backups and snapshots of the local records
//!
//! Every record edited by this tool has a `<name>_orig` sibling holding the
//! record as it was before the first edit. These helpers put the originals
//! back, remove them, or copy the current records aside.

use bridge_traits::storage::FileSystemAccess;
use chrono::NaiveDate;
use core_metadata::store::{is_backup, BACKUP_SUFFIX};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::path::{discover_documents, walk_files};

/// Record path a backup was taken from
fn original_of(backup: &Path) -> Option<PathBuf> {
    let name = backup.file_name()?.to_str()?;
    let original = name.strip_suffix(BACKUP_SUFFIX)?;
    Some(backup.with_file_name(original))
}

/// Overwrite every record under `root_dir` with its backup.
/// Returns the number of records restored.
#[instrument(skip(fs), fields(root = %root_dir.display()))]
pub async fn restore_originals(fs: &dyn FileSystemAccess, root_dir: &Path) -> Result<usize> {
    let mut restored = 0;
    for backup in walk_files(fs, root_dir, is_backup).await? {
        let Some(original) = original_of(&backup) else {
            continue;
        };
        fs.copy_file(&backup, &original).await?;
        debug!(path = %original.display(), "Restored original");
        restored += 1;
    }
    info!(restored, "Restored original records");
    Ok(restored)
}

/// Delete every backup under `root_dir`. Returns the number removed.
#[instrument(skip(fs), fields(root = %root_dir.display()))]
pub async fn remove_backups(fs: &dyn FileSystemAccess, root_dir: &Path) -> Result<usize> {
    let backups = walk_files(fs, root_dir, is_backup).await?;
    for backup in &backups {
        fs.delete_file(backup).await?;
    }
    info!(removed = backups.len(), "Removed backups");
    Ok(backups.len())
}

/// Directory a snapshot taken on `date` is written to
pub fn snapshot_dir(stash_dir: &Path, date: NaiveDate) -> PathBuf {
    stash_dir.join(format!("output_xmls_{}", date.format("%Y%m%d")))
}

/// Copy every current record under `root_dir` into a dated directory in
/// `stash_dir`, keeping each record's position relative to the root.
/// Returns the snapshot directory.
#[instrument(skip(fs), fields(root = %root_dir.display(), stash = %stash_dir.display()))]
pub async fn archive_snapshot(
    fs: &dyn FileSystemAccess,
    root_dir: &Path,
    stash_dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf> {
    let target = snapshot_dir(stash_dir, date);
    let documents = discover_documents(fs, root_dir).await?;

    for document in &documents {
        let Ok(relative) = document.strip_prefix(root_dir) else {
            continue;
        };
        let destination = target.join(relative);
        if let Some(dir) = destination.parent() {
            fs.create_dir_all(dir).await?;
        }
        fs.copy_file(document, &destination).await?;
    }

    info!(copied = documents.len(), target = %target.display(), "Archived records");
    Ok(target)
}
