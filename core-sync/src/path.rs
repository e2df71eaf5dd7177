//! Local path handling
//!
//! Keys used in the run state are relative paths joined with `/` whose first
//! segment is the name of the release's root directory, e.g.
//! `release/site_a/shoreline`. The same key is produced on every platform.

use bridge_traits::storage::FileSystemAccess;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::error::Result;

/// Ordered segments of a path. Root and prefix components are dropped.
pub fn split_all(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => None,
        })
        .collect()
}

/// Cumulative prefixes of a key, outermost first: `a`, `a/b`, `a/b/c`
pub fn dir_chain(key: &str) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current = String::new();
    for segment in key.split('/').filter(|s| !s.is_empty()) {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(segment);
        chain.push(current.clone());
    }
    chain
}

/// Key of the root directory: its final segment
pub fn root_key(root_dir: &Path) -> Option<String> {
    split_all(root_dir).pop()
}

/// Key of `path` relative to the root directory, or `None` when `path` is
/// not inside it
pub fn relative_key(path: &Path, root_dir: &Path) -> Option<String> {
    let rest = path.strip_prefix(root_dir).ok()?;
    let mut segments = vec![root_key(root_dir)?];
    segments.extend(split_all(rest));
    Some(segments.join("/"))
}

/// Key of the parent entry, `None` for a root-level key
pub fn parent_key(key: &str) -> Option<&str> {
    key.rsplit_once('/').map(|(parent, _)| parent)
}

/// Final segment of a key, used as the page title for a directory
pub fn key_name(key: &str) -> &str {
    key.rsplit_once('/').map(|(_, name)| name).unwrap_or(key)
}

/// Name of the directory that holds `path`
pub fn containing_dir_name(path: &Path) -> Option<String> {
    path.parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

pub fn is_metadata_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("xml"))
        .unwrap_or(false)
}

/// Every file under `root_dir` accepted by `keep`, sorted.
///
/// Entries whose name starts with `.` are not descended into, which keeps
/// the state and archive directories out of the scan.
pub async fn walk_files<F>(
    fs: &dyn FileSystemAccess,
    root_dir: &Path,
    keep: F,
) -> Result<Vec<PathBuf>>
where
    F: Fn(&Path) -> bool,
{
    let mut files = Vec::new();
    let mut pending = vec![root_dir.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in fs.list_directory(&dir).await? {
            if is_hidden(&entry) {
                continue;
            }
            if fs.metadata(&entry).await?.is_directory {
                pending.push(entry);
            } else if keep(&entry) {
                files.push(entry);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Every metadata document under `root_dir`, sorted
pub async fn discover_documents(
    fs: &dyn FileSystemAccess,
    root_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let documents = walk_files(fs, root_dir, is_metadata_file).await?;
    debug!(root = %root_dir.display(), count = documents.len(), "Discovered metadata documents");
    Ok(documents)
}
