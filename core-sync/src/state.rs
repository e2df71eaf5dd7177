//! Run state
//!
//! The mapping from local directories (and documents) to catalog pages, plus
//! the parent → children relation recorded while mirroring. Both are saved
//! as JSON in the state directory after a run and loaded again by the next
//! one, so an established page tree is not searched for twice.

use bridge_traits::storage::FileSystemAccess;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::convert::TryFrom;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Result, SyncError};
use crate::path::parent_key;

pub const DIR_TO_ID_FILE: &str = "dir_to_id.json";
pub const PARENT_TO_CHILDREN_FILE: &str = "parent_to_children.json";

/// Bidirectional map between path keys and catalog ids.
///
/// An entry whose key has a parent segment can only be inserted after the
/// parent key is mapped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct PathIdentityMap {
    by_key: BTreeMap<String, String>,
    by_id: HashMap<String, String>,
}

impl PathIdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a key to an id, replacing any previous id for that key
    pub fn insert(&mut self, key: impl Into<String>, id: impl Into<String>) -> Result<()> {
        let key = key.into();
        let id = id.into();
        if let Some(parent) = parent_key(&key) {
            if !self.by_key.contains_key(parent) {
                return Err(SyncError::OrphanPath { path: key });
            }
        }
        if let Some(previous) = self.by_key.insert(key.clone(), id.clone()) {
            self.by_id.remove(&previous);
        }
        self.by_id.insert(id, key);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.by_key.get(key).map(String::as_str)
    }

    pub fn key_of(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// The root-level entry. `None` when there is none or more than one.
    pub fn root(&self) -> Option<(&str, &str)> {
        let mut roots = self.by_key.iter().filter(|(key, _)| parent_key(key).is_none());
        match (roots.next(), roots.next()) {
            (Some((key, id)), None) => Some((key.as_str(), id.as_str())),
            _ => None,
        }
    }

    /// Entries in key order, parents before their children
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_key.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

impl TryFrom<BTreeMap<String, String>> for PathIdentityMap {
    type Error = SyncError;

    fn try_from(entries: BTreeMap<String, String>) -> Result<Self> {
        let mut map = PathIdentityMap::new();
        // BTreeMap order puts "a" before "a/b"
        for (key, id) in entries {
            map.insert(key, id)?;
        }
        Ok(map)
    }
}

impl From<PathIdentityMap> for BTreeMap<String, String> {
    fn from(map: PathIdentityMap) -> Self {
        map.by_key
    }
}

/// Everything a run remembers for the next one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    pub dir_to_id: PathIdentityMap,
    pub parent_to_children: BTreeMap<String, Vec<String>>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `child_id` under `parent_id` once
    pub fn record_child(&mut self, parent_id: &str, child_id: &str) {
        let children = self
            .parent_to_children
            .entry(parent_id.to_string())
            .or_default();
        if !children.iter().any(|c| c == child_id) {
            children.push(child_id.to_string());
        }
    }

    pub fn children_of(&self, parent_id: &str) -> &[String] {
        self.parent_to_children
            .get(parent_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Load saved state; missing files yield empty state
    pub async fn load(fs: &dyn FileSystemAccess, state_dir: &Path) -> Result<Self> {
        let dir_to_id: PathIdentityMap =
            read_json(fs, &state_dir.join(DIR_TO_ID_FILE)).await?.unwrap_or_default();
        let parent_to_children: BTreeMap<String, Vec<String>> =
            read_json(fs, &state_dir.join(PARENT_TO_CHILDREN_FILE))
                .await?
                .unwrap_or_default();

        info!(
            entries = dir_to_id.len(),
            parents = parent_to_children.len(),
            "Loaded run state"
        );
        Ok(Self {
            dir_to_id,
            parent_to_children,
        })
    }

    pub async fn save(&self, fs: &dyn FileSystemAccess, state_dir: &Path) -> Result<()> {
        fs.create_dir_all(state_dir).await?;
        write_json(fs, &state_dir.join(DIR_TO_ID_FILE), &self.dir_to_id).await?;
        write_json(fs, &state_dir.join(PARENT_TO_CHILDREN_FILE), &self.parent_to_children).await?;
        debug!(state_dir = %state_dir.display(), "Saved run state");
        Ok(())
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    fs: &dyn FileSystemAccess,
    path: &Path,
) -> Result<Option<T>> {
    if !fs.exists(path).await? {
        return Ok(None);
    }
    let bytes = fs.read_file(path).await?;
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| SyncError::State(format!("{}: {}", path.display(), e)))
}

async fn write_json<T: Serialize>(fs: &dyn FileSystemAccess, path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| SyncError::State(format!("{}: {}", path.display(), e)))?;
    fs.write_file(path, Bytes::from(json)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_desktop::TokioFileSystem;

    #[test]
    fn test_insert_requires_parent() {
        let mut map = PathIdentityMap::new();
        let err = map.insert("release/a", "id-a").unwrap_err();
        assert!(matches!(err, SyncError::OrphanPath { path } if path == "release/a"));

        map.insert("release", "root").unwrap();
        map.insert("release/a", "id-a").unwrap();
        map.insert("release/a/meta.xml", "id-a").unwrap();
        assert_eq!(map.get("release/a"), Some("id-a"));
        assert_eq!(map.root(), Some(("release", "root")));
    }

    #[test]
    fn test_root_is_ambiguous_with_two_trees() {
        let mut map = PathIdentityMap::new();
        map.insert("release", "root").unwrap();
        map.insert("archive", "old-root").unwrap();
        assert_eq!(map.root(), None);
        assert_eq!(map.get("release"), Some("root"));
    }

    #[test]
    fn test_reverse_lookup_follows_replacement() {
        let mut map = PathIdentityMap::new();
        map.insert("release", "root").unwrap();
        map.insert("release/a", "old").unwrap();
        map.insert("release/a", "new").unwrap();

        assert_eq!(map.key_of("new"), Some("release/a"));
        assert_eq!(map.key_of("old"), None);
    }

    #[test]
    fn test_deserialize_rejects_orphans() {
        let ok: PathIdentityMap =
            serde_json::from_str(r#"{"release/a":"a","release":"r"}"#).unwrap();
        assert_eq!(ok.len(), 2);

        let orphan = serde_json::from_str::<PathIdentityMap>(r#"{"release/a/b":"b"}"#);
        assert!(orphan.is_err());
    }

    #[test]
    fn test_record_child_deduplicates() {
        let mut state = RunState::new();
        state.record_child("p", "c1");
        state.record_child("p", "c1");
        state.record_child("p", "c2");
        assert_eq!(state.children_of("p"), ["c1", "c2"]);
        assert!(state.children_of("other").is_empty());
    }

    #[tokio::test]
    async fn test_state_round_trips_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let state_dir = dir.path().join(".assistants");

        let empty = RunState::load(&fs, &state_dir).await.unwrap();
        assert!(empty.dir_to_id.is_empty());

        let mut state = RunState::new();
        state.dir_to_id.insert("release", "root").unwrap();
        state.dir_to_id.insert("release/a", "id-a").unwrap();
        state.record_child("root", "id-a");
        state.save(&fs, &state_dir).await.unwrap();

        let loaded = RunState::load(&fs, &state_dir).await.unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.dir_to_id.key_of("id-a"), Some("release/a"));
    }
}
