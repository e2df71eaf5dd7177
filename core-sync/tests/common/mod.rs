//! In-memory catalog shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::catalog::{CatalogClient, CatalogFile, CatalogItem, NewItem, FGDC_CONTENT_TYPE};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Default)]
struct FakeState {
    items: BTreeMap<String, CatalogItem>,
    next_id: usize,
    calls: HashMap<&'static str, usize>,
    uploads: Vec<(String, PathBuf)>,
    deleted: Vec<String>,
}

/// Catalog kept in memory, counting calls per operation
#[derive(Default)]
pub struct FakeCatalog {
    state: Mutex<FakeState>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a page as-is, marking its parent as having children
    pub fn insert(&self, item: CatalogItem) {
        let mut state = self.state.lock().unwrap();
        if let Some(parent_id) = &item.parent_id {
            if let Some(parent) = state.items.get_mut(parent_id) {
                parent.has_children = true;
            }
        }
        state.items.insert(item.id.clone(), item);
    }

    pub fn page(&self, id: &str, parent_id: Option<&str>, title: &str) -> CatalogItem {
        let item = CatalogItem {
            id: id.to_string(),
            title: title.to_string(),
            parent_id: parent_id.map(str::to_string),
            ..Default::default()
        };
        self.insert(item.clone());
        item
    }

    pub fn item(&self, id: &str) -> Option<CatalogItem> {
        self.state.lock().unwrap().items.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    pub fn uploads(&self) -> Vec<(String, PathBuf)> {
        self.state.lock().unwrap().uploads.clone()
    }

    /// Ids in the order they were deleted
    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    fn record(&self, operation: &'static str) {
        *self.state.lock().unwrap().calls.entry(operation).or_default() += 1;
    }

    fn child_ids(state: &FakeState, id: &str) -> Vec<String> {
        state
            .items
            .values()
            .filter(|item| item.parent_id.as_deref() == Some(id))
            .map(|item| item.id.clone())
            .collect()
    }

    fn attach(&self, item: &CatalogItem, path: &Path) -> BridgeResult<CatalogItem> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = if name.to_lowercase().ends_with(".xml") {
            FGDC_CONTENT_TYPE.to_string()
        } else {
            "application/octet-stream".to_string()
        };

        let mut state = self.state.lock().unwrap();
        let stored = state
            .items
            .get_mut(&item.id)
            .ok_or_else(|| BridgeError::NotFound(item.id.clone()))?;
        stored.files.retain(|f| f.name != name);
        stored.files.push(CatalogFile {
            name,
            content_type: Some(content_type),
            date_uploaded: Some(Utc::now()),
            original_metadata: Some(content_type_is_fgdc(path)),
            ..Default::default()
        });
        let updated = stored.clone();
        state.uploads.push((item.id.clone(), path.to_path_buf()));
        Ok(updated)
    }
}

fn content_type_is_fgdc(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("xml"))
        .unwrap_or(false)
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn get_item(&self, id: &str) -> BridgeResult<CatalogItem> {
        self.record("get_item");
        self.item(id)
            .ok_or_else(|| BridgeError::NotFound(id.to_string()))
    }

    async fn create_item(&self, item: &NewItem) -> BridgeResult<CatalogItem> {
        self.record("create_item");
        let id = {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            format!("new-{:03}", state.next_id)
        };
        Ok(self.page(&id, Some(&item.parent_id), &item.title))
    }

    async fn update_item(&self, item: &CatalogItem) -> BridgeResult<CatalogItem> {
        self.record("update_item");
        let mut state = self.state.lock().unwrap();
        if !state.items.contains_key(&item.id) {
            return Err(BridgeError::NotFound(item.id.clone()));
        }
        state.items.insert(item.id.clone(), item.clone());
        Ok(item.clone())
    }

    async fn get_child_ids(&self, id: &str) -> BridgeResult<Vec<String>> {
        self.record("get_child_ids");
        let state = self.state.lock().unwrap();
        Ok(Self::child_ids(&state, id))
    }

    async fn delete_items(&self, ids: &[String]) -> BridgeResult<()> {
        self.record("delete_items");
        let mut state = self.state.lock().unwrap();
        for id in ids {
            if let Some(removed) = state.items.remove(id) {
                state.deleted.push(id.clone());
                if let Some(parent_id) = removed.parent_id {
                    let still_has = !Self::child_ids(&state, &parent_id).is_empty();
                    if let Some(parent) = state.items.get_mut(&parent_id) {
                        parent.has_children = still_has;
                    }
                }
            }
        }
        Ok(())
    }

    async fn find_items_by_title(&self, title: &str) -> BridgeResult<Vec<CatalogItem>> {
        self.record("find_items_by_title");
        let state = self.state.lock().unwrap();
        Ok(state
            .items
            .values()
            .filter(|item| item.title == title)
            .cloned()
            .collect())
    }

    async fn upload_file(&self, item: &CatalogItem, path: &Path) -> BridgeResult<CatalogItem> {
        self.record("upload_file");
        self.attach(item, path)
    }

    async fn replace_file(&self, path: &Path, item: &CatalogItem) -> BridgeResult<CatalogItem> {
        self.record("replace_file");
        self.attach(item, path)
    }

    async fn get_ancestor_ids(&self, id: &str) -> BridgeResult<HashSet<String>> {
        self.record("get_ancestor_ids");
        let state = self.state.lock().unwrap();
        let mut found = HashSet::new();
        let mut pending = vec![id.to_string()];
        while let Some(current) = pending.pop() {
            for child in Self::child_ids(&state, &current) {
                if found.insert(child.clone()) {
                    pending.push(child);
                }
            }
        }
        Ok(found)
    }
}

/// A record with every container the value slots need
pub const SAMPLE_RECORD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <idinfo>
    <citation>
      <citeinfo>
        <origin>U.S. Geological Survey</origin>
        <pubdate>2020</pubdate>
        <title>Shoreline positions</title>
        <edition>1.0</edition>
        <serinfo>
          <sername>Data Release</sername>
          <issue>DOI:xxx</issue>
        </serinfo>
        <onlink>https://doi.org/xxx</onlink>
        <lworkcit>
          <citeinfo>
            <pubdate>2020</pubdate>
            <serinfo>
              <issue>DOI:xxx</issue>
            </serinfo>
            <onlink>https://doi.org/xxx</onlink>
          </citeinfo>
        </lworkcit>
      </citeinfo>
    </citation>
    <descript>
      <abstract>Shoreline positions for the site.</abstract>
      <purpose>Track shoreline change.</purpose>
    </descript>
    <browse>
      <browsen>old.png</browsen>
      <browsed>Map of the site</browsed>
      <browset>GIF</browset>
    </browse>
  </idinfo>
  <distinfo>
    <stdorder>
      <digform>
        <digtopt>
          <onlinopt>
            <computer>
              <networka>
                <networkr>https://example.com/old</networkr>
              </networka>
            </computer>
            <accinstr>old instructions</accinstr>
          </onlinopt>
        </digtopt>
      </digform>
    </stdorder>
  </distinfo>
  <metainfo>
    <metd>20200101</metd>
  </metainfo>
</metadata>
"#;

/// Write `SAMPLE_RECORD` to each relative path under `root`
pub fn write_records(root: &Path, relative: &[&str]) {
    for rel in relative {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, SAMPLE_RECORD).unwrap();
    }
}
