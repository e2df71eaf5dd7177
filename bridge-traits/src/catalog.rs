//! Catalog Abstraction
//!
//! The remote page catalog the sync engine mirrors into. Pages form a tree;
//! each page carries a title, attached files, optional spatial extent and an
//! open set of other JSON fields that can be copied between pages.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{BridgeError, Result};

/// Content type the catalog assigns to uploaded FGDC metadata
pub const FGDC_CONTENT_TYPE: &str = "application/fgdc+xml";

/// Axis-aligned geographic extent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    #[serde(rename = "minX")]
    pub min_x: f64,
    #[serde(rename = "minY")]
    pub min_y: f64,
    #[serde(rename = "maxX")]
    pub max_x: f64,
    #[serde(rename = "maxY")]
    pub max_y: f64,
}

impl BoundingBox {
    /// Smallest box covering both `self` and `other`
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

/// A file attached to a page, either directly or through a facet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFile {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_uploaded: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_metadata: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_for_preview: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogFile {
    pub fn is_original_metadata(&self) -> bool {
        self.original_metadata.unwrap_or(false)
    }
}

/// Derived view of uploaded data (e.g. a shapefile) with its own files and extent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facet {
    #[serde(default)]
    pub files: Vec<CatalogFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spatial {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Wire names of the typed [`CatalogItem`] fields other than `id`
const TYPED_FIELDS: &[&str] = &[
    "title",
    "parentId",
    "hasChildren",
    "systemTypes",
    "files",
    "facets",
    "spatial",
];

/// One remote page
///
/// Fields the engine reasons about are typed; everything else the catalog
/// returns is kept in `fields` so an update round-trips it unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub has_children: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub system_types: Vec<String>,
    #[serde(default)]
    pub files: Vec<CatalogFile>,
    #[serde(default)]
    pub facets: Vec<Facet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial: Option<Spatial>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl CatalogItem {
    /// Read any top-level field by its wire name. `None` when absent or null.
    pub fn field(&self, name: &str) -> Option<Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map.get(name).filter(|v| !v.is_null()).cloned(),
            _ => None,
        }
    }

    /// Set any top-level field by its wire name. `Value::Null` clears it.
    /// Clearing a typed field resets it to its default; `id` cannot be
    /// cleared.
    pub fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        if name == "id" && value.is_null() {
            return Err(BridgeError::OperationFailed(format!(
                "Cannot clear the id of item {}",
                self.id
            )));
        }
        let mut map = match serde_json::to_value(&*self) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => {
                return Err(BridgeError::OperationFailed(format!(
                    "Failed to serialize item {}: {}",
                    self.id, e
                )))
            }
        };
        if value.is_null() && TYPED_FIELDS.contains(&name) {
            // Absent typed fields deserialize to their defaults
            map.remove(name);
        } else {
            map.insert(name.to_string(), value);
        }
        *self = serde_json::from_value(Value::Object(map)).map_err(|e| {
            BridgeError::OperationFailed(format!("Invalid value for field '{}': {}", name, e))
        })?;
        Ok(())
    }

    /// Extent of the page: first facet's box, else the spatial box
    pub fn extent(&self) -> Option<BoundingBox> {
        self.facets
            .first()
            .and_then(|f| f.bounding_box)
            .or_else(|| self.spatial.as_ref().and_then(|s| s.bounding_box))
    }

    /// Upload time of the first file with the given content type, looking at
    /// direct attachments before facet files
    pub fn upload_time_of(&self, content_type: &str) -> Option<DateTime<Utc>> {
        self.files
            .iter()
            .chain(self.facets.iter().flat_map(|f| f.files.iter()))
            .find(|f| f.content_type.as_deref() == Some(content_type))
            .and_then(|f| f.date_uploaded)
    }

    /// Whether the catalog flags this page as a folder
    pub fn is_folder(&self) -> bool {
        self.system_types.iter().any(|t| t == "Folder")
    }
}

/// Fields for a page that does not exist yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub parent_id: String,
    pub title: String,
}

impl NewItem {
    pub fn new(parent_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            parent_id: parent_id.into(),
            title: title.into(),
        }
    }
}

/// Remote catalog capability
///
/// Every call is network I/O and may fail with auth expiry, timeouts or rate
/// limiting. Mutations are not guaranteed to be visible to reads immediately.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn get_item(&self, id: &str) -> Result<CatalogItem>;

    async fn create_item(&self, item: &NewItem) -> Result<CatalogItem>;

    async fn update_item(&self, item: &CatalogItem) -> Result<CatalogItem>;

    async fn get_child_ids(&self, id: &str) -> Result<Vec<String>>;

    async fn delete_items(&self, ids: &[String]) -> Result<()>;

    async fn find_items_by_title(&self, title: &str) -> Result<Vec<CatalogItem>>;

    /// Attach a local file to the page and return the updated page
    async fn upload_file(&self, item: &CatalogItem, path: &Path) -> Result<CatalogItem>;

    /// Replace the page's attachment that has the same file name
    async fn replace_file(&self, path: &Path, item: &CatalogItem) -> Result<CatalogItem>;

    /// Identifiers of every page that has `id` among its ancestors
    async fn get_ancestor_ids(&self, id: &str) -> Result<HashSet<String>>;
}
