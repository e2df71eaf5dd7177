//! ScienceBase API response types
//!
//! Item resources themselves deserialize straight into
//! [`bridge_traits::catalog::CatalogItem`]; only the list envelopes live here.

use serde::{Deserialize, Serialize};

/// `items` search response
///
/// The catalog pages results with `offset`/`max`; `total` is the size of the
/// whole result set, not of this page.
#[derive(Debug, Deserialize)]
pub struct ItemsPage<T> {
    #[serde(default)]
    pub total: Option<usize>,

    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// Item projection returned with `fields=id`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemRef {
    pub id: String,
}

impl ItemRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}
