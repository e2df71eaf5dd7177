//! # Catalog Identity Resolution
//!
//! Maps a local metadata document to the catalog page it belongs to.
//!
//! ## Overview
//!
//! Sources are tried from cheapest to most expensive and the first hit wins:
//!
//! 1. The run state: the document's own key, then its directory's key
//! 2. A catalog title search for the name of the containing directory
//! 3. The page link recorded in the document itself (the second citation
//!    online link), whose last path segment is the page id
//!
//! A resolved id is cross-checked against the set of pages that descend from
//! the release's root page. A mismatch does not fail the resolution; it is
//! attached as an [`IntegrityWarning`] so the caller can report it.

use bridge_traits::catalog::CatalogClient;
use bridge_traits::storage::FileSystemAccess;
use core_metadata::value_map::CITATION_LINK;
use core_metadata::{ElementPath, MetadataDocument};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::error::{Result, SyncError};
use crate::path::{containing_dir_name, relative_key, root_key};
use crate::state::PathIdentityMap;

/// Which source produced an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    KnownDocument,
    KnownDirectory,
    TitleSearch,
    DocumentLink,
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResolutionSource::KnownDocument => "known_document",
            ResolutionSource::KnownDirectory => "known_directory",
            ResolutionSource::TitleSearch => "title_search",
            ResolutionSource::DocumentLink => "document_link",
        };
        f.write_str(s)
    }
}

/// A resolved id that is not among the release's pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityWarning {
    pub path: String,
    pub id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub id: String,
    pub source: ResolutionSource,
    pub warning: Option<IntegrityWarning>,
}

/// What the resolver may consult for one lookup
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub known: &'a PathIdentityMap,
    pub root_dir: &'a Path,
    /// Precomputed set of acceptable ids
    pub valid_ids: Option<&'a HashSet<String>>,
    /// Page whose descendants are acceptable; defaults to the page mapped to
    /// `root_dir`, else the only root-level entry of `known`
    pub parent_id: Option<&'a str>,
}

impl<'a> ResolveContext<'a> {
    pub fn new(known: &'a PathIdentityMap, root_dir: &'a Path) -> Self {
        Self {
            known,
            root_dir,
            valid_ids: None,
            parent_id: None,
        }
    }

    pub fn with_valid_ids(mut self, valid_ids: &'a HashSet<String>) -> Self {
        self.valid_ids = Some(valid_ids);
        self
    }

    pub fn with_parent_id(mut self, parent_id: &'a str) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Page id from a catalog page URL: its last non-empty path segment
pub fn id_from_page_url(url: &str) -> Option<String> {
    let without_query = url.trim().split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains(':'))
        .map(str::to_string)
}

pub struct CatalogIdentityResolver {
    catalog: Arc<dyn CatalogClient>,
    fs: Arc<dyn FileSystemAccess>,
    /// Descendant sets already fetched, by ancestor id
    descendants: Mutex<HashMap<String, Arc<HashSet<String>>>>,
}

impl CatalogIdentityResolver {
    pub fn new(catalog: Arc<dyn CatalogClient>, fs: Arc<dyn FileSystemAccess>) -> Self {
        Self {
            catalog,
            fs,
            descendants: Mutex::new(HashMap::new()),
        }
    }

    #[instrument(skip(self, ctx), fields(path = %document.display()))]
    pub async fn resolve(&self, document: &Path, ctx: &ResolveContext<'_>) -> Result<Resolution> {
        let (id, source) = self
            .find_id(document, ctx)
            .await?
            .ok_or_else(|| SyncError::NotFound {
                path: document.display().to_string(),
            })?;
        debug!(item_id = %id, source = %source, "Resolved catalog page");

        let warning = self.check_membership(document, &id, ctx).await?;
        Ok(Resolution {
            id,
            source,
            warning,
        })
    }

    async fn find_id(
        &self,
        document: &Path,
        ctx: &ResolveContext<'_>,
    ) -> Result<Option<(String, ResolutionSource)>> {
        if let Some(id) = relative_key(document, ctx.root_dir).and_then(|k| ctx.known.get(&k)) {
            return Ok(Some((id.to_string(), ResolutionSource::KnownDocument)));
        }
        let dir_key = document
            .parent()
            .and_then(|dir| relative_key(dir, ctx.root_dir));
        if let Some(id) = dir_key.as_deref().and_then(|k| ctx.known.get(k)) {
            return Ok(Some((id.to_string(), ResolutionSource::KnownDirectory)));
        }

        if let Some(title) = containing_dir_name(document) {
            let matches = self.catalog.find_items_by_title(&title).await?;
            if let Some(item) = matches.into_iter().find(|item| !item.id.is_empty()) {
                return Ok(Some((item.id, ResolutionSource::TitleSearch)));
            }
            debug!(title = %title, "No page matches directory name");
        }

        let bytes = self.fs.read_file(document).await?;
        let doc = MetadataDocument::parse(&bytes)?;
        let link_path = ElementPath::parse(CITATION_LINK)?;
        let id = doc
            .read(&link_path, 1)
            .ok()
            .and_then(|url| id_from_page_url(&url));
        Ok(id.map(|id| (id, ResolutionSource::DocumentLink)))
    }

    async fn check_membership(
        &self,
        document: &Path,
        id: &str,
        ctx: &ResolveContext<'_>,
    ) -> Result<Option<IntegrityWarning>> {
        let configured_root = root_key(ctx.root_dir);
        let ancestor = ctx
            .parent_id
            .or_else(|| configured_root.as_deref().and_then(|key| ctx.known.get(key)))
            .or_else(|| ctx.known.root().map(|(_, root_id)| root_id));

        let valid = match (ctx.valid_ids, ancestor) {
            (Some(valid), _) => valid.contains(id) || ancestor == Some(id),
            (None, Some(ancestor)) => {
                ancestor == id || self.descendants_of(ancestor).await?.contains(id)
            }
            (None, None) => {
                debug!(item_id = %id, "No page set to cross-check against");
                return Ok(None);
            }
        };

        if valid {
            return Ok(None);
        }
        warn!(item_id = %id, path = %document.display(), "Resolved page is outside the release");
        Ok(Some(IntegrityWarning {
            path: document.display().to_string(),
            id: id.to_string(),
            message: "resolved page is not a descendant of the release page".to_string(),
        }))
    }

    async fn descendants_of(&self, ancestor: &str) -> Result<Arc<HashSet<String>>> {
        let mut cache = self.descendants.lock().await;
        if let Some(ids) = cache.get(ancestor) {
            return Ok(ids.clone());
        }
        let ids = Arc::new(self.catalog.get_ancestor_ids(ancestor).await?);
        cache.insert(ancestor.to_string(), ids.clone());
        Ok(ids)
    }
}
