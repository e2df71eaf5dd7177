//! # Tree Mirror
//!
//! Reproduces the local directory hierarchy as a page tree under the
//! release's root page.
//!
//! ## Overview
//!
//! For every metadata document, each directory between the root and the
//! document gets a page titled with the directory name. A directory that is
//! already in the run state is skipped; otherwise the parent page's children
//! are searched for an exact title match before a new page is created, so a
//! second run over the same tree creates nothing.
//!
//! The catalog does not make a new page visible to reads right away. After
//! every create the mirror waits `settle_delay` before continuing.

use bridge_traits::catalog::{CatalogClient, CatalogItem, NewItem};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use bridge_traits::storage::FileSystemAccess;

use crate::error::{Result, SyncError};
use crate::path::{dir_chain, discover_documents, key_name, parent_key, relative_key, root_key};
use crate::state::{PathIdentityMap, RunState};

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct MirrorOptions {
    pub settle_delay: Duration,
    /// Uploaded to every page the mirror finds or creates
    pub preview_image: Option<PathBuf>,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            preview_image: None,
        }
    }
}

/// Page returned by [`TreeMirror::find_or_create_child`]
#[derive(Debug, Clone)]
pub struct ChildPage {
    pub item: CatalogItem,
    pub created: bool,
}

pub struct TreeMirror {
    catalog: Arc<dyn CatalogClient>,
    fs: Arc<dyn FileSystemAccess>,
    options: MirrorOptions,
}

impl TreeMirror {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        fs: Arc<dyn FileSystemAccess>,
        options: MirrorOptions,
    ) -> Self {
        Self {
            catalog,
            fs,
            options,
        }
    }

    /// Make sure every directory holding a document has a page, recording
    /// the mapping and parent relation in `state`
    #[instrument(skip(self, state), fields(root = %root_dir.display(), root_id = %root_id))]
    pub async fn mirror(
        &self,
        root_dir: &Path,
        root_id: &str,
        state: &mut RunState,
    ) -> Result<PathIdentityMap> {
        let root = root_key(root_dir).ok_or_else(|| {
            SyncError::State(format!("{} has no directory name", root_dir.display()))
        })?;
        if state.dir_to_id.get(&root) != Some(root_id) {
            state.dir_to_id.insert(root.clone(), root_id)?;
        }

        let mut created = 0usize;
        let mut found = 0usize;

        for document in discover_documents(self.fs.as_ref(), root_dir).await? {
            let Some(dir_key) = document
                .parent()
                .and_then(|dir| relative_key(dir, root_dir))
            else {
                continue;
            };

            for key in dir_chain(&dir_key).into_iter().skip(1) {
                if state.dir_to_id.contains_key(&key) {
                    continue;
                }
                let parent_id = parent_key(&key)
                    .and_then(|parent| state.dir_to_id.get(parent))
                    .map(str::to_string)
                    .ok_or_else(|| SyncError::OrphanPath { path: key.clone() })?;

                let page = self.find_or_create_child(&parent_id, key_name(&key)).await?;
                if page.created {
                    created += 1;
                } else {
                    found += 1;
                }
                state.dir_to_id.insert(key.clone(), page.item.id.clone())?;
                state.record_child(&parent_id, &page.item.id);

                if let Some(image) = &self.options.preview_image {
                    if let Err(e) = self.catalog.upload_file(&page.item, image).await {
                        warn!(item_id = %page.item.id, error = %e, "Preview image upload failed");
                    }
                }
            }
        }

        info!(created, found, mapped = state.dir_to_id.len(), "Page tree mirrored");
        Ok(state.dir_to_id.clone())
    }

    /// Reuse the child of `parent_id` titled exactly `title`, or create it
    #[instrument(skip(self), fields(parent_id = %parent_id, title = %title))]
    pub async fn find_or_create_child(&self, parent_id: &str, title: &str) -> Result<ChildPage> {
        for child_id in self.catalog.get_child_ids(parent_id).await? {
            let child = self.catalog.get_item(&child_id).await?;
            if child.title == title {
                debug!(item_id = %child.id, "Found existing page");
                return Ok(ChildPage {
                    item: child,
                    created: false,
                });
            }
        }

        let item = self
            .catalog
            .create_item(&NewItem::new(parent_id, title))
            .await?;
        info!(item_id = %item.id, "Created page");
        tokio::time::sleep(self.options.settle_delay).await;
        Ok(ChildPage {
            item,
            created: true,
        })
    }
}
