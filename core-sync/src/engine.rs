//! # Sync Engine
//!
//! Drives the per-document passes over a release tree.
//!
//! ## Overview
//!
//! The document pass runs in a fixed order for every record:
//!
//! 1. Resolve the catalog page the record belongs to
//! 2. Compute the catalog-derived values (page and download URLs, DOI,
//!    dates, browse graphic link) and write them into their slots
//! 3. Apply the configured removals, additions and replacements
//! 4. Split multi-value attribute domains
//! 5. Serialize, run the text find/replace pass and write the file back
//!
//! The other passes reuse the same resolution: uploading records whose
//! remote copy is stale, uploading the data files next to each record,
//! marking browse graphics as page previews and populating the landing page.
//!
//! A failing document never stops a batch. The failure is logged with the
//! step it happened in and collected into the [`SyncSummary`].

use bridge_traits::catalog::{CatalogClient, CatalogFile, CatalogItem, FGDC_CONTENT_TYPE};
use bridge_traits::storage::FileSystemAccess;
use bridge_traits::time::Clock;
use chrono::{DateTime, Utc};
use core_metadata::browse::{browse_type, find_browse_file, is_browse_graphic, truncate_caption};
use core_metadata::store::is_backup;
use core_metadata::value_map::{file_url, BROWSE_DESCRIPTION, BROWSE_NAME, BROWSE_TYPE};
use core_metadata::{
    compute_assignments, Element, ElementPath, MetadataDocument, MetadataFile, NewValues,
    SkippedSlot, TextEditOutcome, TextEdits,
};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::identity::{CatalogIdentityResolver, IntegrityWarning, Resolution, ResolveContext};
use crate::maintenance::remove_all_files;
use crate::path::{discover_documents, is_metadata_file};

/// Longest caption written as a preview file's title
pub const MAX_CAPTION_CHARS: usize = 80;

/// Default upload limit for a single data file, 2000 MB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 2_000 * 1_000_000;

pub const PURPOSE_PATH: &str = "./idinfo/descript/purpose";
pub const ABSTRACT_PATH: &str = "./idinfo/descript/abstract";

/// Files in a dataset directory that are never uploaded
const EXCLUDED_SUFFIXES: [&str; 2] = ["DS_Store", ".lock"];

/// Element path a landing page field is read from
pub fn landing_field_source(field: &str) -> Option<&'static str> {
    match field {
        "purpose" => Some(PURPOSE_PATH),
        "summary" | "body" => Some(ABSTRACT_PATH),
        _ => None,
    }
}

/// Whether the local record is newer than the copy on the page
pub fn is_stale(local_modified: DateTime<Utc>, remote_uploaded: DateTime<Utc>) -> bool {
    local_modified > remote_uploaded
}

/// Element-level and text-level edits applied to every record
#[derive(Debug, Clone, Default)]
pub struct XmlEdits {
    /// Elements under a path to drop when their text holds one of the markers
    pub remove_fills: Vec<(ElementPath, Vec<String>)>,
    /// Elements appended to a container unless an identical child is there
    pub additions: Vec<(ElementPath, Element)>,
    /// Elements that replace the same-tagged child of a container
    pub replacements: Vec<(ElementPath, Element)>,
    pub text_edits: TextEdits,
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub doi: Option<String>,
    pub landing_id: Option<String>,
    pub edition: Option<String>,
    pub pubdate: Option<String>,
    pub xml_edits: XmlEdits,
    pub max_upload_bytes: u64,
    /// Number of discovered documents to skip before processing
    pub start_index: usize,
    /// Remove every file from a page before uploading its data
    pub replace_existing_files: bool,
    /// Landing page fields filled from the root record
    pub landing_fields_from_xml: Vec<String>,
    pub preview_image: Option<PathBuf>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            doi: None,
            landing_id: None,
            edition: None,
            pubdate: None,
            xml_edits: XmlEdits::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            start_index: 0,
            replace_existing_files: true,
            landing_fields_from_xml: vec![
                "purpose".to_string(),
                "summary".to_string(),
                "body".to_string(),
            ],
            preview_image: None,
        }
    }
}

/// Step a document failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStep {
    Resolve,
    UpdateMetadata,
    UploadMetadata,
    UploadData,
    Browse,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncStep::Resolve => "resolve",
            SyncStep::UpdateMetadata => "update_metadata",
            SyncStep::UploadMetadata => "upload_metadata",
            SyncStep::UploadData => "upload_data",
            SyncStep::Browse => "browse",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub step: SyncStep,
    pub message: String,
}

/// Outcome of one batch pass
#[derive(Debug, Clone, Default)]
pub struct SyncSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub uploaded: usize,
    pub failures: Vec<DocumentFailure>,
    pub warnings: Vec<IntegrityWarning>,
    /// Data files above the upload limit, left for a manual upload
    pub oversize_files: Vec<PathBuf>,
    pub skipped_slots: Vec<SkippedSlot>,
}

impl SyncSummary {
    fn record_failure(&mut self, path: &Path, step: SyncStep, error: &SyncError) {
        error!(path = %path.display(), step = %step, error = %error, "Document failed");
        self.failed += 1;
        self.failures.push(DocumentFailure {
            path: path.to_path_buf(),
            step,
            message: error.to_string(),
        });
    }

    fn record_warning(&mut self, resolution: &Resolution) {
        if let Some(warning) = &resolution.warning {
            self.warnings.push(warning.clone());
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// What the document pass did to one record
#[derive(Debug, Clone)]
pub struct DocumentUpdate {
    pub resolution: Resolution,
    pub skipped_slots: Vec<SkippedSlot>,
    pub removed: usize,
    pub repaired_domains: usize,
    pub text: Option<TextEditOutcome>,
}

/// Files uploaded from one dataset directory
#[derive(Debug, Clone, Default)]
pub struct DataUpload {
    pub item: Option<CatalogItem>,
    pub uploaded: Vec<PathBuf>,
    pub oversize: Vec<PathBuf>,
}

pub struct SyncEngine {
    catalog: Arc<dyn CatalogClient>,
    fs: Arc<dyn FileSystemAccess>,
    clock: Arc<dyn Clock>,
    resolver: CatalogIdentityResolver,
    options: EngineOptions,
}

impl SyncEngine {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        fs: Arc<dyn FileSystemAccess>,
        clock: Arc<dyn Clock>,
        options: EngineOptions,
    ) -> Self {
        let resolver = CatalogIdentityResolver::new(catalog.clone(), fs.clone());
        Self {
            catalog,
            fs,
            clock,
            resolver,
            options,
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn resolver(&self) -> &CatalogIdentityResolver {
        &self.resolver
    }

    /// Records the passes visit, after skipping `start_index` of them
    pub async fn documents(&self, root_dir: &Path) -> Result<Vec<PathBuf>> {
        let documents = discover_documents(self.fs.as_ref(), root_dir).await?;
        Ok(documents
            .into_iter()
            .skip(self.options.start_index)
            .collect())
    }

    // ========================================================================
    // Document pass
    // ========================================================================

    /// Rewrite one record with the values of the page it resolves to
    #[instrument(skip(self, ctx), fields(path = %document.display()))]
    pub async fn update_document(
        &self,
        document: &Path,
        ctx: &ResolveContext<'_>,
    ) -> Result<DocumentUpdate> {
        let resolution = self.resolver.resolve(document, ctx).await?;
        self.rewrite_document(document, resolution).await
    }

    async fn rewrite_document(
        &self,
        document: &Path,
        resolution: Resolution,
    ) -> Result<DocumentUpdate> {
        let values = NewValues {
            doi: self.options.doi.clone(),
            landing_id: self.options.landing_id.clone(),
            child_id: Some(resolution.id.clone()),
            browse_file: self.browse_file_next_to(document).await?,
            edition: self.options.edition.clone(),
            pubdate: self.options.pubdate.clone(),
        };
        let assignments = compute_assignments(&values, self.clock.today())?;
        let edits = &self.options.xml_edits;

        let mut file = MetadataFile::open(self.fs.clone(), document).await?;
        let (skipped_slots, removed, repaired_domains) = file
            .edit(|doc| {
                let skipped = assignments.apply(doc)?;

                let mut removed = 0;
                for (path, markers) in &edits.remove_fills {
                    removed += doc.remove_matching(path, markers)?;
                }
                for (container, element) in &edits.additions {
                    doc.insert_child_once(container, element.clone())?;
                }
                for (container, element) in &edits.replacements {
                    doc.replace_element(container, element.clone())?;
                }

                let repaired = doc.normalize_multi_value_domain();
                Ok((skipped, removed, repaired))
            })
            .await?;
        let text = file.save(Some(&edits.text_edits)).await?;

        if let Some(outcome) = &text {
            if outcome.remaining_fills > 0 {
                warn!(
                    path = %document.display(),
                    remaining = outcome.remaining_fills,
                    "Record still has fill markers"
                );
            }
        }
        info!(
            path = %document.display(),
            item_id = %resolution.id,
            source = %resolution.source,
            removed,
            repaired_domains,
            "Updated metadata"
        );

        Ok(DocumentUpdate {
            resolution,
            skipped_slots,
            removed,
            repaired_domains,
            text,
        })
    }

    /// Browse graphic among the files in the record's directory
    async fn browse_file_next_to(&self, document: &Path) -> Result<Option<String>> {
        let Some(dir) = document.parent() else {
            return Ok(None);
        };
        let names: Vec<String> = self
            .fs
            .list_directory(dir)
            .await?
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        Ok(find_browse_file(&names))
    }

    /// Run the document pass over every record under `root_dir`
    #[instrument(skip(self, ctx), fields(root = %root_dir.display()))]
    pub async fn update_documents(
        &self,
        root_dir: &Path,
        ctx: &ResolveContext<'_>,
    ) -> Result<SyncSummary> {
        let mut summary = SyncSummary {
            skipped: self.options.start_index,
            ..Default::default()
        };

        for document in self.documents(root_dir).await? {
            let resolution = match self.resolver.resolve(&document, ctx).await {
                Ok(resolution) => resolution,
                Err(e) => {
                    summary.record_failure(&document, SyncStep::Resolve, &e);
                    continue;
                }
            };
            summary.record_warning(&resolution);

            match self.rewrite_document(&document, resolution).await {
                Ok(update) => {
                    summary.processed += 1;
                    summary.skipped_slots.extend(update.skipped_slots);
                }
                Err(e) => summary.record_failure(&document, SyncStep::UpdateMetadata, &e),
            }
        }

        info!(
            processed = summary.processed,
            failed = summary.failed,
            "Metadata pass finished"
        );
        Ok(summary)
    }

    // ========================================================================
    // Metadata upload
    // ========================================================================

    /// Replace the page's record with the local one.
    ///
    /// Files the catalog flags as original metadata are dropped from the
    /// page (and its facets) first, so the page keeps a single record.
    #[instrument(skip(self, item), fields(item_id = %item.id, path = %document.display()))]
    pub async fn upsert_metadata(
        &self,
        mut item: CatalogItem,
        document: &Path,
    ) -> Result<CatalogItem> {
        let before = count_files(&item);
        item.files.retain(|f| !f.is_original_metadata());
        for facet in &mut item.facets {
            facet.files.retain(|f| !f.is_original_metadata());
        }
        if count_files(&item) != before {
            debug!("Dropped previous metadata from page");
            item = self.catalog.update_item(&item).await?;
        }
        Ok(self.catalog.upload_file(&item, document).await?)
    }

    /// Whether the record at `document` should be uploaded to `item`.
    ///
    /// A page without a metadata file, or a local file without a
    /// modification time, counts as stale.
    pub async fn needs_upload(&self, document: &Path, item: &CatalogItem) -> Result<bool> {
        let Some(remote) = item.upload_time_of(FGDC_CONTENT_TYPE) else {
            return Ok(true);
        };
        let local = self
            .fs
            .metadata(document)
            .await?
            .modified_at
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
        Ok(local.map_or(true, |local| is_stale(local, remote)))
    }

    /// Upload every record whose page holds an older copy
    #[instrument(skip(self, ctx), fields(root = %root_dir.display()))]
    pub async fn upload_stale_documents(
        &self,
        root_dir: &Path,
        ctx: &ResolveContext<'_>,
    ) -> Result<SyncSummary> {
        let mut summary = SyncSummary::default();

        for document in self.documents(root_dir).await? {
            let resolution = match self.resolver.resolve(&document, ctx).await {
                Ok(resolution) => resolution,
                Err(e) => {
                    summary.record_failure(&document, SyncStep::Resolve, &e);
                    continue;
                }
            };
            summary.record_warning(&resolution);

            match self.upload_if_stale(&document, &resolution.id).await {
                Ok(true) => {
                    summary.processed += 1;
                    summary.uploaded += 1;
                }
                Ok(false) => summary.skipped += 1,
                Err(e) => summary.record_failure(&document, SyncStep::UploadMetadata, &e),
            }
        }

        info!(
            uploaded = summary.uploaded,
            current = summary.skipped,
            failed = summary.failed,
            "Metadata upload pass finished"
        );
        Ok(summary)
    }

    async fn upload_if_stale(&self, document: &Path, id: &str) -> Result<bool> {
        let item = self.catalog.get_item(id).await?;
        if !self.needs_upload(document, &item).await? {
            debug!(path = %document.display(), item_id = %id, "Page copy is current");
            return Ok(false);
        }
        self.upsert_metadata(item, document).await?;
        info!(path = %document.display(), item_id = %id, "Uploaded metadata");
        Ok(true)
    }

    // ========================================================================
    // Data upload
    // ========================================================================

    /// Upload the data files in `dir` to page `id`
    #[instrument(skip(self), fields(dir = %dir.display(), item_id = %id))]
    pub async fn upload_data(&self, dir: &Path, id: &str) -> Result<DataUpload> {
        let mut upload = DataUpload::default();
        let mut candidates = Vec::new();

        for entry in self.fs.list_directory(dir).await? {
            if !is_data_file(&entry) {
                continue;
            }
            let metadata = self.fs.metadata(&entry).await?;
            if metadata.is_directory {
                continue;
            }
            if metadata.size > self.options.max_upload_bytes {
                warn!(file = %entry.display(), size = metadata.size, "File too large to upload");
                upload.oversize.push(entry);
            } else {
                candidates.push(entry);
            }
        }
        candidates.sort();

        let mut item = if self.options.replace_existing_files {
            remove_all_files(self.catalog.as_ref(), id).await?
        } else {
            self.catalog.get_item(id).await?
        };
        for file in candidates {
            item = self.catalog.upload_file(&item, &file).await?;
            upload.uploaded.push(file);
        }

        info!(
            uploaded = upload.uploaded.len(),
            oversize = upload.oversize.len(),
            "Uploaded data files"
        );
        upload.item = Some(item);
        Ok(upload)
    }

    /// Upload the data next to every record, once per directory
    #[instrument(skip(self, ctx), fields(root = %root_dir.display()))]
    pub async fn upload_all_data(
        &self,
        root_dir: &Path,
        ctx: &ResolveContext<'_>,
    ) -> Result<SyncSummary> {
        let mut summary = SyncSummary::default();
        let mut done: HashSet<PathBuf> = HashSet::new();

        for document in self.documents(root_dir).await? {
            let Some(dir) = document.parent().map(Path::to_path_buf) else {
                continue;
            };
            if dir == root_dir || !done.insert(dir.clone()) {
                summary.skipped += 1;
                continue;
            }

            let resolution = match self.resolver.resolve(&document, ctx).await {
                Ok(resolution) => resolution,
                Err(e) => {
                    summary.record_failure(&document, SyncStep::Resolve, &e);
                    continue;
                }
            };
            summary.record_warning(&resolution);

            match self.upload_data(&dir, &resolution.id).await {
                Ok(upload) => {
                    summary.processed += 1;
                    summary.uploaded += upload.uploaded.len();
                    summary.oversize_files.extend(upload.oversize);
                }
                Err(e) => summary.record_failure(&document, SyncStep::UploadData, &e),
            }
        }
        Ok(summary)
    }

    // ========================================================================
    // Browse graphics
    // ========================================================================

    /// Mark the page's browse graphic as its preview and point the record's
    /// browse entry at it. Returns `true` when the record changed and was
    /// uploaded again.
    #[instrument(skip(self), fields(path = %document.display(), item_id = %id))]
    pub async fn update_browse_graphic(&self, document: &Path, id: &str) -> Result<bool> {
        let mut file = MetadataFile::open(self.fs.clone(), document).await?;
        let caption = read_first(file.document(), BROWSE_DESCRIPTION)?
            .map(|c| truncate_caption(&c, MAX_CAPTION_CHARS));

        let mut item = self.catalog.get_item(id).await?;
        let Some(browse_name) = mark_browse_preview(&mut item, caption.as_deref()) else {
            debug!("No browse graphic on page");
            return Ok(false);
        };
        let item = self.catalog.update_item(&item).await?;

        let link = format!("{}/?name={}", file_url(id), browse_name);
        let kind = browse_type(&browse_name).unwrap_or_default();
        let current_link = read_first(file.document(), BROWSE_NAME)?;
        let current_kind = read_first(file.document(), BROWSE_TYPE)?;
        if current_link.as_deref() == Some(link.as_str())
            && current_kind.as_deref() == Some(kind.as_str())
        {
            return Ok(false);
        }

        let name_path = ElementPath::parse(BROWSE_NAME)?;
        let type_path = ElementPath::parse(BROWSE_TYPE)?;
        file.edit(|doc| {
            doc.write(&name_path, 0, &link)?;
            doc.write(&type_path, 0, &kind)
        })
        .await?;
        file.save(None).await?;

        self.upsert_metadata(item, document).await?;
        info!(browse = %browse_name, "Updated browse graphic");
        Ok(true)
    }

    /// Run the browse pass over every record under `root_dir`
    pub async fn update_browse_graphics(
        &self,
        root_dir: &Path,
        ctx: &ResolveContext<'_>,
    ) -> Result<SyncSummary> {
        let mut summary = SyncSummary::default();

        for document in self.documents(root_dir).await? {
            let resolution = match self.resolver.resolve(&document, ctx).await {
                Ok(resolution) => resolution,
                Err(e) => {
                    summary.record_failure(&document, SyncStep::Resolve, &e);
                    continue;
                }
            };
            summary.record_warning(&resolution);

            match self.update_browse_graphic(&document, &resolution.id).await {
                Ok(true) => {
                    summary.processed += 1;
                    summary.uploaded += 1;
                }
                Ok(false) => summary.skipped += 1,
                Err(e) => summary.record_failure(&document, SyncStep::Browse, &e),
            }
        }
        Ok(summary)
    }

    // ========================================================================
    // Landing page
    // ========================================================================

    /// Attach the root record to the landing page and, when the page has no
    /// body yet, fill the configured fields from the record
    #[instrument(skip(self), fields(root = %root_dir.display(), item_id = %landing_id))]
    pub async fn populate_landing(
        &self,
        root_dir: &Path,
        landing_id: &str,
    ) -> Result<CatalogItem> {
        let mut landing = self.catalog.get_item(landing_id).await?;

        let mut records: Vec<PathBuf> = self
            .fs
            .list_directory(root_dir)
            .await?
            .into_iter()
            .filter(|p| is_metadata_file(p))
            .collect();
        records.sort();

        if let Some(record) = records.pop() {
            match self.catalog.upload_file(&landing, &record).await {
                Ok(updated) => landing = updated,
                Err(e) => {
                    warn!(path = %record.display(), error = %e, "Landing record upload failed")
                }
            }

            if landing.field("body").is_none() {
                let bytes = self.fs.read_file(&record).await?;
                let doc = MetadataDocument::parse(&bytes)?;
                for field in &self.options.landing_fields_from_xml {
                    let Some(source) = landing_field_source(field) else {
                        warn!(field = %field, "No record element for landing field");
                        continue;
                    };
                    if let Some(text) = read_first(&doc, source)? {
                        landing.set_field(field, Value::String(text))?;
                    }
                }
                landing = self.catalog.update_item(&landing).await?;
                info!("Filled landing page from record");
            }
        } else {
            debug!("No record in root directory");
        }

        if let Some(image) = &self.options.preview_image {
            match self.catalog.upload_file(&landing, image).await {
                Ok(updated) => landing = updated,
                Err(e) => {
                    warn!(path = %image.display(), error = %e, "Preview image upload failed")
                }
            }
        }
        Ok(landing)
    }
}

fn count_files(item: &CatalogItem) -> usize {
    item.files.len() + item.facets.iter().map(|f| f.files.len()).sum::<usize>()
}

/// Text of the first match of `path`, `None` when there is no match
fn read_first(doc: &MetadataDocument, path: &str) -> Result<Option<String>> {
    let path = ElementPath::parse(path)?;
    if doc.count(&path) == 0 {
        return Ok(None);
    }
    Ok(Some(doc.read(&path, 0)?))
}

fn is_data_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    !is_backup(path) && !EXCLUDED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Flag the first browse graphic on the page, direct files before facet
/// files, as the preview. Returns its name.
fn mark_browse_preview(item: &mut CatalogItem, caption: Option<&str>) -> Option<String> {
    let mark = |file: &mut CatalogFile| {
        file.use_for_preview = Some(true);
        file.title = caption.map(str::to_string);
        file.name.clone()
    };

    if let Some(file) = item.files.iter_mut().find(|f| is_browse_graphic(&f.name)) {
        return Some(mark(file));
    }
    item.facets
        .iter_mut()
        .flat_map(|facet| facet.files.iter_mut())
        .find(|f| is_browse_graphic(&f.name))
        .map(mark)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::catalog::Facet;
    use chrono::TimeZone;

    fn file(name: &str) -> CatalogFile {
        CatalogFile {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_is_stale_is_strict() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert!(!is_stale(t, t));
        assert!(is_stale(t + chrono::Duration::seconds(1), t));
        assert!(!is_stale(t, t + chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_is_data_file() {
        assert!(is_data_file(Path::new("/r/a/shoreline.shp")));
        assert!(is_data_file(Path::new("/r/a/meta.xml")));
        assert!(!is_data_file(Path::new("/r/a/meta.xml_orig")));
        assert!(!is_data_file(Path::new("/r/a/.DS_Store")));
        assert!(!is_data_file(Path::new("/r/a/shoreline.shp.lock")));
    }

    #[test]
    fn test_mark_browse_prefers_direct_files() {
        let mut item = CatalogItem {
            files: vec![file("data.zip"), file("site_browse.png")],
            facets: vec![Facet {
                files: vec![file("other_browse.jpg")],
                ..Default::default()
            }],
            ..Default::default()
        };

        let name = mark_browse_preview(&mut item, Some("Map of site"));
        assert_eq!(name.as_deref(), Some("site_browse.png"));
        assert_eq!(item.files[1].use_for_preview, Some(true));
        assert_eq!(item.files[1].title.as_deref(), Some("Map of site"));
        assert_eq!(item.facets[0].files[0].use_for_preview, None);
    }

    #[test]
    fn test_mark_browse_falls_back_to_facets() {
        let mut item = CatalogItem {
            files: vec![file("data.zip")],
            facets: vec![Facet {
                files: vec![file("a.shp"), file("site_browse.gif")],
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(mark_browse_preview(&mut item, None).as_deref(), Some("site_browse.gif"));
        assert_eq!(item.facets[0].files[1].use_for_preview, Some(true));

        let mut bare = CatalogItem::default();
        assert_eq!(mark_browse_preview(&mut bare, None), None);
    }

    #[test]
    fn test_landing_field_source() {
        assert_eq!(landing_field_source("purpose"), Some(PURPOSE_PATH));
        assert_eq!(landing_field_source("body"), Some(ABSTRACT_PATH));
        assert_eq!(landing_field_source("summary"), Some(ABSTRACT_PATH));
        assert_eq!(landing_field_source("citation"), None);
    }
}
