//! Core service façade and bootstrap helpers.
//!
//! This crate wires the host bridges (HTTP, filesystem, clock), the catalog
//! session and the ScienceBase connector into one [`CoreService`] per
//! release. The service owns the run order: which passes run, in which
//! sequence, and when the run state is written back.
//!
//! Desktop hosts enable the `desktop-shims` feature (on by default) and call
//! [`CoreDependencies::desktop`].

pub mod edits;
pub mod error;

pub use edits::{engine_options, xml_edits};
pub use error::{CoreError, Result};

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bridge_traits::{
    catalog::CatalogClient, http::HttpClient, storage::FileSystemAccess, time::Clock,
};
use core_auth::{CatalogSession, Credentials, TokenClient, TokenEndpoint};
use core_runtime::logging::redact_if_sensitive;
use core_runtime::SyncConfig;
use core_sync::{
    backup, AuditFinding, DeleteOptions, DeleteReport, DocumentFailure, ExtentReport,
    InheritReport, IntegrityWarning, MirrorOptions, PathIdentityMap, ResolveContext, RunState,
    SyncEngine, SyncSummary, TreeMirror, WhenAbsent,
};
use provider_sciencebase::ScienceBaseConnector;
use tracing::{info, instrument, warn};

/// Aggregated handle to all bridge dependencies the core requires.
#[derive(Clone)]
pub struct CoreDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub filesystem: Arc<dyn FileSystemAccess>,
    pub clock: Arc<dyn Clock>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        filesystem: Arc<dyn FileSystemAccess>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            http_client,
            filesystem,
            clock,
        }
    }

    /// reqwest, tokio fs and the system clock
    #[cfg(feature = "desktop-shims")]
    pub fn desktop() -> Result<Self> {
        let http_client = bridge_desktop::ReqwestHttpClient::new()
            .map_err(|err| CoreError::InitializationFailed(err.to_string()))?;
        Ok(Self::new(
            Arc::new(http_client),
            Arc::new(bridge_desktop::TokioFileSystem::new()),
            Arc::new(bridge_traits::SystemClock),
        ))
    }
}

/// Document pass a [`SyncSummary`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Metadata,
    Data,
    Browse,
    MetadataUpload,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Pass::Metadata => "metadata",
            Pass::Data => "data",
            Pass::Browse => "browse",
            Pass::MetadataUpload => "metadata upload",
        };
        f.write_str(s)
    }
}

/// What a full run did
#[derive(Debug, Default)]
pub struct RunReport {
    pub restored: usize,
    pub deleted: Option<DeleteReport>,
    /// Directories mapped to pages after the mirror
    pub mapped: usize,
    /// Records the document passes visited
    pub documents: usize,
    /// One summary per pass, in run order
    pub passes: Vec<(Pass, SyncSummary)>,
    pub inheritance: Option<InheritReport>,
    pub extent: Option<ExtentReport>,
    pub removed_backups: usize,
    pub snapshot: Option<PathBuf>,
}

impl RunReport {
    pub fn pass(&self, pass: Pass) -> Option<&SyncSummary> {
        self.passes
            .iter()
            .find(|(p, _)| *p == pass)
            .map(|(_, summary)| summary)
    }

    fn summaries(&self) -> impl Iterator<Item = &SyncSummary> {
        self.passes.iter().map(|(_, summary)| summary)
    }

    /// Failures across passes, one per document and step. A record that
    /// cannot be resolved fails every pass; it is listed once.
    pub fn failures(&self) -> Vec<&DocumentFailure> {
        let mut seen = HashSet::new();
        self.summaries()
            .flat_map(|summary| &summary.failures)
            .filter(|failure| seen.insert((failure.path.as_path(), failure.step)))
            .collect()
    }

    /// Distinct records that failed in at least one pass
    pub fn failed_documents(&self) -> usize {
        self.summaries()
            .flat_map(|summary| summary.failures.iter().map(|f| f.path.as_path()))
            .collect::<HashSet<&Path>>()
            .len()
    }

    /// Distinct records that went through every pass without failing
    pub fn succeeded_documents(&self) -> usize {
        self.documents.saturating_sub(self.failed_documents())
    }

    pub fn warnings(&self) -> Vec<&IntegrityWarning> {
        let mut seen = HashSet::new();
        self.summaries()
            .flat_map(|summary| &summary.warnings)
            .filter(|warning| seen.insert((warning.path.as_str(), warning.id.as_str())))
            .collect()
    }

    /// Record and data file uploads over all passes
    pub fn uploaded(&self) -> usize {
        self.summaries().map(|summary| summary.uploaded).sum()
    }

    pub fn has_failures(&self) -> bool {
        self.failed_documents() > 0
            || self
                .inheritance
                .as_ref()
                .is_some_and(|report| !report.failures.is_empty())
    }
}

/// Primary façade exposed to the command line.
pub struct CoreService {
    config: SyncConfig,
    deps: CoreDependencies,
    catalog: Arc<dyn CatalogClient>,
    landing_id: String,
}

impl CoreService {
    /// Use an already built catalog client.
    pub fn new(
        config: SyncConfig,
        deps: CoreDependencies,
        catalog: Arc<dyn CatalogClient>,
    ) -> Result<Self> {
        config.validate()?;
        let landing_id = config.landing_id().ok_or_else(|| {
            CoreError::InitializationFailed("no landing page id configured".to_string())
        })?;
        Ok(Self {
            config,
            deps,
            catalog,
            landing_id,
        })
    }

    /// Read the password file, sign in and build the ScienceBase connector.
    #[instrument(
        skip(config, deps),
        fields(username = %redact_if_sensitive("username", &config.username))
    )]
    pub async fn connect(config: SyncConfig, deps: CoreDependencies) -> Result<Self> {
        let password = read_password(deps.filesystem.as_ref(), &config.password_file).await?;

        let token_client = TokenClient::new(
            TokenEndpoint::default(),
            deps.http_client.clone(),
            deps.clock.clone(),
        );
        let session = Arc::new(CatalogSession::new(
            token_client,
            Credentials::new(config.username.clone(), password),
            deps.clock.clone(),
        ));
        session.login().await?;

        let connector = ScienceBaseConnector::new(
            deps.http_client.clone(),
            session,
            deps.filesystem.clone(),
        );
        Self::new(config, deps, Arc::new(connector))
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn catalog(&self) -> Arc<dyn CatalogClient> {
        Arc::clone(&self.catalog)
    }

    pub fn landing_id(&self) -> &str {
        &self.landing_id
    }

    fn fs(&self) -> &dyn FileSystemAccess {
        self.deps.filesystem.as_ref()
    }

    fn root_dir(&self) -> &Path {
        &self.config.parent_dir
    }

    fn engine(&self) -> Result<SyncEngine> {
        Ok(SyncEngine::new(
            self.catalog.clone(),
            self.deps.filesystem.clone(),
            self.deps.clock.clone(),
            engine_options(&self.config)?,
        ))
    }

    fn mirror(&self) -> TreeMirror {
        TreeMirror::new(
            self.catalog.clone(),
            self.deps.filesystem.clone(),
            MirrorOptions {
                settle_delay: self.config.settle_delay(),
                preview_image: self.config.preview_image.clone(),
            },
        )
    }

    async fn save_state(&self, state: &RunState) -> Result<()> {
        state.save(self.fs(), &self.config.state_dir()).await?;
        Ok(())
    }

    // ========================================================================
    // Full run
    // ========================================================================

    /// Run every enabled pass over the release in order:
    ///
    /// restore backups, optional cascade delete, mirror directories,
    /// rewrite records, landing page, data files, browse graphics, stale
    /// record upload, inheritance, extents, backup removal, snapshot.
    ///
    /// Per-document failures are collected in the report. A failure that
    /// leaves the run without a page map stops it.
    #[instrument(
        skip(self),
        fields(root = %self.root_dir().display(), landing_id = %self.landing_id)
    )]
    pub async fn run(&self) -> Result<RunReport> {
        let mut report = RunReport::default();
        let root_dir = self.root_dir().to_path_buf();
        let engine = self.engine()?;

        if self.config.restore_original_xml {
            report.restored = backup::restore_originals(self.fs(), &root_dir).await?;
        }

        let mut state = RunState::load(self.fs(), &self.config.state_dir()).await?;

        if self.config.delete_all_subpages {
            let deleted = self.delete_children(&self.landing_id).await?;
            report.deleted = Some(deleted);
            state = RunState::new();
        }

        let known = if self.config.update_subpages {
            let known = self
                .mirror()
                .mirror(&root_dir, &self.landing_id, &mut state)
                .await?;
            self.save_state(&state).await?;
            known
        } else {
            self.known_without_mirror(&state)?
        };
        report.mapped = known.len();

        let ctx = ResolveContext::new(&known, &root_dir).with_parent_id(&self.landing_id);
        report.documents = engine.documents(&root_dir).await?.len();

        if self.config.update_xml {
            let summary = engine.update_documents(&root_dir, &ctx).await?;
            report.passes.push((Pass::Metadata, summary));
        }

        if let Err(e) = engine.populate_landing(&root_dir, &self.landing_id).await {
            warn!(error = %e, "Landing page not updated");
        }

        if self.config.update_data {
            let summary = engine.upload_all_data(&root_dir, &ctx).await?;
            report.passes.push((Pass::Data, summary));
            if self.config.update_browse {
                let summary = engine.update_browse_graphics(&root_dir, &ctx).await?;
                report.passes.push((Pass::Browse, summary));
            }
        }

        let summary = engine.upload_stale_documents(&root_dir, &ctx).await?;
        report.passes.push((Pass::MetadataUpload, summary));

        if !self.config.container_inherits.is_empty() || !self.config.data_inherits.is_empty() {
            report.inheritance = Some(self.inherit(&self.landing_id).await?);
        }

        if self.config.update_extent {
            report.extent = Some(self.set_extents(&self.landing_id).await?);
        }

        if self.config.remove_original_xml {
            report.removed_backups = backup::remove_backups(self.fs(), &root_dir).await?;
        }

        if self.config.archive_xml {
            report.snapshot = Some(self.archive().await?);
        }

        self.save_state(&state).await?;

        info!(
            mapped = report.mapped,
            documents = report.documents,
            failed = report.failed_documents(),
            uploaded = report.uploaded(),
            warnings = report.warnings().len(),
            "Run finished"
        );
        Ok(report)
    }

    /// Page map from saved state, with the root pinned to the landing page
    fn known_without_mirror(&self, state: &RunState) -> Result<PathIdentityMap> {
        let mut known = state.dir_to_id.clone();
        if let Some(root) = core_sync::path::root_key(self.root_dir()) {
            if known.get(&root) != Some(self.landing_id.as_str()) {
                known.insert(root, self.landing_id.clone())?;
            }
        }
        Ok(known)
    }

    // ========================================================================
    // Single operations
    // ========================================================================

    pub async fn restore_originals(&self) -> Result<usize> {
        Ok(backup::restore_originals(self.fs(), self.root_dir()).await?)
    }

    pub async fn remove_backups(&self) -> Result<usize> {
        Ok(backup::remove_backups(self.fs(), self.root_dir()).await?)
    }

    /// Snapshot the current records under the stash directory, dated today
    pub async fn archive(&self) -> Result<PathBuf> {
        let today = self.deps.clock.today();
        let stash_dir = self.config.stash_dir();
        Ok(backup::archive_snapshot(self.fs(), self.root_dir(), &stash_dir, today).await?)
    }

    pub async fn delete_children(&self, parent_id: &str) -> Result<DeleteReport> {
        let options = DeleteOptions::default();
        Ok(core_sync::delete_all_children(self.catalog.as_ref(), parent_id, options).await?)
    }

    pub async fn fix_false_folder(&self, id: &str) -> Result<bool> {
        let settle_delay = self.config.settle_delay();
        Ok(core_sync::fix_false_folder(self.catalog.as_ref(), id, settle_delay).await?)
    }

    pub async fn audit(
        &self,
        top_id: &str,
        expectations: &BTreeMap<String, usize>,
    ) -> Result<Vec<AuditFinding>> {
        Ok(core_sync::audit_fields(self.catalog.as_ref(), top_id, expectations).await?)
    }

    pub async fn inherit(&self, top_id: &str) -> Result<InheritReport> {
        Ok(core_sync::inherit_topdown(
            self.catalog.as_ref(),
            top_id,
            self.config.container_inherits.as_slice(),
            self.config.data_inherits.as_slice(),
            WhenAbsent::from_inherit_void(self.config.inherit_void),
        )
        .await?)
    }

    pub async fn set_extents(&self, top_id: &str) -> Result<ExtentReport> {
        Ok(core_sync::set_parent_extents(self.catalog.as_ref(), top_id).await?)
    }
}

/// Password from the first line of `path`
pub async fn read_password(fs: &dyn FileSystemAccess, path: &Path) -> Result<String> {
    let bytes = fs.read_file(path).await?;
    let text = String::from_utf8_lossy(&bytes);
    let password = text.lines().next().unwrap_or_default().trim_end().to_string();
    if password.is_empty() {
        return Err(CoreError::InitializationFailed(format!(
            "password file {} is empty",
            path.display()
        )));
    }
    Ok(password)
}
