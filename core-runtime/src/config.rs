//! # Sync Configuration Module
//!
//! Provides configuration management for a sync run.
//!
//! ## Overview
//!
//! A [`SyncConfig`] describes one release: who signs in, which local tree is
//! mirrored under which landing page, which values are written into the
//! records and which passes run. It is read from a TOML file or assembled
//! with [`SyncConfig::builder`]; both paths end in [`SyncConfig::validate`]
//! so a bad value fails before any catalog call is made.
//!
//! ## Usage
//!
//! ### From a file
//!
//! ```toml
//! username = "someone@usgs.gov"
//! password_file = "key.txt"
//! landing_link = "https://www.sciencebase.gov/catalog/item/5f28109582cef313ed9cd787"
//! parent_dir = "/data/UVVR"
//! doi = "10.5066/P9ABCDEF"
//! pubdate = "2020"
//! data_inherits = ["citation", "contacts", "body"]
//!
//! [[find_and_replace]]
//! find = "http:"
//! replace = "https:"
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! ```ignore
//! use core_runtime::config::SyncConfig;
//!
//! let config = SyncConfig::from_toml_file("release.toml")?;
//! ```
//!
//! ### With the builder
//!
//! ```ignore
//! use core_runtime::config::SyncConfig;
//!
//! let config = SyncConfig::builder()
//!     .username("someone@usgs.gov")
//!     .landing_id("5f28109582cef313ed9cd787")
//!     .parent_dir("/data/UVVR")
//!     .doi("10.5066/P9ABCDEF")
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::logging::LoggingConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Hidden directory under the release root holding state and snapshots
pub const STASH_DIR_NAME: &str = ".assistants";

/// Marker text of unfilled template values
pub const DEFAULT_FILL_MARKER: &str = "AUTHOR";

fn default_password_file() -> PathBuf {
    PathBuf::from("key.txt")
}

fn default_landing_fields() -> Vec<String> {
    ["purpose", "summary", "body"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_fill_markers() -> Vec<String> {
    vec![DEFAULT_FILL_MARKER.to_string()]
}

/// One find → replace pair of the text pass
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TextReplacement {
    pub find: String,
    pub replace: String,
}

/// Elements under `path` dropped when their text holds one of `markers`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FillRemoval {
    pub path: String,
    #[serde(default = "default_fill_markers")]
    pub markers: Vec<String>,
}

/// An element, given as XML, placed under the container at `path`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ElementEdit {
    pub path: String,
    pub xml: String,
}

/// Settings for one sync run.
///
/// Use [`SyncConfig::builder`] or [`SyncConfig::from_toml_file`] to construct
/// validated instances.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Catalog account
    pub username: String,

    /// File holding the account password
    pub password_file: PathBuf,

    /// Id of the release's landing page
    pub landing_id: Option<String>,

    /// Landing page URL, used when `landing_id` is not given
    pub landing_link: Option<String>,

    /// Local root of the release tree
    pub parent_dir: PathBuf,

    /// Where the run state is kept (default: `<parent_dir>/.assistants`)
    pub state_dir: Option<PathBuf>,

    /// Release DOI without prefix, e.g. `10.5066/P9ABCDEF`
    pub doi: Option<String>,
    pub pubdate: Option<String>,
    pub edition: Option<String>,

    /// Fields pages with children take from their parent
    pub container_inherits: Vec<String>,
    /// Fields leaf pages take from their parent
    pub data_inherits: Vec<String>,
    /// Landing page fields filled from the root record
    pub landing_fields_from_xml: Vec<String>,

    pub update_subpages: bool,
    pub delete_all_subpages: bool,
    pub update_xml: bool,
    pub update_data: bool,
    pub update_browse: bool,
    pub update_extent: bool,
    pub restore_original_xml: bool,
    pub remove_original_xml: bool,
    pub archive_xml: bool,
    /// Clear inherited fields the parent lacks instead of keeping them
    pub inherit_void: bool,
    /// Delete a page's files before its data is uploaded
    pub replace_files: bool,

    /// Largest data file uploaded, in MB
    pub max_upload_mb: u64,
    /// Wait after creating a page
    pub settle_delay_ms: u64,
    /// Number of records skipped at the start of the document pass
    pub start_index: usize,
    /// Image attached to every page the mirror touches
    pub preview_image: Option<PathBuf>,

    pub remove_fills: Vec<FillRemoval>,
    pub metadata_additions: Vec<ElementEdit>,
    pub metadata_replacements: Vec<ElementEdit>,
    pub find_and_replace: Vec<TextReplacement>,
    pub regex_replacements: Vec<TextReplacement>,

    pub logging: LoggingConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password_file: default_password_file(),
            landing_id: None,
            landing_link: None,
            parent_dir: PathBuf::new(),
            state_dir: None,
            doi: None,
            pubdate: None,
            edition: None,
            container_inherits: Vec::new(),
            data_inherits: Vec::new(),
            landing_fields_from_xml: default_landing_fields(),
            update_subpages: true,
            delete_all_subpages: false,
            update_xml: true,
            update_data: true,
            update_browse: true,
            update_extent: false,
            restore_original_xml: false,
            remove_original_xml: false,
            archive_xml: false,
            inherit_void: true,
            replace_files: true,
            max_upload_mb: 2000,
            settle_delay_ms: 1000,
            start_index: 0,
            preview_image: None,
            remove_fills: Vec::new(),
            metadata_additions: Vec::new(),
            metadata_replacements: Vec::new(),
            find_and_replace: Vec::new(),
            regex_replacements: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Final path segment of a catalog page URL
fn id_from_link(link: &str) -> Option<String> {
    let without_query = link.trim().split(['?', '#']).next()?;
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .map(str::to_string)
}

impl SyncConfig {
    /// Creates a new builder for constructing a `SyncConfig`.
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Parse a TOML document without validating it
    pub fn from_toml_str(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Read, parse and validate a TOML configuration file.
    ///
    /// Relative `password_file` and `state_dir` entries are taken relative
    /// to the file's directory.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&raw).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(base) = path.parent() {
            if config.password_file.is_relative() {
                config.password_file = base.join(&config.password_file);
            }
            if let Some(state_dir) = config.state_dir.as_mut() {
                if state_dir.is_relative() {
                    *state_dir = base.join(&*state_dir);
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Username and release root are set
    /// - A landing page id can be derived
    /// - The DOI carries no prefix
    /// - Every configured edit names a path
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(Error::Config("Username cannot be empty".to_string()));
        }

        if self.parent_dir.as_os_str().is_empty() {
            return Err(Error::Config(
                "Release root (parent_dir) cannot be empty".to_string(),
            ));
        }

        if self.landing_id().is_none() {
            return Err(Error::Config(
                "Either landing_id or a landing_link ending in the page id is required"
                    .to_string(),
            ));
        }

        if let Some(doi) = &self.doi {
            let lower = doi.trim().to_lowercase();
            if lower.is_empty() {
                return Err(Error::Config("DOI cannot be empty".to_string()));
            }
            if lower.starts_with("doi:") || lower.contains("doi.org") {
                return Err(Error::Config(format!(
                    "DOI {} must be given without the DOI: or https://doi.org/ prefix",
                    doi
                )));
            }
        }

        if self.max_upload_mb == 0 {
            return Err(Error::Config(
                "Upload limit must be greater than 0 MB".to_string(),
            ));
        }

        let edit_paths = self
            .remove_fills
            .iter()
            .map(|r| &r.path)
            .chain(self.metadata_additions.iter().map(|e| &e.path))
            .chain(self.metadata_replacements.iter().map(|e| &e.path));
        for path in edit_paths {
            if path.trim().is_empty() {
                return Err(Error::Config(
                    "Metadata edits need a non-empty element path".to_string(),
                ));
            }
        }

        if self.remove_fills.iter().any(|r| r.markers.is_empty()) {
            return Err(Error::Config(
                "remove_fills entries need at least one marker".to_string(),
            ));
        }

        Ok(())
    }

    /// Landing page id, from `landing_id` or the end of `landing_link`
    pub fn landing_id(&self) -> Option<String> {
        match &self.landing_id {
            Some(id) if !id.trim().is_empty() => Some(id.trim().to_string()),
            _ => self.landing_link.as_deref().and_then(id_from_link),
        }
    }

    /// Hidden directory under the release root
    pub fn stash_dir(&self) -> PathBuf {
        self.parent_dir.join(STASH_DIR_NAME)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| self.stash_dir())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(1_000_000)
    }
}

/// Builder for constructing [`SyncConfig`] instances.
///
/// Unset values keep the [`SyncConfig`] defaults. Call
/// [`build()`](SyncConfigBuilder::build) to validate.
#[derive(Default)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = username.into();
        self
    }

    pub fn password_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.password_file = path.into();
        self
    }

    pub fn landing_id(mut self, id: impl Into<String>) -> Self {
        self.config.landing_id = Some(id.into());
        self
    }

    pub fn landing_link(mut self, link: impl Into<String>) -> Self {
        self.config.landing_link = Some(link.into());
        self
    }

    /// Sets the local root of the release tree.
    pub fn parent_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.parent_dir = path.into();
        self
    }

    pub fn state_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.state_dir = Some(path.into());
        self
    }

    pub fn doi(mut self, doi: impl Into<String>) -> Self {
        self.config.doi = Some(doi.into());
        self
    }

    pub fn pubdate(mut self, pubdate: impl Into<String>) -> Self {
        self.config.pubdate = Some(pubdate.into());
        self
    }

    pub fn edition(mut self, edition: impl Into<String>) -> Self {
        self.config.edition = Some(edition.into());
        self
    }

    pub fn container_inherits<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.container_inherits = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn data_inherits<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.data_inherits = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn landing_fields_from_xml<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.landing_fields_from_xml = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn update_subpages(mut self, enabled: bool) -> Self {
        self.config.update_subpages = enabled;
        self
    }

    pub fn delete_all_subpages(mut self, enabled: bool) -> Self {
        self.config.delete_all_subpages = enabled;
        self
    }

    pub fn update_xml(mut self, enabled: bool) -> Self {
        self.config.update_xml = enabled;
        self
    }

    pub fn update_data(mut self, enabled: bool) -> Self {
        self.config.update_data = enabled;
        self
    }

    pub fn update_browse(mut self, enabled: bool) -> Self {
        self.config.update_browse = enabled;
        self
    }

    pub fn update_extent(mut self, enabled: bool) -> Self {
        self.config.update_extent = enabled;
        self
    }

    pub fn restore_original_xml(mut self, enabled: bool) -> Self {
        self.config.restore_original_xml = enabled;
        self
    }

    pub fn remove_original_xml(mut self, enabled: bool) -> Self {
        self.config.remove_original_xml = enabled;
        self
    }

    pub fn archive_xml(mut self, enabled: bool) -> Self {
        self.config.archive_xml = enabled;
        self
    }

    pub fn inherit_void(mut self, enabled: bool) -> Self {
        self.config.inherit_void = enabled;
        self
    }

    pub fn replace_files(mut self, enabled: bool) -> Self {
        self.config.replace_files = enabled;
        self
    }

    pub fn max_upload_mb(mut self, size_mb: u64) -> Self {
        self.config.max_upload_mb = size_mb;
        self
    }

    pub fn settle_delay_ms(mut self, delay_ms: u64) -> Self {
        self.config.settle_delay_ms = delay_ms;
        self
    }

    pub fn start_index(mut self, index: usize) -> Self {
        self.config.start_index = index;
        self
    }

    pub fn preview_image<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.preview_image = Some(path.into());
        self
    }

    pub fn remove_fill(mut self, path: impl Into<String>, markers: Vec<String>) -> Self {
        self.config.remove_fills.push(FillRemoval {
            path: path.into(),
            markers,
        });
        self
    }

    pub fn metadata_addition(mut self, path: impl Into<String>, xml: impl Into<String>) -> Self {
        self.config.metadata_additions.push(ElementEdit {
            path: path.into(),
            xml: xml.into(),
        });
        self
    }

    pub fn metadata_replacement(
        mut self,
        path: impl Into<String>,
        xml: impl Into<String>,
    ) -> Self {
        self.config.metadata_replacements.push(ElementEdit {
            path: path.into(),
            xml: xml.into(),
        });
        self
    }

    pub fn find_and_replace(mut self, find: impl Into<String>, replace: impl Into<String>) -> Self {
        self.config.find_and_replace.push(TextReplacement {
            find: find.into(),
            replace: replace.into(),
        });
        self
    }

    pub fn regex_replacement(
        mut self,
        pattern: impl Into<String>,
        replace: impl Into<String>,
    ) -> Self {
        self.config.regex_replacements.push(TextReplacement {
            find: pattern.into(),
            replace: replace.into(),
        });
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Builds the final `SyncConfig` instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when [`SyncConfig::validate`] rejects the
    /// assembled values.
    pub fn build(self) -> Result<SyncConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
