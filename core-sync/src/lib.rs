//! # Sync Module
//!
//! Keeps a local release tree of metadata records and a catalog page tree
//! in step.
//!
//! ## Overview
//!
//! This module handles:
//! - Mapping local paths to stable keys and discovering records
//! - Persisting the path → page mapping between runs
//! - Resolving the catalog page a record belongs to
//! - Mirroring the directory hierarchy as pages
//! - Rewriting records, uploading stale records and data files
//! - Field inheritance and extent aggregation across the page tree
//! - Maintenance: cascade delete, folder-flag repair, field audits, backups
//!
//! ## Components
//!
//! - **Path Resolver** (`path`): Keys, directory chains, record discovery
//! - **Run State** (`state`): `PathIdentityMap` and the parent → children relation
//! - **Identity Resolver** (`identity`): Known map, title search, record link
//! - **Tree Mirror** (`tree_mirror`): Find-or-create pages for every directory
//! - **Sync Engine** (`engine`): Per-document passes with a batch summary
//! - **Inheritance** (`inheritance`): Parent → child field copies
//! - **Extent** (`extent`): Bottom-up bounding box aggregation
//! - **Maintenance** (`maintenance`, `backup`): Tree and file housekeeping

pub mod backup;
pub mod engine;
pub mod error;
pub mod extent;
pub mod identity;
pub mod inheritance;
pub mod maintenance;
pub mod path;
pub mod state;
pub mod tree_mirror;

pub use engine::{
    is_stale, DataUpload, DocumentFailure, DocumentUpdate, EngineOptions, SyncEngine, SyncStep,
    SyncSummary, XmlEdits,
};
pub use error::{Result, SyncError};
pub use extent::{aggregate_extent, set_parent_extents, ExtentReport};
pub use identity::{
    CatalogIdentityResolver, IntegrityWarning, Resolution, ResolutionSource, ResolveContext,
};
pub use inheritance::{inherit, inherit_from_parent, inherit_topdown, InheritReport, WhenAbsent};
pub use maintenance::{
    audit_fields, delete_all_children, fix_false_folder, remove_all_files, AuditFinding,
    DeleteOptions, DeleteReport, FindingKind,
};
pub use state::{PathIdentityMap, RunState};
pub use tree_mirror::{MirrorOptions, TreeMirror};
