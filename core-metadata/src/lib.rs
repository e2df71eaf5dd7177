//! # Metadata Document Module
//!
//! Reads and rewrites FGDC/CSDGM metadata records through path-addressed
//! element updates.
//!
//! ## Overview
//!
//! This module handles:
//! - Element paths (`./idinfo/citation/citeinfo/onlink`) and their matches
//! - Read/write/insert/replace/remove operations on the element tree
//! - Repair of attribute domains that hold more than one value
//! - Computing the catalog-derived values (DOI, page URLs, dates) and the
//!   slots they are written to
//! - File-backed documents with a one-time `_orig` backup
//! - Text-level find/replace over the serialized document
//! - Browse-graphic file name matching

pub mod browse;
pub mod document;
pub mod error;
pub mod path;
pub mod store;
pub mod text;
pub mod value_map;

pub use document::{parse_element, MetadataDocument};
pub use error::{MetadataError, Result};
pub use path::ElementPath;
pub use store::{backup_path, MetadataFile, BACKUP_SUFFIX};
pub use text::{TextEditOutcome, TextEdits};
pub use value_map::{compute_assignments, NewValues, SkippedSlot, ValueAssignments};

pub use xmltree::Element;
