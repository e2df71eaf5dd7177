//! # Host Bridge Traits
//!
//! Capability traits the sync core depends on, implemented by host crates.
//!
//! ## Overview
//!
//! This crate defines the contract between the sync core and its
//! environment. Each trait is a capability the core requires but does not
//! implement itself, so the core can be driven against in-memory fakes
//! and mocks in tests.
//!
//! ## Traits
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Async HTTP with bearer auth, multipart bodies, retry
//! - [`FileSystemAccess`](storage::FileSystemAccess) - File reads/writes, no-clobber copies, listings
//!
//! ### Remote Catalog
//! - [`CatalogClient`](catalog::CatalogClient) - Page CRUD, child listing, file upload/replace
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Implementations should:
//!
//! - Convert platform-specific errors to `BridgeError`
//! - Provide actionable error messages
//! - Include error context (e.g., file paths, item identifiers)
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so the same instances can be
//! shared behind `Arc` between the service layer and the engine.

pub mod catalog;
pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use catalog::{
    BoundingBox, CatalogClient, CatalogFile, CatalogItem, Facet, NewItem, Spatial,
    FGDC_CONTENT_TYPE,
};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartForm, RetryPolicy};
pub use storage::{FileMetadata, FileSystemAccess};
pub use time::{Clock, FixedClock, SystemClock};
