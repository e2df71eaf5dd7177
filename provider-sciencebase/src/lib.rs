//! # ScienceBase Provider
//!
//! Implements the `CatalogClient` trait against the ScienceBase catalog REST API.
//!
//! ## Overview
//!
//! This module provides:
//! - Item fetch, create, update and bulk delete
//! - Paged child and descendant listing
//! - Title search
//! - Multipart file upload that upserts the page in the same request
//! - Bearer authentication through a shared `CatalogSession`, with one
//!   forced re-authentication when the catalog answers 401

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{ScienceBaseConnector, SCIENCEBASE_CATALOG_URL};
pub use error::{Result, ScienceBaseError};
