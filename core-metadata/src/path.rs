//! Element path expressions
//!
//! A path is a `/`-separated sequence of tag names. Relative paths
//! (`./idinfo/browse` or `idinfo/browse`) start below the document root;
//! absolute paths (`/metadata/idinfo`) name the root tag first. `.` on its
//! own addresses the root element.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{MetadataError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementPath {
    raw: String,
    root: Option<String>,
    segments: Vec<String>,
}

impl ElementPath {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let invalid = |reason: &str| MetadataError::InvalidPath {
            path: raw.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("empty path"));
        }

        let (root, body) = if let Some(rest) = trimmed.strip_prefix('/') {
            let mut parts = rest.splitn(2, '/');
            let root = parts.next().unwrap_or_default();
            if root.is_empty() {
                return Err(invalid("missing root tag"));
            }
            (Some(root.to_string()), parts.next().unwrap_or_default())
        } else if trimmed == "." {
            (None, "")
        } else {
            (None, trimmed.strip_prefix("./").unwrap_or(trimmed))
        };

        let body = body.trim_end_matches('/');
        let mut segments = Vec::new();
        if !body.is_empty() {
            for segment in body.split('/') {
                if segment.is_empty() {
                    return Err(invalid("empty segment"));
                }
                if segment == "." || segment == ".." {
                    return Err(invalid("relative steps are only allowed as a leading './'"));
                }
                if segment.contains(|c: char| matches!(c, '[' | ']' | '*' | '@')) {
                    return Err(invalid("predicates and wildcards are not supported"));
                }
                segments.push(segment.to_string());
            }
        }

        Ok(Self {
            raw: trimmed.to_string(),
            root,
            segments,
        })
    }

    /// The root tag an absolute path requires, if any
    pub fn root_name(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Final tag of the path; `None` when the path addresses the root
    pub fn tag(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Path to the container of the addressed element
    pub fn parent(&self) -> Option<ElementPath> {
        let (_, init) = self.segments.split_last()?;
        let raw = match &self.root {
            Some(root) if init.is_empty() => format!("/{}", root),
            Some(root) => format!("/{}/{}", root, init.join("/")),
            None if init.is_empty() => ".".to_string(),
            None => format!("./{}", init.join("/")),
        };
        Some(Self {
            raw,
            root: self.root.clone(),
            segments: init.to_vec(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ElementPath {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for ElementPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for ElementPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ElementPath::parse(&raw).map_err(serde::de::Error::custom)
    }
}
