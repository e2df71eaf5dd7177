//! # Field Inheritance
//!
//! Copies selected page fields from parents to children.
//!
//! ## Overview
//!
//! [`inherit`] is the pure per-page rule. A field present on the parent is
//! copied verbatim. A field the parent lacks is either cleared on the child
//! ([`WhenAbsent::Clear`]) or left alone with a diagnostic
//! ([`WhenAbsent::Preserve`]).
//!
//! [`inherit_topdown`] walks a page tree from the top with an explicit work
//! stack. Pages that have children receive the container field set; leaves
//! receive the leaf field set. A parent is always updated before its
//! children are visited, so values cascade down the whole tree in one walk.

use bridge_traits::catalog::{CatalogClient, CatalogItem};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SyncError};

/// What happens to a child's field when the parent has none
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhenAbsent {
    #[default]
    Clear,
    Preserve,
}

impl WhenAbsent {
    pub fn from_inherit_void(inherit_void: bool) -> Self {
        if inherit_void {
            WhenAbsent::Clear
        } else {
            WhenAbsent::Preserve
        }
    }
}

/// A field left untouched because the parent does not have it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InheritDiagnostic {
    pub item_id: String,
    pub field: String,
    pub message: String,
}

/// Copy `fields` from `parent` onto `child`
pub fn inherit<S: AsRef<str>>(
    child: &mut CatalogItem,
    parent: &CatalogItem,
    fields: &[S],
    when_absent: WhenAbsent,
) -> Result<Vec<InheritDiagnostic>> {
    let mut diagnostics = Vec::new();

    for field in fields.iter().map(AsRef::as_ref) {
        match (parent.field(field), when_absent) {
            (Some(value), _) => child.set_field(field, value)?,
            (None, WhenAbsent::Clear) => child.set_field(field, Value::Null)?,
            (None, WhenAbsent::Preserve) => {
                debug!(item_id = %child.id, field, "Parent lacks field, keeping child value");
                diagnostics.push(InheritDiagnostic {
                    item_id: child.id.clone(),
                    field: field.to_string(),
                    message: format!(
                        "'{}' is absent on parent {}; child value kept",
                        field, parent.id
                    ),
                });
            }
        }
    }
    Ok(diagnostics)
}

/// Fetch the child's parent, inherit `fields` and update the child
#[instrument(skip(catalog, child, fields), fields(item_id = %child.id))]
pub async fn inherit_from_parent<S: AsRef<str>>(
    catalog: &dyn CatalogClient,
    mut child: CatalogItem,
    fields: &[S],
    when_absent: WhenAbsent,
) -> Result<(CatalogItem, Vec<InheritDiagnostic>)> {
    let parent_id = child
        .parent_id
        .clone()
        .ok_or_else(|| SyncError::State(format!("page {} has no parent", child.id)))?;
    let parent = catalog.get_item(&parent_id).await?;
    let diagnostics = inherit(&mut child, &parent, fields, when_absent)?;
    let updated = catalog.update_item(&child).await?;
    Ok((updated, diagnostics))
}

#[derive(Debug, Clone, Default)]
pub struct InheritReport {
    pub updated: usize,
    pub diagnostics: Vec<InheritDiagnostic>,
    /// Pages whose update failed, with the error
    pub failures: Vec<(String, String)>,
}

/// Pass fields from `top_id` down to every descendant
#[instrument(skip(catalog, container_fields, leaf_fields), fields(top_id = %top_id))]
pub async fn inherit_topdown<S: AsRef<str>>(
    catalog: &dyn CatalogClient,
    top_id: &str,
    container_fields: &[S],
    leaf_fields: &[S],
    when_absent: WhenAbsent,
) -> Result<InheritReport> {
    let mut report = InheritReport::default();
    let mut visited: HashSet<String> = HashSet::new();
    let mut pending = vec![top_id.to_string()];
    visited.insert(top_id.to_string());

    while let Some(parent_id) = pending.pop() {
        let parent = catalog.get_item(&parent_id).await?;

        for child_id in catalog.get_child_ids(&parent_id).await? {
            if !visited.insert(child_id.clone()) {
                continue;
            }
            let outcome = inherit_one(
                catalog,
                &parent,
                &child_id,
                container_fields,
                leaf_fields,
                when_absent,
            )
            .await;
            match outcome {
                Ok((has_children, diagnostics)) => {
                    report.updated += 1;
                    report.diagnostics.extend(diagnostics);
                    if has_children {
                        pending.push(child_id);
                    }
                }
                Err(e) => {
                    warn!(item_id = %child_id, error = %e, "Inheritance failed");
                    report.failures.push((child_id, e.to_string()));
                }
            }
        }
    }

    info!(
        updated = report.updated,
        failed = report.failures.len(),
        "Inheritance finished"
    );
    Ok(report)
}

async fn inherit_one<S: AsRef<str>>(
    catalog: &dyn CatalogClient,
    parent: &CatalogItem,
    child_id: &str,
    container_fields: &[S],
    leaf_fields: &[S],
    when_absent: WhenAbsent,
) -> Result<(bool, Vec<InheritDiagnostic>)> {
    let mut child = catalog.get_item(child_id).await?;
    let has_children = child.has_children;
    let fields = if has_children { container_fields } else { leaf_fields };
    let diagnostics = inherit(&mut child, parent, fields, when_absent)?;
    catalog.update_item(&child).await?;
    debug!(item_id = %child_id, container = has_children, "Inherited fields");
    Ok((has_children, diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(value: serde_json::Value) -> CatalogItem {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_present_fields_are_copied() {
        let parent = page(json!({"id": "p", "citation": "Smith, 2024", "contacts": [{"name": "A"}]}));
        let mut child = page(json!({"id": "c", "citation": "old"}));

        let diagnostics = inherit(&mut child, &parent, &["citation", "contacts"], WhenAbsent::Clear).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(child.field("citation"), Some(json!("Smith, 2024")));
        assert_eq!(child.field("contacts"), Some(json!([{"name": "A"}])));
    }

    #[test]
    fn test_absent_field_cleared_by_default() {
        let parent = page(json!({"id": "p"}));
        let mut child = page(json!({"id": "c", "body": "child text"}));

        inherit(&mut child, &parent, &["body"], WhenAbsent::default()).unwrap();
        assert_eq!(child.field("body"), None);
    }

    #[test]
    fn test_clear_resets_typed_fields() {
        let parent = page(json!({"id": "p"}));
        let mut child = page(json!({
            "id": "c",
            "systemTypes": ["Folder"],
            "spatial": {"boundingBox": {"minX": -81.0, "minY": 30.0, "maxX": -80.0, "maxY": 31.0}},
            "facets": [{"className": "ShapefileFacet", "files": []}]
        }));

        let fields = ["systemTypes", "spatial", "facets"];
        let diagnostics = inherit(&mut child, &parent, &fields, WhenAbsent::Clear).unwrap();
        assert!(diagnostics.is_empty());
        assert!(!child.is_folder());
        assert!(child.spatial.is_none());
        assert!(child.facets.is_empty());
        assert_eq!(child.id, "c");
    }

    #[test]
    fn test_absent_field_preserved_with_diagnostic() {
        let parent = page(json!({"id": "p"}));
        let mut child = page(json!({"id": "c", "body": "child text"}));

        let diagnostics = inherit(&mut child, &parent, &["body"], WhenAbsent::Preserve).unwrap();
        assert_eq!(child.field("body"), Some(json!("child text")));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].field, "body");
        assert_eq!(diagnostics[0].item_id, "c");
    }

    #[test]
    fn test_when_absent_from_flag() {
        assert_eq!(WhenAbsent::from_inherit_void(true), WhenAbsent::Clear);
        assert_eq!(WhenAbsent::from_inherit_void(false), WhenAbsent::Preserve);
    }
}
