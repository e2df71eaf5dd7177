//! # Page Maintenance
//!
//! Operations on an existing page tree that are not part of a regular run:
//! clearing a tree, stripping attachments, clearing a stale folder flag and
//! auditing fields across descendants.

use bridge_traits::catalog::{CatalogClient, CatalogItem, NewItem};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;

const FOLDER_TYPE: &str = "Folder";
const THROWAWAY_TITLE: &str = "delete me";

/// Remove every file and facet from a page
#[instrument(skip(catalog), fields(item_id = %id))]
pub async fn remove_all_files(catalog: &dyn CatalogClient, id: &str) -> Result<CatalogItem> {
    let mut item = catalog.get_item(id).await?;
    if item.files.is_empty() && item.facets.is_empty() {
        return Ok(item);
    }
    item.files.clear();
    item.facets.clear();
    let item = catalog.update_item(&item).await?;
    debug!("Removed files and facets");
    Ok(item)
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteOptions {
    /// How long to wait for the catalog to report the parent empty
    pub wait: Duration,
    pub poll_interval: Duration,
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self {
            wait: Duration::from_secs(60),
            poll_interval: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: usize,
    /// Whether the parent reported no children before the wait ran out
    pub cleared: bool,
}

/// Delete every descendant of `parent_id`, deepest level first
#[instrument(skip(catalog, options), fields(parent_id = %parent_id))]
pub async fn delete_all_children(
    catalog: &dyn CatalogClient,
    parent_id: &str,
    options: DeleteOptions,
) -> Result<DeleteReport> {
    let mut order: Vec<String> = Vec::new();
    let mut children: HashMap<String, Vec<String>> = HashMap::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut pending = vec![parent_id.to_string()];
    visited.insert(parent_id.to_string());

    while let Some(id) = pending.pop() {
        let child_ids: Vec<String> = catalog
            .get_child_ids(&id)
            .await?
            .into_iter()
            .filter(|c| visited.insert(c.clone()))
            .collect();
        pending.extend(child_ids.iter().cloned());
        order.push(id.clone());
        children.insert(id, child_ids);
    }

    let mut report = DeleteReport::default();
    for id in order.iter().rev() {
        let Some(child_ids) = children.get(id).filter(|c| !c.is_empty()) else {
            continue;
        };
        catalog.delete_items(child_ids).await?;
        report.deleted += child_ids.len();
        debug!(item_id = %id, count = child_ids.len(), "Deleted children");
    }

    let deadline = Instant::now() + options.wait;
    loop {
        if catalog.get_child_ids(parent_id).await?.is_empty() {
            report.cleared = true;
            break;
        }
        if Instant::now() >= deadline {
            warn!("Parent still lists children after deletion");
            break;
        }
        tokio::time::sleep(options.poll_interval).await;
    }

    info!(deleted = report.deleted, cleared = report.cleared, "Deleted page tree");
    Ok(report)
}

/// Clear a `Folder` flag left on a page that has no children.
///
/// The catalog only recomputes the flag after the page's child list
/// changes, so a throwaway child is created and deleted first. Returns
/// whether the page no longer carries the flag.
#[instrument(skip(catalog), fields(item_id = %id))]
pub async fn fix_false_folder(
    catalog: &dyn CatalogClient,
    id: &str,
    settle_delay: Duration,
) -> Result<bool> {
    let throwaway = catalog.create_item(&NewItem::new(id, THROWAWAY_TITLE)).await?;
    tokio::time::sleep(settle_delay).await;
    catalog.delete_items(&[throwaway.id.clone()]).await?;

    let mut item = catalog.get_item(id).await?;
    item.system_types.retain(|t| t != FOLDER_TYPE);
    let item = catalog.update_item(&item).await?;

    let cleared = !item.is_folder();
    if cleared {
        info!("Folder flag cleared");
    } else {
        warn!("Page is still flagged as a folder");
    }
    Ok(cleared)
}

/// How a page's field differs from what was expected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindingKind {
    Missing,
    UnexpectedlyPresent,
    WrongCount { expected: usize, actual: usize },
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingKind::Missing => f.write_str("missing"),
            FindingKind::UnexpectedlyPresent => f.write_str("unexpectedly present"),
            FindingKind::WrongCount { expected, actual } => {
                write!(f, "has {} entries, expected {}", actual, expected)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditFinding {
    pub item_id: String,
    pub title: String,
    pub field: String,
    pub kind: FindingKind,
}

/// Number of entries a field holds; arrays and objects count their
/// members, any other value counts once
fn entry_count(value: &Value) -> usize {
    match value {
        Value::Array(values) => values.len(),
        Value::Object(map) => map.len(),
        _ => 1,
    }
}

/// Compare one page against `expectations` (field name to expected entry
/// count, `0` meaning the field should be absent)
pub fn check_fields(
    item: &CatalogItem,
    expectations: &BTreeMap<String, usize>,
) -> Vec<AuditFinding> {
    let finding = |field: &str, kind: FindingKind| AuditFinding {
        item_id: item.id.clone(),
        title: item.title.clone(),
        field: field.to_string(),
        kind,
    };

    let mut findings = Vec::new();
    for (field, &expected) in expectations {
        // An empty list counts as missing
        let actual = item
            .field(field)
            .filter(|v| !matches!(v, Value::Array(values) if values.is_empty()))
            .map(|v| entry_count(&v));

        match (expected, actual) {
            (0, Some(_)) => findings.push(finding(field, FindingKind::UnexpectedlyPresent)),
            (0, None) => {}
            (_, None) => findings.push(finding(field, FindingKind::Missing)),
            (expected, Some(actual)) if actual != expected => {
                findings.push(finding(field, FindingKind::WrongCount { expected, actual }))
            }
            _ => {}
        }
    }
    findings
}

/// Check every descendant of `top_id` against `expectations`
#[instrument(skip(catalog, expectations), fields(top_id = %top_id))]
pub async fn audit_fields(
    catalog: &dyn CatalogClient,
    top_id: &str,
    expectations: &BTreeMap<String, usize>,
) -> Result<Vec<AuditFinding>> {
    let mut findings = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut pending = vec![top_id.to_string()];
    visited.insert(top_id.to_string());
    let mut checked = 0usize;

    while let Some(id) = pending.pop() {
        for child_id in catalog.get_child_ids(&id).await? {
            if !visited.insert(child_id.clone()) {
                continue;
            }
            let child = catalog.get_item(&child_id).await?;
            for found in check_fields(&child, expectations) {
                warn!(item_id = %found.item_id, field = %found.field, "Field {}", found.kind);
                findings.push(found);
            }
            checked += 1;
            pending.push(child_id);
        }
    }

    info!(checked, findings = findings.len(), "Field audit finished");
    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn expectations(entries: &[(&str, usize)]) -> BTreeMap<String, usize> {
        entries.iter().map(|(f, n)| (f.to_string(), *n)).collect()
    }

    #[test]
    fn test_check_fields_reports_each_kind() {
        let item: CatalogItem = serde_json::from_value(json!({
            "id": "a",
            "title": "Site A",
            "contacts": [{"name": "x"}, {"name": "y"}],
            "body": "text",
            "webLinks": []
        }))
        .unwrap();

        let findings = check_fields(
            &item,
            &expectations(&[
                ("contacts", 3),
                ("body", 0),
                ("citation", 1),
                ("webLinks", 1),
            ]),
        );
        let kinds: Vec<(&str, &FindingKind)> = findings.iter().map(|f| (f.field.as_str(), &f.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("body", &FindingKind::UnexpectedlyPresent),
                ("citation", &FindingKind::Missing),
                ("contacts", &FindingKind::WrongCount { expected: 3, actual: 2 }),
                ("webLinks", &FindingKind::Missing),
            ]
        );
    }

    #[test]
    fn test_check_fields_passes_matching_page() {
        let item: CatalogItem = serde_json::from_value(json!({
            "id": "a",
            "contacts": [{"name": "x"}],
            "citation": "Smith"
        }))
        .unwrap();
        assert!(check_fields(&item, &expectations(&[("contacts", 1), ("citation", 1), ("body", 0)])).is_empty());
    }
}
