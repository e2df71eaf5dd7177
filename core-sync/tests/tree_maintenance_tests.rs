//! Tree-wide catalog operations against an in-memory catalog

mod common;

use bridge_traits::catalog::{BoundingBox, CatalogItem, Facet, Spatial};
use common::FakeCatalog;
use core_sync::{
    audit_fields, delete_all_children, fix_false_folder, inherit_from_parent, inherit_topdown,
    set_parent_extents, DeleteOptions, FindingKind, WhenAbsent,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

fn bbox(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> BoundingBox {
    BoundingBox {
        min_x,
        min_y,
        max_x,
        max_y,
    }
}

fn insert_json(catalog: &FakeCatalog, value: serde_json::Value) {
    let item: CatalogItem = serde_json::from_value(value).unwrap();
    catalog.insert(item);
}

/// root
/// ├── container (has children)
/// │   ├── leaf_1
/// │   └── leaf_2
/// └── leaf_3
fn release_tree() -> FakeCatalog {
    let catalog = FakeCatalog::new();
    insert_json(
        &catalog,
        json!({
            "id": "root",
            "title": "Release",
            "citation": "Smith, 2024, Shoreline data",
            "contacts": [{"name": "Smith"}],
            "purpose": "Release purpose"
        }),
    );
    insert_json(
        &catalog,
        json!({"id": "container", "title": "Site A", "parentId": "root", "purpose": "Old"}),
    );
    insert_json(
        &catalog,
        json!({"id": "leaf_1", "title": "Shoreline", "parentId": "container", "body": "Leaf text"}),
    );
    insert_json(&catalog, json!({"id": "leaf_2", "title": "Marsh", "parentId": "container"}));
    insert_json(&catalog, json!({"id": "leaf_3", "title": "Site B", "parentId": "root"}));
    catalog
}

#[tokio::test]
async fn test_inherit_topdown_splits_container_and_leaf_fields() {
    let catalog = release_tree();

    let report = inherit_topdown(
        &catalog,
        "root",
        &["citation", "purpose"],
        &["citation", "contacts"],
        WhenAbsent::Clear,
    )
    .await
    .unwrap();

    assert_eq!(report.updated, 4);
    assert!(report.failures.is_empty());

    let container = catalog.item("container").unwrap();
    assert_eq!(container.field("citation"), Some(json!("Smith, 2024, Shoreline data")));
    assert_eq!(container.field("purpose"), Some(json!("Release purpose")));
    assert_eq!(container.field("contacts"), None);

    // Leaves under the container inherit through it
    let leaf = catalog.item("leaf_1").unwrap();
    assert_eq!(leaf.field("citation"), Some(json!("Smith, 2024, Shoreline data")));
    // The container has no contacts, so they are cleared on its leaves
    assert_eq!(leaf.field("contacts"), None);
    assert_eq!(leaf.field("body"), Some(json!("Leaf text")));

    let direct_leaf = catalog.item("leaf_3").unwrap();
    assert_eq!(direct_leaf.field("contacts"), Some(json!([{"name": "Smith"}])));
}

#[tokio::test]
async fn test_inherit_preserve_reports_instead_of_clearing() {
    let catalog = release_tree();
    let child = catalog.item("leaf_1").unwrap();

    let (updated, diagnostics) =
        inherit_from_parent(&catalog, child, &["body"], WhenAbsent::Preserve)
            .await
            .unwrap();
    assert_eq!(updated.field("body"), Some(json!("Leaf text")));
    assert_eq!(diagnostics.len(), 1);

    let child = catalog.item("leaf_1").unwrap();
    let (cleared, _) = inherit_from_parent(&catalog, child, &["body"], WhenAbsent::Clear)
        .await
        .unwrap();
    assert_eq!(cleared.field("body"), None);
    assert_eq!(catalog.item("leaf_1").unwrap().field("body"), None);
}

#[tokio::test]
async fn test_set_parent_extents_bottom_up() {
    let catalog = release_tree();

    let mut leaf_1 = catalog.item("leaf_1").unwrap();
    leaf_1.facets = vec![Facet {
        bounding_box: Some(bbox(-81.0, 30.0, -80.0, 31.0)),
        ..Default::default()
    }];
    catalog.insert(leaf_1);

    let mut leaf_3 = catalog.item("leaf_3").unwrap();
    leaf_3.spatial = Some(Spatial {
        bounding_box: Some(bbox(-82.0, 30.5, -79.0, 30.8)),
        ..Default::default()
    });
    catalog.insert(leaf_3);

    let report = set_parent_extents(&catalog, "root").await.unwrap();

    // leaf_2 has no extent and is skipped; container takes leaf_1's box
    let container = catalog.item("container").unwrap();
    assert_eq!(container.extent(), Some(bbox(-81.0, 30.0, -80.0, 31.0)));

    let top = report.top_extent.unwrap();
    assert_eq!(top.min_x, -82.0);
    assert_eq!(top.max_x, -79.0);
    assert_eq!(catalog.item("root").unwrap().extent(), Some(top));
    assert_eq!(report.updated, 2);
}

#[tokio::test]
async fn test_parent_without_child_extents_is_untouched() {
    let catalog = release_tree();
    let report = set_parent_extents(&catalog, "root").await.unwrap();

    assert_eq!(report.updated, 0);
    assert_eq!(report.top_extent, None);
    assert_eq!(catalog.calls("update_item"), 0);
}

#[tokio::test]
async fn test_delete_all_children_deepest_first() {
    let catalog = release_tree();

    let report = delete_all_children(
        &catalog,
        "root",
        DeleteOptions {
            wait: Duration::ZERO,
            poll_interval: Duration::ZERO,
        },
    )
    .await
    .unwrap();

    assert_eq!(report.deleted, 4);
    assert!(report.cleared);
    assert_eq!(catalog.len(), 1);

    let deleted = catalog.deleted();
    let position = |id: &str| deleted.iter().position(|d| d == id).unwrap();
    assert!(position("leaf_1") < position("container"));
    assert!(position("leaf_2") < position("container"));
}

#[tokio::test]
async fn test_fix_false_folder_clears_flag() {
    let catalog = FakeCatalog::new();
    insert_json(
        &catalog,
        json!({"id": "page", "title": "Leaf", "systemTypes": ["Folder"]}),
    );

    let cleared = fix_false_folder(&catalog, "page", Duration::ZERO).await.unwrap();

    assert!(cleared);
    assert_eq!(catalog.calls("create_item"), 1);
    assert_eq!(catalog.calls("delete_items"), 1);
    let page = catalog.item("page").unwrap();
    assert!(!page.is_folder());
    assert!(!page.has_children);
}

#[tokio::test]
async fn test_audit_fields_walks_descendants() {
    let catalog = release_tree();
    let expectations: BTreeMap<String, usize> =
        [("purpose".to_string(), 1), ("body".to_string(), 0)].into_iter().collect();

    let findings = audit_fields(&catalog, "root", &expectations).await.unwrap();

    let mut summary: Vec<(String, String)> = findings
        .iter()
        .map(|f| (f.item_id.clone(), f.kind.to_string()))
        .collect();
    summary.sort();
    assert_eq!(
        summary,
        vec![
            ("leaf_1".to_string(), FindingKind::Missing.to_string()),
            ("leaf_1".to_string(), FindingKind::UnexpectedlyPresent.to_string()),
            ("leaf_2".to_string(), FindingKind::Missing.to_string()),
            ("leaf_3".to_string(), FindingKind::Missing.to_string()),
        ]
    );
}
