//! Spatial extent aggregation
//!
//! A page with children gets the smallest box covering its children's
//! extents. Pages are processed bottom-up so an aggregate computed for a
//! sub-tree feeds the level above it in the same walk.

use bridge_traits::catalog::{BoundingBox, CatalogClient, Spatial};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument};

use crate::error::Result;

/// Elementwise min of the minimums and max of the maximums over the boxes
/// that are present. `None` when no box is present.
pub fn aggregate_extent<I>(boxes: I) -> Option<BoundingBox>
where
    I: IntoIterator<Item = Option<BoundingBox>>,
{
    boxes
        .into_iter()
        .flatten()
        .reduce(|acc, b| acc.union(&b))
}

#[derive(Debug, Clone, Default)]
pub struct ExtentReport {
    pub updated: usize,
    /// Aggregate written to the top page, if any
    pub top_extent: Option<BoundingBox>,
}

/// Set every page with children under (and including) `top_id` to the
/// aggregate extent of its children
#[instrument(skip(catalog), fields(top_id = %top_id))]
pub async fn set_parent_extents(catalog: &dyn CatalogClient, top_id: &str) -> Result<ExtentReport> {
    // Pre-order list of pages with their child ids
    let mut order: Vec<String> = Vec::new();
    let mut children: HashMap<String, Vec<String>> = HashMap::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut pending = vec![top_id.to_string()];
    visited.insert(top_id.to_string());

    while let Some(id) = pending.pop() {
        let child_ids = catalog.get_child_ids(&id).await?;
        for child_id in &child_ids {
            if visited.insert(child_id.clone()) {
                pending.push(child_id.clone());
            }
        }
        order.push(id.clone());
        children.insert(id, child_ids);
    }

    let mut report = ExtentReport::default();

    // Reverse pre-order visits every child before its parent
    for id in order.iter().rev() {
        let Some(child_ids) = children.get(id).filter(|c| !c.is_empty()) else {
            continue;
        };

        let mut boxes = Vec::with_capacity(child_ids.len());
        for child_id in child_ids {
            let child = catalog.get_item(child_id).await?;
            if child.extent().is_none() {
                debug!(item_id = %child_id, "Child has no extent");
            }
            boxes.push(child.extent());
        }
        let Some(aggregate) = aggregate_extent(boxes) else {
            continue;
        };

        let mut item = catalog.get_item(id).await?;
        item.spatial
            .get_or_insert_with(Spatial::default)
            .bounding_box = Some(aggregate);
        catalog.update_item(&item).await?;
        report.updated += 1;
        if id == top_id {
            report.top_extent = Some(aggregate);
        }
        debug!(item_id = %id, "Updated extent");
    }

    info!(updated = report.updated, "Parent extents set");
    Ok(report)
}
