use dirdiff_common::{
    CompareItem, CompareStatus, CompareSummary, DirDiffError, DirectoryEntry, Inventory,
};
use std::collections::HashMap;
use tracing::debug;

/// Merged per-path items plus their status histogram
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub items: Vec<CompareItem>,
    pub summary: CompareSummary,
}

/// Merge two inventories into one item per distinct relative path.
///
/// Items are emitted in byte-wise lexicographic order of relative path.
/// Paths present on both sides are `Same` when size and modification time
/// are exactly equal; contents are never read here.
pub fn classify_inventories(
    left: &Inventory,
    right: &Inventory,
) -> Result<Classification, DirDiffError> {
    let left_map = index_by_path(left);
    let right_map = index_by_path(right);

    let mut all_paths: Vec<&str> = left_map.keys().chain(right_map.keys()).copied().collect();
    all_paths.sort_unstable();
    all_paths.dedup();

    let mut summary = CompareSummary::default();
    let mut items = Vec::with_capacity(all_paths.len());

    for path in all_paths {
        let left = left_map.get(path).copied();
        let right = right_map.get(path).copied();

        let status = match (left, right) {
            (Some(l), Some(r)) => {
                if l.size == r.size && l.modified == r.modified {
                    CompareStatus::Same
                } else {
                    CompareStatus::Different
                }
            }
            (Some(_), None) => CompareStatus::LeftOnly,
            (None, Some(_)) => CompareStatus::RightOnly,
            (None, None) => {
                return Err(DirDiffError::Comparison(format!(
                    "Invalid compare state: {} is missing on both sides",
                    path
                )))
            }
        };

        summary.record(status);
        items.push(CompareItem {
            relative_path: path.to_string(),
            status,
            left: left.map(DirectoryEntry::snapshot),
            right: right.map(DirectoryEntry::snapshot),
            diff_kind_hint: None,
        });
    }

    debug!(
        "Classified {} paths: {} same, {} different, {} left only, {} right only",
        items.len(),
        summary.same,
        summary.different,
        summary.left_only,
        summary.right_only
    );

    Ok(Classification { items, summary })
}

fn index_by_path(inventory: &Inventory) -> HashMap<&str, &DirectoryEntry> {
    inventory
        .iter()
        .map(|e| (e.relative_path.as_str(), e))
        .collect()
}
