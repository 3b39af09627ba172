//! Column addressing by header name
//!
//! Physical column positions shift with every structural edit, so callers
//! resolve a name against a fresh header snapshot right before each operation
//! instead of holding on to indices.

use crate::cell::CellValue;
use crate::error::Result;
use crate::grid::RegionId;
use crate::store::GridStore;

/// Case-insensitive header comparison
pub fn names_equal(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Current header names of a region, trimmed
pub fn header_names<S: GridStore>(store: &S, region: RegionId) -> Result<Vec<String>> {
    let info = store.region(region)?;
    let row = store
        .cell_values(info.sheet, info.header_rect())?
        .into_iter()
        .next()
        .unwrap_or_default();
    Ok(row
        .iter()
        .map(|v| v.to_string_value().trim().to_string())
        .collect())
}

/// Position of `name` within `headers`
pub fn resolve_column(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| names_equal(h, name))
}

/// Resolve `name` against the region's headers as they are right now
pub fn column_index<S: GridStore>(store: &S, region: RegionId, name: &str) -> Result<Option<usize>> {
    Ok(resolve_column(&header_names(store, region)?, name))
}

/// Names from `required` that have no matching header, in request order
pub fn missing_columns(headers: &[String], required: &[String]) -> Vec<String> {
    required
        .iter()
        .filter(|req| resolve_column(headers, req).is_none())
        .cloned()
        .collect()
}

/// A body row seen through its header names
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    headers: &'a [String],
    cells: &'a [CellValue],
}

impl<'a> RowView<'a> {
    pub fn new(headers: &'a [String], cells: &'a [CellValue]) -> Self {
        Self { headers, cells }
    }

    /// Value under the named column; `None` if no such column
    pub fn get(&self, name: &str) -> Option<&'a CellValue> {
        resolve_column(self.headers, name).and_then(|i| self.cells.get(i))
    }

    /// Trimmed display text under the named column, empty if absent
    pub fn text(&self, name: &str) -> String {
        self.get(name)
            .map(|v| v.to_string_value().trim().to_string())
            .unwrap_or_default()
    }
}
