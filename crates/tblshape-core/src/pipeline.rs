//! Named-column transformations over a table region
//!
//! Every step resolves column names against the region's current headers
//! immediately before it mutates anything. Indices never outlive the
//! structural edit that follows them.

use crate::audit::AuditLog;
use crate::cell::{sort_key_cmp, CellValue};
use crate::config::{HeaderCheck, PipelineConfig};
use crate::error::{Error, Result};
use crate::grid::{Rect, RegionId, SheetId};
use crate::headers::{column_index, header_names, missing_columns, names_equal, resolve_column, RowView};
use crate::store::{GridStore, Shift};

/// Fail with `MissingRequiredColumns` unless every header in `check` exists.
/// The caller owns logging of the failure.
pub fn assert_headers<S: GridStore>(store: &S, region: RegionId, check: &HeaderCheck) -> Result<()> {
    let headers = header_names(store, region)?;
    let missing = missing_columns(&headers, &check.columns);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MissingRequiredColumns {
            context: check.context.clone(),
            missing,
        })
    }
}

/// Delete every body row for which `keep` returns false. Returns the number
/// of deleted rows.
pub fn retain_rows<S, F>(store: &mut S, log: &AuditLog, region: RegionId, mut keep: F) -> Result<usize>
where
    S: GridStore,
    F: FnMut(&RowView<'_>) -> bool,
{
    let headers = header_names(store, region)?;
    let info = store.region(region)?;
    let body = store.cell_values(info.sheet, info.body_rect())?;
    let rejected: Vec<bool> = body
        .iter()
        .map(|cells| !keep(&RowView::new(&headers, cells)))
        .collect();

    // last to first, one delete per run of adjacent rejected rows: a deletion
    // only shifts rows we have already visited
    let mut deleted = 0;
    let mut end = rejected.len();
    while end > 0 {
        if !rejected[end - 1] {
            end -= 1;
            continue;
        }
        let mut start = end - 1;
        while start > 0 && rejected[start - 1] {
            start -= 1;
        }
        let bounds = store.region(region)?.bounds;
        let rows = Rect::new(bounds.row + 1 + start, bounds.col, end - start, bounds.cols);
        store.delete_range(info.sheet, rows, Shift::Up)?;
        deleted += end - start;
        end = start;
    }

    log.info(store, "deleteRowsWhere", &format!("Deleted: {}", deleted))?;
    Ok(deleted)
}

/// Best-effort delete by name. A missing column is a warning, not an error.
pub fn delete_column<S: GridStore>(store: &mut S, log: &AuditLog, region: RegionId, name: &str) -> Result<bool> {
    let headers = header_names(store, region)?;
    let Some(idx) = resolve_column(&headers, name) else {
        log.warn(store, "deleteColumn", &format!("Not found '{}'", name))?;
        return Ok(false);
    };

    store.delete_column(region, idx)?;
    log.info(store, "deleteColumn", &format!("Deleted '{}'", headers[idx]))?;
    Ok(true)
}

/// Move the named column to `target` by rebuilding it: capture its values,
/// insert a fresh column at `target`, copy the values in under the original
/// name, then delete every other column carrying that name.
///
/// Returns the column's final index, or `None` if no column has that name.
pub fn move_column<S: GridStore>(store: &mut S, region: RegionId, name: &str, target: usize) -> Result<Option<usize>> {
    let headers = header_names(store, region)?;
    let Some(current) = resolve_column(&headers, name) else {
        return Ok(None);
    };
    if current == target {
        return Ok(Some(current));
    }
    let source_name = headers[current].clone();

    let info = store.region(region)?;
    let body = info.body_rect();
    let values = store.cell_values(info.sheet, Rect::new(body.row, body.col + current, body.rows, 1))?;

    store.insert_column(region, target)?;
    let info = store.region(region)?;
    let mut position = target.min(info.bounds.cols - 1);
    let header_cell = Rect::new(info.bounds.row, info.bounds.col + position, 1, 1);
    store.set_cell_values(info.sheet, header_cell, &[vec![CellValue::String(source_name.clone())]])?;
    if !values.is_empty() {
        let column = Rect::new(info.bounds.row + 1, info.bounds.col + position, values.len(), 1);
        store.set_cell_values(info.sheet, column, &values)?;
    }

    // re-resolve after every delete; earlier deletes shift our column left
    loop {
        let headers = header_names(store, region)?;
        let duplicate = headers
            .iter()
            .enumerate()
            .position(|(i, h)| i != position && names_equal(h, &source_name));
        let Some(idx) = duplicate else {
            break;
        };
        store.delete_column(region, idx)?;
        if idx < position {
            position -= 1;
        }
    }

    Ok(Some(position))
}

/// Move the named columns to the front in the given order. Missing names are
/// warned about and do not reserve a slot.
pub fn reorder_columns_to_front<S: GridStore>(
    store: &mut S,
    log: &AuditLog,
    region: RegionId,
    order: &[String],
) -> Result<usize> {
    let mut target = 0;
    for desired in order {
        match move_column(store, region, desired, target)? {
            Some(_) => target += 1,
            None => log.warn(store, "reorderColumnsToFront", &format!("Missing '{}'", desired))?,
        }
    }

    log.info(store, "reorderColumnsToFront", &order.join(" | "))?;
    Ok(target)
}

/// Best-effort rename in place. Collisions with other headers are not checked.
pub fn rename_column<S: GridStore>(
    store: &mut S,
    log: &AuditLog,
    region: RegionId,
    from: &str,
    to: &str,
) -> Result<bool> {
    let Some(idx) = column_index(store, region, from)? else {
        log.warn(store, "renameColumn", &format!("Not found '{}'", from))?;
        return Ok(false);
    };

    let info = store.region(region)?;
    let cell = Rect::new(info.bounds.row, info.bounds.col + idx, 1, 1);
    store.set_cell_values(info.sheet, cell, &[vec![CellValue::from(to)]])?;
    log.info(store, "renameColumn", &format!("'{}' -> '{}'", from, to))?;
    Ok(true)
}

/// Stable sort of the body rows by one named column. Ties keep their order;
/// blanks go last.
pub fn sort_rows<S: GridStore>(
    store: &mut S,
    log: &AuditLog,
    region: RegionId,
    column: &str,
    descending: bool,
) -> Result<()> {
    let key = column_index(store, region, column)?
        .ok_or_else(|| Error::ColumnNotFound(column.to_string()))?;

    let info = store.region(region)?;
    let body = info.body_rect();
    if body.rows > 0 {
        let mut rows = store.cell_values(info.sheet, body)?;
        rows.sort_by(|a, b| sort_key_cmp(&a[key], &b[key], descending));
        store.set_cell_values(info.sheet, body, &rows)?;
    }

    let direction = if descending { "DESC" } else { "ASC" };
    log.info(store, "sort", &format!("{} {}", column, direction))?;
    Ok(())
}

/// Delete one absolute sheet row (1-based), shifting everything below up
pub fn delete_sheet_row<S: GridStore>(store: &mut S, log: &AuditLog, sheet: SheetId, row: usize) -> Result<()> {
    let index = row
        .checked_sub(1)
        .ok_or_else(|| Error::InvalidConfig("sheet rows are 1-based".into()))?;
    store.delete_range(sheet, Rect::entire_rows(index, 1), Shift::Up)?;
    log.info(store, "deleteRow", &format!("Deleted row {}", row))?;
    Ok(())
}

/// Run every configured transformation on the region, in order
pub fn apply<S: GridStore>(store: &mut S, log: &AuditLog, region: RegionId, config: &PipelineConfig) -> Result<()> {
    for check in &config.checks {
        assert_headers(store, region, check)?;
    }

    if let Some(filter) = &config.filter {
        if column_index(store, region, &filter.column)?.is_none() {
            return Err(Error::ColumnNotFound(filter.column.clone()));
        }
        retain_rows(store, log, region, |row| {
            let value = row.text(&filter.column);
            filter.allowed.iter().any(|code| *code == value)
        })?;
    }

    for name in &config.delete_columns {
        delete_column(store, log, region, name)?;
    }

    if !config.column_order.is_empty() {
        reorder_columns_to_front(store, log, region, &config.column_order)?;
    }

    for rename in &config.renames {
        rename_column(store, log, region, &rename.from, &rename.to)?;
    }

    for check in &config.final_checks {
        assert_headers(store, region, check)?;
    }

    if let Some(sort) = &config.sort {
        sort_rows(store, log, region, &sort.column, sort.descending)?;
    }

    if let Some(row) = config.prune_row {
        let sheet = store.region(region)?.sheet;
        delete_sheet_row(store, log, sheet, row)?;
    }

    Ok(())
}
