//! Trim the result to a fixed column budget and bind it to the canonical
//! table region name

use crate::audit::AuditLog;
use crate::error::{Error, Result};
use crate::grid::{column_letter, Rect, RegionId, SheetId};
use crate::headers::names_equal;
use crate::store::{GridStore, Shift};

/// Delete every sheet column past the first `budget` and return the
/// rectangle the table should cover: the occupied rows over columns `0..budget`.
pub fn shrink_to_columns<S: GridStore>(store: &mut S, log: &AuditLog, sheet: SheetId, budget: usize) -> Result<Rect> {
    if let Some(extent) = store.occupied_extent(sheet)? {
        if extent.end_col() > budget {
            let count = extent.end_col() - budget;
            store.delete_range(sheet, Rect::entire_columns(budget, count), Shift::Left)?;
            log.info(
                store,
                "shrinkColumns",
                &format!("Deleted {} column(s) from {}", count, column_letter(budget)),
            )?;
        }
    }

    match store.occupied_extent(sheet)? {
        Some(extent) => Ok(Rect::new(extent.row, 0, extent.rows, budget)),
        None => Err(Error::NoDataAfterShrink {
            sheet: store.sheet_name(sheet)?,
            columns: budget,
        }),
    }
}

/// Point the canonical region at `bounds`: reuse the region already named
/// `name`, else adopt the sheet's first region, else create one. Rename
/// collisions are ignored.
pub fn bind_region<S: GridStore>(store: &mut S, log: &AuditLog, sheet: SheetId, bounds: Rect, name: &str) -> Result<RegionId> {
    let mut named = None;
    let mut first = None;
    for region in store.list_regions(sheet)? {
        let info = store.region(region)?;
        first.get_or_insert(region);
        if names_equal(&info.name, name) {
            named = Some(region);
            break;
        }
    }

    let (region, verb) = match named.or(first) {
        Some(region) => {
            store.resize_region(region, bounds)?;
            (region, "Resized")
        }
        None => (store.create_region(sheet, bounds, true)?, "Created"),
    };

    if let Err(e) = store.rename_region(region, name) {
        tracing::debug!(error = %e, "table rename skipped");
    }

    let current = store.region(region)?.name;
    log.info(
        store,
        "ensureTable",
        &format!("{} '{}' at {}", verb, current, bounds.address()),
    )?;
    Ok(region)
}

/// Shrink to `budget` columns and bind the canonical region
pub fn reshape<S: GridStore>(store: &mut S, log: &AuditLog, sheet: SheetId, budget: usize, name: &str) -> Result<RegionId> {
    let bounds = shrink_to_columns(store, log, sheet, budget)?;
    bind_region(store, log, sheet, bounds, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::DEFAULT_LOG_SHEET;
    use crate::cell::CellValue;
    use crate::grid::Workbook;

    fn sheet_with(wb: &mut Workbook, name: &str, cols: usize) -> SheetId {
        let rows = (0..3)
            .map(|r| (0..cols).map(|c| CellValue::from(format!("r{}c{}", r, c))).collect())
            .collect();
        wb.add_sheet_with_rows(name, rows).unwrap()
    }

    #[test]
    fn test_shrink_drops_columns_past_budget() {
        let mut wb = Workbook::new();
        let sheet = sheet_with(&mut wb, "Raw", 6);
        let log = AuditLog::ensure(&mut wb, DEFAULT_LOG_SHEET).unwrap();

        let bounds = shrink_to_columns(&mut wb, &log, sheet, 4).unwrap();
        assert_eq!(bounds, Rect::new(0, 0, 3, 4));
        assert_eq!(wb.occupied_extent(sheet).unwrap(), Some(Rect::new(0, 0, 3, 4)));

        // already within budget: nothing else changes
        let again = shrink_to_columns(&mut wb, &log, sheet, 4).unwrap();
        assert_eq!(again, bounds);
        assert_eq!(log.records(&wb).unwrap().len(), 1);
    }

    #[test]
    fn test_shrink_with_nothing_left_fails() {
        let mut wb = Workbook::new();
        let rows = vec![vec![
            CellValue::Empty,
            CellValue::Empty,
            CellValue::from("only"),
        ]];
        let sheet = wb.add_sheet_with_rows("Raw", rows).unwrap();
        let log = AuditLog::ensure(&mut wb, DEFAULT_LOG_SHEET).unwrap();

        let err = shrink_to_columns(&mut wb, &log, sheet, 2).unwrap_err();
        assert!(matches!(err, Error::NoDataAfterShrink { columns: 2, .. }));
    }

    #[test]
    fn test_bind_adopts_first_region_and_renames() {
        let mut wb = Workbook::new();
        let sheet = sheet_with(&mut wb, "Raw", 6);
        let region = wb.create_region(sheet, Rect::new(0, 0, 3, 6), true).unwrap();
        let log = AuditLog::ensure(&mut wb, DEFAULT_LOG_SHEET).unwrap();

        let bound = reshape(&mut wb, &log, sheet, 4, "tbl_SAP").unwrap();

        assert_eq!(bound, region);
        let info = wb.region(region).unwrap();
        assert_eq!(info.name, "tbl_SAP");
        assert_eq!(info.bounds.address(), "A1:D3");
    }

    #[test]
    fn test_bind_prefers_region_with_canonical_name() {
        let mut wb = Workbook::new();
        let rows = vec![
            vec![CellValue::from("a"), CellValue::Empty, CellValue::from("b")],
            vec![CellValue::from("1"), CellValue::Empty, CellValue::from("2")],
        ];
        let sheet = wb.add_sheet_with_rows("Raw", rows).unwrap();
        wb.create_region(sheet, Rect::new(0, 2, 2, 1), true).unwrap();
        let canonical = wb.create_region(sheet, Rect::new(0, 0, 2, 1), true).unwrap();
        wb.rename_region(canonical, "TBL_SAP").unwrap();
        let log = AuditLog::ensure(&mut wb, DEFAULT_LOG_SHEET).unwrap();

        let bound = bind_region(&mut wb, &log, sheet, Rect::new(0, 0, 2, 2), "tbl_SAP").unwrap();
        assert_eq!(bound, canonical);
        assert_eq!(wb.region(canonical).unwrap().name, "tbl_SAP");
    }

    #[test]
    fn test_bind_creates_region_and_swallows_collision() {
        let mut wb = Workbook::new();
        let other = sheet_with(&mut wb, "Other", 1);
        let taken = wb.create_region(other, Rect::new(0, 0, 3, 1), true).unwrap();
        wb.rename_region(taken, "tbl_SAP").unwrap();
        let sheet = sheet_with(&mut wb, "Raw", 2);
        let log = AuditLog::ensure(&mut wb, DEFAULT_LOG_SHEET).unwrap();

        let region = bind_region(&mut wb, &log, sheet, Rect::new(0, 0, 3, 2), "tbl_SAP").unwrap();

        let info = wb.region(region).unwrap();
        assert_eq!(info.sheet, sheet);
        assert_eq!(info.name, "Table1");
        assert_eq!(info.bounds, Rect::new(0, 0, 3, 2));
    }
}
