//! Make sure the selected sheet's data is bound to a table region

use crate::audit::AuditLog;
use crate::error::{Error, Result};
use crate::grid::{RegionId, SheetId};
use crate::store::GridStore;

/// Return the sheet's first table region, or create one over the occupied
/// extent with its first row as headers. An existing region is reused as-is.
pub fn ensure_table<S: GridStore>(store: &mut S, log: &AuditLog, sheet: SheetId) -> Result<RegionId> {
    if let Some(&existing) = store.list_regions(sheet)?.first() {
        let info = store.region(existing)?;
        log.info(
            store,
            "ensureTable",
            &format!("Using table '{}' at {}", info.name, info.bounds.address()),
        )?;
        return Ok(existing);
    }

    let extent = store
        .occupied_extent(sheet)?
        .ok_or_else(|| match store.sheet_name(sheet) {
            Ok(name) => Error::EmptySheet { sheet: name },
            Err(e) => e,
        })?;

    let region = store.create_region(sheet, extent, true)?;
    let name = store.region(region)?.name;
    log.info(
        store,
        "ensureTable",
        &format!("Created table '{}' from {}", name, extent.address()),
    )?;
    Ok(region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::DEFAULT_LOG_SHEET;
    use crate::cell::CellValue;
    use crate::grid::{Rect, Workbook};

    fn rows() -> Vec<Vec<CellValue>> {
        vec![
            vec![CellValue::Empty, CellValue::Empty],
            vec![CellValue::from("Material"), CellValue::from("Qty")],
            vec![CellValue::from("M1"), CellValue::Integer(3)],
        ]
    }

    #[test]
    fn test_creates_region_over_extent() {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet_with_rows("Raw", rows()).unwrap();
        let log = AuditLog::ensure(&mut wb, DEFAULT_LOG_SHEET).unwrap();

        let region = ensure_table(&mut wb, &log, sheet).unwrap();
        let info = wb.region(region).unwrap();
        assert_eq!(info.bounds, Rect::new(1, 0, 2, 2));
        assert_eq!(
            log.records(&wb).unwrap()[0].detail,
            "Created table 'Table1' from A2:B3"
        );
    }

    #[test]
    fn test_reuses_first_region_without_validation() {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet_with_rows("Raw", rows()).unwrap();
        let first = wb.create_region(sheet, Rect::new(1, 0, 1, 1), true).unwrap();
        wb.create_region(sheet, Rect::new(1, 1, 2, 1), true).unwrap();
        let log = AuditLog::ensure(&mut wb, DEFAULT_LOG_SHEET).unwrap();

        assert_eq!(ensure_table(&mut wb, &log, sheet).unwrap(), first);
        assert_eq!(wb.list_regions(sheet).unwrap().len(), 2);
    }

    #[test]
    fn test_empty_sheet_fails() {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("Blank").unwrap();
        let log = AuditLog::ensure(&mut wb, DEFAULT_LOG_SHEET).unwrap();

        let err = ensure_table(&mut wb, &log, sheet).unwrap_err();
        assert!(matches!(err, Error::EmptySheet { sheet } if sheet == "Blank"));
    }
}
