//! In-memory sheet grids, table regions and the workbook that owns them

use crate::cell::CellValue;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Row count of a full sheet column
pub const MAX_ROWS: usize = 1_048_576;
/// Column count of a full sheet row
pub const MAX_COLS: usize = 16_384;

static EMPTY: CellValue = CellValue::Empty;

/// Stable handle to a sheet; survives renames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SheetId(pub u64);

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable handle to a table region; survives renames and resizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(pub u64);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A rectangle of cells, 0-based, with exclusive ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub row: usize,
    pub col: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Rect {
    pub fn new(row: usize, col: usize, rows: usize, cols: usize) -> Self {
        Self { row, col, rows, cols }
    }

    /// Whole sheet rows `row..row + count`
    pub fn entire_rows(row: usize, count: usize) -> Self {
        Self::new(row, 0, count, MAX_COLS)
    }

    /// Whole sheet columns `col..col + count`
    pub fn entire_columns(col: usize, count: usize) -> Self {
        Self::new(0, col, MAX_ROWS, count)
    }

    pub fn end_row(&self) -> usize {
        self.row.saturating_add(self.rows)
    }

    pub fn end_col(&self) -> usize {
        self.col.saturating_add(self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// True if `other`'s column span lies within this rectangle's columns
    pub fn spans_columns_of(&self, other: &Rect) -> bool {
        self.col <= other.col && other.end_col() <= self.end_col()
    }

    /// True if `other`'s row span lies within this rectangle's rows
    pub fn spans_rows_of(&self, other: &Rect) -> bool {
        self.row <= other.row && other.end_row() <= self.end_row()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.row < other.end_row()
            && other.row < self.end_row()
            && self.col < other.end_col()
            && other.col < self.end_col()
    }

    /// A1-style address, e.g. `A1:D3`
    pub fn address(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        let start = format!("{}{}", column_letter(self.col), self.row + 1);
        let end = format!(
            "{}{}",
            column_letter(self.end_col() - 1),
            self.end_row()
        );
        if self.rows == 1 && self.cols == 1 {
            start
        } else {
            format!("{}:{}", start, end)
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address())
    }
}

/// Spreadsheet column letter for a 0-based index (0 -> A, 26 -> AA)
pub fn column_letter(mut col: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (col % 26) as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// A named, bounded table over a sheet: header row plus body rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRegion {
    pub id: RegionId,
    pub name: String,
    pub bounds: Rect,
}

/// Shrink a 1-D span `[start, start + len)` after deleting `[del_start, del_start + del_len)`
/// and closing the gap. Returns the new `(start, len)`.
pub(crate) fn shrink_span(start: usize, len: usize, del_start: usize, del_len: usize) -> (usize, usize) {
    let end = start + len;
    let del_end = del_start.saturating_add(del_len);
    let before = del_end.min(start).saturating_sub(del_start);
    let overlap = end.min(del_end).saturating_sub(start.max(del_start));
    (start - before, len - overlap)
}

/// One sheet: a ragged row-major grid plus its table regions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sheet {
    pub id: SheetId,
    pub name: String,
    #[serde(default)]
    cells: Vec<Vec<CellValue>>,
    #[serde(default)]
    pub regions: Vec<TableRegion>,
}

impl Sheet {
    pub fn new(id: SheetId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            cells: Vec::new(),
            regions: Vec::new(),
        }
    }

    pub fn from_rows(id: SheetId, name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let mut sheet = Self::new(id, name);
        sheet.cells = rows;
        sheet.trim();
        sheet
    }

    pub fn get(&self, row: usize, col: usize) -> &CellValue {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    pub fn set(&mut self, row: usize, col: usize, value: CellValue) {
        if value.is_empty() && self.get(row, col).is_empty() {
            return;
        }
        if self.cells.len() <= row {
            self.cells.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.cells[row];
        if cells.len() <= col {
            cells.resize(col + 1, CellValue::Empty);
        }
        cells[col] = value;
    }

    /// Number of stored rows (may include trailing blanks)
    pub fn height(&self) -> usize {
        self.cells.len()
    }

    /// Widest stored row
    pub fn width(&self) -> usize {
        self.cells.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Stored rows, for serializers
    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.cells
    }

    /// Bounding box of non-blank cells
    pub fn occupied_extent(&self) -> Option<Rect> {
        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        for (r, row) in self.cells.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                bounds = Some(match bounds {
                    None => (r, c, r, c),
                    Some((r0, c0, r1, c1)) => (r0.min(r), c0.min(c), r1.max(r), c1.max(c)),
                });
            }
        }
        bounds.map(|(r0, c0, r1, c1)| Rect::new(r0, c0, r1 - r0 + 1, c1 - c0 + 1))
    }

    pub fn values(&self, rect: Rect) -> Vec<Vec<CellValue>> {
        (rect.row..rect.end_row())
            .map(|r| {
                (rect.col..rect.end_col())
                    .map(|c| self.get(r, c).clone())
                    .collect()
            })
            .collect()
    }

    pub fn write(&mut self, rect: Rect, values: &[Vec<CellValue>]) -> Result<()> {
        let found = (values.len(), values.first().map_or(0, Vec::len));
        if found != (rect.rows, rect.cols) || values.iter().any(|row| row.len() != rect.cols) {
            return Err(Error::ShapeMismatch {
                expected: (rect.rows, rect.cols),
                found,
            });
        }
        for (dr, row) in values.iter().enumerate() {
            for (dc, value) in row.iter().enumerate() {
                self.set(rect.row + dr, rect.col + dc, value.clone());
            }
        }
        self.trim();
        Ok(())
    }

    /// Remove `rect`, pulling the cells below it (within its columns) up
    pub(crate) fn remove_shift_up(&mut self, rect: Rect) {
        let height = self.height();
        let last_col = rect.end_col().min(self.width());
        for c in rect.col..last_col {
            for r in rect.row..height {
                let below = r.saturating_add(rect.rows);
                let value = if below < height {
                    self.get(below, c).clone()
                } else {
                    CellValue::Empty
                };
                self.set(r, c, value);
            }
        }

        self.regions.retain_mut(|region| {
            if !rect.spans_columns_of(&region.bounds) {
                return true;
            }
            let (row, rows) = shrink_span(region.bounds.row, region.bounds.rows, rect.row, rect.rows);
            region.bounds.row = row;
            region.bounds.rows = rows;
            rows > 0
        });
        self.trim();
    }

    /// Remove `rect`, pulling the cells right of it (within its rows) left
    pub(crate) fn remove_shift_left(&mut self, rect: Rect) {
        let last_row = rect.end_row().min(self.height());
        for row in self.cells[rect.row.min(last_row)..last_row].iter_mut() {
            if rect.col < row.len() {
                let end = rect.end_col().min(row.len());
                row.drain(rect.col..end);
            }
        }

        self.regions.retain_mut(|region| {
            if !rect.spans_rows_of(&region.bounds) {
                return true;
            }
            let (col, cols) = shrink_span(region.bounds.col, region.bounds.cols, rect.col, rect.cols);
            region.bounds.col = col;
            region.bounds.cols = cols;
            cols > 0
        });
        self.trim();
    }

    /// Open a blank column at `col` within `rows`, pushing cells right.
    /// Regions inside those rows that start at or after `col` move right.
    pub(crate) fn insert_shift_right(&mut self, rows: Rect, col: usize) {
        let last_row = rows.end_row().min(self.height());
        for row in self.cells[rows.row.min(last_row)..last_row].iter_mut() {
            if col < row.len() {
                row.insert(col, CellValue::Empty);
            }
        }
        for region in self.regions.iter_mut() {
            if rows.spans_rows_of(&region.bounds) && region.bounds.col >= col {
                region.bounds.col += 1;
            }
        }
    }

    /// Open a blank row at `row` within `cols`, pushing cells down.
    /// Regions inside those columns that start at or below `row` move down.
    pub(crate) fn insert_shift_down(&mut self, cols: Rect, row: usize) {
        let height = self.height();
        let last_col = cols.end_col().min(self.width());
        for c in cols.col..last_col {
            for r in (row..height).rev() {
                let value = self.get(r, c).clone();
                self.set(r + 1, c, value);
            }
            self.set(row, c, CellValue::Empty);
        }
        for region in self.regions.iter_mut() {
            if cols.spans_columns_of(&region.bounds) && region.bounds.row >= row {
                region.bounds.row += 1;
            }
        }
    }

    /// Drop trailing blank cells and rows
    fn trim(&mut self) {
        for row in self.cells.iter_mut() {
            while row.last().is_some_and(CellValue::is_empty) {
                row.pop();
            }
        }
        while self.cells.last().is_some_and(Vec::is_empty) {
            self.cells.pop();
        }
    }
}

/// An ordered collection of uniquely named sheets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "WorkbookData")]
pub struct Workbook {
    sheets: Vec<Sheet>,
    next_id: u64,
}

/// Serialized form of a [`Workbook`], checked before use
#[derive(Deserialize)]
struct WorkbookData {
    sheets: Vec<Sheet>,
    #[serde(default)]
    next_id: u64,
}

impl TryFrom<WorkbookData> for Workbook {
    type Error = Error;

    /// Ids must be unique across sheets and regions; the counter resumes past
    /// the largest one even when the stored counter is missing or stale.
    fn try_from(data: WorkbookData) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut next_id = data.next_id;
        for sheet in &data.sheets {
            let ids = std::iter::once(sheet.id.0).chain(sheet.regions.iter().map(|r| r.id.0));
            for id in ids {
                if !seen.insert(id) {
                    return Err(Error::DuplicateId(id));
                }
                next_id = next_id.max(id);
            }
        }
        Ok(Self {
            sheets: data.sheets,
            next_id,
        })
    }
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, id: SheetId) -> Result<&Sheet> {
        self.sheets
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::SheetNotFound(id.to_string()))
    }

    pub fn sheet_mut(&mut self, id: SheetId) -> Result<&mut Sheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::SheetNotFound(id.to_string()))
    }

    /// Find a sheet by exact (case-sensitive) name
    pub fn sheet_by_name(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Append a sheet holding `rows`
    pub fn add_sheet_with_rows(&mut self, name: &str, rows: Vec<Vec<CellValue>>) -> Result<SheetId> {
        self.check_sheet_name(name, None)?;
        let id = SheetId(self.generate_id());
        self.sheets.push(Sheet::from_rows(id, name, rows));
        Ok(id)
    }

    /// Append a region read from a saved document, keeping its name
    pub fn restore_region(&mut self, sheet: SheetId, name: &str, bounds: Rect) -> Result<RegionId> {
        if self.region_name_taken(name, None) {
            return Err(Error::NameTaken(name.to_string()));
        }
        let id = RegionId(self.generate_id());
        self.sheet_mut(sheet)?.regions.push(TableRegion {
            id,
            name: name.to_string(),
            bounds,
        });
        Ok(id)
    }

    pub(crate) fn generate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub(crate) fn push_sheet(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }

    pub(crate) fn remove_sheet(&mut self, id: SheetId) -> Result<Sheet> {
        let idx = self
            .sheets
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| Error::SheetNotFound(id.to_string()))?;
        Ok(self.sheets.remove(idx))
    }

    /// Validate a sheet name; `exclude` is the sheet being renamed
    pub(crate) fn check_sheet_name(&self, name: &str, exclude: Option<SheetId>) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::InvalidName(name.to_string()));
        }
        if self
            .sheets
            .iter()
            .any(|s| s.name == name && Some(s.id) != exclude)
        {
            return Err(Error::NameTaken(name.to_string()));
        }
        Ok(())
    }

    pub(crate) fn region_location(&self, id: RegionId) -> Result<(usize, usize)> {
        self.sheets
            .iter()
            .enumerate()
            .find_map(|(si, sheet)| {
                sheet
                    .regions
                    .iter()
                    .position(|r| r.id == id)
                    .map(|ri| (si, ri))
            })
            .ok_or(Error::RegionNotFound(id))
    }

    pub(crate) fn sheet_at_mut(&mut self, idx: usize) -> &mut Sheet {
        &mut self.sheets[idx]
    }

    pub(crate) fn sheet_at(&self, idx: usize) -> &Sheet {
        &self.sheets[idx]
    }

    /// Region names are unique across the workbook, ignoring case
    pub(crate) fn region_name_taken(&self, name: &str, exclude: Option<RegionId>) -> bool {
        let key = name.to_lowercase();
        self.sheets
            .iter()
            .flat_map(|s| s.regions.iter())
            .any(|r| Some(r.id) != exclude && r.name.to_lowercase() == key)
    }

    pub(crate) fn unique_region_name(&self) -> String {
        (1..)
            .map(|n| format!("Table{}", n))
            .find(|name| !self.region_name_taken(name, None))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_rows(rows: &[&[&str]]) -> Vec<Vec<CellValue>> {
        rows.iter()
            .map(|r| r.iter().map(|s| CellValue::parse(s)).collect())
            .collect()
    }

    #[test]
    fn test_rect_address() {
        assert_eq!(Rect::new(0, 0, 3, 4).address(), "A1:D3");
        assert_eq!(Rect::new(1, 1, 1, 1).address(), "B2");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn test_shrink_span() {
        // delete entirely above
        assert_eq!(shrink_span(5, 3, 0, 2), (3, 3));
        // delete entirely below
        assert_eq!(shrink_span(5, 3, 10, 2), (5, 3));
        // delete the middle row
        assert_eq!(shrink_span(5, 3, 6, 1), (5, 2));
        // delete across the start
        assert_eq!(shrink_span(5, 3, 4, 2), (4, 2));
        // delete everything
        assert_eq!(shrink_span(5, 3, 0, usize::MAX), (0, 0));
    }

    #[test]
    fn test_json_without_counter_resumes_past_stored_ids() {
        let json = r#"{
            "sheets": [
                { "id": 1, "name": "Raw" },
                { "id": 2, "name": "Other", "regions": [
                    { "id": 7, "name": "Table1", "bounds": { "row": 0, "col": 0, "rows": 1, "cols": 1 } }
                ] }
            ]
        }"#;
        let mut wb: Workbook = serde_json::from_str(json).unwrap();

        let id = wb.add_sheet_with_rows("Log", Vec::new()).unwrap();
        assert_eq!(id, SheetId(8));
        assert_eq!(wb.sheet(SheetId(1)).unwrap().name, "Raw");
    }

    #[test]
    fn test_json_with_duplicate_ids_is_rejected() {
        let json = r#"{ "sheets": [ { "id": 3, "name": "A" }, { "id": 3, "name": "B" } ], "next_id": 3 }"#;
        let err = serde_json::from_str::<Workbook>(json).unwrap_err();
        assert!(err.to_string().contains("duplicate id #3"));
    }

    #[test]
    fn test_occupied_extent() {
        let mut sheet = Sheet::new(SheetId(1), "S");
        assert_eq!(sheet.occupied_extent(), None);

        sheet.set(2, 1, CellValue::from("x"));
        sheet.set(4, 3, CellValue::Integer(1));
        assert_eq!(sheet.occupied_extent(), Some(Rect::new(2, 1, 3, 3)));

        sheet.set(4, 3, CellValue::Empty);
        assert_eq!(sheet.occupied_extent(), Some(Rect::new(2, 1, 1, 1)));
    }

    #[test]
    fn test_remove_shift_up_moves_cells_and_regions() {
        let rows = text_rows(&[&["h1", "h2", "note"], &["a", "1", "x"], &["b", "2", "y"]]);
        let mut sheet = Sheet::from_rows(SheetId(1), "S", rows);
        sheet.regions.push(TableRegion {
            id: RegionId(9),
            name: "T".into(),
            bounds: Rect::new(0, 0, 3, 2),
        });

        sheet.remove_shift_up(Rect::new(1, 0, 1, 2));

        assert_eq!(sheet.get(1, 0), &CellValue::from("b"));
        assert_eq!(sheet.get(2, 0), &CellValue::Empty);
        // column outside the removed range is untouched
        assert_eq!(sheet.get(1, 2), &CellValue::from("x"));
        assert_eq!(sheet.regions[0].bounds, Rect::new(0, 0, 2, 2));
    }

    #[test]
    fn test_remove_shift_left_drops_collapsed_region() {
        let rows = text_rows(&[&["a", "b", "c"], &["1", "2", "3"]]);
        let mut sheet = Sheet::from_rows(SheetId(1), "S", rows);
        sheet.regions.push(TableRegion {
            id: RegionId(9),
            name: "T".into(),
            bounds: Rect::new(0, 2, 2, 1),
        });

        sheet.remove_shift_left(Rect::entire_columns(1, 2));

        assert_eq!(sheet.width(), 1);
        assert!(sheet.regions.is_empty());
    }

    #[test]
    fn test_insert_shift_right_within_rows() {
        let rows = text_rows(&[&["a", "b"], &["1", "2"], &["tail", "z"]]);
        let mut sheet = Sheet::from_rows(SheetId(1), "S", rows);

        sheet.insert_shift_right(Rect::new(0, 0, 2, 2), 1);

        assert_eq!(sheet.get(0, 1), &CellValue::Empty);
        assert_eq!(sheet.get(0, 2), &CellValue::from("b"));
        assert_eq!(sheet.get(2, 1), &CellValue::from("z"));
    }

    #[test]
    fn test_write_rejects_wrong_shape() {
        let mut sheet = Sheet::new(SheetId(1), "S");
        let err = sheet
            .write(Rect::new(0, 0, 1, 2), &[vec![CellValue::Integer(1)]])
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_workbook_sheet_names_are_case_sensitive() {
        let mut wb = Workbook::new();
        wb.add_sheet_with_rows("SAP", Vec::new()).unwrap();
        assert!(wb.add_sheet_with_rows("sap", Vec::new()).is_ok());
        assert!(matches!(
            wb.add_sheet_with_rows("SAP", Vec::new()),
            Err(Error::NameTaken(_))
        ));
        assert!(matches!(
            wb.add_sheet_with_rows("  ", Vec::new()),
            Err(Error::InvalidName(_))
        ));
    }
}
