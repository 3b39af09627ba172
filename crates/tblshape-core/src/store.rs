//! The grid store interface the pipeline runs against
//!
//! Every component talks to the document only through [`GridStore`], so the
//! same pipeline can drive the in-memory [`Workbook`] or any host that can
//! read/write rectangular ranges and manage sheets and table regions.

use crate::cell::CellValue;
use crate::error::{Error, Result};
use crate::grid::{Rect, RegionId, Sheet, SheetId, TableRegion, Workbook};
use serde::{Deserialize, Serialize};

/// Direction remaining cells move when a range is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Up,
    Left,
}

/// Snapshot of a table region and the sheet it lives on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionInfo {
    pub id: RegionId,
    pub sheet: SheetId,
    pub name: String,
    pub bounds: Rect,
}

impl RegionInfo {
    fn from_region(sheet: SheetId, region: &TableRegion) -> Self {
        Self {
            id: region.id,
            sheet,
            name: region.name.clone(),
            bounds: region.bounds,
        }
    }

    pub fn header_rect(&self) -> Rect {
        Rect::new(self.bounds.row, self.bounds.col, 1, self.bounds.cols)
    }

    pub fn body_rect(&self) -> Rect {
        Rect::new(
            self.bounds.row + 1,
            self.bounds.col,
            self.bounds.rows.saturating_sub(1),
            self.bounds.cols,
        )
    }
}

/// Storage collaborator: sheets of cells plus table-region metadata
pub trait GridStore {
    /// Sheets in document order
    fn list_sheets(&self) -> Vec<SheetId>;
    fn sheet_name(&self, sheet: SheetId) -> Result<String>;
    /// Look a sheet up by exact name
    fn get_sheet(&self, name: &str) -> Option<SheetId>;
    fn add_sheet(&mut self, name: &str) -> Result<SheetId>;
    fn delete_sheet(&mut self, sheet: SheetId) -> Result<()>;
    fn rename_sheet(&mut self, sheet: SheetId, name: &str) -> Result<()>;

    /// Bounding box of the sheet's non-blank cells
    fn occupied_extent(&self, sheet: SheetId) -> Result<Option<Rect>>;
    fn cell_values(&self, sheet: SheetId, rect: Rect) -> Result<Vec<Vec<CellValue>>>;
    fn set_cell_values(&mut self, sheet: SheetId, rect: Rect, values: &[Vec<CellValue>]) -> Result<()>;
    /// Delete a range, closing the gap in the given direction
    fn delete_range(&mut self, sheet: SheetId, rect: Rect, shift: Shift) -> Result<()>;

    /// Table regions on a sheet in creation order
    fn list_regions(&self, sheet: SheetId) -> Result<Vec<RegionId>>;
    fn region(&self, region: RegionId) -> Result<RegionInfo>;
    fn create_region(&mut self, sheet: SheetId, rect: Rect, has_headers: bool) -> Result<RegionId>;
    fn resize_region(&mut self, region: RegionId, rect: Rect) -> Result<()>;
    /// Fails with [`Error::NameTaken`] if another region already has the name
    fn rename_region(&mut self, region: RegionId, name: &str) -> Result<()>;
    /// Insert a blank, auto-named column at `at` (0-based, relative to the region)
    fn insert_column(&mut self, region: RegionId, at: usize) -> Result<()>;
    fn delete_column(&mut self, region: RegionId, index: usize) -> Result<()>;

    /// Cosmetic column fitting; hosts without a layout engine ignore it
    fn autofit_columns(&mut self, _sheet: SheetId) {}
}

impl Workbook {
    fn check_overlap(&self, sheet: &Sheet, rect: Rect, exclude: Option<RegionId>) -> Result<()> {
        match sheet
            .regions
            .iter()
            .find(|r| Some(r.id) != exclude && r.bounds.intersects(&rect))
        {
            Some(other) => Err(Error::RegionOverlap {
                sheet: sheet.id,
                range: rect.address(),
                other: other.name.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Give blank headers a `ColumnN` name and suffix case-insensitive duplicates
fn normalize_headers(sheet: &mut Sheet, header: Rect) {
    let mut seen: Vec<String> = Vec::with_capacity(header.cols);
    let raw: Vec<String> = (header.col..header.end_col())
        .map(|c| sheet.get(header.row, c).to_string_value().trim().to_string())
        .collect();

    for (offset, name) in raw.iter().enumerate() {
        let taken = |candidate: &str, seen: &[String]| {
            let key = candidate.to_lowercase();
            seen.iter().any(|s| s.to_lowercase() == key)
                || raw
                    .iter()
                    .enumerate()
                    .any(|(i, other)| i > offset && other.to_lowercase() == key)
        };

        let resolved = if name.is_empty() {
            (offset + 1..)
                .map(|n| format!("Column{}", n))
                .find(|c| !taken(c, &seen))
                .unwrap_or_default()
        } else if seen.iter().any(|s| s.to_lowercase() == name.to_lowercase()) {
            (2..)
                .map(|n| format!("{}{}", name, n))
                .find(|c| !taken(c, &seen))
                .unwrap_or_default()
        } else {
            name.clone()
        };

        let col = header.col + offset;
        if sheet.get(header.row, col).to_string_value() != resolved {
            sheet.set(header.row, col, CellValue::String(resolved.clone()));
        }
        seen.push(resolved);
    }
}

fn generated_column_name(headers: &[String]) -> String {
    (1..)
        .map(|n| format!("Column{}", n))
        .find(|c| !headers.iter().any(|h| h.eq_ignore_ascii_case(c)))
        .unwrap_or_default()
}

impl GridStore for Workbook {
    fn list_sheets(&self) -> Vec<SheetId> {
        self.sheets().iter().map(|s| s.id).collect()
    }

    fn sheet_name(&self, sheet: SheetId) -> Result<String> {
        Ok(self.sheet(sheet)?.name.clone())
    }

    fn get_sheet(&self, name: &str) -> Option<SheetId> {
        self.sheet_by_name(name).map(|s| s.id)
    }

    fn add_sheet(&mut self, name: &str) -> Result<SheetId> {
        self.check_sheet_name(name, None)?;
        let id = SheetId(self.generate_id());
        self.push_sheet(Sheet::new(id, name));
        Ok(id)
    }

    fn delete_sheet(&mut self, sheet: SheetId) -> Result<()> {
        self.remove_sheet(sheet).map(|_| ())
    }

    fn rename_sheet(&mut self, sheet: SheetId, name: &str) -> Result<()> {
        self.check_sheet_name(name, Some(sheet))?;
        self.sheet_mut(sheet)?.name = name.to_string();
        Ok(())
    }

    fn occupied_extent(&self, sheet: SheetId) -> Result<Option<Rect>> {
        Ok(self.sheet(sheet)?.occupied_extent())
    }

    fn cell_values(&self, sheet: SheetId, rect: Rect) -> Result<Vec<Vec<CellValue>>> {
        Ok(self.sheet(sheet)?.values(rect))
    }

    fn set_cell_values(&mut self, sheet: SheetId, rect: Rect, values: &[Vec<CellValue>]) -> Result<()> {
        self.sheet_mut(sheet)?.write(rect, values)
    }

    fn delete_range(&mut self, sheet: SheetId, rect: Rect, shift: Shift) -> Result<()> {
        if rect.is_empty() {
            return Err(Error::EmptyRange(rect.address()));
        }
        let sheet = self.sheet_mut(sheet)?;
        match shift {
            Shift::Up => sheet.remove_shift_up(rect),
            Shift::Left => sheet.remove_shift_left(rect),
        }
        Ok(())
    }

    fn list_regions(&self, sheet: SheetId) -> Result<Vec<RegionId>> {
        Ok(self.sheet(sheet)?.regions.iter().map(|r| r.id).collect())
    }

    fn region(&self, region: RegionId) -> Result<RegionInfo> {
        let (si, ri) = self.region_location(region)?;
        let sheet = self.sheet_at(si);
        Ok(RegionInfo::from_region(sheet.id, &sheet.regions[ri]))
    }

    fn create_region(&mut self, sheet: SheetId, rect: Rect, has_headers: bool) -> Result<RegionId> {
        if rect.is_empty() {
            return Err(Error::EmptyRange(rect.address()));
        }
        let bounds = if has_headers {
            rect
        } else {
            Rect::new(rect.row, rect.col, rect.rows + 1, rect.cols)
        };
        self.check_overlap(self.sheet(sheet)?, bounds, None)?;

        let name = self.unique_region_name();
        let id = RegionId(self.generate_id());
        let target = self.sheet_mut(sheet)?;
        if !has_headers {
            target.insert_shift_down(rect, rect.row);
        }
        target.regions.push(TableRegion { id, name, bounds });
        normalize_headers(target, Rect::new(bounds.row, bounds.col, 1, bounds.cols));
        Ok(id)
    }

    fn resize_region(&mut self, region: RegionId, rect: Rect) -> Result<()> {
        if rect.is_empty() {
            return Err(Error::EmptyRange(rect.address()));
        }
        let (si, ri) = self.region_location(region)?;
        self.check_overlap(self.sheet_at(si), rect, Some(region))?;

        let sheet = self.sheet_at_mut(si);
        sheet.regions[ri].bounds = rect;
        normalize_headers(sheet, Rect::new(rect.row, rect.col, 1, rect.cols));
        Ok(())
    }

    fn rename_region(&mut self, region: RegionId, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidName(name.to_string()));
        }
        if self.region_name_taken(name, Some(region)) {
            return Err(Error::NameTaken(name.to_string()));
        }
        let (si, ri) = self.region_location(region)?;
        self.sheet_at_mut(si).regions[ri].name = name.to_string();
        Ok(())
    }

    fn insert_column(&mut self, region: RegionId, at: usize) -> Result<()> {
        let (si, ri) = self.region_location(region)?;
        let sheet = self.sheet_at_mut(si);
        let bounds = sheet.regions[ri].bounds;
        let at = at.min(bounds.cols);
        let col = bounds.col + at;

        let headers: Vec<String> = sheet
            .values(Rect::new(bounds.row, bounds.col, 1, bounds.cols))
            .into_iter()
            .flatten()
            .map(|v| v.to_string_value())
            .collect();

        // the owning region is handled here, neighbours by the sheet
        sheet.insert_shift_right(bounds, col);
        for (i, other) in sheet.regions.iter_mut().enumerate() {
            if i == ri {
                other.bounds.col = bounds.col;
                other.bounds.cols = bounds.cols + 1;
            } else if bounds.spans_rows_of(&other.bounds)
                && other.bounds.col < col
                && col < other.bounds.end_col()
            {
                other.bounds.cols += 1;
            }
        }
        sheet.set(bounds.row, col, CellValue::String(generated_column_name(&headers)));
        Ok(())
    }

    fn delete_column(&mut self, region: RegionId, index: usize) -> Result<()> {
        let (si, ri) = self.region_location(region)?;
        let sheet = self.sheet_at_mut(si);
        let bounds = sheet.regions[ri].bounds;
        if index >= bounds.cols {
            return Err(Error::ColumnNotFound(format!("#{}", index)));
        }
        sheet.remove_shift_left(Rect::new(bounds.row, bounds.col + index, bounds.rows, 1));
        Ok(())
    }
}
