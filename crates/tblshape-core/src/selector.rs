//! Sheet selection: find the sheet that holds the dataset

use crate::audit::AuditLog;
use crate::error::{Error, Result};
use crate::grid::{Rect, SheetId};
use crate::store::GridStore;
use serde::{Deserialize, Serialize};

/// How one sheet fared as a data candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub sheet: SheetId,
    pub name: String,
    pub extent: Option<Rect>,
    /// `rows * cols` of the occupied extent; `None` when the sheet is skipped
    pub score: Option<usize>,
}

/// Score every sheet except `exclude` (the audit sheet), in document order
pub fn score_sheets<S: GridStore>(store: &S, exclude: &str) -> Result<Vec<Candidate>> {
    let mut candidates = Vec::new();

    for sheet in store.list_sheets() {
        let name = store.sheet_name(sheet)?;
        if name == exclude {
            continue;
        }

        let extent = store.occupied_extent(sheet)?;
        let score = match extent {
            Some(extent) if has_header(store, sheet, extent)? => Some(extent.rows * extent.cols),
            _ => None,
        };

        candidates.push(Candidate {
            sheet,
            name,
            extent,
            score,
        });
    }

    Ok(candidates)
}

fn has_header<S: GridStore>(store: &S, sheet: SheetId, extent: Rect) -> Result<bool> {
    let first_row = store.cell_values(sheet, Rect::new(extent.row, extent.col, 1, extent.cols))?;
    Ok(first_row
        .iter()
        .flatten()
        .any(|v| !v.to_string_value().trim().is_empty()))
}

/// The scored candidate with the largest occupied area; the first one wins ties
pub fn best_candidate(candidates: &[Candidate]) -> Option<(&Candidate, usize)> {
    let mut best: Option<(&Candidate, usize)> = None;
    for candidate in candidates {
        if let Some(score) = candidate.score {
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((candidate, score));
            }
        }
    }
    best
}

/// Pick the data sheet among every sheet except the audit sheet
pub fn select_data_sheet<S: GridStore>(store: &mut S, log: &AuditLog) -> Result<SheetId> {
    let candidates = score_sheets(store, log.name())?;
    let (chosen, score) = best_candidate(&candidates).ok_or(Error::NoDataSheetFound)?;
    let (sheet, detail) = (
        chosen.sheet,
        format!("Selected sheet '{}' (area {})", chosen.name, score),
    );
    log.info(store, "selectSheet", &detail)?;
    Ok(sheet)
}
