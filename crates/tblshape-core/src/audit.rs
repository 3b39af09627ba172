//! Append-only audit log kept in a reserved sheet
//!
//! Each record is one row: `[timestamp, "LEVEL:action", detail]` under a
//! `Timestamp | Action | Detail` header. Records are only ever appended.
//! Every append is mirrored as a `tracing` event.

use crate::cell::CellValue;
use crate::error::Result;
use crate::grid::{Rect, SheetId};
use crate::store::GridStore;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default name of the reserved audit sheet
pub const DEFAULT_LOG_SHEET: &str = "_log_transform";

/// Header row of the audit sheet
pub const LOG_HEADERS: [&str; 3] = ["Timestamp", "Action", "Detail"];

/// Severity of an audit record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "INFO" => Ok(Level::Info),
            "WARN" => Ok(Level::Warn),
            "ERROR" => Ok(Level::Error),
            other => Err(format!("unknown level '{}'", other)),
        }
    }
}

/// One appended audit entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub action: String,
    pub detail: String,
}

impl AuditRecord {
    pub fn new(level: Level, action: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            action: action.into(),
            detail: detail.into(),
        }
    }

    /// The persisted triple
    pub fn to_row(&self) -> Vec<CellValue> {
        vec![
            CellValue::String(self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
            CellValue::String(format!("{}:{}", self.level, self.action)),
            CellValue::String(self.detail.clone()),
        ]
    }

    /// Parse a persisted row; `None` for rows that are not records
    pub fn from_row(row: &[CellValue]) -> Option<Self> {
        let text = |i: usize| row.get(i).map(CellValue::to_string_value).unwrap_or_default();
        let timestamp = DateTime::parse_from_rfc3339(&text(0)).ok()?.with_timezone(&Utc);
        let tagged = text(1);
        let (level, action) = tagged.split_once(':')?;
        Some(Self {
            timestamp,
            level: level.parse().ok()?,
            action: action.to_string(),
            detail: text(2),
        })
    }
}

impl fmt::Display for AuditRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:<5} {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.level,
            self.action
        )?;
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

/// Handle to the audit sheet; passed explicitly to every component
#[derive(Debug, Clone)]
pub struct AuditLog {
    sheet: SheetId,
    name: String,
}

impl AuditLog {
    /// Open the audit sheet, creating it (with its header row) if absent
    pub fn ensure<S: GridStore>(store: &mut S, name: &str) -> Result<Self> {
        let sheet = match store.get_sheet(name) {
            Some(id) => id,
            None => store.add_sheet(name)?,
        };
        if store.occupied_extent(sheet)?.is_none() {
            let header: Vec<CellValue> = LOG_HEADERS.iter().map(|h| CellValue::from(*h)).collect();
            store.set_cell_values(sheet, Rect::new(0, 0, 1, LOG_HEADERS.len()), &[header])?;
        }
        Ok(Self {
            sheet,
            name: name.to_string(),
        })
    }

    /// Open an existing audit sheet without creating anything
    pub fn open<S: GridStore>(store: &S, name: &str) -> Option<Self> {
        store.get_sheet(name).map(|sheet| Self {
            sheet,
            name: name.to_string(),
        })
    }

    pub fn sheet(&self) -> SheetId {
        self.sheet
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn append<S: GridStore>(&self, store: &mut S, record: &AuditRecord) -> Result<()> {
        match record.level {
            Level::Info => tracing::info!(action = %record.action, "{}", record.detail),
            Level::Warn => tracing::warn!(action = %record.action, "{}", record.detail),
            Level::Error => tracing::error!(action = %record.action, "{}", record.detail),
        }
        let next = store
            .occupied_extent(self.sheet)?
            .map_or(0, |extent| extent.end_row());
        store.set_cell_values(
            self.sheet,
            Rect::new(next, 0, 1, LOG_HEADERS.len()),
            &[record.to_row()],
        )
    }

    pub fn info<S: GridStore>(&self, store: &mut S, action: &str, detail: &str) -> Result<()> {
        self.append(store, &AuditRecord::new(Level::Info, action, detail))
    }

    pub fn warn<S: GridStore>(&self, store: &mut S, action: &str, detail: &str) -> Result<()> {
        self.append(store, &AuditRecord::new(Level::Warn, action, detail))
    }

    pub fn error<S: GridStore>(&self, store: &mut S, action: &str, detail: &str) -> Result<()> {
        self.append(store, &AuditRecord::new(Level::Error, action, detail))
    }

    /// All records in append order
    pub fn records<S: GridStore>(&self, store: &S) -> Result<Vec<AuditRecord>> {
        let extent = match store.occupied_extent(self.sheet)? {
            Some(extent) => extent,
            None => return Ok(Vec::new()),
        };
        let rows = store.cell_values(
            self.sheet,
            Rect::new(0, 0, extent.end_row(), LOG_HEADERS.len()),
        )?;
        Ok(rows.iter().filter_map(|row| AuditRecord::from_row(row)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Workbook;

    #[test]
    fn test_ensure_creates_sheet_with_header_once() {
        let mut wb = Workbook::new();
        let log = AuditLog::ensure(&mut wb, DEFAULT_LOG_SHEET).unwrap();
        log.info(&mut wb, "start", "").unwrap();

        let again = AuditLog::ensure(&mut wb, DEFAULT_LOG_SHEET).unwrap();
        assert_eq!(again.sheet(), log.sheet());
        assert_eq!(wb.sheets().len(), 1);

        let header = wb.cell_values(log.sheet(), Rect::new(0, 0, 1, 3)).unwrap();
        assert_eq!(header[0][1], CellValue::from("Action"));
        assert_eq!(log.records(&wb).unwrap().len(), 1);
    }

    #[test]
    fn test_records_keep_append_order_and_levels() {
        let mut wb = Workbook::new();
        let log = AuditLog::ensure(&mut wb, DEFAULT_LOG_SHEET).unwrap();
        log.info(&mut wb, "deleteColumn", "Deleted 'Plant'").unwrap();
        log.warn(&mut wb, "renameColumn", "Not found 'X'").unwrap();
        log.error(&mut wb, "run", "boom").unwrap();

        let records = log.records(&wb).unwrap();
        let levels: Vec<Level> = records.iter().map(|r| r.level).collect();
        assert_eq!(levels, vec![Level::Info, Level::Warn, Level::Error]);
        assert_eq!(records[0].action, "deleteColumn");
        assert_eq!(records[0].detail, "Deleted 'Plant'");
        assert!(records[0].timestamp <= records[2].timestamp);

        let persisted = wb.cell_values(log.sheet(), Rect::new(2, 1, 1, 1)).unwrap();
        assert_eq!(persisted[0][0], CellValue::from("WARN:renameColumn"));
    }

    #[test]
    fn test_from_row_splits_on_first_colon() {
        let record = AuditRecord::new(Level::Info, "sort", "Mnozstvi_SAP DESC");
        let parsed = AuditRecord::from_row(&record.to_row()).unwrap();
        assert_eq!(parsed.level, Level::Info);
        assert_eq!(parsed.action, "sort");

        let header: Vec<CellValue> = LOG_HEADERS.iter().map(|h| CellValue::from(*h)).collect();
        assert!(AuditRecord::from_row(&header).is_none());
    }
}
