//! Error types for tblshape-core

use crate::grid::{RegionId, SheetId};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tblshape-core
#[derive(Debug, Error)]
pub enum Error {
    /// No candidate sheet has data with a header row
    #[error("no sheet with a header in its first row was found")]
    NoDataSheetFound,

    /// The sheet has no occupied cells to build a table from
    #[error("sheet '{sheet}' contains no data")]
    EmptySheet { sheet: String },

    /// One or more required headers are absent from the table
    #[error("{context}: {}", .missing.join(", "))]
    MissingRequiredColumns {
        context: String,
        missing: Vec<String>,
    },

    /// Nothing left inside the column budget after trimming
    #[error("no data left in the first {columns} column(s) of sheet '{sheet}'")]
    NoDataAfterShrink { sheet: String, columns: usize },

    /// A required column could not be resolved by name
    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    /// Unknown sheet handle or name
    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    /// Unknown region handle
    #[error("table region {0} not found")]
    RegionNotFound(RegionId),

    /// A sheet or region name is already in use
    #[error("name '{0}' is already taken")]
    NameTaken(String),

    /// Two sheets or regions of a loaded workbook share a handle
    #[error("duplicate id #{0} in workbook")]
    DuplicateId(u64),

    /// A sheet or region name is blank
    #[error("invalid name: '{0}'")]
    InvalidName(String),

    /// A new or resized region would overlap another region on the same sheet
    #[error("range {range} on sheet {sheet} overlaps table '{other}'")]
    RegionOverlap {
        sheet: SheetId,
        range: String,
        other: String,
    },

    /// Values written to a range do not match its dimensions
    #[error("shape mismatch: range is {expected:?} (rows, cols) but values are {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// A range with zero rows or columns was used where cells are required
    #[error("empty range: {0}")]
    EmptyRange(String),

    /// Configuration failed validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV parsing error from the csv crate
    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
