//! tblshape-core: Core library for normalizing raw sheet exports
//!
//! This library provides functionality to:
//! - Pick the sheet that holds a dataset among the sheets of a workbook
//! - Bind that data to a named table region
//! - Filter, delete, reorder, rename and sort columns by header name
//! - Trim the result to a fixed column budget under a canonical name
//! - Record every mutation in an append-only audit sheet

pub mod audit;
pub mod cell;
pub mod config;
pub mod error;
pub mod grid;
pub mod headers;
pub mod identity;
pub mod io;
pub mod materialize;
pub mod pipeline;
pub mod reshape;
pub mod runner;
pub mod selector;
pub mod store;

pub use audit::{AuditLog, AuditRecord, Level, DEFAULT_LOG_SHEET};
pub use cell::CellValue;
pub use config::{ColumnRename, HeaderCheck, PipelineConfig, RowFilter, SortSpec};
pub use error::{Error, Result};
pub use grid::{Rect, RegionId, Sheet, SheetId, TableRegion, Workbook};
pub use io::{load_workbook, save_workbook};
pub use runner::{run, RunReport};
pub use selector::{best_candidate, score_sheets, Candidate};
pub use store::{GridStore, RegionInfo, Shift};
