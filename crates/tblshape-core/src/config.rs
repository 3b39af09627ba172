//! Pipeline configuration (JSON)
//!
//! The default profile reproduces the SAP stock export cleanup: keep storage
//! locations F010/F070, drop plant/location columns, order and rename the
//! output columns, sort by quantity and bind the result as `tbl_SAP` on `SAP`.

use crate::audit::DEFAULT_LOG_SHEET;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A set of headers that must all be present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderCheck {
    /// Prefix for the error message when something is missing
    pub context: String,
    pub columns: Vec<String>,
}

impl HeaderCheck {
    pub fn new(context: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            context: context.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Keep only rows whose trimmed value in `column` is one of `allowed`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFilter {
    pub column: String,
    pub allowed: Vec<String>,
}

/// Rename a column in place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRename {
    pub from: String,
    pub to: String,
}

impl ColumnRename {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Single-key stable sort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    #[serde(default = "default_true")]
    pub descending: bool,
}

fn default_true() -> bool {
    true
}

/// Everything a run needs to know
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Reserved audit sheet, never a data candidate
    pub log_sheet: String,
    /// Header checks before any row or column is touched
    pub checks: Vec<HeaderCheck>,
    pub filter: Option<RowFilter>,
    /// Best-effort column deletions
    pub delete_columns: Vec<String>,
    /// Columns moved to the front, in this order
    pub column_order: Vec<String>,
    pub renames: Vec<ColumnRename>,
    /// Header checks after renaming
    pub final_checks: Vec<HeaderCheck>,
    pub sort: Option<SortSpec>,
    /// 1-based sheet row deleted after sorting
    pub prune_row: Option<usize>,
    /// Number of leading columns kept
    pub column_budget: usize,
    /// Canonical table region name
    pub region_name: String,
    /// Canonical result sheet name
    pub sheet_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let output = ["Material", "Material description", "Batch", "Total Quantity"];
        Self {
            log_sheet: DEFAULT_LOG_SHEET.to_string(),
            checks: vec![
                HeaderCheck::new("missing filter column", &["Storage location"]),
                HeaderCheck::new("missing required output columns", &output),
            ],
            filter: Some(RowFilter {
                column: "Storage location".to_string(),
                allowed: vec!["F010".to_string(), "F070".to_string()],
            }),
            delete_columns: vec!["Plant".to_string(), "Storage location".to_string()],
            column_order: output.iter().map(|c| c.to_string()).collect(),
            renames: vec![
                ColumnRename::new("Material description", "Název"),
                ColumnRename::new("Total Quantity", "Mnozstvi_SAP"),
            ],
            final_checks: vec![HeaderCheck::new(
                "missing renamed columns",
                &["Material", "Název", "Batch", "Mnozstvi_SAP"],
            )],
            sort: Some(SortSpec {
                column: "Mnozstvi_SAP".to_string(),
                descending: true,
            }),
            prune_row: Some(2),
            column_budget: 4,
            region_name: "tbl_SAP".to_string(),
            sheet_name: "SAP".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load a config from JSON; omitted fields take the default profile
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the config as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.column_budget == 0 {
            return Err(Error::InvalidConfig("column_budget must be at least 1".into()));
        }
        for (field, value) in [
            ("log_sheet", &self.log_sheet),
            ("region_name", &self.region_name),
            ("sheet_name", &self.sheet_name),
        ] {
            if value.trim().is_empty() {
                return Err(Error::InvalidConfig(format!("{} must not be blank", field)));
            }
        }
        if self.log_sheet == self.sheet_name {
            return Err(Error::InvalidConfig(
                "sheet_name must differ from log_sheet".into(),
            ));
        }
        if self.prune_row == Some(0) {
            return Err(Error::InvalidConfig("prune_row is 1-based".into()));
        }
        Ok(())
    }
}
