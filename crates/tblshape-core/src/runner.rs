//! One complete run: select, materialize, transform, reshape, bind

use crate::audit::AuditLog;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::grid::{Rect, SheetId};
use crate::headers::header_names;
use crate::identity::bind_sheet_name;
use crate::materialize::ensure_table;
use crate::pipeline;
use crate::reshape::reshape;
use crate::selector::select_data_sheet;
use crate::store::GridStore;
use serde::Serialize;

/// What a successful run produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Name the data sheet had before the run
    pub source_sheet: String,
    pub sheet: SheetId,
    pub sheet_name: String,
    pub region_name: String,
    pub bounds: Rect,
    pub headers: Vec<String>,
    pub body_rows: usize,
}

/// Run the whole pipeline against `store`.
///
/// A failure is recorded as a single ERROR audit record and then returned.
/// Mutations made before the failure stay in place.
pub fn run<S: GridStore>(store: &mut S, config: &PipelineConfig) -> Result<RunReport> {
    config.validate()?;
    let log = AuditLog::ensure(store, &config.log_sheet)?;
    log.info(store, "start", "")?;

    match execute(store, &log, config) {
        Ok(report) => {
            store.autofit_columns(report.sheet);
            log.info(store, "done", "")?;
            Ok(report)
        }
        Err(err) => {
            if let Err(log_err) = log.error(store, "run", &err.to_string()) {
                tracing::error!(error = %log_err, "failed to record run failure");
            }
            Err(err)
        }
    }
}

fn execute<S: GridStore>(store: &mut S, log: &AuditLog, config: &PipelineConfig) -> Result<RunReport> {
    let sheet = select_data_sheet(store, log)?;
    let source_sheet = store.sheet_name(sheet)?;

    let table = ensure_table(store, log, sheet)?;
    pipeline::apply(store, log, table, config)?;

    let region = reshape(store, log, sheet, config.column_budget, &config.region_name)?;
    bind_sheet_name(store, log, sheet, &config.sheet_name)?;

    let info = store.region(region)?;
    Ok(RunReport {
        source_sheet,
        sheet,
        sheet_name: store.sheet_name(sheet)?,
        region_name: info.name.clone(),
        bounds: info.bounds,
        headers: header_names(store, region)?,
        body_rows: info.bounds.rows.saturating_sub(1),
    })
}
