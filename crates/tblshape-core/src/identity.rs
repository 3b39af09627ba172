//! Give the result sheet its canonical name

use crate::audit::AuditLog;
use crate::error::Result;
use crate::grid::SheetId;
use crate::store::GridStore;

/// Rename `target` to `name`. Any other sheet already holding `name` is a
/// stale result: it is deleted first and a warning is logged.
pub fn bind_sheet_name<S: GridStore>(store: &mut S, log: &AuditLog, target: SheetId, name: &str) -> Result<()> {
    if let Some(existing) = store.get_sheet(name) {
        if existing != target {
            store.delete_sheet(existing)?;
            log.warn(store, "renameSheet", &format!("Deleted existing sheet '{}'", name))?;
        }
    }

    store.rename_sheet(target, name)?;
    log.info(store, "renameSheet", &format!("Sheet renamed to '{}'", name))?;
    Ok(())
}
