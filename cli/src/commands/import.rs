use std::path::Path;

use anyhow::Result;

use fitlog_core::db::Database;
use fitlog_core::import::{ImportOptions, import_workbook, summary_line};
use fitlog_core::sheet::Workbook;

pub(crate) fn cmd_import(
    db: &Database,
    profile_id: i64,
    path: &Path,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let workbook = Workbook::open(path)?;
    let summary = import_workbook(db, &workbook, profile_id, ImportOptions { dry_run })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}", summary_line(&summary));
    if summary.entries_imported > 0 {
        let verb = if dry_run { "would be created" } else { "created" };
        println!(
            "  Food entries: {} ({} custom foods {verb}, {} reused)",
            summary.entries_imported, summary.foods_created, summary.foods_reused
        );
    }

    Ok(())
}
