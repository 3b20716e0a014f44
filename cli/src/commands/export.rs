use std::path::Path;

use anyhow::{Context, Result};

use fitlog_core::db::Database;
use fitlog_core::export::write_logs_csv;

/// Write every log of the profile as CSV, oldest first. `-` writes to stdout.
pub(crate) fn cmd_export(db: &Database, profile_id: i64, path: &Path) -> Result<()> {
    db.ensure_profile(profile_id)?;
    let logs = db.get_daily_logs_in_range(profile_id, None, None)?;

    if path == Path::new("-") {
        write_logs_csv(&logs, std::io::stdout().lock())?;
        return Ok(());
    }

    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    let written = write_logs_csv(&logs, std::io::BufWriter::new(file))?;
    eprintln!("Exported {written} logs to {}", path.display());
    Ok(())
}
