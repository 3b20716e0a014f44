use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::day_number::day_number_for;
use crate::db::Database;
use crate::food_cache::CustomFoodCache;
use crate::macrofactor::{ParsedExport, parse_export};
use crate::models::{
    CustomFood, DailyLogUpsert, DayMetrics, FoodEntrySnapshot, FoodLogEntry, ImportSummary,
    ProgramSettings,
};
use crate::sheet::Workbook;

/// Unit recorded on imported food entries; `amount` counts servings.
pub const SERVING_UNIT: &str = "serving";

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Reconcile everything, then roll back instead of committing.
    pub dry_run: bool,
}

/// Parse `workbook` and merge it into the logs of `profile_id`.
pub fn import_workbook(
    db: &Database,
    workbook: &Workbook,
    profile_id: i64,
    options: ImportOptions,
) -> Result<ImportSummary> {
    let parsed = parse_export(workbook)?;
    reconcile(db, &parsed, profile_id, options)
}

/// Merge a parsed export into storage.
///
/// Every date in the export is visited once, oldest first. Summary values are
/// written only for dates present in the summary sheet and the food list is
/// replaced only for dates present in the food log, so a partial export never
/// clears data it does not carry. The run is a single transaction.
pub fn reconcile(
    db: &Database,
    parsed: &ParsedExport,
    profile_id: i64,
    options: ImportOptions,
) -> Result<ImportSummary> {
    db.ensure_profile(profile_id)?;

    let run = |db: &Database| reconcile_dates(db, parsed, profile_id);
    let mut summary = if options.dry_run {
        db.with_rollback(run)?
    } else {
        db.with_transaction(run)?
    };
    summary.dry_run = options.dry_run;

    tracing::info!(
        profile_id,
        dry_run = summary.dry_run,
        dates = summary.dates_processed,
        created = summary.logs_created,
        updated = summary.logs_updated,
        foods_created = summary.foods_created,
        entries = summary.entries_imported,
        "import reconciled"
    );
    Ok(summary)
}

fn reconcile_dates(db: &Database, parsed: &ParsedExport, profile_id: i64) -> Result<ImportSummary> {
    let settings = db.get_settings(profile_id)?;
    let mut cache = CustomFoodCache::new();
    let mut summary = ImportSummary::default();

    for date in parsed.dates() {
        let entry = build_upsert(db, &mut cache, parsed, settings.as_ref(), date)
            .with_context(|| format!("Failed to import {date}"))?;
        summary.entries_imported += entry.foods.as_ref().map_or(0, Vec::len);

        if db.update_daily_log(profile_id, &entry)? {
            tracing::debug!(%date, day_number = entry.day_number, "updated daily log");
            summary.logs_updated += 1;
        } else {
            db.insert_daily_log(profile_id, &entry)?;
            tracing::debug!(%date, day_number = entry.day_number, "created daily log");
            summary.logs_created += 1;
        }
        summary.dates_processed += 1;
    }

    summary.foods_created = cache.created();
    summary.foods_reused = cache.reused();
    Ok(summary)
}

fn build_upsert(
    db: &Database,
    cache: &mut CustomFoodCache,
    parsed: &ParsedExport,
    settings: Option<&ProgramSettings>,
    date: NaiveDate,
) -> Result<DailyLogUpsert> {
    let foods = match parsed.food_log.get(&date) {
        Some(entries) if !entries.is_empty() => Some(food_snapshots(db, cache, date, entries)?),
        _ => None,
    };

    Ok(DailyLogUpsert {
        date,
        day_number: day_number_for(settings, date),
        metrics: parsed.summaries.get(&date).map(DayMetrics::from),
        foods,
    })
}

fn food_snapshots(
    db: &Database,
    cache: &mut CustomFoodCache,
    date: NaiveDate,
    entries: &[FoodLogEntry],
) -> Result<Vec<FoodEntrySnapshot>> {
    let mut foods = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(food) = cache.resolve(db, entry)? else {
            continue;
        };
        let index = foods.len();
        foods.push(snapshot(&food, entry, date, index));
    }
    Ok(foods)
}

/// Snapshot ids depend only on the food, the date and the position, so
/// re-importing the same export reproduces them.
fn snapshot(
    food: &CustomFood,
    entry: &FoodLogEntry,
    date: NaiveDate,
    index: usize,
) -> FoodEntrySnapshot {
    FoodEntrySnapshot {
        id: format!("custom-{}-{}-{index}", food.id, date.format("%Y-%m-%d")),
        custom_food_id: Some(food.id),
        name: entry.name.trim().to_string(),
        brand: None,
        amount: entry.serving_qty,
        unit: SERVING_UNIT.to_string(),
        custom_food: Some(entry.per_serving()),
        calories: entry.calories,
        protein: entry.protein,
        fat: entry.fat,
        carbs: entry.carbs,
    }
}

/// One-line result printed after an import.
#[must_use]
pub fn summary_line(summary: &ImportSummary) -> String {
    if summary.dry_run {
        format!(
            "Dry run: Dates: {}. Would create {} new logs, update {} existing.",
            summary.dates_processed, summary.logs_created, summary.logs_updated
        )
    } else {
        format!(
            "Import done. Dates: {}. Created {} new logs, updated {} existing.",
            summary.dates_processed, summary.logs_created, summary.logs_updated
        )
    }
}
