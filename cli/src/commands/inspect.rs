use std::path::Path;

use anyhow::Result;

use fitlog_core::macrofactor::{
    ColumnMap, FOOD_LOG_RULES, FOOD_LOG_SHEET, FoodColumn, SUMMARY_RULES, SUMMARY_SHEET,
    SummaryColumn, food_log_entry, parse_export, summary_record,
};
use fitlog_core::sheet::{Cell, Sheet, Workbook};

use super::helpers::{fmt_opt, truncate};

const PREVIEW_ROWS: usize = 5;

pub(crate) fn cmd_inspect(path: &Path) -> Result<()> {
    let workbook = Workbook::open(path)?;

    println!("Sheets: {}", workbook.sheet_names().join(", "));

    for sheet in &workbook.sheets {
        println!("\n== {} ({} data rows)", sheet.name, sheet.data_rows().count());
        let header: Vec<String> = sheet.header().iter().map(Cell::as_text).collect();
        println!("  Header: {}", header.join(" | "));
    }

    if let Some(sheet) = workbook.sheet(SUMMARY_SHEET) {
        inspect_summary(sheet)?;
    } else {
        println!("\nNo \"{SUMMARY_SHEET}\" sheet; daily summaries will not be imported.");
    }

    if let Some(sheet) = workbook.sheet(FOOD_LOG_SHEET) {
        inspect_food_log(sheet)?;
    } else {
        println!("\nNo \"{FOOD_LOG_SHEET}\" sheet; foods will not be replaced.");
    }

    let parsed = parse_export(&workbook)?;
    let food_dates: Vec<String> = parsed
        .food_log
        .iter()
        .map(|(date, entries)| format!("{date} ({})", entries.len()))
        .collect();
    println!(
        "\nDates: {} total, {} with food entries",
        parsed.dates().len(),
        parsed.food_log.len()
    );
    if !food_dates.is_empty() {
        println!("  Food log dates: {}", food_dates.join(", "));
    }
    if parsed.skipped_summary_rows + parsed.skipped_food_rows > 0 {
        println!(
            "  Skipped rows: {} summary, {} food log",
            parsed.skipped_summary_rows, parsed.skipped_food_rows
        );
    }

    Ok(())
}

fn print_mapping<F: Copy + PartialEq>(
    sheet: &Sheet,
    cols: &ColumnMap<F>,
    label: impl Fn(F) -> &'static str,
) {
    println!("  Columns:");
    for (field, idx) in cols.iter() {
        let source = idx
            .and_then(|i| sheet.header().get(i))
            .map_or_else(|| "(missing)".to_string(), |c| format!("\"{}\"", c.as_text()));
        println!("    {:<14} <- {source}", label(field));
    }
}

fn inspect_summary(sheet: &Sheet) -> Result<()> {
    let cols = ColumnMap::resolve(sheet.header(), SUMMARY_RULES)?;
    println!("\n{SUMMARY_SHEET}:");
    print_mapping(sheet, &cols, SummaryColumn::as_str);

    println!("  First rows:");
    for (row_num, row) in sheet.data_rows().take(PREVIEW_ROWS) {
        match summary_record(&cols, row) {
            Some(r) => println!(
                "    row {row_num}: {} weight={} trend={} kcal={} P={} F={} C={} steps={}",
                r.date,
                fmt_opt(r.weight, 1),
                fmt_opt(r.trend_weight, 1),
                fmt_opt(r.calories, 0),
                fmt_opt(r.protein, 0),
                fmt_opt(r.fat, 0),
                fmt_opt(r.carbs, 0),
                fmt_opt(r.steps, 0),
            ),
            None => println!("    row {row_num}: skipped (no valid date)"),
        }
    }
    Ok(())
}

fn inspect_food_log(sheet: &Sheet) -> Result<()> {
    let cols = ColumnMap::resolve(sheet.header(), FOOD_LOG_RULES)?;
    println!("\n{FOOD_LOG_SHEET}:");
    print_mapping(sheet, &cols, FoodColumn::as_str);

    println!("  First rows:");
    for (row_num, row) in sheet.data_rows().take(PREVIEW_ROWS) {
        match food_log_entry(&cols, row) {
            Some(e) => println!(
                "    row {row_num}: {} {} x{} ({}, {}g) kcal={:.0} P={:.1} F={:.1} C={:.1}",
                e.date,
                truncate(&e.name, 30),
                e.serving_qty,
                e.serving_size,
                e.serving_weight_g,
                e.calories,
                e.protein,
                e.fat,
                e.carbs,
            ),
            None => println!("    row {row_num}: skipped (no valid date or food name)"),
        }
    }
    Ok(())
}
