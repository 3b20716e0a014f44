//! Parser for MacroFactor's two-sheet spreadsheet export.
//!
//! "Quick Export" holds one row of daily aggregates per date (weight, logged
//! macros, steps). "Food Log" holds one row per logged food with the totals
//! for that line. Columns are located by header pattern, not position, so
//! exports with extra or reordered columns still parse.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use regex::{Regex, RegexBuilder};

use crate::models::{DailySummaryRecord, FoodLogEntry};
use crate::sheet::{Cell, Sheet, Workbook};

pub const SUMMARY_SHEET: &str = "Quick Export";
pub const FOOD_LOG_SHEET: &str = "Food Log";

/// Spreadsheet serial number of 1970-01-01.
const SERIAL_UNIX_EPOCH: i64 = 25_569;

const DEFAULT_SERVING_LABEL: &str = "serving";
const DEFAULT_SERVING_QTY: f64 = 1.0;
const DEFAULT_SERVING_WEIGHT_G: f64 = 100.0;

/// Header matcher for one logical column. The first header matching `include`
/// and not matching `exclude` wins; matching is case-insensitive.
#[derive(Debug, Clone, Copy)]
pub struct ColumnRule<F> {
    pub field: F,
    pub include: &'static str,
    pub exclude: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryColumn {
    Date,
    TrendWeight,
    Weight,
    Calories,
    Protein,
    Fat,
    Carbs,
    Steps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoodColumn {
    Date,
    Name,
    ServingSize,
    ServingQty,
    ServingWeight,
    Calories,
    Fat,
    Carbs,
    Protein,
}

impl SummaryColumn {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SummaryColumn::Date => "date",
            SummaryColumn::TrendWeight => "trend_weight",
            SummaryColumn::Weight => "weight",
            SummaryColumn::Calories => "calories",
            SummaryColumn::Protein => "protein",
            SummaryColumn::Fat => "fat",
            SummaryColumn::Carbs => "carbs",
            SummaryColumn::Steps => "steps",
        }
    }
}

impl FoodColumn {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FoodColumn::Date => "date",
            FoodColumn::Name => "name",
            FoodColumn::ServingSize => "serving_size",
            FoodColumn::ServingQty => "serving_qty",
            FoodColumn::ServingWeight => "serving_weight_g",
            FoodColumn::Calories => "calories",
            FoodColumn::Fat => "fat",
            FoodColumn::Carbs => "carbs",
            FoodColumn::Protein => "protein",
        }
    }
}

// Logged values only: "Target ..." columns sit next to the logged ones.
pub const SUMMARY_RULES: &[ColumnRule<SummaryColumn>] = &[
    ColumnRule { field: SummaryColumn::Date, include: r"date", exclude: None },
    ColumnRule { field: SummaryColumn::TrendWeight, include: r"trend\s*weight", exclude: None },
    ColumnRule { field: SummaryColumn::Weight, include: r"^weight\s*\(", exclude: Some(r"trend") },
    ColumnRule { field: SummaryColumn::Calories, include: r"calories", exclude: Some(r"target") },
    ColumnRule { field: SummaryColumn::Protein, include: r"^protein\s*\(", exclude: Some(r"target") },
    ColumnRule { field: SummaryColumn::Fat, include: r"^fat\s*\(", exclude: Some(r"target") },
    ColumnRule { field: SummaryColumn::Carbs, include: r"^carbs\s*\(", exclude: Some(r"target") },
    ColumnRule { field: SummaryColumn::Steps, include: r"steps", exclude: None },
];

pub const FOOD_LOG_RULES: &[ColumnRule<FoodColumn>] = &[
    ColumnRule { field: FoodColumn::Date, include: r"date", exclude: None },
    ColumnRule { field: FoodColumn::Name, include: r"food\s*name", exclude: None },
    ColumnRule { field: FoodColumn::ServingSize, include: r"serving\s*size", exclude: None },
    ColumnRule { field: FoodColumn::ServingQty, include: r"serving\s*qty", exclude: None },
    ColumnRule { field: FoodColumn::ServingWeight, include: r"serving\s*weight", exclude: None },
    ColumnRule { field: FoodColumn::Calories, include: r"calories", exclude: None },
    ColumnRule { field: FoodColumn::Fat, include: r"^fat\s*\(", exclude: None },
    ColumnRule { field: FoodColumn::Carbs, include: r"^carbs\s*\(", exclude: None },
    ColumnRule { field: FoodColumn::Protein, include: r"^protein\s*\(", exclude: None },
];

static EMPTY_CELL: Cell = Cell::Empty;

/// Column indices resolved once per sheet from its header row.
#[derive(Debug, Clone)]
pub struct ColumnMap<F> {
    columns: Vec<(F, Option<usize>)>,
}

impl<F: Copy + PartialEq> ColumnMap<F> {
    pub fn resolve(header: &[Cell], rules: &[ColumnRule<F>]) -> Result<Self> {
        let headers: Vec<String> = header.iter().map(Cell::as_text).collect();
        let mut columns = Vec::with_capacity(rules.len());

        for rule in rules {
            let include = compile(rule.include)?;
            let exclude = rule.exclude.map(compile).transpose()?;
            let idx = headers.iter().position(|h| {
                include.is_match(h) && !exclude.as_ref().is_some_and(|re| re.is_match(h))
            });
            columns.push((rule.field, idx));
        }

        Ok(ColumnMap { columns })
    }

    #[must_use]
    pub fn index(&self, field: F) -> Option<usize> {
        self.columns
            .iter()
            .find(|(f, _)| *f == field)
            .and_then(|(_, idx)| *idx)
    }

    /// The cell for `field` in `row`; empty when the column or cell is missing.
    #[must_use]
    pub fn cell<'a>(&self, row: &'a [Cell], field: F) -> &'a Cell {
        self.index(field)
            .and_then(|i| row.get(i))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn iter(&self) -> impl Iterator<Item = (F, Option<usize>)> + '_ {
        self.columns.iter().copied()
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("Invalid column pattern: {pattern}"))
}

/// Accepts a spreadsheet serial day number or text starting with `YYYY-MM-DD`.
#[must_use]
pub fn normalize_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Empty => None,
        Cell::Number(n) => date_from_serial(*n),
        Cell::Text(s) => {
            let s = s.trim();
            if let Some(date) = s
                .get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
            {
                return Some(date);
            }
            s.parse::<f64>().ok().and_then(date_from_serial)
        }
    }
}

fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let offset = (serial.floor() as i64).checked_sub(SERIAL_UNIX_EPOCH)?;
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    if offset >= 0 {
        epoch.checked_add_days(Days::new(offset.unsigned_abs()))
    } else {
        epoch.checked_sub_days(Days::new(offset.unsigned_abs()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParsedExport {
    pub summaries: BTreeMap<NaiveDate, DailySummaryRecord>,
    pub food_log: BTreeMap<NaiveDate, Vec<FoodLogEntry>>,
    pub skipped_summary_rows: usize,
    pub skipped_food_rows: usize,
}

impl ParsedExport {
    /// Every date present in either sheet, ascending.
    #[must_use]
    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.summaries
            .keys()
            .chain(self.food_log.keys())
            .copied()
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty() && self.food_log.is_empty()
    }

    #[must_use]
    pub fn food_entry_count(&self) -> usize {
        self.food_log.values().map(Vec::len).sum()
    }
}

pub fn parse_export(workbook: &Workbook) -> Result<ParsedExport> {
    let mut parsed = ParsedExport::default();

    if let Some(sheet) = workbook.sheet(SUMMARY_SHEET) {
        parse_summary_sheet(sheet, &mut parsed)?;
    } else {
        tracing::info!(sheet = SUMMARY_SHEET, "sheet not found, no daily summaries");
    }

    if let Some(sheet) = workbook.sheet(FOOD_LOG_SHEET) {
        parse_food_log_sheet(sheet, &mut parsed)?;
    } else {
        tracing::info!(sheet = FOOD_LOG_SHEET, "sheet not found, no food entries");
    }

    tracing::debug!(
        summaries = parsed.summaries.len(),
        food_dates = parsed.food_log.len(),
        food_entries = parsed.food_entry_count(),
        skipped_summary_rows = parsed.skipped_summary_rows,
        skipped_food_rows = parsed.skipped_food_rows,
        "parsed export"
    );

    Ok(parsed)
}

fn parse_summary_sheet(sheet: &Sheet, parsed: &mut ParsedExport) -> Result<()> {
    let cols = ColumnMap::resolve(sheet.header(), SUMMARY_RULES)?;

    for (row_num, row) in sheet.data_rows() {
        let Some(record) = summary_record(&cols, row) else {
            tracing::debug!(sheet = %sheet.name, row = row_num, "skipping row without a valid date");
            parsed.skipped_summary_rows += 1;
            continue;
        };
        parsed.summaries.insert(record.date, record);
    }

    Ok(())
}

#[must_use]
pub fn summary_record(cols: &ColumnMap<SummaryColumn>, row: &[Cell]) -> Option<DailySummaryRecord> {
    let date = normalize_date(cols.cell(row, SummaryColumn::Date))?;
    let num = |field| cols.cell(row, field).as_number();

    Some(DailySummaryRecord {
        date,
        trend_weight: num(SummaryColumn::TrendWeight),
        weight: num(SummaryColumn::Weight),
        calories: num(SummaryColumn::Calories),
        protein: num(SummaryColumn::Protein),
        fat: num(SummaryColumn::Fat),
        carbs: num(SummaryColumn::Carbs),
        steps: num(SummaryColumn::Steps),
    })
}

fn parse_food_log_sheet(sheet: &Sheet, parsed: &mut ParsedExport) -> Result<()> {
    let cols = ColumnMap::resolve(sheet.header(), FOOD_LOG_RULES)?;

    for (row_num, row) in sheet.data_rows() {
        let Some(entry) = food_log_entry(&cols, row) else {
            tracing::debug!(sheet = %sheet.name, row = row_num, "skipping row without a date or food name");
            parsed.skipped_food_rows += 1;
            continue;
        };
        parsed.food_log.entry(entry.date).or_default().push(entry);
    }

    Ok(())
}

#[must_use]
pub fn food_log_entry(cols: &ColumnMap<FoodColumn>, row: &[Cell]) -> Option<FoodLogEntry> {
    let date = normalize_date(cols.cell(row, FoodColumn::Date))?;
    let name = cols.cell(row, FoodColumn::Name).as_text();
    if name.is_empty() {
        return None;
    }

    let num = |field| cols.cell(row, field).as_number();
    let positive_or = |field, default: f64| num(field).filter(|v| *v > 0.0).unwrap_or(default);

    let serving_size = cols.cell(row, FoodColumn::ServingSize).as_text();
    let serving_size = if serving_size.is_empty() {
        DEFAULT_SERVING_LABEL.to_string()
    } else {
        serving_size
    };

    Some(FoodLogEntry {
        date,
        name,
        serving_size,
        serving_qty: positive_or(FoodColumn::ServingQty, DEFAULT_SERVING_QTY),
        serving_weight_g: positive_or(FoodColumn::ServingWeight, DEFAULT_SERVING_WEIGHT_G),
        calories: num(FoodColumn::Calories).unwrap_or(0.0),
        fat: num(FoodColumn::Fat).unwrap_or(0.0),
        carbs: num(FoodColumn::Carbs).unwrap_or(0.0),
        protein: num(FoodColumn::Protein).unwrap_or(0.0),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE_QUICK_EXPORT: &str = "\
Date,Expenditure,Trend Weight (lbs),Weight (lbs),Calories (kcal),Target Calories (kcal),Protein (g),Target Protein (g),Fat (g),Target Fat (g),Carbs (g),Target Carbs (g),Steps
2024-03-01,2500,181.0,180.2,2100,2200,150,160,70,75,210,220,9321
2024-03-02,2480,180.9,,1950,2200,140,160,65,75,200,220,8000
";

    pub(crate) const SAMPLE_FOOD_LOG: &str = "\
Date,Time,Food Name,Serving Size,Serving Qty,Serving Weight (g),Calories (kcal),Fat (g),Carbs (g),Protein (g)
2024-03-02,08:00,Oatmeal,1 cup,1,50,190,3,33,7
2024-03-02,12:30,Oatmeal,1 cup,2,50,380,6,66,14
2024-03-02,13:00,,1 cup,1,50,100,1,1,1
2024-03-02,18:00,Chicken Breast,,,,165,3.6,0,31
";

    pub(crate) fn workbook(quick_export: Option<&str>, food_log: Option<&str>) -> Workbook {
        let mut sheets = Vec::new();
        if let Some(csv) = quick_export {
            sheets.push(Sheet::from_csv(SUMMARY_SHEET, csv.as_bytes()).unwrap());
        }
        if let Some(csv) = food_log {
            sheets.push(Sheet::from_csv(FOOD_LOG_SHEET, csv.as_bytes()).unwrap());
        }
        Workbook { sheets }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn header(names: &[&str]) -> Vec<Cell> {
        names.iter().map(|n| Cell::Text((*n).to_string())).collect()
    }

    #[test]
    fn test_normalize_date_iso_and_serial() {
        assert_eq!(
            normalize_date(&Cell::Text("2024-03-01".to_string())),
            Some(date(2024, 3, 1))
        );
        assert_eq!(
            normalize_date(&Cell::Text("2024-03-01T07:15:00".to_string())),
            Some(date(2024, 3, 1))
        );
        assert_eq!(normalize_date(&Cell::Number(45352.0)), Some(date(2024, 3, 1)));
        assert_eq!(normalize_date(&Cell::Number(45352.75)), Some(date(2024, 3, 1)));
        assert_eq!(
            normalize_date(&Cell::Text("45352".to_string())),
            Some(date(2024, 3, 1))
        );
        assert_eq!(normalize_date(&Cell::Number(25569.0)), Some(date(1970, 1, 1)));
    }

    #[test]
    fn test_normalize_date_rejects_other_values() {
        assert_eq!(normalize_date(&Cell::Empty), None);
        assert_eq!(normalize_date(&Cell::Text("March 1st".to_string())), None);
        assert_eq!(normalize_date(&Cell::Text("2024-13-45".to_string())), None);
        assert_eq!(normalize_date(&Cell::Number(f64::NAN)), None);
    }

    #[test]
    fn test_column_map_excludes_target_columns() {
        let cols = ColumnMap::resolve(
            &header(&[
                "Date",
                "Trend Weight (lbs)",
                "Weight (lbs)",
                "Target Calories (kcal)",
                "Calories (kcal)",
                "Target Protein (g)",
                "Protein (g)",
            ]),
            SUMMARY_RULES,
        )
        .unwrap();

        assert_eq!(cols.index(SummaryColumn::Date), Some(0));
        assert_eq!(cols.index(SummaryColumn::TrendWeight), Some(1));
        assert_eq!(cols.index(SummaryColumn::Weight), Some(2));
        assert_eq!(cols.index(SummaryColumn::Calories), Some(4));
        assert_eq!(cols.index(SummaryColumn::Protein), Some(6));
        assert_eq!(cols.index(SummaryColumn::Fat), None);
        assert_eq!(cols.index(SummaryColumn::Steps), None);
    }

    #[test]
    fn test_column_map_is_case_insensitive() {
        let cols = ColumnMap::resolve(
            &header(&["DATE", "food name", "SERVING WEIGHT (G)"]),
            FOOD_LOG_RULES,
        )
        .unwrap();
        assert_eq!(cols.index(FoodColumn::Date), Some(0));
        assert_eq!(cols.index(FoodColumn::Name), Some(1));
        assert_eq!(cols.index(FoodColumn::ServingWeight), Some(2));
        assert_eq!(cols.index(FoodColumn::ServingQty), None);
    }

    #[test]
    fn test_parse_quick_export() {
        let parsed = parse_export(&workbook(Some(SAMPLE_QUICK_EXPORT), None)).unwrap();
        assert_eq!(parsed.summaries.len(), 2);
        assert!(parsed.food_log.is_empty());

        let first = &parsed.summaries[&date(2024, 3, 1)];
        assert_eq!(first.trend_weight, Some(181.0));
        assert_eq!(first.weight, Some(180.2));
        assert_eq!(first.calories, Some(2100.0));
        assert_eq!(first.protein, Some(150.0));
        assert_eq!(first.fat, Some(70.0));
        assert_eq!(first.carbs, Some(210.0));
        assert_eq!(first.steps, Some(9321.0));

        let second = &parsed.summaries[&date(2024, 3, 2)];
        assert_eq!(second.weight, None);
        assert_eq!(second.effective_weight(), Some(180.9));
    }

    #[test]
    fn test_parse_quick_export_later_row_wins() {
        let csv = "\
Date,Weight (lbs),Steps
2024-03-01,180.2,9000
garbage,1,1
2024-03-01,179.8,9500
";
        let parsed = parse_export(&workbook(Some(csv), None)).unwrap();
        assert_eq!(parsed.summaries.len(), 1);
        assert_eq!(parsed.skipped_summary_rows, 1);
        let rec = &parsed.summaries[&date(2024, 3, 1)];
        assert_eq!(rec.weight, Some(179.8));
        assert_eq!(rec.steps, Some(9500.0));
    }

    #[test]
    fn test_parse_quick_export_serial_dates() {
        let sheet = Sheet {
            name: SUMMARY_SHEET.to_string(),
            rows: vec![
                header(&["Date", "Weight (kg)"]),
                vec![Cell::Number(45352.0), Cell::Number(81.7)],
                vec![Cell::Number(45353.0), Cell::Text("n/a".to_string())],
            ],
        };
        let parsed = parse_export(&Workbook { sheets: vec![sheet] }).unwrap();
        assert_eq!(parsed.summaries[&date(2024, 3, 1)].weight, Some(81.7));
        assert_eq!(parsed.summaries[&date(2024, 3, 2)].weight, None);
    }

    #[test]
    fn test_parse_food_log_groups_and_drops_blank_names() {
        let parsed = parse_export(&workbook(None, Some(SAMPLE_FOOD_LOG))).unwrap();
        assert!(parsed.summaries.is_empty());
        assert_eq!(parsed.skipped_food_rows, 1);

        let entries = &parsed.food_log[&date(2024, 3, 2)];
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, "Oatmeal");
        assert_eq!(entries[0].serving_size, "1 cup");
        assert!((entries[1].serving_qty - 2.0).abs() < f64::EPSILON);
        assert!((entries[1].calories - 380.0).abs() < f64::EPSILON);
        assert_eq!(entries[2].name, "Chicken Breast");
    }

    #[test]
    fn test_parse_food_log_defaults() {
        let parsed = parse_export(&workbook(None, Some(SAMPLE_FOOD_LOG))).unwrap();
        let chicken = &parsed.food_log[&date(2024, 3, 2)][2];
        assert_eq!(chicken.serving_size, "serving");
        assert!((chicken.serving_qty - 1.0).abs() < f64::EPSILON);
        assert!((chicken.serving_weight_g - 100.0).abs() < f64::EPSILON);
        assert!((chicken.protein - 31.0).abs() < f64::EPSILON);

        let csv = "\
Date,Food Name,Serving Qty,Serving Weight (g),Calories (kcal)
2024-03-03,Water,0,-5,abc
";
        let parsed = parse_export(&workbook(None, Some(csv))).unwrap();
        let water = &parsed.food_log[&date(2024, 3, 3)][0];
        assert!((water.serving_qty - 1.0).abs() < f64::EPSILON);
        assert!((water.serving_weight_g - 100.0).abs() < f64::EPSILON);
        assert!(water.calories.abs() < f64::EPSILON);
        assert!(water.fat.abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_food_log_skips_bad_dates() {
        let csv = "\
Date,Food Name,Calories (kcal)
,Toast,80
yesterday,Toast,80
2024-03-04,Toast,80
";
        let parsed = parse_export(&workbook(None, Some(csv))).unwrap();
        assert_eq!(parsed.skipped_food_rows, 2);
        assert_eq!(parsed.food_entry_count(), 1);
        assert!(parsed.food_log.contains_key(&date(2024, 3, 4)));
    }

    #[test]
    fn test_parse_missing_sheets_is_empty() {
        let parsed = parse_export(&Workbook::default()).unwrap();
        assert!(parsed.is_empty());
        assert!(parsed.dates().is_empty());
    }

    #[test]
    fn test_parse_header_only_sheet() {
        let parsed = parse_export(&workbook(Some("Date,Weight (lbs)\n"), Some("Date\n"))).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_dates_is_sorted_union() {
        let parsed =
            parse_export(&workbook(Some(SAMPLE_QUICK_EXPORT), Some(SAMPLE_FOOD_LOG))).unwrap();
        let dates: Vec<_> = parsed.dates().into_iter().collect();
        assert_eq!(dates, vec![date(2024, 3, 1), date(2024, 3, 2)]);
    }
}
