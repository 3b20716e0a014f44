use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use fitlog_core::models::{CustomFood, DailyLog};

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Like [`parse_date`], but an absent value stays absent.
pub(crate) fn parse_optional_date(date_str: Option<String>) -> Result<Option<NaiveDate>> {
    date_str.map(|s| parse_date(Some(s))).transpose()
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

/// Format an optional value with `decimals` places, or "-" when missing.
pub(crate) fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    v.map_or_else(|| "-".to_string(), |v| format!("{:.decimals$}", no_neg_zero(v)))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

pub(crate) fn print_log_table(logs: &[DailyLog]) {
    #[derive(Tabled)]
    struct LogRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Day")]
        day: i64,
        #[tabled(rename = "Weight")]
        weight: String,
        #[tabled(rename = "Calories")]
        calories: String,
        #[tabled(rename = "Protein")]
        protein: String,
        #[tabled(rename = "Fat")]
        fat: String,
        #[tabled(rename = "Carbs")]
        carbs: String,
        #[tabled(rename = "Steps")]
        steps: String,
        #[tabled(rename = "Foods")]
        foods: usize,
    }

    let rows: Vec<LogRow> = logs
        .iter()
        .map(|l| LogRow {
            date: l.date.format("%Y-%m-%d").to_string(),
            day: l.day_number,
            weight: fmt_opt(l.weight, 1),
            calories: if l.foods.is_empty() {
                "-".to_string()
            } else {
                format!("{:.0}", no_neg_zero(l.food_calories()))
            },
            protein: fmt_opt(l.protein, 0),
            fat: fmt_opt(l.fat, 0),
            carbs: fmt_opt(l.carbs, 0),
            steps: l.steps.map_or("-".into(), |s| s.to_string()),
            foods: l.foods.len(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..9)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_food_table(foods: &[CustomFood]) {
    #[derive(Tabled)]
    struct FoodRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Serving")]
        serving: String,
        #[tabled(rename = "Cal")]
        calories: String,
        #[tabled(rename = "P")]
        protein: String,
        #[tabled(rename = "C")]
        carbs: String,
        #[tabled(rename = "F")]
        fat: String,
    }

    let rows: Vec<FoodRow> = foods
        .iter()
        .map(|f| FoodRow {
            id: f.id,
            name: truncate(&f.name, 35),
            serving: format!("{}{}", f.serving_size, f.serving_unit),
            calories: format!("{:.0}", no_neg_zero(f.calories)),
            protein: format!("{:.1}", no_neg_zero(f.protein)),
            carbs: format!("{:.1}", no_neg_zero(f.carbs)),
            fat: format!("{:.1}", no_neg_zero(f.fat)),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..7)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}
