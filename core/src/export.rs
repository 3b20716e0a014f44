use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::models::DailyLog;

#[derive(Debug, Serialize)]
struct ExportRow {
    date: String,
    day_number: i64,
    weight: Option<f64>,
    calories: f64,
    protein: Option<f64>,
    fat: Option<f64>,
    carbs: Option<f64>,
    steps: Option<i64>,
    food_entries: usize,
}

impl From<&DailyLog> for ExportRow {
    fn from(log: &DailyLog) -> Self {
        ExportRow {
            date: log.date.format("%Y-%m-%d").to_string(),
            day_number: log.day_number,
            weight: log.weight,
            calories: log.food_calories(),
            protein: log.protein,
            fat: log.fat,
            carbs: log.carbs,
            steps: log.steps,
            food_entries: log.foods.len(),
        }
    }
}

/// Write `logs` as CSV with a header row. Returns the number of data rows.
pub fn write_logs_csv<W: Write>(logs: &[DailyLog], writer: W) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    for log in logs {
        wtr.serialize(ExportRow::from(log))
            .with_context(|| format!("Failed to write log for {}", log.date))?;
    }
    if logs.is_empty() {
        wtr.write_record([
            "date",
            "day_number",
            "weight",
            "calories",
            "protein",
            "fat",
            "carbs",
            "steps",
            "food_entries",
        ])?;
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(logs.len())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::FoodEntrySnapshot;

    fn log(date: &str, foods: Vec<FoodEntrySnapshot>) -> DailyLog {
        DailyLog {
            id: 1,
            profile_id: 1,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            day_number: 4,
            weight: Some(180.2),
            fat_percent: None,
            workout: None,
            protein: Some(150.0),
            fat: None,
            carbs: Some(210.0),
            foods,
            sleep_time: None,
            sleep_score: None,
            strava: None,
            steps: Some(9321),
            photo_mime_type: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn food(calories: f64) -> FoodEntrySnapshot {
        FoodEntrySnapshot {
            id: "x".to_string(),
            custom_food_id: None,
            name: "Toast".to_string(),
            brand: None,
            amount: 1.0,
            unit: "serving".to_string(),
            custom_food: None,
            calories,
            protein: 0.0,
            fat: 0.0,
            carbs: 0.0,
        }
    }

    #[test]
    fn test_write_logs_csv() {
        let logs = vec![log("2024-03-04", vec![food(80.0), food(120.5)])];
        let mut out = Vec::new();
        assert_eq!(write_logs_csv(&logs, &mut out).unwrap(), 1);

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("date,day_number,weight,calories,protein,fat,carbs,steps,food_entries")
        );
        assert_eq!(lines.next(), Some("2024-03-04,4,180.2,200.5,150.0,,210.0,9321,2"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_write_empty_logs_still_has_header() {
        let mut out = Vec::new();
        assert_eq!(write_logs_csv(&[], &mut out).unwrap(), 0);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text.trim_end(),
            "date,day_number,weight,calories,protein,fat,carbs,steps,food_entries"
        );
    }
}
