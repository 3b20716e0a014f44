use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Program length used when a profile has no settings row.
pub const DEFAULT_TOTAL_DAYS: i64 = 84;

/// Source tag stored on foods created by import or by hand.
pub const CUSTOM_FOOD_SOURCE: &str = "custom";

pub const GRAM_UNIT: &str = "g";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub username: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramSettings {
    pub profile_id: i64,
    pub start_date: NaiveDate,
    pub total_days: i64,
}

/// A per-serving nutrition record reused across log entries and import runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFood {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub name: String,
    pub serving_size: f64,
    pub serving_unit: String,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub source: String,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewCustomFood {
    pub name: String,
    pub serving_size: f64,
    pub serving_unit: String,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
}

/// Per-serving values carried inside a food entry so the frontend can rescale it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServingMacros {
    pub serving_size: f64,
    pub serving_unit: String,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
}

/// One food line stored inside a daily log. Totals are frozen when written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodEntrySnapshot {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_food_id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    pub amount: f64,
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_food: Option<ServingMacros>,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyLog {
    pub id: i64,
    pub profile_id: i64,
    pub date: NaiveDate,
    pub day_number: i64,
    pub weight: Option<f64>,
    pub fat_percent: Option<f64>,
    pub workout: Option<String>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub carbs: Option<f64>,
    pub foods: Vec<FoodEntrySnapshot>,
    pub sleep_time: Option<String>,
    pub sleep_score: Option<i64>,
    pub strava: Option<String>,
    pub steps: Option<i64>,
    pub photo_mime_type: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl DailyLog {
    /// Calories for the day, summed from the stored food entries.
    #[must_use]
    pub fn food_calories(&self) -> f64 {
        self.foods.iter().map(|f| f.calories).sum()
    }
}

/// Summary-sheet values an import writes to a daily log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayMetrics {
    pub weight: Option<f64>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub carbs: Option<f64>,
    pub steps: Option<i64>,
}

impl From<&DailySummaryRecord> for DayMetrics {
    fn from(record: &DailySummaryRecord) -> Self {
        DayMetrics {
            weight: record.effective_weight(),
            protein: record.protein,
            fat: record.fat,
            carbs: record.carbs,
            steps: record.steps.map(|s| s.round() as i64),
        }
    }
}

/// The fields an import writes to a daily log. `None` leaves the stored
/// values of that group as they are.
#[derive(Debug, Clone)]
pub struct DailyLogUpsert {
    pub date: NaiveDate,
    pub day_number: i64,
    pub metrics: Option<DayMetrics>,
    pub foods: Option<Vec<FoodEntrySnapshot>>,
}

/// One row of the summary sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailySummaryRecord {
    pub date: NaiveDate,
    pub trend_weight: Option<f64>,
    pub weight: Option<f64>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub carbs: Option<f64>,
    pub steps: Option<f64>,
}

impl DailySummaryRecord {
    /// Logged scale weight, falling back to the trend weight.
    #[must_use]
    pub fn effective_weight(&self) -> Option<f64> {
        self.weight.or(self.trend_weight)
    }
}

/// One row of the food log sheet. Macro values are totals for the row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodLogEntry {
    pub date: NaiveDate,
    pub name: String,
    pub serving_size: String,
    pub serving_qty: f64,
    pub serving_weight_g: f64,
    pub calories: f64,
    pub fat: f64,
    pub carbs: f64,
    pub protein: f64,
}

impl FoodLogEntry {
    #[must_use]
    pub fn per_serving(&self) -> ServingMacros {
        let qty = self.serving_qty;
        ServingMacros {
            serving_size: self.serving_weight_g,
            serving_unit: GRAM_UNIT.to_string(),
            calories: self.calories / qty,
            protein: self.protein / qty,
            fat: self.fat / qty,
            carbs: self.carbs / qty,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub dry_run: bool,
    pub dates_processed: usize,
    pub logs_created: usize,
    pub logs_updated: usize,
    pub foods_created: usize,
    pub foods_reused: usize,
    pub entries_imported: usize,
}

pub fn normalize_username(raw: &str) -> Result<String> {
    let name = raw.trim().to_lowercase();
    if name.is_empty() {
        bail!("Username cannot be empty");
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(qty: f64) -> FoodLogEntry {
        FoodLogEntry {
            date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            name: "Oatmeal".to_string(),
            serving_size: "serving".to_string(),
            serving_qty: qty,
            serving_weight_g: 50.0,
            calories: 380.0,
            fat: 6.0,
            carbs: 66.0,
            protein: 14.0,
        }
    }

    #[test]
    fn test_per_serving_divides_by_quantity() {
        let per = entry(2.0).per_serving();
        assert!((per.calories - 190.0).abs() < f64::EPSILON);
        assert!((per.protein - 7.0).abs() < f64::EPSILON);
        assert!((per.fat - 3.0).abs() < f64::EPSILON);
        assert!((per.carbs - 33.0).abs() < f64::EPSILON);
        assert!((per.serving_size - 50.0).abs() < f64::EPSILON);
        assert_eq!(per.serving_unit, "g");
    }

    #[test]
    fn test_effective_weight_prefers_scale_weight() {
        let mut rec = DailySummaryRecord {
            weight: Some(180.2),
            trend_weight: Some(181.0),
            ..Default::default()
        };
        assert_eq!(rec.effective_weight(), Some(180.2));
        rec.weight = None;
        assert_eq!(rec.effective_weight(), Some(181.0));
        rec.trend_weight = None;
        assert_eq!(rec.effective_weight(), None);
    }

    #[test]
    fn test_day_metrics_from_summary() {
        let rec = DailySummaryRecord {
            trend_weight: Some(181.0),
            protein: Some(150.0),
            steps: Some(9321.4),
            ..Default::default()
        };
        let metrics = DayMetrics::from(&rec);
        assert_eq!(metrics.weight, Some(181.0));
        assert_eq!(metrics.protein, Some(150.0));
        assert_eq!(metrics.fat, None);
        assert_eq!(metrics.steps, Some(9321));
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snap = FoodEntrySnapshot {
            id: "custom-1-2024-03-02-0".to_string(),
            custom_food_id: Some(1),
            name: "Oatmeal".to_string(),
            brand: None,
            amount: 1.0,
            unit: "serving".to_string(),
            custom_food: Some(entry(1.0).per_serving()),
            calories: 190.0,
            protein: 7.0,
            fat: 3.0,
            carbs: 33.0,
        };
        let value = serde_json::to_value(&snap).unwrap();
        assert_eq!(value["customFoodId"], 1);
        assert_eq!(value["customFood"]["serving_unit"], "g");
        assert!(value["brand"].is_null());

        let back: FoodEntrySnapshot = serde_json::from_value(value).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username("  Alice ").unwrap(), "alice");
        assert!(normalize_username("   ").is_err());
    }
}
