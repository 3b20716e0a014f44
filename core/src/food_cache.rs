use std::collections::HashMap;

use anyhow::Result;

use crate::db::Database;
use crate::models::{CustomFood, FoodLogEntry, GRAM_UNIT, NewCustomFood};

/// Identity of a custom food: lowercase-trimmed name plus exact serving grams.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FoodKey {
    pub name: String,
    serving_g_bits: u64,
}

impl FoodKey {
    #[must_use]
    pub fn new(name: &str, serving_g: f64) -> Self {
        FoodKey {
            name: name.trim().to_lowercase(),
            serving_g_bits: serving_g.to_bits(),
        }
    }

    #[must_use]
    pub fn serving_g(&self) -> f64 {
        f64::from_bits(self.serving_g_bits)
    }
}

/// Resolves food log rows to custom foods for one import run.
///
/// Storage is checked before anything is created, so repeated imports of the
/// same food converge on a single record.
#[derive(Debug, Default)]
pub struct CustomFoodCache {
    foods: HashMap<FoodKey, CustomFood>,
    created: usize,
    reused: usize,
}

impl CustomFoodCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when the entry has no name.
    pub fn resolve(&mut self, db: &Database, entry: &FoodLogEntry) -> Result<Option<CustomFood>> {
        let name = entry.name.trim();
        if name.is_empty() {
            return Ok(None);
        }

        let key = FoodKey::new(name, entry.serving_weight_g);
        if let Some(food) = self.foods.get(&key) {
            self.reused += 1;
            return Ok(Some(food.clone()));
        }

        let food = if let Some(existing) = db.find_custom_food(&key.name, key.serving_g())? {
            tracing::debug!(food_id = existing.id, name = %existing.name, serving_g = key.serving_g(), "reusing stored custom food");
            self.reused += 1;
            existing
        } else {
            let per_serving = entry.per_serving();
            let created = db.insert_custom_food(&NewCustomFood {
                name: name.to_string(),
                serving_size: key.serving_g(),
                serving_unit: GRAM_UNIT.to_string(),
                calories: per_serving.calories,
                protein: per_serving.protein,
                fat: per_serving.fat,
                carbs: per_serving.carbs,
            })?;
            tracing::debug!(food_id = created.id, name = %created.name, serving_g = key.serving_g(), "created custom food");
            self.created += 1;
            created
        };

        self.foods.insert(key, food.clone());
        Ok(Some(food))
    }

    /// Foods inserted during this run.
    #[must_use]
    pub fn created(&self) -> usize {
        self.created
    }

    /// Resolutions served by an already known food.
    #[must_use]
    pub fn reused(&self) -> usize {
        self.reused
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn entry(name: &str, weight_g: f64, qty: f64, calories: f64) -> FoodLogEntry {
        FoodLogEntry {
            date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            name: name.to_string(),
            serving_size: "serving".to_string(),
            serving_qty: qty,
            serving_weight_g: weight_g,
            calories,
            fat: 3.0 * qty,
            carbs: 33.0 * qty,
            protein: 7.0 * qty,
        }
    }

    #[test]
    fn test_food_key_normalizes_name() {
        assert_eq!(FoodKey::new("  Oatmeal ", 50.0), FoodKey::new("oatmeal", 50.0));
        assert_ne!(FoodKey::new("Oatmeal", 50.0), FoodKey::new("Oatmeal", 50.5));
        assert!((FoodKey::new("x", 12.5).serving_g() - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_resolve_creates_once_per_key() {
        let db = Database::open_in_memory().unwrap();
        let mut cache = CustomFoodCache::new();

        let first = cache
            .resolve(&db, &entry("Oatmeal", 50.0, 1.0, 190.0))
            .unwrap()
            .unwrap();
        let second = cache
            .resolve(&db, &entry("oatmeal ", 50.0, 2.0, 380.0))
            .unwrap()
            .unwrap();

        assert_eq!(first.id, second.id);
        assert!((first.calories - 190.0).abs() < f64::EPSILON);
        assert!((first.protein - 7.0).abs() < f64::EPSILON);
        assert!((first.serving_size - 50.0).abs() < f64::EPSILON);
        assert_eq!(first.serving_unit, "g");
        assert_eq!(cache.created(), 1);
        assert_eq!(cache.reused(), 1);
        assert_eq!(db.count_custom_foods().unwrap(), 1);
    }

    #[test]
    fn test_resolve_per_serving_divides_totals() {
        let db = Database::open_in_memory().unwrap();
        let mut cache = CustomFoodCache::new();
        let food = cache
            .resolve(&db, &entry("Rice", 75.0, 2.0, 540.0))
            .unwrap()
            .unwrap();
        assert!((food.calories - 270.0).abs() < f64::EPSILON);
        assert!((food.carbs - 33.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_resolve_different_weight_is_a_different_food() {
        let db = Database::open_in_memory().unwrap();
        let mut cache = CustomFoodCache::new();
        let a = cache
            .resolve(&db, &entry("Oatmeal", 50.0, 1.0, 190.0))
            .unwrap()
            .unwrap();
        let b = cache
            .resolve(&db, &entry("Oatmeal", 40.0, 1.0, 152.0))
            .unwrap()
            .unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(cache.created(), 2);
    }

    #[test]
    fn test_resolve_reuses_stored_food_across_runs() {
        let db = Database::open_in_memory().unwrap();
        let first_id = CustomFoodCache::new()
            .resolve(&db, &entry("Oatmeal", 50.0, 1.0, 190.0))
            .unwrap()
            .unwrap()
            .id;

        let mut second_run = CustomFoodCache::new();
        let again = second_run
            .resolve(&db, &entry("OATMEAL", 50.0, 1.0, 190.0))
            .unwrap()
            .unwrap();
        assert_eq!(again.id, first_id);
        assert_eq!(second_run.created(), 0);
        assert_eq!(second_run.reused(), 1);
        assert_eq!(db.count_custom_foods().unwrap(), 1);
    }

    #[test]
    fn test_resolve_blank_name() {
        let db = Database::open_in_memory().unwrap();
        let mut cache = CustomFoodCache::new();
        assert!(cache.resolve(&db, &entry("   ", 50.0, 1.0, 1.0)).unwrap().is_none());
        assert_eq!(cache.created() + cache.reused(), 0);
        assert_eq!(db.count_custom_foods().unwrap(), 0);
    }
}
