use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use uuid::Uuid;

use crate::models::{
    CUSTOM_FOOD_SOURCE, CustomFood, DailyLog, DailyLogUpsert, FoodEntrySnapshot, GRAM_UNIT,
    NewCustomFood, Profile, ProgramSettings,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

const DAILY_LOG_COLUMNS: &str = "id, profile_id, date, day_number, weight, fat_percent, workout, protein, fat, carbs, foods,
     sleep_time, sleep_score, strava, steps, photo_mime_type, created_at, updated_at";

/// Fields of a daily log that are entered by hand and never written by import.
#[derive(Debug, Clone, Default)]
pub struct LogDetails {
    pub fat_percent: Option<f64>,
    pub workout: Option<String>,
    pub sleep_time: Option<String>,
    pub sleep_score: Option<i64>,
    pub strava: Option<String>,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            let now = Local::now().to_rfc3339();
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS profiles (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    username TEXT NOT NULL UNIQUE,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS app_settings (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    profile_id INTEGER NOT NULL REFERENCES profiles(id),
                    start_date TEXT NOT NULL,
                    total_days INTEGER NOT NULL CHECK (total_days >= 1),
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS foods (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    source TEXT NOT NULL,
                    name TEXT NOT NULL,
                    serving_size REAL NOT NULL,
                    serving_unit TEXT NOT NULL,
                    calories REAL NOT NULL,
                    protein REAL NOT NULL,
                    fat REAL NOT NULL,
                    carbs REAL NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS daily_logs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    profile_id INTEGER NOT NULL REFERENCES profiles(id),
                    date TEXT NOT NULL,
                    day_number INTEGER NOT NULL,
                    weight REAL,
                    fat_percent REAL,
                    workout TEXT,
                    protein REAL,
                    fat REAL,
                    carbs REAL,
                    foods TEXT NOT NULL DEFAULT '[]',
                    sleep_time TEXT,
                    sleep_score INTEGER,
                    strava TEXT,
                    steps INTEGER,
                    photo BLOB,
                    photo_mime_type TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    UNIQUE (profile_id, date)
                );

                CREATE INDEX IF NOT EXISTS idx_app_settings_profile ON app_settings(profile_id);
                CREATE INDEX IF NOT EXISTS idx_foods_serving ON foods(source, serving_unit, serving_size);
                CREATE INDEX IF NOT EXISTS idx_daily_logs_profile_date ON daily_logs(profile_id, date);",
            )?;
            self.conn.execute(
                "INSERT OR IGNORE INTO profiles (id, username, created_at) VALUES (1, 'default', ?1)",
                params![now],
            )?;
            self.conn.execute_batch("PRAGMA user_version = 1;")?;
        }

        Ok(())
    }

    /// Run `f` in one transaction, committing only if it succeeds.
    pub fn with_transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let out = f(self)?;
        tx.commit().context("Failed to commit transaction")?;
        Ok(out)
    }

    /// Run `f` in one transaction that is always rolled back.
    pub fn with_rollback<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let out = f(self);
        tx.rollback().context("Failed to roll back transaction")?;
        out
    }

    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    // --- Profiles ---

    fn profile_from_row(row: &rusqlite::Row) -> rusqlite::Result<Profile> {
        Ok(Profile {
            id: row.get(0)?,
            username: row.get(1)?,
            created_at: row.get(2)?,
        })
    }

    pub fn create_profile(&self, username: &str) -> Result<Profile> {
        let username = crate::models::normalize_username(username)?;
        let now = Local::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT INTO profiles (username, created_at) VALUES (?1, ?2)",
            params![username, now],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                bail!("Username '{username}' already exists");
            }
            Err(e) => return Err(e.into()),
        }
        let id = self.conn.last_insert_rowid();
        self.get_profile(id)?.context("Profile not found after insert")
    }

    pub fn get_profile(&self, id: i64) -> Result<Option<Profile>> {
        let profile = self
            .conn
            .query_row(
                "SELECT id, username, created_at FROM profiles WHERE id = ?1",
                params![id],
                Self::profile_from_row,
            )
            .optional()?;
        Ok(profile)
    }

    pub fn list_profiles(&self) -> Result<Vec<Profile>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, username, created_at FROM profiles ORDER BY username")?;
        let profiles = stmt
            .query_map([], Self::profile_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(profiles)
    }

    pub fn ensure_profile(&self, id: i64) -> Result<Profile> {
        if id < 1 {
            bail!("Invalid profile id {id}");
        }
        self.get_profile(id)?
            .with_context(|| format!("Profile {id} not found"))
    }

    // --- Program settings ---

    pub fn get_settings(&self, profile_id: i64) -> Result<Option<ProgramSettings>> {
        let row: Option<(String, i64)> = self
            .conn
            .query_row(
                "SELECT start_date, total_days FROM app_settings
                 WHERE profile_id = ?1 ORDER BY id DESC LIMIT 1",
                params![profile_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((start_date, total_days)) = row else {
            return Ok(None);
        };
        let start_date = NaiveDate::parse_from_str(&start_date, DATE_FORMAT)
            .with_context(|| format!("Invalid start date in settings: '{start_date}'"))?;
        Ok(Some(ProgramSettings {
            profile_id,
            start_date,
            total_days,
        }))
    }

    pub fn save_settings(
        &self,
        profile_id: i64,
        start_date: NaiveDate,
        total_days: i64,
    ) -> Result<ProgramSettings> {
        if total_days < 1 {
            bail!("Total days must be at least 1");
        }
        let now = Local::now().to_rfc3339();
        let start = start_date.format(DATE_FORMAT).to_string();
        let latest: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM app_settings WHERE profile_id = ?1 ORDER BY id DESC LIMIT 1",
                params![profile_id],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = latest {
            self.conn.execute(
                "UPDATE app_settings SET start_date = ?1, total_days = ?2, updated_at = ?3 WHERE id = ?4",
                params![start, total_days, now, id],
            )?;
        } else {
            self.conn.execute(
                "INSERT INTO app_settings (profile_id, start_date, total_days, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![profile_id, start, total_days, now],
            )?;
        }

        self.get_settings(profile_id)?
            .context("Settings not found after save")
    }

    // --- Custom foods ---

    fn custom_food_from_row(row: &rusqlite::Row) -> rusqlite::Result<CustomFood> {
        Ok(CustomFood {
            id: row.get(0)?,
            uuid: row.get(1)?,
            source: row.get(2)?,
            name: row.get(3)?,
            serving_size: row.get(4)?,
            serving_unit: row.get(5)?,
            calories: row.get(6)?,
            protein: row.get(7)?,
            fat: row.get(8)?,
            carbs: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    pub fn insert_custom_food(&self, food: &NewCustomFood) -> Result<CustomFood> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO foods (uuid, source, name, serving_size, serving_unit, calories, protein, fat, carbs, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                uuid,
                CUSTOM_FOOD_SOURCE,
                food.name,
                food.serving_size,
                food.serving_unit,
                food.calories,
                food.protein,
                food.fat,
                food.carbs,
                now,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_custom_food(id)
    }

    pub fn get_custom_food(&self, id: i64) -> Result<CustomFood> {
        self.conn
            .query_row(
                "SELECT id, uuid, source, name, serving_size, serving_unit, calories, protein, fat, carbs, created_at, updated_at
                 FROM foods WHERE id = ?1",
                params![id],
                Self::custom_food_from_row,
            )
            .context("Food not found")
    }

    /// Oldest gram-based custom food whose lowercase-trimmed name equals
    /// `name_key` and whose serving weight is exactly `serving_g`.
    pub fn find_custom_food(&self, name_key: &str, serving_g: f64) -> Result<Option<CustomFood>> {
        // Name comparison happens here rather than in SQL: SQLite's LOWER() only folds ASCII.
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, source, name, serving_size, serving_unit, calories, protein, fat, carbs, created_at, updated_at
             FROM foods
             WHERE source = ?1 AND serving_unit = ?2 AND serving_size = ?3
             ORDER BY id",
        )?;
        let candidates = stmt
            .query_map(
                params![CUSTOM_FOOD_SOURCE, GRAM_UNIT, serving_g],
                Self::custom_food_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(candidates
            .into_iter()
            .find(|f| f.name.trim().to_lowercase() == name_key))
    }

    pub fn list_custom_foods(&self, search: Option<&str>) -> Result<Vec<CustomFood>> {
        let pattern = search.map(|q| {
            let escaped = q
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("%{escaped}%")
        });
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, source, name, serving_size, serving_unit, calories, protein, fat, carbs, created_at, updated_at
             FROM foods
             WHERE ?1 IS NULL OR name LIKE ?1 ESCAPE '\\'
             ORDER BY name, serving_size",
        )?;
        let foods = stmt
            .query_map(params![pattern], Self::custom_food_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(foods)
    }

    pub fn count_custom_foods(&self) -> Result<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM foods", [], |row| row.get(0))?;
        Ok(n)
    }

    // --- Daily logs ---

    fn daily_log_from_row(row: &rusqlite::Row) -> rusqlite::Result<DailyLog> {
        let date_str: String = row.get(2)?;
        let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
        let foods_json: String = row.get(10)?;
        let foods: Vec<FoodEntrySnapshot> = serde_json::from_str(&foods_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e)))?;

        Ok(DailyLog {
            id: row.get(0)?,
            profile_id: row.get(1)?,
            date,
            day_number: row.get(3)?,
            weight: row.get(4)?,
            fat_percent: row.get(5)?,
            workout: row.get(6)?,
            protein: row.get(7)?,
            fat: row.get(8)?,
            carbs: row.get(9)?,
            foods,
            sleep_time: row.get(11)?,
            sleep_score: row.get(12)?,
            strava: row.get(13)?,
            steps: row.get(14)?,
            photo_mime_type: row.get(15)?,
            created_at: row.get(16)?,
            updated_at: row.get(17)?,
        })
    }

    pub fn get_daily_log(&self, profile_id: i64, date: NaiveDate) -> Result<Option<DailyLog>> {
        let date_str = date.format(DATE_FORMAT).to_string();
        let log = self
            .conn
            .query_row(
                &format!(
                    "SELECT {DAILY_LOG_COLUMNS} FROM daily_logs WHERE profile_id = ?1 AND date = ?2"
                ),
                params![profile_id, date_str],
                Self::daily_log_from_row,
            )
            .optional()
            .with_context(|| format!("Failed to load daily log for {date_str}"))?;
        Ok(log)
    }

    /// Most recent logs first.
    pub fn list_daily_logs(&self, profile_id: i64, limit: i64) -> Result<Vec<DailyLog>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DAILY_LOG_COLUMNS} FROM daily_logs WHERE profile_id = ?1 ORDER BY date DESC LIMIT ?2"
        ))?;
        let logs = stmt
            .query_map(params![profile_id, limit], Self::daily_log_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    /// Logs between `from` and `to` inclusive, oldest first. Open ends are unbounded.
    pub fn get_daily_logs_in_range(
        &self,
        profile_id: i64,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<DailyLog>> {
        let from = from.map(|d| d.format(DATE_FORMAT).to_string());
        let to = to.map(|d| d.format(DATE_FORMAT).to_string());
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DAILY_LOG_COLUMNS} FROM daily_logs
             WHERE profile_id = ?1
               AND (?2 IS NULL OR date >= ?2)
               AND (?3 IS NULL OR date <= ?3)
             ORDER BY date ASC"
        ))?;
        let logs = stmt
            .query_map(params![profile_id, from, to], Self::daily_log_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    /// Insert a new log; fields outside `entry` stay NULL.
    pub fn insert_daily_log(&self, profile_id: i64, entry: &DailyLogUpsert) -> Result<DailyLog> {
        let now = Local::now().to_rfc3339();
        let date_str = entry.date.format(DATE_FORMAT).to_string();
        let metrics = entry.metrics.clone().unwrap_or_default();
        let foods = serde_json::to_string(entry.foods.as_deref().unwrap_or_default())?;
        self.conn
            .execute(
                "INSERT INTO daily_logs (profile_id, date, day_number, weight, protein, fat, carbs, foods, steps, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    profile_id,
                    date_str,
                    entry.day_number,
                    metrics.weight,
                    metrics.protein,
                    metrics.fat,
                    metrics.carbs,
                    foods,
                    metrics.steps,
                    now,
                    now,
                ],
            )
            .with_context(|| format!("Failed to insert daily log for {date_str}"))?;
        self.get_daily_log(profile_id, entry.date)?
            .context("Daily log not found after insert")
    }

    /// Update the import-owned fields of an existing log. Metrics and foods are
    /// only written when present in `entry`. Returns false when no log exists.
    pub fn update_daily_log(&self, profile_id: i64, entry: &DailyLogUpsert) -> Result<bool> {
        let now = Local::now().to_rfc3339();
        let date_str = entry.date.format(DATE_FORMAT).to_string();
        let has_metrics = entry.metrics.is_some();
        let metrics = entry.metrics.clone().unwrap_or_default();
        let foods = entry
            .foods
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let rows = self
            .conn
            .execute(
                "UPDATE daily_logs
                 SET day_number = ?1,
                     weight = CASE WHEN ?2 THEN ?3 ELSE weight END,
                     protein = CASE WHEN ?2 THEN ?4 ELSE protein END,
                     fat = CASE WHEN ?2 THEN ?5 ELSE fat END,
                     carbs = CASE WHEN ?2 THEN ?6 ELSE carbs END,
                     steps = CASE WHEN ?2 THEN ?7 ELSE steps END,
                     foods = COALESCE(?8, foods),
                     updated_at = ?9
                 WHERE profile_id = ?10 AND date = ?11",
                params![
                    entry.day_number,
                    has_metrics,
                    metrics.weight,
                    metrics.protein,
                    metrics.fat,
                    metrics.carbs,
                    metrics.steps,
                    foods,
                    now,
                    profile_id,
                    date_str,
                ],
            )
            .with_context(|| format!("Failed to update daily log for {date_str}"))?;
        Ok(rows > 0)
    }

    /// Set the hand-entered fields of a log, creating the log if needed.
    pub fn set_log_details(
        &self,
        profile_id: i64,
        date: NaiveDate,
        day_number: i64,
        details: &LogDetails,
    ) -> Result<DailyLog> {
        let now = Local::now().to_rfc3339();
        let date_str = date.format(DATE_FORMAT).to_string();
        self.conn.execute(
            "INSERT INTO daily_logs (profile_id, date, day_number, fat_percent, workout, sleep_time, sleep_score, strava, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(profile_id, date) DO UPDATE SET
                fat_percent = COALESCE(excluded.fat_percent, fat_percent),
                workout = COALESCE(excluded.workout, workout),
                sleep_time = COALESCE(excluded.sleep_time, sleep_time),
                sleep_score = COALESCE(excluded.sleep_score, sleep_score),
                strava = COALESCE(excluded.strava, strava),
                updated_at = excluded.updated_at",
            params![
                profile_id,
                date_str,
                day_number,
                details.fat_percent,
                details.workout,
                details.sleep_time,
                details.sleep_score,
                details.strava,
                now,
                now,
            ],
        )?;
        self.get_daily_log(profile_id, date)?
            .context("Daily log not found after update")
    }

    pub fn count_daily_logs(&self, profile_id: i64) -> Result<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM daily_logs WHERE profile_id = ?1",
            params![profile_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}
