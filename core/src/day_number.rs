use chrono::NaiveDate;

use crate::models::{DEFAULT_TOTAL_DAYS, ProgramSettings};

/// 1-based index of `date` within a program of `total_days` starting at
/// `start_date`, clamped to `[1, total_days]`.
#[must_use]
pub fn day_number(date: NaiveDate, start_date: NaiveDate, total_days: i64) -> i64 {
    let total_days = if total_days < 1 {
        DEFAULT_TOTAL_DAYS
    } else {
        total_days
    };
    let day = date.signed_duration_since(start_date).num_days() + 1;
    day.clamp(1, total_days)
}

/// Day number for a profile; day 1 when no settings have been saved.
#[must_use]
pub fn day_number_for(settings: Option<&ProgramSettings>, date: NaiveDate) -> i64 {
    settings.map_or(1, |s| day_number(date, s.start_date, s.total_days))
}

#[must_use]
pub fn total_days_for(settings: Option<&ProgramSettings>) -> i64 {
    settings
        .map(|s| s.total_days)
        .filter(|d| *d >= 1)
        .unwrap_or(DEFAULT_TOTAL_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_day_number_basic() {
        let start = date("2024-01-05");
        assert_eq!(day_number(date("2024-01-05"), start, 84), 1);
        assert_eq!(day_number(date("2024-01-06"), start, 84), 2);
        assert_eq!(day_number(date("2024-02-05"), start, 84), 32);
    }

    #[test]
    fn test_day_number_before_start_clamps_to_one() {
        assert_eq!(day_number(date("2024-01-01"), date("2024-01-05"), 84), 1);
    }

    #[test]
    fn test_day_number_after_end_clamps_to_total() {
        assert_eq!(day_number(date("2025-01-01"), date("2024-01-05"), 84), 84);
        assert_eq!(day_number(date("2024-01-14"), date("2024-01-05"), 10), 10);
        assert_eq!(day_number(date("2024-01-15"), date("2024-01-05"), 10), 10);
    }

    #[test]
    fn test_day_number_invalid_total_uses_default() {
        assert_eq!(day_number(date("2025-01-01"), date("2024-01-05"), 0), 84);
    }

    #[test]
    fn test_day_number_monotonic_and_bounded() {
        let start = date("2024-01-05");
        let mut prev = 0;
        let mut d = date("2023-12-01");
        while d < date("2024-06-01") {
            let n = day_number(d, start, 30);
            assert!((1..=30).contains(&n));
            assert!(n >= prev);
            prev = n;
            d = d.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_day_number_without_settings() {
        assert_eq!(day_number_for(None, date("2024-03-01")), 1);
        assert_eq!(total_days_for(None), 84);

        let settings = ProgramSettings {
            profile_id: 1,
            start_date: date("2024-03-01"),
            total_days: 90,
        };
        assert_eq!(day_number_for(Some(&settings), date("2024-03-03")), 3);
        assert_eq!(total_days_for(Some(&settings)), 90);
    }
}
