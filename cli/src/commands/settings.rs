use anyhow::Result;
use chrono::Local;

use fitlog_core::day_number::{day_number_for, total_days_for};
use fitlog_core::db::Database;

use super::helpers::parse_date;

pub(crate) fn cmd_settings_show(db: &Database, profile_id: i64, json: bool) -> Result<()> {
    db.ensure_profile(profile_id)?;
    let settings = db.get_settings(profile_id)?;
    let today = Local::now().date_naive();
    let day_today = day_number_for(settings.as_ref(), today);
    let total_days = total_days_for(settings.as_ref());

    if json {
        println!(
            "{}",
            serde_json::json!({
                "settings": settings,
                "total_days": total_days,
                "day_number_today": day_today,
            })
        );
        return Ok(());
    }

    match settings {
        Some(s) => {
            println!("Start date: {}", s.start_date.format("%Y-%m-%d"));
            println!("Total days: {}", s.total_days);
            println!("Today is day {day_today} of {total_days}.");
        }
        None => {
            println!("No program settings. Every date counts as day 1 of {total_days}.");
            println!("Use `fitlog settings set --start-date YYYY-MM-DD` to set a start date.");
        }
    }

    Ok(())
}

pub(crate) fn cmd_settings_set(
    db: &Database,
    profile_id: i64,
    start_date: &str,
    total_days: i64,
    json: bool,
) -> Result<()> {
    db.ensure_profile(profile_id)?;
    let start = parse_date(Some(start_date.to_string()))?;
    let settings = db.save_settings(profile_id, start, total_days)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    } else {
        println!(
            "Program starts {} and runs {} days",
            settings.start_date.format("%Y-%m-%d"),
            settings.total_days
        );
    }

    Ok(())
}
