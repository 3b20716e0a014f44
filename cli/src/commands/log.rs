use anyhow::{Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use fitlog_core::day_number::{day_number_for, total_days_for};
use fitlog_core::db::{Database, LogDetails};
use fitlog_core::models::DailyLog;

use super::helpers::{
    fmt_opt, no_neg_zero, parse_date, parse_optional_date, print_log_table, truncate,
};

pub(crate) fn cmd_log_show(
    db: &Database,
    profile_id: i64,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    db.ensure_profile(profile_id)?;
    let date = parse_date(date)?;

    let Some(log) = db.get_daily_log(profile_id, date)? else {
        let settings = db.get_settings(profile_id)?;
        let day_number = day_number_for(settings.as_ref(), date);
        let total_days = total_days_for(settings.as_ref());
        if json {
            println!(
                "{}",
                serde_json::json!({
                    "date": date,
                    "day_number": day_number,
                    "total_days": total_days,
                    "log": null,
                })
            );
        } else {
            println!("No log for {date}. Day {day_number} of {total_days}.");
        }
        return Ok(());
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "calories": log.food_calories(),
                "log": log,
            }))?
        );
    } else {
        print_log_detail(&log);
    }

    Ok(())
}

fn print_log_detail(log: &DailyLog) {
    println!("{} (day {})", log.date.format("%Y-%m-%d"), log.day_number);
    println!("  Weight:   {}", fmt_opt(log.weight, 1));
    println!(
        "  Macros:   P {} / F {} / C {}",
        fmt_opt(log.protein, 0),
        fmt_opt(log.fat, 0),
        fmt_opt(log.carbs, 0)
    );
    println!("  Calories: {:.0}", no_neg_zero(log.food_calories()));
    println!(
        "  Steps:    {}",
        log.steps.map_or("-".into(), |s| s.to_string())
    );
    if let Some(ref w) = log.workout {
        println!("  Workout:  {w}");
    }
    if let Some(bf) = log.fat_percent {
        println!("  Body fat: {bf:.1}%");
    }
    if log.sleep_time.is_some() || log.sleep_score.is_some() {
        println!(
            "  Sleep:    {} (score {})",
            log.sleep_time.as_deref().unwrap_or("-"),
            log.sleep_score.map_or("-".into(), |s| s.to_string())
        );
    }
    if let Some(ref s) = log.strava {
        println!("  Strava:   {s}");
    }

    if log.foods.is_empty() {
        println!("\nNo food entries.");
        return;
    }

    #[derive(Tabled)]
    struct FoodEntryRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "Food")]
        name: String,
        #[tabled(rename = "Amount")]
        amount: String,
        #[tabled(rename = "Cal")]
        calories: String,
        #[tabled(rename = "P")]
        protein: String,
        #[tabled(rename = "C")]
        carbs: String,
        #[tabled(rename = "F")]
        fat: String,
    }

    let rows: Vec<FoodEntryRow> = log
        .foods
        .iter()
        .enumerate()
        .map(|(i, f)| FoodEntryRow {
            idx: i + 1,
            name: truncate(&f.name, 35),
            amount: format!("{} {}", f.amount, f.unit),
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
    println!("\n{table}");
}

pub(crate) fn cmd_log_list(
    db: &Database,
    profile_id: i64,
    from: Option<String>,
    to: Option<String>,
    limit: i64,
    json: bool,
) -> Result<()> {
    db.ensure_profile(profile_id)?;
    if limit < 1 {
        bail!("Limit must be at least 1");
    }

    let from = parse_optional_date(from)?;
    let to = parse_optional_date(to)?;
    let logs = if from.is_some() || to.is_some() {
        if let (Some(f), Some(t)) = (from, to) {
            if f > t {
                bail!("--from {f} is after --to {t}");
            }
        }
        db.get_daily_logs_in_range(profile_id, from, to)?
    } else {
        db.list_daily_logs(profile_id, limit)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&logs)?);
    } else if logs.is_empty() {
        eprintln!("No daily logs found. Use `fitlog import` to load an export.");
    } else {
        print_log_table(&logs);
    }

    Ok(())
}

pub(crate) fn cmd_log_note(
    db: &Database,
    profile_id: i64,
    date: Option<String>,
    details: &LogDetails,
    json: bool,
) -> Result<()> {
    db.ensure_profile(profile_id)?;
    if details.fat_percent.is_none()
        && details.workout.is_none()
        && details.sleep_time.is_none()
        && details.sleep_score.is_none()
        && details.strava.is_none()
    {
        bail!("Nothing to set. Pass at least one of --workout, --fat-percent, --sleep-time, --sleep-score, --strava");
    }
    if details.fat_percent.is_some_and(|bf| !(0.0..=100.0).contains(&bf)) {
        bail!("Body fat must be between 0 and 100");
    }

    let date = parse_date(date)?;
    let settings = db.get_settings(profile_id)?;
    let day_number = day_number_for(settings.as_ref(), date);
    let log = db.set_log_details(profile_id, date, day_number, details)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&log)?);
    } else {
        println!("Updated log for {} (day {})", log.date.format("%Y-%m-%d"), log.day_number);
    }

    Ok(())
}
