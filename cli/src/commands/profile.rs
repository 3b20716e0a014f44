use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use fitlog_core::db::Database;

pub(crate) fn cmd_profile_list(db: &Database, json: bool) -> Result<()> {
    let profiles = db.list_profiles()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profiles)?);
        return Ok(());
    }

    #[derive(Tabled)]
    struct ProfileRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Username")]
        username: String,
        #[tabled(rename = "Created")]
        created: String,
    }

    let rows: Vec<ProfileRow> = profiles
        .iter()
        .map(|p| ProfileRow {
            id: p.id,
            username: p.username.clone(),
            created: p.created_at.chars().take(10).collect(),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_profile_add(db: &Database, username: &str, json: bool) -> Result<()> {
    let profile = db.create_profile(username)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        println!("Created profile '{}' (id {})", profile.username, profile.id);
    }

    Ok(())
}
