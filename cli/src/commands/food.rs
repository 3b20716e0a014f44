use anyhow::Result;

use fitlog_core::db::Database;

use super::helpers::print_food_table;

pub(crate) fn cmd_food_list(db: &Database, search: Option<&str>, json: bool) -> Result<()> {
    let foods = db.list_custom_foods(search)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&foods)?);
    } else if foods.is_empty() {
        eprintln!("No foods found");
    } else {
        print_food_table(&foods);
    }

    Ok(())
}
