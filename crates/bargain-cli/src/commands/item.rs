use std::path::Path;

use bargain_core::db::SqliteCatalog;
use serde::Serialize;

use crate::commands::common::open_database;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct ItemListItem {
    id: String,
    price: i64,
}

pub fn run_item_add(id: &str, price: i64, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    SqliteCatalog::new(db.connection()).upsert_item(id, price)?;

    println!("{id}");
    Ok(())
}

pub fn run_item_list(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let items = SqliteCatalog::new(db.connection()).list_items()?;

    if as_json {
        let json_items = items
            .into_iter()
            .map(|(id, price)| ItemListItem { id, price })
            .collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        for (id, price) in items {
            println!("{id:<20}  {price}");
        }
    }

    Ok(())
}
