use std::path::Path;

use bargain_core::db::SqliteCatalog;
use bargain_core::services::{RedemptionService, WelcomeService};

use crate::commands::common::{normalize_code, normalize_user_id, open_database};
use crate::error::CliError;

pub fn run_validate(
    code: &str,
    buyer: &str,
    item: &str,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let code = normalize_code(code)?;
    let buyer = normalize_user_id(buyer)?;

    let db = open_database(db_path)?;
    let catalog = SqliteCatalog::new(db.connection());
    let service = RedemptionService::new(db.connection(), &catalog);

    let validated = service.validate_for_purchase(code, buyer, item)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&validated)?);
    } else {
        println!(
            "{}  {}  -{}  pay {}",
            validated.code, validated.kind, validated.discount_amount, validated.final_price
        );
    }

    Ok(())
}

pub fn run_redeem(code: &str, buyer: &str, payment: &str, db_path: &Path) -> Result<(), CliError> {
    let code = normalize_code(code)?;
    let buyer = normalize_user_id(buyer)?;

    let db = open_database(db_path)?;
    let catalog = SqliteCatalog::new(db.connection());
    let service = RedemptionService::new(db.connection(), &catalog);

    service.redeem(code, buyer, payment)?;
    println!("{code}");
    Ok(())
}

pub fn run_claim_welcome(buyer: &str, db_path: &Path) -> Result<(), CliError> {
    let buyer = normalize_user_id(buyer)?;

    let db = open_database(db_path)?;
    let service = WelcomeService::new(db.connection());

    let credential = service.claim(buyer)?;
    println!("{}", credential.code);
    Ok(())
}
