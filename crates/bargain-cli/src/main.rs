//! Bargain CLI - negotiate marketplace prices from the terminal
//!
//! Drives the negotiation engine and discount code store against a local
//! `SQLite` database.

mod cli;
mod commands;
mod error;

use clap::Parser;

use crate::cli::{Cli, Commands, ItemCommands};
use crate::commands::common::resolve_db_path;
use crate::commands::{discount, item, negotiate, sweep};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bargain=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Item { command } => match command {
            ItemCommands::Add { id, price } => item::run_item_add(&id, price, &db_path)?,
            ItemCommands::List { json } => item::run_item_list(json, &db_path)?,
        },
        Commands::Start {
            buyer,
            seller,
            item,
            message,
        } => negotiate::run_start(&buyer, &seller, &item, message.as_deref(), &db_path)?,
        Commands::Message { id, from, text } => {
            negotiate::run_message(&id, &from, &text, &db_path)?;
        }
        Commands::Offer { id, from, amount } => {
            negotiate::run_offer(&id, &from, amount, &db_path)?;
        }
        Commands::Accept { id, seller } => negotiate::run_accept(&id, &seller, &db_path)?,
        Commands::Reject { id, from, reason } => {
            negotiate::run_reject(&id, &from, reason.as_deref(), &db_path)?;
        }
        Commands::Complete { id, payment } => {
            negotiate::run_complete(&id, &payment, &db_path)?;
        }
        Commands::Show { id, json } => negotiate::run_show(&id, json, &db_path)?,
        Commands::List { user, limit, json } => {
            negotiate::run_list(&user, limit, json, &db_path)?;
        }
        Commands::Validate {
            code,
            buyer,
            item,
            json,
        } => discount::run_validate(&code, &buyer, &item, json, &db_path)?,
        Commands::Redeem {
            code,
            buyer,
            payment,
        } => discount::run_redeem(&code, &buyer, &payment, &db_path)?,
        Commands::ClaimWelcome { buyer } => discount::run_claim_welcome(&buyer, &db_path)?,
        Commands::Sweep { watch, interval } => sweep::run_sweep(watch, interval, &db_path).await?,
    }

    Ok(())
}
