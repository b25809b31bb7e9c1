use std::path::Path;

use bargain_core::db::SqliteCatalog;
use bargain_core::models::MessageKind;
use bargain_core::services::NegotiationService;
use chrono::Utc;
use serde::Serialize;

use crate::commands::common::{
    format_expiry, format_message_lines, format_negotiation_lines, negotiation_to_item,
    normalize_user_id, open_database, parse_negotiation_id, NegotiationListItem,
};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct TranscriptMessage {
    seq: i64,
    sender_id: String,
    kind: String,
    content: String,
    price_offer: Option<i64>,
    created_at: i64,
}

#[derive(Debug, Serialize)]
struct NegotiationDetail {
    #[serde(flatten)]
    negotiation: NegotiationListItem,
    messages: Vec<TranscriptMessage>,
}

pub fn run_start(
    buyer: &str,
    seller: &str,
    item: &str,
    message: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let buyer = normalize_user_id(buyer)?;
    let seller = normalize_user_id(seller)?;

    let db = open_database(db_path)?;
    let catalog = SqliteCatalog::new(db.connection());
    let service = NegotiationService::new(db.connection(), &catalog);

    let negotiation = service.start(buyer, seller, item, message)?;
    println!("{}", negotiation.id);
    Ok(())
}

pub fn run_message(id: &str, from: &str, text: &str, db_path: &Path) -> Result<(), CliError> {
    let negotiation_id = parse_negotiation_id(id)?;
    let from = normalize_user_id(from)?;

    let db = open_database(db_path)?;
    let catalog = SqliteCatalog::new(db.connection());
    let service = NegotiationService::new(db.connection(), &catalog);

    let message = service.post_message(&negotiation_id, from, MessageKind::FreeText, text, None)?;
    println!("{}", message.seq);
    Ok(())
}

/// Post a price. The first price in a negotiation is an opening offer;
/// every later one is a counter.
pub fn run_offer(id: &str, from: &str, amount: i64, db_path: &Path) -> Result<(), CliError> {
    let negotiation_id = parse_negotiation_id(id)?;
    let from = normalize_user_id(from)?;

    let db = open_database(db_path)?;
    let catalog = SqliteCatalog::new(db.connection());
    let service = NegotiationService::new(db.connection(), &catalog);

    let kind = if service.get(&negotiation_id)?.current_offer.is_some() {
        MessageKind::CounterOffer
    } else {
        MessageKind::PriceOffer
    };

    let message = service.post_message(&negotiation_id, from, kind, "", Some(amount))?;
    println!("{}", message.seq);
    Ok(())
}

pub fn run_accept(id: &str, seller: &str, db_path: &Path) -> Result<(), CliError> {
    let negotiation_id = parse_negotiation_id(id)?;
    let seller = normalize_user_id(seller)?;

    let db = open_database(db_path)?;
    let catalog = SqliteCatalog::new(db.connection());
    let service = NegotiationService::new(db.connection(), &catalog);

    let (negotiation, credential) = service.accept(&negotiation_id, seller)?;
    let final_price = negotiation.final_price.unwrap_or(negotiation.original_price);

    println!("{}", credential.code);
    eprintln!(
        "accepted at {final_price} (list {}); code valid until {}",
        negotiation.original_price,
        chrono::DateTime::from_timestamp_millis(credential.expires_at)
            .map_or_else(|| credential.expires_at.to_string(), |dt| dt
                .format("%Y-%m-%d %H:%M UTC")
                .to_string())
    );
    Ok(())
}

pub fn run_reject(
    id: &str,
    from: &str,
    reason: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let negotiation_id = parse_negotiation_id(id)?;
    let from = normalize_user_id(from)?;

    let db = open_database(db_path)?;
    let catalog = SqliteCatalog::new(db.connection());
    let service = NegotiationService::new(db.connection(), &catalog);

    let negotiation = service.reject(&negotiation_id, from, reason)?;
    println!("{}", negotiation.status);
    Ok(())
}

pub fn run_complete(id: &str, payment: &str, db_path: &Path) -> Result<(), CliError> {
    let negotiation_id = parse_negotiation_id(id)?;

    let db = open_database(db_path)?;
    let catalog = SqliteCatalog::new(db.connection());
    let service = NegotiationService::new(db.connection(), &catalog);

    let negotiation = service.mark_completed(&negotiation_id, payment)?;
    println!("{}", negotiation.status);
    Ok(())
}

pub fn run_show(id: &str, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let negotiation_id = parse_negotiation_id(id)?;

    let db = open_database(db_path)?;
    let catalog = SqliteCatalog::new(db.connection());
    let service = NegotiationService::new(db.connection(), &catalog);

    let negotiation = service.get(&negotiation_id)?;
    let messages = service.messages(&negotiation_id)?;

    if as_json {
        let detail = NegotiationDetail {
            negotiation: negotiation_to_item(&negotiation),
            messages: messages
                .iter()
                .map(|message| TranscriptMessage {
                    seq: message.seq,
                    sender_id: message.sender_id.clone(),
                    kind: message.kind.to_string(),
                    content: message.content.clone(),
                    price_offer: message.price_offer,
                    created_at: message.created_at,
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    let now_ms = Utc::now().timestamp_millis();
    println!(
        "{}  {}  buyer={} seller={}",
        negotiation.id, negotiation.item_id, negotiation.buyer_id, negotiation.seller_id
    );
    println!(
        "status={}  list={}  offer={}  {}",
        negotiation.status,
        negotiation.original_price,
        negotiation
            .current_offer
            .map_or_else(|| "-".to_string(), |offer| offer.to_string()),
        format_expiry(negotiation.expires_at, now_ms)
    );
    if let Some(code) = &negotiation.discount_code {
        println!("code={code}");
    }

    for line in format_message_lines(&messages) {
        println!("{line}");
    }

    Ok(())
}

pub fn run_list(user: &str, limit: usize, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let user = normalize_user_id(user)?;

    let db = open_database(db_path)?;
    let catalog = SqliteCatalog::new(db.connection());
    let service = NegotiationService::new(db.connection(), &catalog);

    let mut negotiations = service.list_for_user(user)?;
    negotiations.truncate(limit);

    if as_json {
        let json_items = negotiations
            .iter()
            .map(negotiation_to_item)
            .collect::<Vec<NegotiationListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        for line in format_negotiation_lines(&negotiations) {
            println!("{line}");
        }
    }

    Ok(())
}
