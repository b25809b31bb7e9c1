use std::env;
use std::path::{Path, PathBuf};

use bargain_core::db::Database;
use bargain_core::models::SYSTEM_SENDER;
use bargain_core::{Message, Negotiation, NegotiationId};
use chrono::Utc;
use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct NegotiationListItem {
    pub id: String,
    pub item_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub status: String,
    pub original_price: i64,
    pub current_offer: Option<i64>,
    pub final_price: Option<i64>,
    pub discount_code: Option<String>,
    pub last_activity: String,
    pub expires_at: i64,
}

pub fn negotiation_to_item(negotiation: &Negotiation) -> NegotiationListItem {
    let now_ms = Utc::now().timestamp_millis();

    NegotiationListItem {
        id: negotiation.id.to_string(),
        item_id: negotiation.item_id.clone(),
        buyer_id: negotiation.buyer_id.clone(),
        seller_id: negotiation.seller_id.clone(),
        status: negotiation.status.to_string(),
        original_price: negotiation.original_price,
        current_offer: negotiation.current_offer,
        final_price: negotiation.final_price,
        discount_code: negotiation.discount_code.clone(),
        last_activity: format_relative_time(negotiation.last_activity_at, now_ms),
        expires_at: negotiation.expires_at,
    }
}

pub fn format_negotiation_lines(negotiations: &[Negotiation]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    negotiations
        .iter()
        .map(|negotiation| {
            let id = negotiation.id.to_string();
            let short_id = id.chars().take(13).collect::<String>();
            let offer = negotiation
                .current_offer
                .map_or_else(|| "-".to_string(), |offer| offer.to_string());
            let relative_time = format_relative_time(negotiation.last_activity_at, now_ms);

            format!(
                "{short_id:<13}  {:<12}  {:<9}  list={:<8}  offer={offer:<8}  {relative_time}",
                negotiation.item_id,
                negotiation.status.as_str(),
                negotiation.original_price
            )
        })
        .collect()
}

pub fn format_message_lines(messages: &[Message]) -> Vec<String> {
    messages
        .iter()
        .map(|message| {
            let sender = if message.sender_id == SYSTEM_SENDER {
                "*system*".to_string()
            } else {
                message.sender_id.clone()
            };

            message.price_offer.map_or_else(
                || format!("{:>4}  {sender:<12}  {}", message.seq, message.content),
                |offer| format!("{:>4}  {sender:<12}  [{}] {offer}", message.seq, message.kind),
            )
        })
        .collect()
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format!("{}w ago", diff / week)
    }
}

pub fn format_expiry(expires_at: i64, now_ms: i64) -> String {
    let remaining = expires_at.saturating_sub(now_ms);
    if remaining <= 0 {
        return "expired".to_string();
    }

    let hour = 3_600_000;
    if remaining < hour {
        format!("expires in {}m", remaining / 60_000)
    } else {
        format!("expires in {}h", remaining / hour)
    }
}

pub fn parse_negotiation_id(id: &str) -> Result<NegotiationId, CliError> {
    id.trim()
        .parse::<NegotiationId>()
        .map_err(|_| CliError::InvalidNegotiationId(id.to_string()))
}

pub fn normalize_user_id(user_id: &str) -> Result<&str, CliError> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyUserId)
    } else {
        Ok(trimmed)
    }
}

pub fn normalize_code(code: &str) -> Result<&str, CliError> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyCode)
    } else {
        Ok(trimmed)
    }
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("BARGAIN_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bargain")
        .join("bargain.db")
}

pub fn open_database(path: &Path) -> Result<Database, CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    Ok(Database::open(path)?)
}
