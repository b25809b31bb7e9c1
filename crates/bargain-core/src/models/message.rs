//! Negotiation message model

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::NegotiationId;

/// Maximum length of free-text message content, in characters
pub const MAX_FREE_TEXT_LEN: usize = 500;

/// Sender id recorded on system-generated messages (e.g. rejection reasons)
pub const SYSTEM_SENDER: &str = "system";

/// A unique identifier for a message, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Create a new unique message ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl ToSql for MessageId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

impl FromSql for MessageId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: uuid::Error| FromSqlError::Other(Box::new(e)))
    }
}

/// Kind of negotiation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Canned template text
    Template,
    /// Arbitrary text, capped at [`MAX_FREE_TEXT_LEN`] characters
    FreeText,
    /// Buyer's price proposal
    PriceOffer,
    /// Responding price proposal
    CounterOffer,
    /// Generated by the engine itself, never by a party
    System,
}

impl MessageKind {
    /// Stable string form used in storage
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::FreeText => "free_text",
            Self::PriceOffer => "price_offer",
            Self::CounterOffer => "counter_offer",
            Self::System => "system",
        }
    }

    /// Whether this kind carries a price and moves the current offer
    #[must_use]
    pub const fn is_price(self) -> bool {
        matches!(self, Self::PriceOffer | Self::CounterOffer)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "template" => Ok(Self::Template),
            "free_text" => Ok(Self::FreeText),
            "price_offer" => Ok(Self::PriceOffer),
            "counter_offer" => Ok(Self::CounterOffer),
            "system" => Ok(Self::System),
            other => Err(crate::error::Error::InvalidInput(format!(
                "unknown message kind: {other}"
            ))),
        }
    }
}

impl ToSql for MessageKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for MessageKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: crate::error::Error| FromSqlError::Other(Box::new(e)))
    }
}

/// One entry in a negotiation's append-only message log
///
/// Immutable once appended; `seq` is assigned by the log at insert time and
/// is strictly increasing within a negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier
    pub id: MessageId,
    /// Owning negotiation
    pub negotiation_id: NegotiationId,
    /// Sender (buyer id, seller id, or [`SYSTEM_SENDER`])
    pub sender_id: String,
    /// Message kind
    pub kind: MessageKind,
    /// Text content
    pub content: String,
    /// Proposed price, present only for price kinds
    pub price_offer: Option<i64>,
    /// Position in the log, assigned at append
    pub seq: i64,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl Message {
    /// Create a message ready for appending (`seq` assigned by the log)
    #[must_use]
    pub fn new(
        negotiation_id: NegotiationId,
        sender_id: impl Into<String>,
        kind: MessageKind,
        content: impl Into<String>,
        price_offer: Option<i64>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            negotiation_id,
            sender_id: sender_id.into(),
            kind,
            content: content.into(),
            price_offer,
            seq: 0,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Create an engine-generated system message
    #[must_use]
    pub fn system(negotiation_id: NegotiationId, content: impl Into<String>) -> Self {
        Self::new(negotiation_id, SYSTEM_SENDER, MessageKind::System, content, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_message_new() {
        let nid = NegotiationId::new();
        let msg = Message::new(nid, "buyer-1", MessageKind::PriceOffer, "", Some(450));
        assert_eq!(msg.negotiation_id, nid);
        assert_eq!(msg.price_offer, Some(450));
        assert_eq!(msg.seq, 0);
        assert!(msg.created_at > 0);
    }

    #[test]
    fn test_system_message() {
        let msg = Message::system(NegotiationId::new(), "offer rejected: too low");
        assert_eq!(msg.sender_id, SYSTEM_SENDER);
        assert_eq!(msg.kind, MessageKind::System);
        assert_eq!(msg.price_offer, None);
    }

    #[test]
    fn test_price_kinds() {
        assert!(MessageKind::PriceOffer.is_price());
        assert!(MessageKind::CounterOffer.is_price());
        assert!(!MessageKind::FreeText.is_price());
        assert!(!MessageKind::Template.is_price());
        assert!(!MessageKind::System.is_price());
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            MessageKind::Template,
            MessageKind::FreeText,
            MessageKind::PriceOffer,
            MessageKind::CounterOffer,
            MessageKind::System,
        ] {
            let parsed: MessageKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }
}
