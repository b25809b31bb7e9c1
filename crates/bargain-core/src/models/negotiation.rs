//! Negotiation model and lifecycle states

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Fixed negotiation lifetime: 72 hours from creation (Unix ms)
pub const NEGOTIATION_TTL_MS: i64 = 72 * 60 * 60 * 1000;

/// Hard price floor: 70% of the list price, rounded down
#[must_use]
pub const fn floor_price(original_price: i64) -> i64 {
    original_price * 7 / 10
}

/// A unique identifier for a negotiation, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NegotiationId(Uuid);

impl NegotiationId {
    /// Create a new unique negotiation ID using UUID v7
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

impl Default for NegotiationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NegotiationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NegotiationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl ToSql for NegotiationId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

impl FromSql for NegotiationId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: uuid::Error| FromSqlError::Other(Box::new(e)))
    }
}

/// Lifecycle state of a negotiation
///
/// `Rejected`, `Expired`, and `Completed` are terminal: no further messages
/// or transitions are accepted. `Accepted` still admits one transition, to
/// `Completed`, driven by the external payment pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationStatus {
    /// Open, both parties may post messages and offers
    Active,
    /// Seller accepted the current offer; a discount credential is minted
    Accepted,
    /// One party walked away (terminal)
    Rejected,
    /// Timed out without agreement (terminal)
    Expired,
    /// Credential redeemed and payment confirmed (terminal)
    Completed,
}

impl NegotiationStatus {
    /// Stable string form used in storage
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Completed => "completed",
        }
    }

    /// Terminal states admit no further transitions
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Expired | Self::Completed)
    }
}

impl fmt::Display for NegotiationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NegotiationStatus {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "expired" => Ok(Self::Expired),
            "completed" => Ok(Self::Completed),
            other => Err(crate::error::Error::InvalidInput(format!(
                "unknown negotiation status: {other}"
            ))),
        }
    }
}

impl ToSql for NegotiationStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for NegotiationStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: crate::error::Error| FromSqlError::Other(Box::new(e)))
    }
}

/// A price negotiation between one buyer and one seller over one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Negotiation {
    /// Unique identifier
    pub id: NegotiationId,
    /// Catalog item under negotiation
    pub item_id: String,
    /// Buyer who opened the negotiation
    pub buyer_id: String,
    /// Seller of the item
    pub seller_id: String,
    /// List price at creation time, immutable
    pub original_price: i64,
    /// 70% floor below which no offer is accepted, immutable
    pub minimum_price: i64,
    /// Latest price proposed by either party
    pub current_offer: Option<i64>,
    /// Locked-in price, set only on transition into `accepted`
    pub final_price: Option<i64>,
    /// Lifecycle state
    pub status: NegotiationStatus,
    /// Discount code minted on acceptance
    pub discount_code: Option<String>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Timestamp of the last message or transition (Unix ms)
    pub last_activity_at: i64,
    /// Hard wall-clock expiry (Unix ms)
    pub expires_at: i64,
    /// Optimistic-concurrency counter, bumped on every mutation
    pub version: i64,
}

impl Negotiation {
    /// Open a new negotiation at the given list price
    ///
    /// Computes the 70% floor and the fixed 72-hour expiry.
    #[must_use]
    pub fn open(
        buyer_id: impl Into<String>,
        seller_id: impl Into<String>,
        item_id: impl Into<String>,
        original_price: i64,
    ) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: NegotiationId::new(),
            item_id: item_id.into(),
            buyer_id: buyer_id.into(),
            seller_id: seller_id.into(),
            original_price,
            minimum_price: floor_price(original_price),
            current_offer: None,
            final_price: None,
            status: NegotiationStatus::Active,
            discount_code: None,
            created_at: now,
            last_activity_at: now,
            expires_at: now + NEGOTIATION_TTL_MS,
            version: 0,
        }
    }

    /// Whether the given user is the buyer or seller of this negotiation
    #[must_use]
    pub fn is_party(&self, user_id: &str) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }

    /// Whether a price offer respects the floor and the list-price ceiling
    #[must_use]
    pub const fn offer_in_bounds(&self, offer: i64) -> bool {
        offer >= self.minimum_price && offer <= self.original_price
    }

    /// Whether the wall-clock expiry has passed
    #[must_use]
    pub const fn is_past_expiry(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_negotiation_id_unique() {
        let id1 = NegotiationId::new();
        let id2 = NegotiationId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_negotiation_id_parse() {
        let id = NegotiationId::new();
        let parsed: NegotiationId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_floor_price_rounds_down() {
        assert_eq!(floor_price(500), 350);
        assert_eq!(floor_price(999), 699);
        assert_eq!(floor_price(1), 0);
        assert_eq!(floor_price(10), 7);
    }

    #[test]
    fn test_open_computes_floor_and_expiry() {
        let n = Negotiation::open("buyer-1", "seller-1", "item-1", 500);
        assert_eq!(n.minimum_price, 350);
        assert_eq!(n.status, NegotiationStatus::Active);
        assert_eq!(n.version, 0);
        assert_eq!(n.expires_at, n.created_at + NEGOTIATION_TTL_MS);
        assert_eq!(n.current_offer, None);
        assert_eq!(n.final_price, None);
    }

    #[test]
    fn test_offer_in_bounds() {
        let n = Negotiation::open("b", "s", "i", 500);
        assert!(n.offer_in_bounds(350));
        assert!(n.offer_in_bounds(450));
        assert!(n.offer_in_bounds(500));
        assert!(!n.offer_in_bounds(349));
        assert!(!n.offer_in_bounds(501));
    }

    #[test]
    fn test_is_party() {
        let n = Negotiation::open("buyer-1", "seller-1", "item-1", 100);
        assert!(n.is_party("buyer-1"));
        assert!(n.is_party("seller-1"));
        assert!(!n.is_party("someone-else"));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!NegotiationStatus::Active.is_terminal());
        assert!(!NegotiationStatus::Accepted.is_terminal());
        assert!(NegotiationStatus::Rejected.is_terminal());
        assert!(NegotiationStatus::Expired.is_terminal());
        assert!(NegotiationStatus::Completed.is_terminal());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            NegotiationStatus::Active,
            NegotiationStatus::Accepted,
            NegotiationStatus::Rejected,
            NegotiationStatus::Expired,
            NegotiationStatus::Completed,
        ] {
            let parsed: NegotiationStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("bogus".parse::<NegotiationStatus>().is_err());
    }
}
