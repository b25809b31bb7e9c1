//! Discount credential model and code generation

use rand::Rng;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use super::NegotiationId;

/// Length of generated discount codes
pub const CODE_LEN: usize = 10;

/// Code alphabet without visually ambiguous characters (0/O, 1/I/L)
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Salt mixed into deterministic negotiated-code derivation
const NEGOTIATED_CODE_SALT: &str = "bargain/negotiated/v1";

/// Negotiated codes stay redeemable for 7 days after acceptance (Unix ms)
pub const NEGOTIATED_CODE_TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Welcome codes stay redeemable for 30 days after issuance (Unix ms)
pub const WELCOME_CODE_TTL_MS: i64 = 30 * 24 * 60 * 60 * 1000;

/// Welcome discount rate, in whole percent
pub const WELCOME_DISCOUNT_PERCENT: i64 = 20;

/// Welcome codes require at least this purchase amount
pub const WELCOME_MIN_PURCHASE: i64 = 100;

/// Welcome discounts are capped at this absolute amount
pub const WELCOME_MAX_DISCOUNT_CAP: i64 = 500;

/// Derive the discount code for a negotiation
///
/// Deterministic: hashing the negotiation id with a fixed salt makes
/// re-minting after a crash yield the same code, so issuance is idempotent
/// without a separate existence check.
#[must_use]
pub fn negotiated_code(negotiation_id: &NegotiationId) -> String {
    let digest = Sha256::digest(format!("{NEGOTIATED_CODE_SALT}:{negotiation_id}"));
    digest
        .iter()
        .take(CODE_LEN)
        .map(|b| CODE_ALPHABET[usize::from(*b) % CODE_ALPHABET.len()] as char)
        .collect()
}

/// Generate a random welcome code token
#[must_use]
pub fn welcome_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Origin of a discount credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// Minted when a seller accepts a negotiated offer
    Negotiated,
    /// Issued once per eligible first-time buyer
    Welcome,
}

impl CredentialKind {
    /// Stable string form used in storage
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Negotiated => "negotiated",
            Self::Welcome => "welcome",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialKind {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "negotiated" => Ok(Self::Negotiated),
            "welcome" => Ok(Self::Welcome),
            other => Err(crate::error::Error::InvalidInput(format!(
                "unknown credential kind: {other}"
            ))),
        }
    }
}

impl ToSql for CredentialKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for CredentialKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: crate::error::Error| FromSqlError::Other(Box::new(e)))
    }
}

/// Redemption state of a credential
///
/// The `Unused` to `Used` transition happens exactly once, via an atomic
/// conditional update in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    /// Not yet redeemed
    Unused,
    /// Consumed by a confirmed payment
    Used,
}

impl CredentialStatus {
    /// Stable string form used in storage
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unused => "unused",
            Self::Used => "used",
        }
    }
}

impl fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialStatus {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unused" => Ok(Self::Unused),
            "used" => Ok(Self::Used),
            other => Err(crate::error::Error::InvalidInput(format!(
                "unknown credential status: {other}"
            ))),
        }
    }
}

impl ToSql for CredentialStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for CredentialStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: crate::error::Error| FromSqlError::Other(Box::new(e)))
    }
}

/// A single-use authorization to purchase at a reduced price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountCredential {
    /// Opaque unique token presented at checkout
    pub code: String,
    /// Buyer the credential is bound to
    pub buyer_id: String,
    /// Item scope; negotiated codes are bound to one item, welcome codes are
    /// item-agnostic
    pub scope_item_id: Option<String>,
    /// Origin of the credential
    pub kind: CredentialKind,
    /// Source negotiation for negotiated codes
    pub negotiation_id: Option<NegotiationId>,
    /// Absolute discount, fixed at issuance (negotiated codes)
    pub discount_amount: Option<i64>,
    /// Percent discount computed at redemption time (welcome codes)
    pub discount_percent: Option<i64>,
    /// Minimum purchase amount constraint (welcome codes)
    pub min_purchase_amount: Option<i64>,
    /// Absolute cap on the computed discount (welcome codes)
    pub max_discount_cap: Option<i64>,
    /// Redemption state
    pub status: CredentialStatus,
    /// Payment that consumed this credential
    pub used_by_payment_id: Option<String>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Redemption deadline (Unix ms)
    pub expires_at: i64,
}

impl DiscountCredential {
    /// Mint a credential for an accepted negotiation
    ///
    /// `discount_amount` is the locked difference between the list price and
    /// the agreed final price; it is never recomputed later.
    #[must_use]
    pub fn negotiated(
        negotiation_id: NegotiationId,
        buyer_id: impl Into<String>,
        item_id: impl Into<String>,
        discount_amount: i64,
        now: i64,
    ) -> Self {
        Self {
            code: negotiated_code(&negotiation_id),
            buyer_id: buyer_id.into(),
            scope_item_id: Some(item_id.into()),
            kind: CredentialKind::Negotiated,
            negotiation_id: Some(negotiation_id),
            discount_amount: Some(discount_amount),
            discount_percent: None,
            min_purchase_amount: None,
            max_discount_cap: None,
            status: CredentialStatus::Unused,
            used_by_payment_id: None,
            created_at: now,
            expires_at: now + NEGOTIATED_CODE_TTL_MS,
        }
    }

    /// Issue a welcome credential for a first-time buyer
    #[must_use]
    pub fn welcome(buyer_id: impl Into<String>, now: i64) -> Self {
        Self {
            code: welcome_code(),
            buyer_id: buyer_id.into(),
            scope_item_id: None,
            kind: CredentialKind::Welcome,
            negotiation_id: None,
            discount_amount: None,
            discount_percent: Some(WELCOME_DISCOUNT_PERCENT),
            min_purchase_amount: Some(WELCOME_MIN_PURCHASE),
            max_discount_cap: Some(WELCOME_MAX_DISCOUNT_CAP),
            status: CredentialStatus::Unused,
            used_by_payment_id: None,
            created_at: now,
            expires_at: now + WELCOME_CODE_TTL_MS,
        }
    }

    /// Whether the redemption deadline has passed
    #[must_use]
    pub const fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }

    /// Effective discount of a percent-based credential for a given price
    ///
    /// `min(round(price * percent / 100), cap)`, per the welcome-code rule.
    #[must_use]
    pub fn percent_discount(&self, item_price: i64) -> i64 {
        let percent = self.discount_percent.unwrap_or(0);
        let raw = (item_price * percent + 50) / 100;
        match self.max_discount_cap {
            Some(cap) => raw.min(cap),
            None => raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_negotiated_code_deterministic() {
        let id = NegotiationId::new();
        assert_eq!(negotiated_code(&id), negotiated_code(&id));
        assert_eq!(negotiated_code(&id).len(), CODE_LEN);
    }

    #[test]
    fn test_negotiated_code_differs_per_negotiation() {
        assert_ne!(
            negotiated_code(&NegotiationId::new()),
            negotiated_code(&NegotiationId::new())
        );
    }

    #[test]
    fn test_code_alphabet() {
        let code = negotiated_code(&NegotiationId::new());
        assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));

        let code = welcome_code();
        assert_eq!(code.len(), CODE_LEN);
        assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_negotiated_credential_fixes_amount() {
        let id = NegotiationId::new();
        let c = DiscountCredential::negotiated(id, "buyer-1", "item-1", 50, 1_000);
        assert_eq!(c.kind, CredentialKind::Negotiated);
        assert_eq!(c.discount_amount, Some(50));
        assert_eq!(c.scope_item_id.as_deref(), Some("item-1"));
        assert_eq!(c.negotiation_id, Some(id));
        assert_eq!(c.status, CredentialStatus::Unused);
        assert_eq!(c.expires_at, 1_000 + NEGOTIATED_CODE_TTL_MS);
    }

    #[test]
    fn test_welcome_credential_constraints() {
        let c = DiscountCredential::welcome("buyer-1", 1_000);
        assert_eq!(c.kind, CredentialKind::Welcome);
        assert_eq!(c.discount_percent, Some(WELCOME_DISCOUNT_PERCENT));
        assert_eq!(c.min_purchase_amount, Some(WELCOME_MIN_PURCHASE));
        assert_eq!(c.max_discount_cap, Some(WELCOME_MAX_DISCOUNT_CAP));
        assert_eq!(c.scope_item_id, None);
        assert_eq!(c.negotiation_id, None);
    }

    #[test]
    fn test_percent_discount_applies_cap() {
        let c = DiscountCredential::welcome("buyer-1", 0);
        // 20% of 5000 is 1000, capped at 500
        assert_eq!(c.percent_discount(5000), 500);
        // 20% of 1000 is 200, under the cap
        assert_eq!(c.percent_discount(1000), 200);
    }

    #[test]
    fn test_percent_discount_rounds() {
        let c = DiscountCredential::welcome("buyer-1", 0);
        // 20% of 153 is 30.6, rounds to 31
        assert_eq!(c.percent_discount(153), 31);
        // 20% of 152 is 30.4, rounds to 30
        assert_eq!(c.percent_discount(152), 30);
    }

    #[test]
    fn test_is_expired() {
        let c = DiscountCredential::welcome("buyer-1", 1_000);
        assert!(!c.is_expired(1_000));
        assert!(!c.is_expired(c.expires_at));
        assert!(c.is_expired(c.expires_at + 1));
    }
}
