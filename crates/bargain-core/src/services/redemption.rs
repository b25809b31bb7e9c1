//! Discount validation and redemption service
//!
//! `validate_for_purchase` is the read-only preview used at checkout
//! display; it never consumes the code. Consumption happens in `redeem`,
//! called by the payment pipeline strictly after payment success, which
//! re-runs the ownership checks and then flips the credential atomically.
//! Re-validating at redemption time (instead of trusting an earlier
//! preview) closes the window where another request consumed the code
//! between preview and payment confirmation.

use rusqlite::Connection;
use serde::Serialize;

use crate::db::{Catalog, CredentialStore, SqliteCredentialStore};
use crate::error::{Error, Result};
use crate::models::{CredentialKind, CredentialStatus, DiscountCredential};

/// Outcome of a successful validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedDiscount {
    /// The validated code
    pub code: String,
    /// Credential origin
    pub kind: CredentialKind,
    /// Amount taken off the list price
    pub discount_amount: i64,
    /// Price the buyer pays
    pub final_price: i64,
    /// Current list price of the item
    pub original_price: i64,
}

/// Validation and redemption over the credential store and catalog
pub struct RedemptionService<'a> {
    conn: &'a Connection,
    catalog: &'a dyn Catalog,
}

impl<'a> RedemptionService<'a> {
    /// Create a service over the given connection and catalog boundary
    pub const fn new(conn: &'a Connection, catalog: &'a dyn Catalog) -> Self {
        Self { conn, catalog }
    }

    /// Check a code against a buyer and item and price the discount
    ///
    /// Read-only: the credential stays unused.
    pub fn validate_for_purchase(
        &self,
        code: &str,
        buyer_id: &str,
        item_id: &str,
    ) -> Result<ValidatedDiscount> {
        let now = chrono::Utc::now().timestamp_millis();
        let credential = self.screen(code, buyer_id, now)?;
        let item_price = self.catalog.item_price(item_id)?;

        let discount_amount = match credential.kind {
            CredentialKind::Negotiated => {
                if credential.scope_item_id.as_deref() != Some(item_id) {
                    return Err(Error::WrongItem);
                }
                // Fixed at issuance, never recomputed
                credential.discount_amount.ok_or_else(|| {
                    Error::InvalidInput("negotiated credential is missing its amount".into())
                })?
            }
            CredentialKind::Welcome => {
                if let Some(minimum) = credential.min_purchase_amount {
                    if item_price < minimum {
                        return Err(Error::BelowMinimumPurchase { minimum });
                    }
                }
                credential.percent_discount(item_price)
            }
        };

        Ok(ValidatedDiscount {
            code: credential.code,
            kind: credential.kind,
            discount_amount,
            final_price: (item_price - discount_amount).max(0),
            original_price: item_price,
        })
    }

    /// Consume a code on behalf of a confirmed payment
    ///
    /// Ownership checks run again here; the flip itself is an atomic
    /// conditional update, so only one of any concurrent redeemers wins.
    pub fn redeem(&self, code: &str, buyer_id: &str, payment_id: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.screen(code, buyer_id, now)?;

        let store = SqliteCredentialStore::new(self.conn);
        store.mark_used(code, payment_id, now)?;

        tracing::info!(code, payment = payment_id, "discount credential redeemed");
        Ok(())
    }

    /// Lookup plus the status/expiry/ownership screens shared by both paths
    fn screen(&self, code: &str, buyer_id: &str, now: i64) -> Result<DiscountCredential> {
        let credential = SqliteCredentialStore::new(self.conn)
            .lookup(code)?
            .ok_or(Error::CodeNotFound)?;

        if credential.status == CredentialStatus::Used {
            return Err(Error::AlreadyUsed);
        }
        if credential.is_expired(now) {
            return Err(Error::Expired);
        }
        if credential.buyer_id != buyer_id {
            return Err(Error::NotOwner);
        }

        Ok(credential)
    }
}
