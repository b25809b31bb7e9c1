//! Discount credential store implementation

use crate::error::{Error, Result};
use crate::models::{CredentialStatus, DiscountCredential, NegotiationId};
use rusqlite::{params, Connection};

use super::negotiation_repository::is_constraint_violation;

const SELECT_COLUMNS: &str = "code, buyer_id, scope_item_id, kind, negotiation_id, \
     discount_amount, discount_percent, min_purchase_amount, max_discount_cap, status, \
     used_by_payment_id, created_at, expires_at";

/// Trait for discount credential storage
pub trait CredentialStore {
    /// Insert a negotiated credential, idempotently
    ///
    /// If a credential already exists for the same negotiation (crash
    /// re-invocation, concurrent accept), the existing one is returned
    /// instead of erroring.
    fn insert_negotiated(&self, credential: &DiscountCredential) -> Result<DiscountCredential>;

    /// Insert a welcome credential
    ///
    /// The partial unique index on (buyer, welcome) turns a double issue
    /// into [`Error::NotEligible`], closing the double-click race.
    fn insert_welcome(&self, credential: &DiscountCredential) -> Result<()>;

    /// Look up a credential by code
    fn lookup(&self, code: &str) -> Result<Option<DiscountCredential>>;

    /// Find the credential minted for a negotiation, if any
    fn find_for_negotiation(&self, negotiation_id: &NegotiationId)
        -> Result<Option<DiscountCredential>>;

    /// Atomically flip a credential from unused to used
    ///
    /// A single conditional update: among concurrent redeemers exactly one
    /// succeeds; the rest see [`Error::AlreadyUsed`]. Safe to retry.
    fn mark_used(&self, code: &str, payment_id: &str, now: i64) -> Result<()>;
}

/// `SQLite` implementation of `CredentialStore`
pub struct SqliteCredentialStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteCredentialStore<'a> {
    /// Create a new store with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a credential from a database row
    fn parse_credential(row: &rusqlite::Row<'_>) -> rusqlite::Result<DiscountCredential> {
        Ok(DiscountCredential {
            code: row.get(0)?,
            buyer_id: row.get(1)?,
            scope_item_id: row.get(2)?,
            kind: row.get(3)?,
            negotiation_id: row.get(4)?,
            discount_amount: row.get(5)?,
            discount_percent: row.get(6)?,
            min_purchase_amount: row.get(7)?,
            max_discount_cap: row.get(8)?,
            status: row.get(9)?,
            used_by_payment_id: row.get(10)?,
            created_at: row.get(11)?,
            expires_at: row.get(12)?,
        })
    }

    fn insert(&self, credential: &DiscountCredential, or_ignore: bool) -> rusqlite::Result<usize> {
        let sql = if or_ignore {
            "INSERT OR IGNORE INTO discount_codes"
        } else {
            "INSERT INTO discount_codes"
        };
        self.conn.execute(
            &format!(
                "{sql} (code, buyer_id, scope_item_id, kind, negotiation_id, discount_amount,
                 discount_percent, min_purchase_amount, max_discount_cap, status,
                 used_by_payment_id, created_at, expires_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ),
            params![
                credential.code,
                credential.buyer_id,
                credential.scope_item_id,
                credential.kind,
                credential.negotiation_id,
                credential.discount_amount,
                credential.discount_percent,
                credential.min_purchase_amount,
                credential.max_discount_cap,
                credential.status,
                credential.used_by_payment_id,
                credential.created_at,
                credential.expires_at,
            ],
        )
    }
}

impl CredentialStore for SqliteCredentialStore<'_> {
    fn insert_negotiated(&self, credential: &DiscountCredential) -> Result<DiscountCredential> {
        let negotiation_id = credential.negotiation_id.ok_or_else(|| {
            Error::InvalidInput("negotiated credential requires a negotiation id".into())
        })?;

        // The deterministic code and the unique negotiation index make the
        // insert a no-op when the credential already exists
        self.insert(credential, true)?;

        self.find_for_negotiation(&negotiation_id)?
            .ok_or_else(|| Error::NotFound(format!("credential for negotiation {negotiation_id}")))
    }

    fn insert_welcome(&self, credential: &DiscountCredential) -> Result<()> {
        match self.insert(credential, false) {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::NotEligible),
            Err(e) => Err(e.into()),
        }
    }

    fn lookup(&self, code: &str) -> Result<Option<DiscountCredential>> {
        let result = self.conn.query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM discount_codes WHERE code = ?"),
            params![code],
            Self::parse_credential,
        );

        match result {
            Ok(credential) => Ok(Some(credential)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn find_for_negotiation(
        &self,
        negotiation_id: &NegotiationId,
    ) -> Result<Option<DiscountCredential>> {
        let result = self.conn.query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM discount_codes WHERE negotiation_id = ?"),
            params![negotiation_id],
            Self::parse_credential,
        );

        match result {
            Ok(credential) => Ok(Some(credential)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn mark_used(&self, code: &str, payment_id: &str, now: i64) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE discount_codes SET status = ?, used_by_payment_id = ?
             WHERE code = ? AND status = ? AND expires_at >= ?",
            params![
                CredentialStatus::Used,
                payment_id,
                code,
                CredentialStatus::Unused,
                now,
            ],
        )?;

        if rows == 1 {
            return Ok(());
        }

        // The conditional update missed; classify why
        match self.lookup(code)? {
            None => Err(Error::CodeNotFound),
            Some(c) if c.status == CredentialStatus::Used => Err(Error::AlreadyUsed),
            Some(_) => Err(Error::Expired),
        }
    }
}
