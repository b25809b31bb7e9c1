//! Negotiation repository implementation

use crate::error::{Error, Result};
use crate::models::{Negotiation, NegotiationId, NegotiationStatus};
use rusqlite::{params, Connection};

const SELECT_COLUMNS: &str = "id, item_id, buyer_id, seller_id, original_price, minimum_price, \
     current_offer, final_price, status, discount_code, created_at, last_activity_at, \
     expires_at, version";

/// Trait for negotiation storage operations
pub trait NegotiationRepository {
    /// Insert a new negotiation
    ///
    /// Fails with [`Error::DuplicateActiveNegotiation`] when an active
    /// negotiation already exists for the same (buyer, item) pair.
    fn create(&self, negotiation: &Negotiation) -> Result<()>;

    /// Get a negotiation by ID
    fn get(&self, id: &NegotiationId) -> Result<Option<Negotiation>>;

    /// List negotiations where the user is buyer or seller, newest first
    fn list_for_user(&self, user_id: &str) -> Result<Vec<Negotiation>>;

    /// Write back a mutated negotiation, conditional on the version read
    ///
    /// The stored row is updated only if its version still equals
    /// `expected_version`; the write bumps the version by one. A lost race
    /// surfaces as [`Error::VersionConflict`].
    fn update_versioned(&self, negotiation: &Negotiation, expected_version: i64) -> Result<()>;

    /// Transition every overdue active negotiation to `expired`
    ///
    /// Returns the ids that were flipped by this sweep.
    fn expire_due(&self, now: i64) -> Result<Vec<NegotiationId>>;
}

/// `SQLite` implementation of `NegotiationRepository`
pub struct SqliteNegotiationRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteNegotiationRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a negotiation from a database row
    fn parse_negotiation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Negotiation> {
        Ok(Negotiation {
            id: row.get(0)?,
            item_id: row.get(1)?,
            buyer_id: row.get(2)?,
            seller_id: row.get(3)?,
            original_price: row.get(4)?,
            minimum_price: row.get(5)?,
            current_offer: row.get(6)?,
            final_price: row.get(7)?,
            status: row.get(8)?,
            discount_code: row.get(9)?,
            created_at: row.get(10)?,
            last_activity_at: row.get(11)?,
            expires_at: row.get(12)?,
            version: row.get(13)?,
        })
    }
}

/// Whether a rusqlite error is a unique/check constraint violation
pub(crate) fn is_constraint_violation(error: &rusqlite::Error) -> bool {
    error.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation)
}

impl NegotiationRepository for SqliteNegotiationRepository<'_> {
    fn create(&self, negotiation: &Negotiation) -> Result<()> {
        let result = self.conn.execute(
            "INSERT INTO negotiations (id, item_id, buyer_id, seller_id, original_price,
             minimum_price, current_offer, final_price, status, discount_code, created_at,
             last_activity_at, expires_at, version)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                negotiation.id,
                negotiation.item_id,
                negotiation.buyer_id,
                negotiation.seller_id,
                negotiation.original_price,
                negotiation.minimum_price,
                negotiation.current_offer,
                negotiation.final_price,
                negotiation.status,
                negotiation.discount_code,
                negotiation.created_at,
                negotiation.last_activity_at,
                negotiation.expires_at,
                negotiation.version,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::DuplicateActiveNegotiation),
            Err(e) => Err(e.into()),
        }
    }

    fn get(&self, id: &NegotiationId) -> Result<Option<Negotiation>> {
        let result = self.conn.query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM negotiations WHERE id = ?"),
            params![id],
            Self::parse_negotiation,
        );

        match result {
            Ok(negotiation) => Ok(Some(negotiation)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_for_user(&self, user_id: &str) -> Result<Vec<Negotiation>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM negotiations
             WHERE buyer_id = ? OR seller_id = ?
             ORDER BY last_activity_at DESC"
        ))?;

        let negotiations = stmt
            .query_map(params![user_id, user_id], Self::parse_negotiation)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(negotiations)
    }

    fn update_versioned(&self, negotiation: &Negotiation, expected_version: i64) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE negotiations
             SET current_offer = ?, final_price = ?, status = ?, discount_code = ?,
                 last_activity_at = ?, version = ?
             WHERE id = ? AND version = ?",
            params![
                negotiation.current_offer,
                negotiation.final_price,
                negotiation.status,
                negotiation.discount_code,
                negotiation.last_activity_at,
                expected_version + 1,
                negotiation.id,
                expected_version,
            ],
        )?;

        if rows == 0 {
            return match self.get(&negotiation.id)? {
                Some(_) => Err(Error::VersionConflict),
                None => Err(Error::NotFound(negotiation.id.to_string())),
            };
        }

        Ok(())
    }

    fn expire_due(&self, now: i64) -> Result<Vec<NegotiationId>> {
        let tx = self.conn.unchecked_transaction()?;

        let mut stmt = tx
            .prepare("SELECT id FROM negotiations WHERE status = 'active' AND expires_at < ?")?;
        let due = stmt
            .query_map(params![now], |row| row.get::<_, NegotiationId>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);

        if !due.is_empty() {
            tx.execute(
                "UPDATE negotiations SET status = ?, version = version + 1
                 WHERE status = 'active' AND expires_at < ?",
                params![NegotiationStatus::Expired, now],
            )?;
        }

        tx.commit()?;
        Ok(due)
    }
}
