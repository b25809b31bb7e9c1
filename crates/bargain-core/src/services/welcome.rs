//! Welcome code issuance for first-time buyers

use rusqlite::Connection;

use crate::db::{CredentialStore, PurchaseLedger, SqliteCredentialStore, SqlitePurchaseLedger};
use crate::error::{Error, Result};
use crate::models::DiscountCredential;

/// Issues the one-per-buyer welcome credential
pub struct WelcomeService<'a> {
    conn: &'a Connection,
}

impl<'a> WelcomeService<'a> {
    /// Create a service over the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Claim a welcome code if the buyer is eligible
    ///
    /// Eligibility: zero completed purchases platform-wide and no welcome
    /// code issued before. The ledger read is advisory; the unique
    /// constraint on (buyer, welcome) makes the insert the real gate, so a
    /// double-clicked claim yields exactly one code.
    pub fn claim(&self, buyer_id: &str) -> Result<DiscountCredential> {
        if SqlitePurchaseLedger::new(self.conn).has_completed_purchase(buyer_id)? {
            return Err(Error::NotEligible);
        }

        let now = chrono::Utc::now().timestamp_millis();
        let credential = DiscountCredential::welcome(buyer_id, now);
        SqliteCredentialStore::new(self.conn).insert_welcome(&credential)?;

        tracing::info!(buyer = buyer_id, code = %credential.code, "welcome code issued");
        Ok(credential)
    }
}
