//! Negotiation state machine service
//!
//! Owns the lifecycle of buyer/seller price discussions. Every mutation is a
//! read-check-write under the negotiation's version counter, so concurrent
//! actions on one negotiation resolve to exactly one winner; the loser is
//! retried internally a couple of times before a conflict surfaces.

use rusqlite::Connection;

use crate::db::{
    Catalog, CredentialStore, MessageLog, NegotiationRepository, PurchaseLedger,
    SqliteCredentialStore, SqliteMessageLog, SqliteNegotiationRepository, SqlitePurchaseLedger,
};
use crate::error::{Error, Result};
use crate::models::{
    DiscountCredential, Message, MessageKind, Negotiation, NegotiationId, NegotiationStatus,
    MAX_FREE_TEXT_LEN,
};

/// Internal retries on a lost optimistic-concurrency race
const VERSION_CONFLICT_RETRIES: usize = 2;

/// Retry an operation a bounded number of times on [`Error::VersionConflict`]
fn with_version_retries<T>(mut op: impl FnMut() -> Result<T>) -> Result<T> {
    let mut attempts = 0;
    loop {
        match op() {
            Err(Error::VersionConflict) if attempts < VERSION_CONFLICT_RETRIES => {
                attempts += 1;
                tracing::debug!(attempts, "retrying negotiation update after version conflict");
            }
            result => return result,
        }
    }
}

/// State machine driver for negotiations
pub struct NegotiationService<'a> {
    conn: &'a Connection,
    catalog: &'a dyn Catalog,
}

impl<'a> NegotiationService<'a> {
    /// Create a service over the given connection and catalog boundary
    pub const fn new(conn: &'a Connection, catalog: &'a dyn Catalog) -> Self {
        Self { conn, catalog }
    }

    /// Open a negotiation for (buyer, item), optionally with a first message
    ///
    /// The list price is read from the catalog at creation time and frozen
    /// into the negotiation together with its 70% floor.
    pub fn start(
        &self,
        buyer_id: &str,
        seller_id: &str,
        item_id: &str,
        initial_message: Option<&str>,
    ) -> Result<Negotiation> {
        if buyer_id == seller_id {
            return Err(Error::InvalidInput(
                "buyer and seller must be different users".into(),
            ));
        }

        let original_price = self.catalog.item_price(item_id)?;
        if original_price <= 0 {
            return Err(Error::InvalidInput("item price must be positive".into()));
        }

        if let Some(text) = initial_message {
            validate_text(text)?;
        }

        let negotiation = Negotiation::open(buyer_id, seller_id, item_id, original_price);

        let tx = self.conn.unchecked_transaction()?;
        SqliteNegotiationRepository::new(self.conn).create(&negotiation)?;
        if let Some(text) = initial_message {
            let message = Message::new(negotiation.id, buyer_id, MessageKind::FreeText, text, None);
            SqliteMessageLog::new(self.conn).append(&message)?;
        }
        tx.commit()?;

        tracing::info!(
            negotiation = %negotiation.id,
            buyer = buyer_id,
            item = item_id,
            price = original_price,
            "negotiation opened"
        );
        Ok(negotiation)
    }

    /// Post a message or price offer to an active negotiation
    ///
    /// Price kinds move `current_offer` and must respect the floor/ceiling;
    /// every post refreshes `last_activity_at`.
    pub fn post_message(
        &self,
        negotiation_id: &NegotiationId,
        sender_id: &str,
        kind: MessageKind,
        content: &str,
        price_offer: Option<i64>,
    ) -> Result<Message> {
        if kind == MessageKind::System {
            return Err(Error::InvalidInput(
                "system messages cannot be posted by users".into(),
            ));
        }

        with_version_retries(|| {
            let repo = SqliteNegotiationRepository::new(self.conn);
            let mut negotiation = self.load(&repo, negotiation_id)?;
            let now = chrono::Utc::now().timestamp_millis();

            if !negotiation.is_party(sender_id) {
                return Err(Error::NotOwner);
            }
            ensure_active(&negotiation, now)?;

            let offer = if kind.is_price() {
                let offer = price_offer.ok_or_else(|| {
                    Error::InvalidInput("price message requires a price offer".into())
                })?;
                if !negotiation.offer_in_bounds(offer) {
                    return Err(Error::PriceOutOfBounds {
                        offer,
                        min: negotiation.minimum_price,
                        max: negotiation.original_price,
                    });
                }
                Some(offer)
            } else {
                validate_text(content)?;
                None
            };

            let mut message = Message::new(*negotiation_id, sender_id, kind, content, offer);

            let tx = self.conn.unchecked_transaction()?;
            message.seq = SqliteMessageLog::new(self.conn).append(&message)?;
            if let Some(offer) = offer {
                negotiation.current_offer = Some(offer);
            }
            negotiation.last_activity_at = now;
            let expected = negotiation.version;
            repo.update_versioned(&negotiation, expected)?;
            tx.commit()?;

            Ok(message)
        })
    }

    /// Seller accepts the current offer
    ///
    /// Locks in the final price and mints the single-use discount credential
    /// in the same storage transaction. Minting is idempotent per
    /// negotiation, so a crashed or raced accept never double-issues.
    pub fn accept(
        &self,
        negotiation_id: &NegotiationId,
        seller_id: &str,
    ) -> Result<(Negotiation, DiscountCredential)> {
        with_version_retries(|| {
            let repo = SqliteNegotiationRepository::new(self.conn);
            let mut negotiation = self.load(&repo, negotiation_id)?;
            let now = chrono::Utc::now().timestamp_millis();

            if negotiation.seller_id != seller_id {
                return Err(Error::NotOwner);
            }
            ensure_active(&negotiation, now)?;
            let final_price = negotiation.current_offer.ok_or(Error::NoPendingOffer)?;

            let discount_amount = negotiation.original_price - final_price;
            let credential = DiscountCredential::negotiated(
                negotiation.id,
                &negotiation.buyer_id,
                &negotiation.item_id,
                discount_amount,
                now,
            );

            let tx = self.conn.unchecked_transaction()?;
            let credential = SqliteCredentialStore::new(self.conn).insert_negotiated(&credential)?;
            negotiation.status = NegotiationStatus::Accepted;
            negotiation.final_price = Some(final_price);
            negotiation.discount_code = Some(credential.code.clone());
            negotiation.last_activity_at = now;
            let expected = negotiation.version;
            repo.update_versioned(&negotiation, expected)?;
            tx.commit()?;

            tracing::info!(
                negotiation = %negotiation.id,
                final_price,
                discount_amount,
                code = %credential.code,
                "offer accepted, credential minted"
            );
            Ok((negotiation, credential))
        })
    }

    /// Either party walks away; the reason lands in a trailing system message
    pub fn reject(
        &self,
        negotiation_id: &NegotiationId,
        sender_id: &str,
        reason: Option<&str>,
    ) -> Result<Negotiation> {
        with_version_retries(|| {
            let repo = SqliteNegotiationRepository::new(self.conn);
            let mut negotiation = self.load(&repo, negotiation_id)?;
            let now = chrono::Utc::now().timestamp_millis();

            if !negotiation.is_party(sender_id) {
                return Err(Error::NotOwner);
            }
            ensure_active(&negotiation, now)?;

            let note = reason.map_or_else(
                || format!("negotiation rejected by {sender_id}"),
                |r| format!("negotiation rejected by {sender_id}: {r}"),
            );

            let tx = self.conn.unchecked_transaction()?;
            SqliteMessageLog::new(self.conn).append(&Message::system(negotiation.id, note))?;
            negotiation.status = NegotiationStatus::Rejected;
            negotiation.last_activity_at = now;
            let expected = negotiation.version;
            repo.update_versioned(&negotiation, expected)?;
            tx.commit()?;

            tracing::info!(negotiation = %negotiation.id, by = sender_id, "negotiation rejected");
            Ok(negotiation)
        })
    }

    /// Payment pipeline confirms the discounted purchase went through
    ///
    /// Requires that the negotiation's credential was redeemed by the same
    /// payment. Records the purchase in the platform ledger.
    pub fn mark_completed(
        &self,
        negotiation_id: &NegotiationId,
        payment_id: &str,
    ) -> Result<Negotiation> {
        with_version_retries(|| {
            let repo = SqliteNegotiationRepository::new(self.conn);
            let mut negotiation = self.load(&repo, negotiation_id)?;
            let now = chrono::Utc::now().timestamp_millis();

            if negotiation.status != NegotiationStatus::Accepted {
                return Err(Error::InvalidState(negotiation.status.to_string()));
            }

            let credential = SqliteCredentialStore::new(self.conn)
                .find_for_negotiation(negotiation_id)?
                .ok_or_else(|| Error::NotFound(format!("credential for {negotiation_id}")))?;
            if credential.used_by_payment_id.as_deref() != Some(payment_id) {
                return Err(Error::InvalidInput(
                    "payment does not match the credential redemption".into(),
                ));
            }

            let final_price = negotiation.final_price.ok_or_else(|| {
                Error::InvalidInput("accepted negotiation is missing its final price".into())
            })?;

            let tx = self.conn.unchecked_transaction()?;
            negotiation.status = NegotiationStatus::Completed;
            negotiation.last_activity_at = now;
            let expected = negotiation.version;
            repo.update_versioned(&negotiation, expected)?;
            SqlitePurchaseLedger::new(self.conn).record_purchase(
                payment_id,
                &negotiation.buyer_id,
                &negotiation.item_id,
                final_price,
                now,
            )?;
            tx.commit()?;

            tracing::info!(negotiation = %negotiation.id, payment = payment_id, "negotiation completed");
            Ok(negotiation)
        })
    }

    /// Get a negotiation by id
    pub fn get(&self, negotiation_id: &NegotiationId) -> Result<Negotiation> {
        let repo = SqliteNegotiationRepository::new(self.conn);
        self.load(&repo, negotiation_id)
    }

    /// All messages of a negotiation, in log order
    pub fn messages(&self, negotiation_id: &NegotiationId) -> Result<Vec<Message>> {
        SqliteMessageLog::new(self.conn).list(negotiation_id)
    }

    /// Messages after a cursor, for incremental reads
    pub fn messages_since(
        &self,
        negotiation_id: &NegotiationId,
        after_seq: i64,
        limit: usize,
    ) -> Result<Vec<Message>> {
        SqliteMessageLog::new(self.conn).list_since(negotiation_id, after_seq, limit)
    }

    /// Negotiations where the user participates, newest activity first
    pub fn list_for_user(&self, user_id: &str) -> Result<Vec<Negotiation>> {
        SqliteNegotiationRepository::new(self.conn).list_for_user(user_id)
    }

    /// Transition every overdue active negotiation to `expired`
    pub fn sweep_expired(&self, now: i64) -> Result<Vec<NegotiationId>> {
        let expired = SqliteNegotiationRepository::new(self.conn).expire_due(now)?;
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "expired overdue negotiations");
        }
        Ok(expired)
    }

    fn load(
        &self,
        repo: &SqliteNegotiationRepository<'_>,
        id: &NegotiationId,
    ) -> Result<Negotiation> {
        repo.get(id)?
            .ok_or_else(|| Error::NotFound(format!("negotiation {id}")))
    }
}

/// Active-state guard shared by all party actions
///
/// A negotiation past its wall-clock expiry refuses mutations even before
/// the background sweep has flipped its stored status.
fn ensure_active(negotiation: &Negotiation, now: i64) -> Result<()> {
    if negotiation.status != NegotiationStatus::Active {
        return Err(Error::InvalidState(negotiation.status.to_string()));
    }
    if negotiation.is_past_expiry(now) {
        return Err(Error::InvalidState(NegotiationStatus::Expired.to_string()));
    }
    Ok(())
}

/// Free-text/template content validation
fn validate_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::InvalidInput("message content is empty".into()));
    }
    if text.chars().count() > MAX_FREE_TEXT_LEN {
        return Err(Error::InvalidInput(format!(
            "message content exceeds {MAX_FREE_TEXT_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, SqliteCatalog};
    use crate::models::CredentialStatus;
    use pretty_assertions::assert_eq;

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        SqliteCatalog::new(db.connection())
            .upsert_item("item-1", 500)
            .unwrap();
        db
    }

    fn service<'a>(db: &'a Database, catalog: &'a SqliteCatalog<'a>) -> NegotiationService<'a> {
        NegotiationService::new(db.connection(), catalog)
    }

    /// Force the stored expiry into the past, simulating elapsed time
    fn force_expiry(db: &Database, id: &NegotiationId, expires_at: i64) {
        db.connection()
            .execute(
                "UPDATE negotiations SET expires_at = ? WHERE id = ?",
                rusqlite::params![expires_at, id],
            )
            .unwrap();
    }

    #[test]
    fn test_start_creates_active_negotiation() {
        let db = setup();
        let catalog = SqliteCatalog::new(db.connection());
        let svc = service(&db, &catalog);

        let n = svc.start("b1", "s1", "item-1", Some("is this negotiable?")).unwrap();
        assert_eq!(n.status, NegotiationStatus::Active);
        assert_eq!(n.original_price, 500);
        assert_eq!(n.minimum_price, 350);

        let messages = svc.messages(&n.id).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "is this negotiable?");
        assert_eq!(messages[0].kind, MessageKind::FreeText);
    }

    #[test]
    fn test_start_rejects_duplicate_active() {
        let db = setup();
        let catalog = SqliteCatalog::new(db.connection());
        let svc = service(&db, &catalog);

        svc.start("b1", "s1", "item-1", None).unwrap();
        let err = svc.start("b1", "s1", "item-1", None).unwrap_err();
        assert!(matches!(err, Error::DuplicateActiveNegotiation));
    }

    #[test]
    fn test_start_unknown_item() {
        let db = setup();
        let catalog = SqliteCatalog::new(db.connection());
        let svc = service(&db, &catalog);
        assert!(matches!(
            svc.start("b1", "s1", "no-such-item", None).unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[test]
    fn test_start_rejects_self_negotiation() {
        let db = setup();
        let catalog = SqliteCatalog::new(db.connection());
        let svc = service(&db, &catalog);
        assert!(matches!(
            svc.start("b1", "b1", "item-1", None).unwrap_err(),
            Error::InvalidInput(_)
        ));
    }

    #[test]
    fn test_offer_above_floor_moves_current_offer() {
        let db = setup();
        let catalog = SqliteCatalog::new(db.connection());
        let svc = service(&db, &catalog);

        let n = svc.start("b1", "s1", "item-1", None).unwrap();
        let msg = svc
            .post_message(&n.id, "b1", MessageKind::PriceOffer, "", Some(450))
            .unwrap();
        assert_eq!(msg.price_offer, Some(450));
        assert_eq!(msg.seq, 1);

        let stored = svc.get(&n.id).unwrap();
        assert_eq!(stored.current_offer, Some(450));
        assert!(stored.version > n.version);
    }

    #[test]
    fn test_offer_below_floor_rejected() {
        let db = setup();
        let catalog = SqliteCatalog::new(db.connection());
        let svc = service(&db, &catalog);

        let n = svc.start("b1", "s1", "item-1", None).unwrap();
        let err = svc
            .post_message(&n.id, "b1", MessageKind::PriceOffer, "", Some(300))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::PriceOutOfBounds { offer: 300, min: 350, max: 500 }
        ));

        // Nothing was appended and the offer state is untouched
        assert!(svc.messages(&n.id).unwrap().is_empty());
        assert_eq!(svc.get(&n.id).unwrap().current_offer, None);
    }

    #[test]
    fn test_offer_above_ceiling_rejected() {
        let db = setup();
        let catalog = SqliteCatalog::new(db.connection());
        let svc = service(&db, &catalog);

        let n = svc.start("b1", "s1", "item-1", None).unwrap();
        let err = svc
            .post_message(&n.id, "s1", MessageKind::CounterOffer, "", Some(600))
            .unwrap_err();
        assert!(matches!(err, Error::PriceOutOfBounds { .. }));
    }

    #[test]
    fn test_stranger_cannot_post() {
        let db = setup();
        let catalog = SqliteCatalog::new(db.connection());
        let svc = service(&db, &catalog);

        let n = svc.start("b1", "s1", "item-1", None).unwrap();
        let err = svc
            .post_message(&n.id, "intruder", MessageKind::FreeText, "hi", None)
            .unwrap_err();
        assert!(matches!(err, Error::NotOwner));
    }

    #[test]
    fn test_system_kind_not_postable() {
        let db = setup();
        let catalog = SqliteCatalog::new(db.connection());
        let svc = service(&db, &catalog);

        let n = svc.start("b1", "s1", "item-1", None).unwrap();
        let err = svc
            .post_message(&n.id, "b1", MessageKind::System, "fake", None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_free_text_length_cap() {
        let db = setup();
        let catalog = SqliteCatalog::new(db.connection());
        let svc = service(&db, &catalog);

        let n = svc.start("b1", "s1", "item-1", None).unwrap();
        let long = "x".repeat(MAX_FREE_TEXT_LEN + 1);
        let err = svc
            .post_message(&n.id, "b1", MessageKind::FreeText, &long, None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let ok = "x".repeat(MAX_FREE_TEXT_LEN);
        svc.post_message(&n.id, "b1", MessageKind::FreeText, &ok, None)
            .unwrap();
    }

    #[test]
    fn test_accept_locks_price_and_mints_credential() {
        let db = setup();
        let catalog = SqliteCatalog::new(db.connection());
        let svc = service(&db, &catalog);

        let n = svc.start("b1", "s1", "item-1", None).unwrap();
        svc.post_message(&n.id, "b1", MessageKind::PriceOffer, "", Some(450))
            .unwrap();

        let (accepted, credential) = svc.accept(&n.id, "s1").unwrap();
        assert_eq!(accepted.status, NegotiationStatus::Accepted);
        assert_eq!(accepted.final_price, Some(450));
        assert_eq!(accepted.discount_code.as_deref(), Some(credential.code.as_str()));

        assert_eq!(credential.discount_amount, Some(50));
        assert_eq!(credential.buyer_id, "b1");
        assert_eq!(credential.scope_item_id.as_deref(), Some("item-1"));
        assert_eq!(credential.status, CredentialStatus::Unused);
    }

    #[test]
    fn test_accept_requires_pending_offer() {
        let db = setup();
        let catalog = SqliteCatalog::new(db.connection());
        let svc = service(&db, &catalog);

        let n = svc.start("b1", "s1", "item-1", None).unwrap();
        let err = svc.accept(&n.id, "s1").unwrap_err();
        assert!(matches!(err, Error::NoPendingOffer));
    }

    #[test]
    fn test_accept_only_by_seller() {
        let db = setup();
        let catalog = SqliteCatalog::new(db.connection());
        let svc = service(&db, &catalog);

        let n = svc.start("b1", "s1", "item-1", None).unwrap();
        svc.post_message(&n.id, "b1", MessageKind::PriceOffer, "", Some(450))
            .unwrap();

        assert!(matches!(svc.accept(&n.id, "b1").unwrap_err(), Error::NotOwner));
    }

    #[test]
    fn test_terminal_states_are_monotonic() {
        let db = setup();
        let catalog = SqliteCatalog::new(db.connection());
        let svc = service(&db, &catalog);

        let n = svc.start("b1", "s1", "item-1", None).unwrap();
        svc.reject(&n.id, "s1", Some("not selling below list")).unwrap();

        // No further messages or transitions
        let err = svc
            .post_message(&n.id, "b1", MessageKind::FreeText, "please?", None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert!(matches!(
            svc.accept(&n.id, "s1").unwrap_err(),
            Error::InvalidState(_)
        ));
        assert!(matches!(
            svc.reject(&n.id, "b1", None).unwrap_err(),
            Error::InvalidState(_)
        ));
    }

    #[test]
    fn test_reject_records_reason_in_system_message() {
        let db = setup();
        let catalog = SqliteCatalog::new(db.connection());
        let svc = service(&db, &catalog);

        let n = svc.start("b1", "s1", "item-1", None).unwrap();
        svc.reject(&n.id, "s1", Some("price too low")).unwrap();

        let messages = svc.messages(&n.id).unwrap();
        let last = messages.last().unwrap();
        assert_eq!(last.kind, MessageKind::System);
        assert!(last.content.contains("price too low"));
        assert!(last.content.contains("s1"));
    }

    #[test]
    fn test_double_accept_fails_but_credential_stays_unique() {
        let db = setup();
        let catalog = SqliteCatalog::new(db.connection());
        let svc = service(&db, &catalog);

        let n = svc.start("b1", "s1", "item-1", None).unwrap();
        svc.post_message(&n.id, "b1", MessageKind::PriceOffer, "", Some(450))
            .unwrap();

        svc.accept(&n.id, "s1").unwrap();
        assert!(matches!(
            svc.accept(&n.id, "s1").unwrap_err(),
            Error::InvalidState(_)
        ));

        let count: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM discount_codes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_expired_negotiation_refuses_actions_even_before_sweep() {
        let db = setup();
        let catalog = SqliteCatalog::new(db.connection());
        let svc = service(&db, &catalog);

        let n = svc.start("b1", "s1", "item-1", None).unwrap();
        svc.post_message(&n.id, "b1", MessageKind::PriceOffer, "", Some(450))
            .unwrap();
        force_expiry(&db, &n.id, 0);

        assert!(matches!(
            svc.post_message(&n.id, "b1", MessageKind::FreeText, "hello?", None)
                .unwrap_err(),
            Error::InvalidState(_)
        ));
        assert!(matches!(svc.accept(&n.id, "s1").unwrap_err(), Error::InvalidState(_)));
    }

    #[test]
    fn test_sweep_expires_overdue_then_blocks_messages() {
        let db = setup();
        let catalog = SqliteCatalog::new(db.connection());
        let svc = service(&db, &catalog);

        let n = svc.start("b1", "s1", "item-1", None).unwrap();
        force_expiry(&db, &n.id, 1_000);

        let expired = svc
            .sweep_expired(chrono::Utc::now().timestamp_millis())
            .unwrap();
        assert_eq!(expired, vec![n.id]);
        assert_eq!(svc.get(&n.id).unwrap().status, NegotiationStatus::Expired);
        assert_eq!(svc.get(&n.id).unwrap().discount_code, None);

        let err = svc
            .post_message(&n.id, "b1", MessageKind::FreeText, "anyone?", None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn test_mark_completed_requires_redeemed_credential() {
        let db = setup();
        let catalog = SqliteCatalog::new(db.connection());
        let svc = service(&db, &catalog);

        let n = svc.start("b1", "s1", "item-1", None).unwrap();
        svc.post_message(&n.id, "b1", MessageKind::PriceOffer, "", Some(450))
            .unwrap();
        let (_, credential) = svc.accept(&n.id, "s1").unwrap();

        // Payment pipeline has not redeemed yet
        assert!(matches!(
            svc.mark_completed(&n.id, "pay-1").unwrap_err(),
            Error::InvalidInput(_)
        ));

        SqliteCredentialStore::new(db.connection())
            .mark_used(&credential.code, "pay-1", chrono::Utc::now().timestamp_millis())
            .unwrap();

        let completed = svc.mark_completed(&n.id, "pay-1").unwrap();
        assert_eq!(completed.status, NegotiationStatus::Completed);

        // The purchase landed in the ledger
        let ledger = SqlitePurchaseLedger::new(db.connection());
        assert!(ledger.has_completed_purchase("b1").unwrap());
    }

    #[test]
    fn test_mark_completed_only_from_accepted() {
        let db = setup();
        let catalog = SqliteCatalog::new(db.connection());
        let svc = service(&db, &catalog);

        let n = svc.start("b1", "s1", "item-1", None).unwrap();
        assert!(matches!(
            svc.mark_completed(&n.id, "pay-1").unwrap_err(),
            Error::InvalidState(_)
        ));
    }

    #[test]
    fn test_new_negotiation_allowed_after_terminal() {
        let db = setup();
        let catalog = SqliteCatalog::new(db.connection());
        let svc = service(&db, &catalog);

        let n = svc.start("b1", "s1", "item-1", None).unwrap();
        svc.reject(&n.id, "b1", None).unwrap();

        // The partial unique index only binds active rows
        svc.start("b1", "s1", "item-1", None).unwrap();
    }

    #[test]
    fn test_list_for_user() {
        let db = setup();
        let catalog = SqliteCatalog::new(db.connection());
        SqliteCatalog::new(db.connection())
            .upsert_item("item-2", 300)
            .unwrap();
        let svc = service(&db, &catalog);

        svc.start("b1", "s1", "item-1", None).unwrap();
        svc.start("b2", "s1", "item-2", None).unwrap();

        assert_eq!(svc.list_for_user("s1").unwrap().len(), 2);
        assert_eq!(svc.list_for_user("b1").unwrap().len(), 1);
    }
}
