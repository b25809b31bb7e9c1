//! Business logic services for Bargain

mod negotiation;
mod redemption;
mod sweeper;
mod welcome;

pub use negotiation::NegotiationService;
pub use redemption::{RedemptionService, ValidatedDiscount};
pub use sweeper::{Sweeper, DEFAULT_SWEEP_INTERVAL};
pub use welcome::WelcomeService;

#[cfg(test)]
mod tests {
    //! End-to-end flow across the services

    use super::*;
    use crate::db::{Database, SqliteCatalog};
    use crate::error::Error;
    use crate::models::{MessageKind, NegotiationStatus};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_negotiate_redeem_complete_flow() {
        let db = Database::open_in_memory().unwrap();
        let catalog = SqliteCatalog::new(db.connection());
        catalog.upsert_item("guitar", 500).unwrap();

        let negotiations = NegotiationService::new(db.connection(), &catalog);
        let redemption = RedemptionService::new(db.connection(), &catalog);
        let welcome = WelcomeService::new(db.connection());

        // Buyer opens and offers 450 (floor is 350)
        let n = negotiations
            .start("buyer-1", "seller-1", "guitar", Some("would you take less?"))
            .unwrap();
        negotiations
            .post_message(&n.id, "buyer-1", MessageKind::PriceOffer, "", Some(450))
            .unwrap();

        // Seller counters, buyer counters back
        negotiations
            .post_message(&n.id, "seller-1", MessageKind::CounterOffer, "", Some(480))
            .unwrap();
        negotiations
            .post_message(&n.id, "buyer-1", MessageKind::CounterOffer, "", Some(460))
            .unwrap();

        // Seller accepts at 460; the credential locks in the 40 difference
        let (accepted, credential) = negotiations.accept(&n.id, "seller-1").unwrap();
        assert_eq!(accepted.final_price, Some(460));
        assert_eq!(credential.discount_amount, Some(40));

        // Checkout preview, then payment-confirmed redemption
        let v = redemption
            .validate_for_purchase(&credential.code, "buyer-1", "guitar")
            .unwrap();
        assert_eq!(v.final_price, 460);

        redemption.redeem(&credential.code, "buyer-1", "pay-42").unwrap();
        let completed = negotiations.mark_completed(&n.id, "pay-42").unwrap();
        assert_eq!(completed.status, NegotiationStatus::Completed);

        // The completed purchase now blocks the welcome path
        assert!(matches!(
            welcome.claim("buyer-1").unwrap_err(),
            Error::NotEligible
        ));

        // The message log kept the whole conversation plus offers in order
        let log = negotiations.messages(&n.id).unwrap();
        assert_eq!(log.len(), 4);
        assert_eq!(log[1].price_offer, Some(450));
        assert_eq!(log[3].price_offer, Some(460));
    }
}
