//! Error types for bargain-core

use thiserror::Error;

/// Result type alias using bargain-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in bargain-core operations
///
/// The first group are expected business outcomes (lifecycle and credential
/// rules) and must be surfaced to the caller as-is; the trailing variants
/// wrap infrastructure failures.
#[derive(Error, Debug)]
pub enum Error {
    /// Action not permitted in the current lifecycle state
    #[error("action not permitted while negotiation is {0}")]
    InvalidState(String),

    /// Price offer outside the allowed floor/ceiling range
    #[error("offer {offer} is outside the allowed range {min}..={max}")]
    PriceOutOfBounds { offer: i64, min: i64, max: i64 },

    /// An active negotiation already exists for this buyer and item
    #[error("an active negotiation already exists for this buyer and item")]
    DuplicateActiveNegotiation,

    /// Accept called with no offer on the table
    #[error("no pending offer to accept")]
    NoPendingOffer,

    /// Lost an optimistic-concurrency race; the caller may retry
    #[error("negotiation was modified concurrently, please try again")]
    VersionConflict,

    /// Discount code does not exist
    #[error("discount code not found")]
    CodeNotFound,

    /// Discount code has already been redeemed
    #[error("discount code has already been used")]
    AlreadyUsed,

    /// Discount code is past its expiry
    #[error("discount code has expired")]
    Expired,

    /// Caller is not the owner/party of the resource
    #[error("caller is not a party to this resource")]
    NotOwner,

    /// Negotiated code presented against a different item
    #[error("discount code is not valid for this item")]
    WrongItem,

    /// Item price below the welcome code's minimum purchase amount
    #[error("purchase amount is below the code minimum of {minimum}")]
    BelowMinimumPurchase { minimum: i64 },

    /// Buyer does not qualify for a welcome code
    #[error("buyer is not eligible for a welcome code")]
    NotEligible,

    /// Entity not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// SQLite error
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is a transient concurrency loss worth retrying
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::VersionConflict)
    }
}
