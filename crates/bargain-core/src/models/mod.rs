//! Data models for Bargain

mod credential;
mod message;
mod negotiation;

pub use credential::{
    negotiated_code, welcome_code, CredentialKind, CredentialStatus, DiscountCredential, CODE_LEN,
    NEGOTIATED_CODE_TTL_MS, WELCOME_CODE_TTL_MS, WELCOME_DISCOUNT_PERCENT,
    WELCOME_MAX_DISCOUNT_CAP, WELCOME_MIN_PURCHASE,
};
pub use message::{Message, MessageId, MessageKind, MAX_FREE_TEXT_LEN, SYSTEM_SENDER};
pub use negotiation::{
    floor_price, Negotiation, NegotiationId, NegotiationStatus, NEGOTIATION_TTL_MS,
};
