//! bargain-core - Core library for Bargain
//!
//! This crate contains the negotiation state machine, the discount credential
//! store, and the validation/redemption logic shared by all Bargain
//! interfaces (CLI, service embedding).

pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use error::{Error, Result};
pub use models::{DiscountCredential, Message, MessageId, Negotiation, NegotiationId};
