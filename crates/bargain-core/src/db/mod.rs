//! Database layer for Bargain

mod connection;
mod credential_store;
mod external;
mod message_log;
mod migrations;
mod negotiation_repository;

pub use connection::Database;
pub use credential_store::{CredentialStore, SqliteCredentialStore};
pub use external::{Catalog, PurchaseLedger, SqliteCatalog, SqlitePurchaseLedger};
pub use message_log::{MessageLog, SqliteMessageLog};
pub use negotiation_repository::{NegotiationRepository, SqliteNegotiationRepository};
