use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] bargain_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid negotiation ID: {0}")]
    InvalidNegotiationId(String),
    #[error("User ID cannot be empty")]
    EmptyUserId,
    #[error("Discount code cannot be empty")]
    EmptyCode,
}
