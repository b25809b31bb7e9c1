//! Append-only negotiation message log
//!
//! The log is a dumb, reliable ledger: it enforces ordering and immutability
//! of past entries and nothing else. All price and lifecycle enforcement
//! lives in the negotiation service.

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use crate::error::{Error, Result};
use crate::models::{Message, NegotiationId};
use rusqlite::{params, Connection};

const SELECT_COLUMNS: &str =
    "id, negotiation_id, sender_id, kind, content, price_offer, seq, created_at";

/// Trait for the append-only message log
///
/// There are deliberately no update or delete operations.
pub trait MessageLog {
    /// Append a message, assigning the next sequence number
    fn append(&self, message: &Message) -> Result<i64>;

    /// List all messages of a negotiation in log order
    fn list(&self, negotiation_id: &NegotiationId) -> Result<Vec<Message>>;

    /// List up to `limit` messages with `seq > after_seq`, in log order
    ///
    /// Restartable: pass the last seen `seq` as the next cursor.
    fn list_since(
        &self,
        negotiation_id: &NegotiationId,
        after_seq: i64,
        limit: usize,
    ) -> Result<Vec<Message>>;
}

/// `SQLite` implementation of `MessageLog`
pub struct SqliteMessageLog<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteMessageLog<'a> {
    /// Create a new log with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a message from a database row
    fn parse_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
        Ok(Message {
            id: row.get(0)?,
            negotiation_id: row.get(1)?,
            sender_id: row.get(2)?,
            kind: row.get(3)?,
            content: row.get(4)?,
            price_offer: row.get(5)?,
            seq: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

impl MessageLog for SqliteMessageLog<'_> {
    fn append(&self, message: &Message) -> Result<i64> {
        // Sequence assignment and insert in one statement so the
        // (negotiation_id, seq) uniqueness never races
        self.conn.execute(
            "INSERT INTO messages (id, negotiation_id, sender_id, kind, content, price_offer,
             seq, created_at)
             VALUES (?, ?, ?, ?, ?, ?,
                     (SELECT COALESCE(MAX(seq), 0) + 1 FROM messages WHERE negotiation_id = ?),
                     ?)",
            params![
                message.id,
                message.negotiation_id,
                message.sender_id,
                message.kind,
                message.content,
                message.price_offer,
                message.negotiation_id,
                message.created_at,
            ],
        )?;

        let seq = self.conn.query_row(
            "SELECT seq FROM messages WHERE id = ?",
            params![message.id],
            |row| row.get(0),
        )?;

        Ok(seq)
    }

    fn list(&self, negotiation_id: &NegotiationId) -> Result<Vec<Message>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM messages WHERE negotiation_id = ? ORDER BY seq"
        ))?;

        let messages = stmt
            .query_map(params![negotiation_id], Self::parse_message)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(messages)
    }

    fn list_since(
        &self,
        negotiation_id: &NegotiationId,
        after_seq: i64,
        limit: usize,
    ) -> Result<Vec<Message>> {
        if limit == 0 {
            return Err(Error::InvalidInput("limit must be positive".into()));
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM messages
             WHERE negotiation_id = ? AND seq > ?
             ORDER BY seq
             LIMIT ?"
        ))?;

        let messages = stmt
            .query_map(
                params![negotiation_id, after_seq, limit as i64],
                Self::parse_message,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(messages)
    }
}
