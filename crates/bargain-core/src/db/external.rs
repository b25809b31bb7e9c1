//! Collaborator boundary: catalog prices and the purchase ledger
//!
//! The engine never owns item pricing or payment history; it reads both
//! through these traits. The SQLite implementations back the CLI and tests;
//! a deployment embeds the real catalog and payment services here.

use crate::error::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension};

/// Read-only price lookups against the item catalog
pub trait Catalog {
    /// Current list price of an item
    fn item_price(&self, item_id: &str) -> Result<i64>;
}

/// Read/write access to the platform-wide completed-purchase history
pub trait PurchaseLedger {
    /// Whether the buyer has at least one completed purchase anywhere on the
    /// platform (welcome-code eligibility input)
    fn has_completed_purchase(&self, buyer_id: &str) -> Result<bool>;

    /// Record a confirmed purchase
    fn record_purchase(
        &self,
        payment_id: &str,
        buyer_id: &str,
        item_id: &str,
        amount_paid: i64,
        now: i64,
    ) -> Result<()>;
}

/// `SQLite` implementation of `Catalog` over the `items` table
pub struct SqliteCatalog<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteCatalog<'a> {
    /// Create a new catalog with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert or update an item's list price (CLI seeding)
    pub fn upsert_item(&self, item_id: &str, price: i64) -> Result<()> {
        if price <= 0 {
            return Err(Error::InvalidInput("item price must be positive".into()));
        }
        self.conn.execute(
            "INSERT INTO items (id, price) VALUES (?, ?)
             ON CONFLICT(id) DO UPDATE SET price = excluded.price",
            params![item_id, price],
        )?;
        Ok(())
    }

    /// List all items with their prices
    pub fn list_items(&self) -> Result<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare("SELECT id, price FROM items ORDER BY id")?;
        let items = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }
}

impl Catalog for SqliteCatalog<'_> {
    fn item_price(&self, item_id: &str) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT price FROM items WHERE id = ?",
                params![item_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("item {item_id}")))
    }
}

/// `SQLite` implementation of `PurchaseLedger` over `completed_purchases`
pub struct SqlitePurchaseLedger<'a> {
    conn: &'a Connection,
}

impl<'a> SqlitePurchaseLedger<'a> {
    /// Create a new ledger with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl PurchaseLedger for SqlitePurchaseLedger<'_> {
    fn has_completed_purchase(&self, buyer_id: &str) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM completed_purchases WHERE buyer_id = ?)",
            params![buyer_id],
            |row| row.get::<_, i32>(0).map(|v| v != 0),
        )?;
        Ok(exists)
    }

    fn record_purchase(
        &self,
        payment_id: &str,
        buyer_id: &str,
        item_id: &str,
        amount_paid: i64,
        now: i64,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO completed_purchases
             (payment_id, buyer_id, item_id, amount_paid, completed_at)
             VALUES (?, ?, ?, ?, ?)",
            params![payment_id, buyer_id, item_id, amount_paid, now],
        )?;
        Ok(())
    }
}
