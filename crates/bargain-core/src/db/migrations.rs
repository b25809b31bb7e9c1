//! Database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get::<_, i32>(0).map(|v| v != 0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

/// Migration to version 1: negotiations, message log, discount codes
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;

        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS negotiations (
            id TEXT PRIMARY KEY,
            item_id TEXT NOT NULL,
            buyer_id TEXT NOT NULL,
            seller_id TEXT NOT NULL,
            original_price INTEGER NOT NULL,
            minimum_price INTEGER NOT NULL,
            current_offer INTEGER,
            final_price INTEGER,
            status TEXT NOT NULL DEFAULT 'active',
            discount_code TEXT,
            created_at INTEGER NOT NULL,
            last_activity_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL,
            version INTEGER NOT NULL DEFAULT 0
        );
        -- At most one active negotiation per (buyer, item)
        CREATE UNIQUE INDEX IF NOT EXISTS idx_negotiations_active_pair
            ON negotiations(buyer_id, item_id) WHERE status = 'active';
        CREATE INDEX IF NOT EXISTS idx_negotiations_buyer ON negotiations(buyer_id);
        CREATE INDEX IF NOT EXISTS idx_negotiations_seller ON negotiations(seller_id);
        CREATE INDEX IF NOT EXISTS idx_negotiations_expiry ON negotiations(status, expires_at);

        CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            negotiation_id TEXT NOT NULL REFERENCES negotiations(id) ON DELETE CASCADE,
            sender_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            content TEXT NOT NULL,
            price_offer INTEGER,
            seq INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE (negotiation_id, seq)
        );
        CREATE INDEX IF NOT EXISTS idx_messages_negotiation ON messages(negotiation_id, seq);

        CREATE TABLE IF NOT EXISTS discount_codes (
            code TEXT PRIMARY KEY,
            buyer_id TEXT NOT NULL,
            scope_item_id TEXT,
            kind TEXT NOT NULL,
            negotiation_id TEXT,
            discount_amount INTEGER,
            discount_percent INTEGER,
            min_purchase_amount INTEGER,
            max_discount_cap INTEGER,
            status TEXT NOT NULL DEFAULT 'unused',
            used_by_payment_id TEXT,
            created_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL
        );
        -- Idempotent minting: one credential per negotiation
        CREATE UNIQUE INDEX IF NOT EXISTS idx_discount_codes_negotiation
            ON discount_codes(negotiation_id) WHERE negotiation_id IS NOT NULL;
        -- One welcome code per buyer, ever
        CREATE UNIQUE INDEX IF NOT EXISTS idx_discount_codes_welcome
            ON discount_codes(buyer_id) WHERE kind = 'welcome';
        CREATE INDEX IF NOT EXISTS idx_discount_codes_buyer ON discount_codes(buyer_id);

        INSERT INTO schema_version (version) VALUES (1);

        COMMIT;",
    )?;

    tracing::info!("Migrated database to version 1");
    Ok(())
}

/// Migration to version 2: collaborator boundary tables (catalog, ledger)
fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;

        CREATE TABLE IF NOT EXISTS items (
            id TEXT PRIMARY KEY,
            price INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS completed_purchases (
            payment_id TEXT PRIMARY KEY,
            buyer_id TEXT NOT NULL,
            item_id TEXT NOT NULL,
            amount_paid INTEGER NOT NULL,
            completed_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_completed_purchases_buyer
            ON completed_purchases(buyer_id);

        INSERT INTO schema_version (version) VALUES (2);

        COMMIT;",
    )?;

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}
