//! Database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
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

/// Migration to version 1: Initial schema
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;

        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        -- Product catalog, keyed by the remote-assigned reference
        CREATE TABLE IF NOT EXISTS products (
            reference TEXT PRIMARY KEY,
            description TEXT NOT NULL DEFAULT '',
            family TEXT NOT NULL DEFAULT '',
            pack_quantity REAL NOT NULL DEFAULT 0,
            sale_unit REAL NOT NULL DEFAULT 0,
            stock REAL NOT NULL DEFAULT 0,
            price REAL NOT NULL DEFAULT 0,
            discount TEXT NOT NULL DEFAULT '',
            state TEXT NOT NULL DEFAULT 'void',
            location TEXT NOT NULL DEFAULT '',
            updated_at INTEGER NOT NULL DEFAULT 0,
            sync_generation INTEGER NOT NULL DEFAULT 0,
            search_text TEXT NOT NULL DEFAULT ''
        );
        CREATE INDEX IF NOT EXISTS idx_products_updated ON products(updated_at DESC);
        CREATE INDEX IF NOT EXISTS idx_products_family ON products(family);
        CREATE INDEX IF NOT EXISTS idx_products_generation ON products(sync_generation);

        -- Full-text search over the normalized search_text column
        CREATE VIRTUAL TABLE IF NOT EXISTS products_fts USING fts5(
            search_text,
            content=products,
            content_rowid=rowid
        );

        -- Triggers to keep FTS in sync
        CREATE TRIGGER IF NOT EXISTS products_ai AFTER INSERT ON products BEGIN
            INSERT INTO products_fts(rowid, search_text) VALUES (NEW.rowid, NEW.search_text);
        END;
        CREATE TRIGGER IF NOT EXISTS products_ad AFTER DELETE ON products BEGIN
            INSERT INTO products_fts(products_fts, rowid, search_text) VALUES('delete', OLD.rowid, OLD.search_text);
        END;
        CREATE TRIGGER IF NOT EXISTS products_au AFTER UPDATE ON products BEGIN
            INSERT INTO products_fts(products_fts, rowid, search_text) VALUES('delete', OLD.rowid, OLD.search_text);
            INSERT INTO products_fts(rowid, search_text) VALUES (NEW.rowid, NEW.search_text);
        END;

        -- Single-row update watermark
        CREATE TABLE IF NOT EXISTS watermark (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            timestamp INTEGER NOT NULL,
            version TEXT NOT NULL
        );

        -- Settings table (local only)
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Record migration version
        INSERT INTO schema_version (version) VALUES (1);

        COMMIT;",
    )?;

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}
