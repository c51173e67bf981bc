//! Update-watermark repository implementation

use crate::error::Result;
use crate::models::Watermark;
use rusqlite::{params, Connection};

/// Trait for watermark storage operations
pub trait WatermarkRepository {
    /// Load the watermark, if a sync has ever completed
    fn get(&self) -> Result<Option<Watermark>>;

    /// Overwrite the watermark (single row, never appended)
    fn set(&self, watermark: &Watermark) -> Result<()>;

    /// The watermark timestamp, with the zero sentinel when absent.
    ///
    /// Zero doubles as the first-install signal.
    fn last_timestamp(&self) -> Result<i64> {
        Ok(self.get()?.map_or(0, |watermark| watermark.timestamp))
    }
}

/// `SQLite` implementation of `WatermarkRepository`
pub struct SqliteWatermarkRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteWatermarkRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl WatermarkRepository for SqliteWatermarkRepository<'_> {
    fn get(&self) -> Result<Option<Watermark>> {
        let result = self.conn.query_row(
            "SELECT timestamp, version FROM watermark WHERE id = 1",
            [],
            |row| {
                Ok(Watermark {
                    timestamp: row.get(0)?,
                    version: row.get(1)?,
                })
            },
        );

        match result {
            Ok(watermark) => Ok(Some(watermark)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, watermark: &Watermark) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO watermark (id, timestamp, version) VALUES (1, ?, ?)",
            params![watermark.timestamp, watermark.version],
        )?;
        Ok(())
    }
}
