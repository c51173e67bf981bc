//! Settings repository implementation

use crate::error::Result;
use rusqlite::{params, Connection};

/// Settings key gating the immediate sync on first app launch
pub const FIRST_RUN_COMPLETED: &str = "first_run_completed";

/// Trait for key/value settings storage
pub trait SettingsRepository {
    /// Load a setting value
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a setting value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Whether the first-launch sync has already been attempted
    fn first_run_completed(&self) -> Result<bool> {
        Ok(self
            .get(FIRST_RUN_COMPLETED)?
            .is_some_and(|value| value == "true"))
    }

    /// Record that the first-launch sync has been attempted
    fn mark_first_run_completed(&self) -> Result<()> {
        self.set(FIRST_RUN_COMPLETED, "true")
    }
}

/// `SQLite` implementation of `SettingsRepository`
pub struct SqliteSettingsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSettingsRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SettingsRepository for SqliteSettingsRepository<'_> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let result = self.conn.query_row(
            "SELECT value FROM settings WHERE key = ?",
            params![key],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
            params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_get_missing_setting() {
        let db = setup();
        let repo = SqliteSettingsRepository::new(db.connection());

        assert!(repo.get("nope").unwrap().is_none());
    }

    #[test]
    fn test_set_and_get() {
        let db = setup();
        let repo = SqliteSettingsRepository::new(db.connection());

        repo.set("endpoint", "https://example.test").unwrap();
        repo.set("endpoint", "https://example.test/v2").unwrap();

        assert_eq!(
            repo.get("endpoint").unwrap().as_deref(),
            Some("https://example.test/v2")
        );
    }

    #[test]
    fn test_first_run_flag() {
        let db = setup();
        let repo = SqliteSettingsRepository::new(db.connection());

        assert!(!repo.first_run_completed().unwrap());
        repo.mark_first_run_completed().unwrap();
        assert!(repo.first_run_completed().unwrap());
    }
}
