//! Persistent launcher settings.
//!
//! Settings are plain string key-value pairs behind the [`SettingsStore`]
//! trait. The launcher keeps two kinds of entries there: last-launched
//! timestamps per app (see [`recents`]) and the theme preference (see
//! [`theme`]). [`Settings`] is the `SQLite`-backed implementation.

pub mod migrations;
pub mod recents;
pub mod schema;
pub mod theme;

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::{Error, Result};

pub use recents::{RecentEntry, RECENTS_PREFIX};
pub use theme::{Theme, THEME_KEY};

/// A string key-value store.
pub trait SettingsStore {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<bool>;

    /// All entries whose key starts with `prefix`, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn entries_with_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>>;
}

/// `SQLite`-backed settings store.
#[derive(Debug)]
pub struct Settings {
    path: PathBuf,
    conn: Connection,
}

impl Settings {
    /// Open or create a settings database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening settings database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::SettingsOpen {
            path: path.clone(),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self { path, conn })
    }

    /// Create an in-memory settings store.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::SettingsOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Count stored entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM settings", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl SettingsStore for Settings {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
            params![key, value],
        )?;
        debug!("Stored setting {}", key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM settings WHERE key = ?1", [key])?;
        Ok(affected > 0)
    }

    fn entries_with_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        // substr() keeps `%` and `_` in the prefix literal, unlike LIKE
        let mut stmt = self.conn.prepare(
            r"
            SELECT key, value FROM settings
            WHERE substr(key, 1, length(?1)) = ?1
            ORDER BY key
            ",
        )?;

        let entries = stmt
            .query_map([prefix], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }
}
