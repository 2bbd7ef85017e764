//! Persisted defaults for the CLI, backed by a SQLite key-value table.
//!
//! Flags always win; a stored value is used when the flag is absent; the
//! built-in default is used when neither is set.

use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use std::sync::Mutex;

use crate::consts::{DEFAULT_BASE_URL, SUMMARY_TYPES};

/// Summarizer service base URL.
pub const KEY_BASE_URL: &str = "base_url";
/// Default `summary_type` form value.
pub const KEY_SUMMARY_TYPE: &str = "summary_type";

/// Keys `scribe config` accepts.
pub const KNOWN_KEYS: &[&str] = &[KEY_BASE_URL, KEY_SUMMARY_TYPE];

/// Persistent key-value configuration store.
pub struct Config {
    conn: Mutex<Connection>,
}

impl Config {
    /// Open or create the config table in the given database.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open config database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS config (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .context("failed to create config table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get a config value by key.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT value FROM config WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Set a known config value (upsert).
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        if !KNOWN_KEYS.contains(&key) {
            bail!(
                "unknown config key: {key} (expected one of: {})",
                KNOWN_KEYS.join(", ")
            );
        }
        if key == KEY_SUMMARY_TYPE {
            check_summary_type(value)?;
        }
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    /// Remove a config key.
    pub fn remove(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM config WHERE key = ?1", [key])?;
        Ok(())
    }

    /// Resolve the base URL: flag, then stored value, then default.
    pub fn base_url(&self, flag: Option<&str>) -> Result<String> {
        self.resolve(flag, KEY_BASE_URL, DEFAULT_BASE_URL)
    }

    /// Resolve the summary type: flag, then stored value, then `quick`.
    /// A stored value the service would not understand is an error.
    pub fn summary_type(&self, flag: Option<&str>) -> Result<String> {
        let value = self.resolve(flag, KEY_SUMMARY_TYPE, "quick")?;
        check_summary_type(&value)?;
        Ok(value)
    }

    fn resolve(&self, flag: Option<&str>, key: &str, default: &str) -> Result<String> {
        if let Some(value) = flag {
            return Ok(value.to_string());
        }
        Ok(self.get(key)?.unwrap_or_else(|| default.to_string()))
    }
}

fn check_summary_type(value: &str) -> Result<()> {
    if !SUMMARY_TYPES.contains(&value) {
        bail!(
            "invalid summary_type: {value} (expected one of: {})",
            SUMMARY_TYPES.join(", ")
        );
    }
    Ok(())
}
