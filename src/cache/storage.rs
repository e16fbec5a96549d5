//! Cache storage trait and SQLite implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A raw row as persisted by a backend.
#[derive(Debug, Clone)]
pub struct StoredEntry {
  /// Serialized payload
  pub payload: Vec<u8>,
  /// When the payload was written
  pub written_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
///
/// Backends report their faults; the TTL layer above them decides to swallow.
pub trait CacheStorage: Send + Sync {
  /// Read a raw entry.
  fn load(&self, key: &str) -> Result<Option<StoredEntry>>;

  /// Write (or overwrite) a raw entry.
  fn save(&self, key: &str, entry: &StoredEntry) -> Result<()>;

  /// Remove a single entry.
  fn remove(&self, key: &str) -> Result<()>;

  /// Remove every entry.
  fn clear(&self) -> Result<()>;

  /// Number of stored entries, expired or not.
  fn count(&self) -> Result<usize>;

  /// Human-readable location of the backing store.
  fn location(&self) -> String;
}

/// Storage implementation that doesn't cache anything.
/// Used with `--no-cache` or `cache.enabled: false`.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn load(&self, _key: &str) -> Result<Option<StoredEntry>> {
    Ok(None) // Always miss
  }

  fn save(&self, _key: &str, _entry: &StoredEntry) -> Result<()> {
    Ok(()) // Discard
  }

  fn remove(&self, _key: &str) -> Result<()> {
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    Ok(())
  }

  fn count(&self) -> Result<usize> {
    Ok(0)
  }

  fn location(&self) -> String {
    "disabled".to_string()
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
  location: String,
}

impl SqliteStorage {
  /// Open the cache database at `path`, or at the default location.
  pub fn open(path: Option<&Path>) -> Result<Self> {
    let path = match path {
      Some(p) => p.to_path_buf(),
      None => Self::default_path()?,
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn, path.display().to_string())
  }

  /// Open a private in-memory database.
  #[cfg(test)]
  pub fn in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::with_connection(conn, ":memory:".to_string())
  }

  fn with_connection(conn: Connection, location: String) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
      location,
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("ghx").join("cache.db"))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }

  fn connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

/// Schema for the response cache.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS response_cache (
    key_hash TEXT PRIMARY KEY,
    cache_key TEXT NOT NULL,
    payload BLOB NOT NULL,
    written_at TEXT NOT NULL
);
"#;

/// SHA256 hash for stable, fixed-length primary keys.
fn hash_key(key: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(key.as_bytes());
  hex::encode(hasher.finalize())
}

impl CacheStorage for SqliteStorage {
  fn load(&self, key: &str) -> Result<Option<StoredEntry>> {
    let conn = self.connection()?;

    let row: Option<(Vec<u8>, String)> = conn
      .query_row(
        "SELECT payload, written_at FROM response_cache WHERE key_hash = ?",
        params![hash_key(key)],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cache entry: {}", e))?;

    match row {
      Some((payload, written_at)) => Ok(Some(StoredEntry {
        payload,
        written_at: parse_datetime(&written_at)?,
      })),
      None => Ok(None),
    }
  }

  fn save(&self, key: &str, entry: &StoredEntry) -> Result<()> {
    let conn = self.connection()?;

    conn
      .execute(
        "INSERT OR REPLACE INTO response_cache (key_hash, cache_key, payload, written_at)
         VALUES (?, ?, ?, ?)",
        params![
          hash_key(key),
          key,
          entry.payload,
          entry.written_at.to_rfc3339()
        ],
      )
      .map_err(|e| eyre!("Failed to store cache entry: {}", e))?;

    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let conn = self.connection()?;

    conn
      .execute(
        "DELETE FROM response_cache WHERE key_hash = ?",
        params![hash_key(key)],
      )
      .map_err(|e| eyre!("Failed to delete cache entry: {}", e))?;

    Ok(())
  }

  fn clear(&self) -> Result<()> {
    let conn = self.connection()?;

    conn
      .execute("DELETE FROM response_cache", [])
      .map_err(|e| eyre!("Failed to clear cache: {}", e))?;

    Ok(())
  }

  fn count(&self) -> Result<usize> {
    let conn = self.connection()?;

    let count: i64 = conn
      .query_row("SELECT COUNT(*) FROM response_cache", [], |row| row.get(0))
      .map_err(|e| eyre!("Failed to count cache entries: {}", e))?;

    Ok(count as usize)
  }

  fn location(&self) -> String {
    self.location.clone()
  }
}

/// Parse an RFC 3339 timestamp written by `save`.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry(payload: &str) -> StoredEntry {
    StoredEntry {
      payload: payload.as_bytes().to_vec(),
      written_at: Utc::now(),
    }
  }

  #[test]
  fn test_save_and_load() {
    let storage = SqliteStorage::in_memory().unwrap();
    let written = entry("[1,2,3]");
    storage.save("pr.list::a::b", &written).unwrap();

    let loaded = storage.load("pr.list::a::b").unwrap().unwrap();
    assert_eq!(loaded.payload, written.payload);
    assert_eq!(loaded.written_at, written.written_at);
  }

  #[test]
  fn test_load_missing() {
    let storage = SqliteStorage::in_memory().unwrap();
    assert!(storage.load("nope").unwrap().is_none());
  }

  #[test]
  fn test_save_overwrites() {
    let storage = SqliteStorage::in_memory().unwrap();
    storage.save("k", &entry("old")).unwrap();
    storage.save("k", &entry("new")).unwrap();

    assert_eq!(storage.count().unwrap(), 1);
    assert_eq!(storage.load("k").unwrap().unwrap().payload, b"new".to_vec());
  }

  #[test]
  fn test_remove_and_clear() {
    let storage = SqliteStorage::in_memory().unwrap();
    storage.save("a", &entry("1")).unwrap();
    storage.save("b", &entry("2")).unwrap();
    storage.save("c", &entry("3")).unwrap();

    storage.remove("a").unwrap();
    assert_eq!(storage.count().unwrap(), 2);

    storage.clear().unwrap();
    assert_eq!(storage.count().unwrap(), 0);
  }

  #[test]
  fn test_persists_across_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("nested").join("cache.db");

    {
      let storage = SqliteStorage::open(Some(&path)).unwrap();
      storage.save("k", &entry("v")).unwrap();
    }

    let storage = SqliteStorage::open(Some(&path)).unwrap();
    assert_eq!(storage.load("k").unwrap().unwrap().payload, b"v".to_vec());
    assert_eq!(storage.location(), path.display().to_string());
  }

  #[test]
  fn test_noop_always_misses() {
    let storage = NoopStorage;
    storage.save("k", &entry("v")).unwrap();
    assert!(storage.load("k").unwrap().is_none());
    assert_eq!(storage.count().unwrap(), 0);
  }
}
