//! TTL-bounded cache store over a storage backend.
//!
//! Every fault below this layer degrades to a cache miss; nothing here ever
//! returns an error to the caller.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::key::CacheKey;
use super::storage::{CacheStorage, StoredEntry};

/// Time source for expiry checks.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Manually advanced clock for tests.
#[cfg(test)]
#[derive(Clone)]
pub struct ManualClock {
  now: Arc<std::sync::Mutex<DateTime<Utc>>>,
}

#[cfg(test)]
impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    Self {
      now: Arc::new(std::sync::Mutex::new(start)),
    }
  }

  pub fn advance(&self, by: Duration) {
    if let Ok(mut now) = self.now.lock() {
      *now += by;
    }
  }
}

#[cfg(test)]
impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    self.now.lock().map(|now| *now).unwrap_or_else(|e| *e.into_inner())
  }
}

/// Persisted key/value cache with lazy TTL expiry.
pub struct CacheStore {
  storage: Arc<dyn CacheStorage>,
  clock: Arc<dyn Clock>,
  /// How long before cached data is considered stale
  ttl: Duration,
}

impl CacheStore {
  /// Entries older than this are discarded on read.
  pub const TTL_MINUTES: i64 = 5;

  /// Create a new cache store with the given storage backend.
  pub fn new(storage: impl CacheStorage + 'static) -> Self {
    Self {
      storage: Arc::new(storage),
      clock: Arc::new(SystemClock),
      ttl: Duration::minutes(Self::TTL_MINUTES),
    }
  }

  /// Replace the time source.
  #[cfg(test)]
  pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
    self.clock = Arc::new(clock);
    self
  }

  /// Check if an entry written at `written_at` has outlived the TTL.
  fn is_expired(&self, written_at: DateTime<Utc>) -> bool {
    self.clock.now() - written_at > self.ttl
  }

  /// Look up a payload. Missing, expired, unreadable and undecodable entries
  /// all come back as `None`; expired ones are deleted.
  pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
    let entry = match self.storage.load(key.as_str()) {
      Ok(Some(entry)) => entry,
      Ok(None) => {
        debug!(key = %key, "cache miss");
        return None;
      }
      Err(e) => {
        warn!(key = %key, error = %e, "cache read failed");
        return None;
      }
    };

    if self.is_expired(entry.written_at) {
      debug!(key = %key, written_at = %entry.written_at, "cache entry expired");
      if let Err(e) = self.storage.remove(key.as_str()) {
        warn!(key = %key, error = %e, "failed to remove expired cache entry");
      }
      return None;
    }

    match serde_json::from_slice(&entry.payload) {
      Ok(payload) => {
        debug!(key = %key, "cache hit");
        Some(payload)
      }
      Err(e) => {
        warn!(key = %key, error = %e, "cached payload could not be decoded");
        None
      }
    }
  }

  /// Store a payload stamped with the current time. Failures are logged and
  /// otherwise ignored.
  pub fn set<T: Serialize>(&self, key: &CacheKey, payload: &T) {
    let payload = match serde_json::to_vec(payload) {
      Ok(bytes) => bytes,
      Err(e) => {
        warn!(key = %key, error = %e, "failed to serialize cache payload");
        return;
      }
    };

    let entry = StoredEntry {
      payload,
      written_at: self.clock.now(),
    };

    if let Err(e) = self.storage.save(key.as_str(), &entry) {
      warn!(key = %key, error = %e, "cache write failed");
    }
  }

  /// Remove every entry.
  pub fn clear(&self) {
    if let Err(e) = self.storage.clear() {
      warn!(error = %e, "failed to clear cache");
    }
  }

  /// Number of stored entries; zero when the backend can't tell.
  pub fn entry_count(&self) -> usize {
    self.storage.count().unwrap_or_else(|e| {
      warn!(error = %e, "failed to count cache entries");
      0
    })
  }

  pub fn location(&self) -> String {
    self.storage.location()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::storage::{NoopStorage, SqliteStorage};
  use color_eyre::{eyre::eyre, Result};
  use serde::Deserialize;

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Repo {
    name: String,
    stars: u32,
    topics: Vec<String>,
  }

  fn repo() -> Repo {
    Repo {
      name: "widgets".to_string(),
      stars: 42,
      topics: vec!["cli".to_string(), "rust".to_string()],
    }
  }

  fn store_with_clock() -> (CacheStore, ManualClock) {
    let clock = ManualClock::new(Utc::now());
    let store = CacheStore::new(SqliteStorage::in_memory().unwrap()).with_clock(clock.clone());
    (store, clock)
  }

  /// Backend whose every operation fails.
  struct BrokenStorage;

  impl CacheStorage for BrokenStorage {
    fn load(&self, _key: &str) -> Result<Option<StoredEntry>> {
      Err(eyre!("disk on fire"))
    }
    fn save(&self, _key: &str, _entry: &StoredEntry) -> Result<()> {
      Err(eyre!("disk on fire"))
    }
    fn remove(&self, _key: &str) -> Result<()> {
      Err(eyre!("disk on fire"))
    }
    fn clear(&self) -> Result<()> {
      Err(eyre!("disk on fire"))
    }
    fn count(&self) -> Result<usize> {
      Err(eyre!("disk on fire"))
    }
    fn location(&self) -> String {
      "broken".to_string()
    }
  }

  #[test]
  fn test_set_then_get_returns_equal_value() {
    let (store, _clock) = store_with_clock();
    let key = CacheKey::build(["repo.get".into(), "acme".into()]);

    store.set(&key, &repo());
    assert_eq!(store.get::<Repo>(&key), Some(repo()));
  }

  #[test]
  fn test_get_missing_is_none() {
    let (store, _clock) = store_with_clock();
    let key = CacheKey::build(["repo.get".into()]);
    assert_eq!(store.get::<Repo>(&key), None);
  }

  #[test]
  fn test_entry_at_exact_ttl_is_still_valid() {
    let (store, clock) = store_with_clock();
    let key = CacheKey::build(["k".into()]);

    store.set(&key, &repo());
    clock.advance(Duration::minutes(5));
    assert_eq!(store.get::<Repo>(&key), Some(repo()));
  }

  #[test]
  fn test_expired_entry_is_removed() {
    let (store, clock) = store_with_clock();
    let key = CacheKey::build(["k".into()]);

    store.set(&key, &repo());
    assert_eq!(store.entry_count(), 1);

    clock.advance(Duration::minutes(5) + Duration::seconds(1));
    assert_eq!(store.get::<Repo>(&key), None);
    assert_eq!(store.entry_count(), 0);
    assert_eq!(store.get::<Repo>(&key), None);
  }

  #[test]
  fn test_rewrite_refreshes_timestamp() {
    let (store, clock) = store_with_clock();
    let key = CacheKey::build(["k".into()]);

    store.set(&key, &repo());
    clock.advance(Duration::minutes(4));
    store.set(&key, &repo());
    clock.advance(Duration::minutes(4));

    assert_eq!(store.get::<Repo>(&key), Some(repo()));
  }

  #[test]
  fn test_undecodable_payload_is_a_miss() {
    let (store, _clock) = store_with_clock();
    let key = CacheKey::build(["k".into()]);

    store.set(&key, &"just a string");
    assert_eq!(store.get::<Repo>(&key), None);
  }

  #[test]
  fn test_clear_removes_everything() {
    let (store, _clock) = store_with_clock();
    store.set(&CacheKey::build(["a".into()]), &1);
    store.set(&CacheKey::build(["b".into()]), &2);

    store.clear();
    assert_eq!(store.entry_count(), 0);
    assert_eq!(store.get::<i32>(&CacheKey::build(["a".into()])), None);
  }

  #[test]
  fn test_storage_faults_degrade_to_miss() {
    let store = CacheStore::new(BrokenStorage);
    let key = CacheKey::build(["k".into()]);

    store.set(&key, &repo());
    assert_eq!(store.get::<Repo>(&key), None);
    store.clear();
    assert_eq!(store.entry_count(), 0);
  }

  #[test]
  fn test_noop_storage_never_hits() {
    let store = CacheStore::new(NoopStorage);
    let key = CacheKey::build(["k".into()]);

    store.set(&key, &repo());
    assert_eq!(store.get::<Repo>(&key), None);
    assert_eq!(store.location(), "disabled");
  }
}
