//! Response cache: deterministic keys, pluggable storage and TTL expiry.
//!
//! This module is GitHub-agnostic. It:
//! - Builds cache keys from an operation tag and ordered parameters
//! - Persists serialized payloads in SQLite (or nowhere, when disabled)
//! - Expires entries lazily, five minutes after they were written
//! - Never lets a storage fault reach the caller

mod key;
mod storage;
mod store;

pub use key::{CacheKey, KeyPart};
pub use storage::{NoopStorage, SqliteStorage};
pub use store::CacheStore;
