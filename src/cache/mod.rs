//! Offline asset caching.
//!
//! This module provides the storage side of the offline layer:
//! - Named caches keyed by method + URL, persisted in SQLite
//! - One static and one dynamic cache per version tag
//! - Pruning of every generation but the current one

mod manager;
mod storage;
mod types;

pub use manager::{AssetCacheManager, ProvisionReport};
pub use storage::{CacheStorage, SqliteStorage};
pub use types::{has_version, CacheKind, CachedResponse, RequestKey};
