//! Key/value storage behind the embedding and response caches.
//!
//! The caches only need two primitives, a read and a write-with-expiry, so
//! any TTL-capable key/value service can sit behind [`CacheStore`]. Two
//! backends are provided:
//!
//! - [`MemoryCacheStore`]: process-local map, entries expire on the tokio clock.
//! - [`SqliteCacheStore`]: SQLite table via `sqlx`, entries survive restarts.

use crate::config::{CacheBackend, CacheConfig};
use crate::error::CacheError;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Result type for storage operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Both backends sweep out expired entries once per this many writes.
pub const PURGE_EVERY_WRITES: u64 = 128;

/// Count a write on `counter`, returning `true` when a sweep is due.
fn sweep_due(counter: &AtomicU64) -> bool {
    (counter.fetch_add(1, Ordering::Relaxed) + 1) % PURGE_EVERY_WRITES == 0
}

/// A string key/value store with per-entry expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch the value stored under `key`, or `None` if it is absent or expired.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value. The entry
    /// expires `ttl_secs` seconds after this call.
    async fn setex(&self, key: &str, ttl_secs: u64, value: &str) -> CacheResult<()>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &str;
}

/// Open the storage backend selected by `config`.
pub async fn open_cache_store(config: &CacheConfig) -> CacheResult<Arc<dyn CacheStore>> {
    match &config.backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryCacheStore::new())),
        CacheBackend::Sqlite(path) => Ok(Arc::new(SqliteCacheStore::open(path).await?)),
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// In-process cache storage.
///
/// An expired entry is removed when it is read, and every
/// [`PURGE_EVERY_WRITES`] writes sweep out the rest.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, MemoryEntry>>,
    writes: AtomicU64,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry and return how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {}
            }
        }

        // Expired: drop it unless a writer refreshed it in the meantime.
        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn setex(&self, key: &str, ttl_secs: u64, value: &str) -> CacheResult<()> {
        let now = Instant::now();
        let entry = MemoryEntry {
            value: value.to_string(),
            expires_at: now + Duration::from_secs(ttl_secs),
        };

        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), entry);
        if sweep_due(&self.writes) {
            let before = entries.len();
            entries.retain(|_, entry| entry.expires_at > now);
            tracing::debug!("Swept {} expired cache entries", before - entries.len());
        }
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

/// SQLite-backed cache storage.
///
/// Expiry times are stored as unix milliseconds. Reads ignore expired rows.
/// Expired rows are deleted when the store is opened and once every
/// [`PURGE_EVERY_WRITES`] writes.
#[derive(Debug, Clone)]
pub struct SqliteCacheStore {
    pool: SqlitePool,
    writes: Arc<AtomicU64>,
}

impl SqliteCacheStore {
    /// Open (creating if needed) a cache database at `path`.
    pub async fn open(path: &Path) -> CacheResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CacheError::backend(format!("{}: {e}", parent.display())))?;
        }

        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .busy_timeout(Duration::from_secs(5)),
        )
        .await?;

        tracing::info!("Opened cache database at {}", path.display());
        Self::new_with_pool(pool).await
    }

    /// Create an in-memory database, used by tests.
    pub async fn open_memory() -> CacheResult<Self> {
        // A single connection keeps every query on the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::new_with_pool(pool).await
    }

    async fn new_with_pool(pool: SqlitePool) -> CacheResult<Self> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_cache_entries_expires ON cache_entries(expires_at)")
            .execute(&pool)
            .await?;

        let store = Self {
            pool,
            writes: Arc::new(AtomicU64::new(0)),
        };
        let purged = store.purge_expired().await?;
        if purged > 0 {
            tracing::debug!("Purged {} expired cache rows on open", purged);
        }
        Ok(store)
    }

    /// Delete expired rows and return how many were removed.
    pub async fn purge_expired(&self) -> CacheResult<u64> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE expires_at <= ?1")
            .bind(now_millis())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Number of stored rows, including expired ones not yet purged.
    pub async fn entry_count(&self) -> CacheResult<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM cache_entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let value = sqlx::query_scalar::<_, String>(
            "SELECT value FROM cache_entries WHERE key = ?1 AND expires_at > ?2",
        )
        .bind(key)
        .bind(now_millis())
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    async fn setex(&self, key: &str, ttl_secs: u64, value: &str) -> CacheResult<()> {
        let ttl_millis = i64::try_from(ttl_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        let expires_at = now_millis().saturating_add(ttl_millis);

        sqlx::query(
            "INSERT INTO cache_entries (key, value, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        if sweep_due(&self.writes) {
            let purged = self.purge_expired().await?;
            tracing::debug!("Swept {} expired cache rows", purged);
        }
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "sqlite"
    }
}
