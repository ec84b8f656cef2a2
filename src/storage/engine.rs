//! Thread-Safe Storage Engine with Expiry Support
//!
//! This module implements the in-memory [`Backend`] for nskv: a single
//! `RwLock<HashMap>` table with per-entry TTL, atomic counters, get-and-set
//! and compare-and-swap.
//!
//! ## Design Decisions
//!
//! 1. **One table, one lock**: every mutating call is a single critical section,
//!    which is what makes `mset`, `incr` and `compare_and_swap` atomic.
//! 2. **Lazy Expiry**: there is no background sweep. An expired entry is removed
//!    by the first operation that observes it.
//! 3. **Double-checked reads**: `get` and `exists` only take the read lock on the
//!    common path and escalate to the write lock when they see an expired entry.
//!
//! ## Read Path
//!
//! ```text
//!   get(key)
//!      │
//!      ▼
//! ┌──────────────┐  live    ┌──────────────┐
//! │  read lock   │─────────>│ return value │
//! │  snapshot    │          └──────────────┘
//! └──────┬───────┘
//!        │ expired
//!        ▼
//! ┌──────────────┐  gone / still expired   ┌───────────────────┐
//! │  write lock  │────────────────────────>│ remove, NotFound  │
//! │  re-validate │                         └───────────────────┘
//! └──────┬───────┘
//!        │ refreshed by another writer
//!        ▼
//!   return current value
//! ```

use crate::storage::backend::{Backend, Ttl, KEY_SEPARATOR};
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::pattern::GlobPattern;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// Width of an encoded counter value.
pub const COUNTER_WIDTH: usize = 8;

/// Represents a stored value with optional expiry time.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    /// The stored value
    value: Bytes,
    /// When this entry expires (None = never expires)
    expires_at: Option<Instant>,
}

impl Entry {
    /// Creates an entry that expires `ttl` from now, or never for a zero `ttl`.
    pub fn new(value: Bytes, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: expiry(ttl),
        }
    }

    /// Creates an entry without expiry.
    pub fn persistent(value: Bytes) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Checks if this entry has expired.
    ///
    /// An entry is still live at exactly its expiry instant.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|exp| Instant::now() > exp)
            .unwrap_or(false)
    }

    /// Returns the remaining lifetime of this entry.
    pub fn ttl(&self) -> Ttl {
        match self.expires_at {
            None => Ttl::Persistent,
            Some(exp) => Ttl::Remaining(exp.saturating_duration_since(Instant::now())),
        }
    }
}

/// Converts a relative TTL into an absolute expiry. Zero means no expiry.
fn expiry(ttl: Duration) -> Option<Instant> {
    if ttl.is_zero() {
        None
    } else {
        Instant::now().checked_add(ttl)
    }
}

fn encode_counter(n: i64) -> Bytes {
    Bytes::copy_from_slice(&n.to_le_bytes())
}

fn decode_counter(value: &[u8]) -> StoreResult<i64> {
    let raw: [u8; COUNTER_WIDTH] = value.try_into().map_err(|_| StoreError::TypeMismatch)?;
    Ok(u64::from_le_bytes(raw) as i64)
}

/// The in-memory storage engine.
///
/// Every engine owns its own table; create as many isolated engines as
/// needed. Wrap it in an `Arc` to share it between threads or namespaces.
///
/// # Example
///
/// ```
/// use nskv::storage::{Backend, StorageEngine, Ttl};
/// use std::time::Duration;
///
/// let engine = StorageEngine::new();
///
/// engine.set("app:users:name", b"Ariz", Duration::ZERO).unwrap();
/// assert_eq!(engine.get("app:users:name").unwrap().as_ref(), b"Ariz");
/// assert_eq!(engine.ttl("app:users:name").unwrap(), Ttl::Persistent);
///
/// assert_eq!(engine.incr("app:users:visits", 5).unwrap(), 5);
/// ```
pub struct StorageEngine {
    /// The table
    data: RwLock<HashMap<String, Entry>>,

    /// Statistics: total read operations
    get_count: AtomicU64,

    /// Statistics: total write operations
    set_count: AtomicU64,

    /// Statistics: total delete operations
    del_count: AtomicU64,

    /// Statistics: number of expired entries removed on access
    expired_count: AtomicU64,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("entries", &self.len())
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .field("set_count", &self.set_count.load(Ordering::Relaxed))
            .field("expired_count", &self.expired_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Creates a new, empty storage engine.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    // Every write is a single insert/remove/field store, so a panicking
    // writer cannot leave the map half-updated.
    #[inline]
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Entry>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the live entry for `key`, removing it first if it has expired.
    fn live_entry<'a>(
        &self,
        data: &'a mut HashMap<String, Entry>,
        key: &str,
    ) -> Option<&'a mut Entry> {
        if data.get(key).is_some_and(Entry::is_expired) {
            data.remove(key);
            self.expired_count.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        data.get_mut(key)
    }

    /// Returns the number of entries physically in the table.
    ///
    /// Expired entries that nothing has touched yet are still counted.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if the table holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns whether `key` is physically present, ignoring expiry.
    ///
    /// Unlike [`Backend::exists`] this never removes anything.
    pub fn contains_raw(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    /// Returns engine statistics.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            entries: self.len() as u64,
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }
}

impl Backend for StorageEngine {
    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let entry = Entry::new(Bytes::copy_from_slice(value), ttl);
        self.write().insert(key.to_owned(), entry);
        Ok(())
    }

    fn set_nx(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<bool> {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let mut data = self.write();
        if self.live_entry(&mut data, key).is_some() {
            return Ok(false);
        }
        data.insert(
            key.to_owned(),
            Entry::new(Bytes::copy_from_slice(value), ttl),
        );
        Ok(true)
    }

    fn get(&self, key: &str) -> StoreResult<Bytes> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        // Fast path: read lock only
        {
            let data = self.read();
            match data.get(key) {
                None => return Err(StoreError::NotFound),
                Some(entry) if !entry.is_expired() => return Ok(entry.value.clone()),
                Some(_) => {}
            }
        }

        // Expired snapshot: re-validate under the write lock, the entry may
        // have been removed or refreshed in between
        let mut data = self.write();
        self.live_entry(&mut data, key)
            .map(|entry| entry.value.clone())
            .ok_or(StoreError::NotFound)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.del_count.fetch_add(1, Ordering::Relaxed);

        self.write().remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        {
            let data = self.read();
            match data.get(key) {
                None => return Ok(false),
                Some(entry) if !entry.is_expired() => return Ok(true),
                Some(_) => {}
            }
        }

        let mut data = self.write();
        Ok(self.live_entry(&mut data, key).is_some())
    }

    fn mget(&self, keys: &[String]) -> StoreResult<HashMap<String, Bytes>> {
        self.get_count.fetch_add(keys.len() as u64, Ordering::Relaxed);

        let mut data = self.write();
        let mut result = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(entry) = self.live_entry(&mut data, key) {
                result.insert(key.clone(), entry.value.clone());
            }
        }
        Ok(result)
    }

    fn mset(&self, pairs: &HashMap<String, Bytes>, ttl: Duration) -> StoreResult<()> {
        self.set_count
            .fetch_add(pairs.len() as u64, Ordering::Relaxed);

        // Computed once so every pair shares the same deadline
        let expires_at = expiry(ttl);
        let mut data = self.write();
        for (key, value) in pairs {
            data.insert(
                key.clone(),
                Entry {
                    value: Bytes::copy_from_slice(value),
                    expires_at,
                },
            );
        }
        Ok(())
    }

    fn mdel(&self, keys: &[String]) -> StoreResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        self.del_count
            .fetch_add(keys.len() as u64, Ordering::Relaxed);

        let mut data = self.write();
        for key in keys {
            data.remove(key);
        }
        Ok(())
    }

    fn ttl(&self, key: &str) -> StoreResult<Ttl> {
        let mut data = self.write();
        self.live_entry(&mut data, key)
            .map(|entry| entry.ttl())
            .ok_or(StoreError::NotFound)
    }

    fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()> {
        let mut data = self.write();
        let entry = self
            .live_entry(&mut data, key)
            .ok_or(StoreError::NotFound)?;
        entry.expires_at = expiry(ttl);
        Ok(())
    }

    fn persist(&self, key: &str) -> StoreResult<()> {
        let mut data = self.write();
        let entry = self
            .live_entry(&mut data, key)
            .ok_or(StoreError::NotFound)?;
        entry.expires_at = None;
        Ok(())
    }

    /// Scans the whole table under the write lock.
    ///
    /// Expired keys under `prefix` are removed as they are found. The pattern
    /// is compiled before the lock is taken.
    fn keys(&self, prefix: &str, pattern: &str) -> StoreResult<Vec<String>> {
        let matcher = match pattern {
            "" | "*" => None,
            p => Some(GlobPattern::compile(p)?),
        };
        let scope = format!("{}{}", prefix, KEY_SEPARATOR);

        let mut data = self.write();
        let mut result = Vec::new();
        let mut expired = Vec::new();

        for (key, entry) in data.iter() {
            let Some(suffix) = key.strip_prefix(scope.as_str()) else {
                continue;
            };
            if entry.is_expired() {
                expired.push(key.clone());
                continue;
            }
            if matcher.as_ref().map_or(true, |m| m.matches(suffix)) {
                result.push(key.clone());
            }
        }

        if !expired.is_empty() {
            self.expired_count
                .fetch_add(expired.len() as u64, Ordering::Relaxed);
            for key in &expired {
                data.remove(key);
            }
        }

        Ok(result)
    }

    fn clear(&self, prefix: &str) -> StoreResult<()> {
        let scope = format!("{}{}", prefix, KEY_SEPARATOR);

        let mut data = self.write();
        let before = data.len();
        data.retain(|key, _| !key.starts_with(scope.as_str()));
        self.del_count
            .fetch_add((before - data.len()) as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Counters are 8 bytes, little-endian. A key that already holds a counter
    /// keeps its expiry; a counter created here never expires.
    fn incr(&self, key: &str, delta: i64) -> StoreResult<i64> {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let mut data = self.write();
        if let Some(entry) = self.live_entry(&mut data, key) {
            let next = decode_counter(&entry.value)?.wrapping_add(delta);
            entry.value = encode_counter(next);
            return Ok(next);
        }

        data.insert(key.to_owned(), Entry::persistent(encode_counter(delta)));
        Ok(delta)
    }

    fn get_set(&self, key: &str, value: &[u8]) -> StoreResult<Bytes> {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let value = Bytes::copy_from_slice(value);
        let mut data = self.write();
        if let Some(entry) = self.live_entry(&mut data, key) {
            let old = std::mem::replace(entry, Entry::persistent(value));
            return Ok(old.value);
        }

        data.insert(key.to_owned(), Entry::persistent(value));
        Err(StoreError::NotFound)
    }

    fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        value: &[u8],
        ttl: Duration,
    ) -> StoreResult<bool> {
        let mut data = self.write();
        match self.live_entry(&mut data, key) {
            Some(entry) if entry.value.as_ref() == expected => {
                self.set_count.fetch_add(1, Ordering::Relaxed);
                *entry = Entry::new(Bytes::copy_from_slice(value), ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Engine statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of entries physically stored
    pub entries: u64,
    /// Total read operations
    pub get_ops: u64,
    /// Total write operations
    pub set_ops: u64,
    /// Total delete operations
    pub del_ops: u64,
    /// Total expired entries removed on access
    pub expired: u64,
}
