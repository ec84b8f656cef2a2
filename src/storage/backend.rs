//! Storage Backend Contract
//!
//! [`Backend`] is the capability every storage implementation provides to the
//! namespace layer. The in-memory [`StorageEngine`](crate::storage::StorageEngine)
//! is one implementation; anything else that honours the same semantics can be
//! swapped in without touching [`Namespace`](crate::namespace::Namespace).
//!
//! ## Conventions
//!
//! - Keys are opaque strings. The only structure a backend interprets is the
//!   `prefix + ":"` scheme used by [`Backend::keys`] and [`Backend::clear`].
//! - A `ttl` of [`Duration::ZERO`] means "no expiration".
//! - Every method must be safe to call concurrently from many threads.
//! - Failures are reported with the [`StoreError`] sentinels, unchanged.

use crate::storage::error::StoreResult;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Separator between a key prefix and the rest of the key.
pub const KEY_SEPARATOR: char = ':';

/// Remaining lifetime of a key, as reported by [`Backend::ttl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// The key never expires.
    Persistent,
    /// The key expires after this much time.
    Remaining(Duration),
}

impl Ttl {
    /// Returns the remaining duration, or `None` for a persistent key.
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            Ttl::Persistent => None,
            Ttl::Remaining(d) => Some(*d),
        }
    }
}

/// Thread-safe key-value storage with expiration and atomic primitives.
pub trait Backend: Send + Sync + 'static {
    /// Stores `value` under `key`, replacing any existing entry.
    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()>;

    /// Stores `value` only if `key` has no live entry. Returns whether it did.
    fn set_nx(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<bool>;

    /// Returns the live value for `key`.
    fn get(&self, key: &str) -> StoreResult<Bytes>;

    /// Removes `key`. Succeeds whether or not it existed.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Returns whether `key` has a live entry.
    fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Returns the live values for `keys`, silently omitting missing ones.
    fn mget(&self, keys: &[String]) -> StoreResult<HashMap<String, Bytes>>;

    /// Stores every pair with the same expiration, as one atomic step.
    fn mset(&self, pairs: &HashMap<String, Bytes>, ttl: Duration) -> StoreResult<()>;

    /// Removes every key in `keys`.
    fn mdel(&self, keys: &[String]) -> StoreResult<()>;

    /// Returns the remaining lifetime of a live key.
    fn ttl(&self, key: &str) -> StoreResult<Ttl>;

    /// Resets the expiration of a live key. Never creates the key.
    fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()>;

    /// Removes the expiration of a live key.
    fn persist(&self, key: &str) -> StoreResult<()>;

    /// Returns the full keys under `prefix` whose suffix matches `pattern`.
    fn keys(&self, prefix: &str, pattern: &str) -> StoreResult<Vec<String>>;

    /// Removes every key under `prefix`.
    fn clear(&self, prefix: &str) -> StoreResult<()>;

    /// Adds `delta` to the 8-byte counter at `key`, wrapping on overflow.
    fn incr(&self, key: &str, delta: i64) -> StoreResult<i64>;

    /// Subtracts `delta` from the counter at `key`.
    fn decr(&self, key: &str, delta: i64) -> StoreResult<i64> {
        self.incr(key, delta.wrapping_neg())
    }

    /// Stores `value` and returns the previous live value.
    ///
    /// The write happens even when the previous value was missing; in that
    /// case the result is `Err(StoreError::NotFound)`.
    fn get_set(&self, key: &str, value: &[u8]) -> StoreResult<Bytes>;

    /// Replaces the value and expiration of `key` iff its live value equals
    /// `expected` byte-for-byte.
    fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        value: &[u8],
        ttl: Duration,
    ) -> StoreResult<bool>;
}

impl<B: Backend + ?Sized> Backend for Arc<B> {
    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        (**self).set(key, value, ttl)
    }

    fn set_nx(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<bool> {
        (**self).set_nx(key, value, ttl)
    }

    fn get(&self, key: &str) -> StoreResult<Bytes> {
        (**self).get(key)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        (**self).delete(key)
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        (**self).exists(key)
    }

    fn mget(&self, keys: &[String]) -> StoreResult<HashMap<String, Bytes>> {
        (**self).mget(keys)
    }

    fn mset(&self, pairs: &HashMap<String, Bytes>, ttl: Duration) -> StoreResult<()> {
        (**self).mset(pairs, ttl)
    }

    fn mdel(&self, keys: &[String]) -> StoreResult<()> {
        (**self).mdel(keys)
    }

    fn ttl(&self, key: &str) -> StoreResult<Ttl> {
        (**self).ttl(key)
    }

    fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()> {
        (**self).expire(key, ttl)
    }

    fn persist(&self, key: &str) -> StoreResult<()> {
        (**self).persist(key)
    }

    fn keys(&self, prefix: &str, pattern: &str) -> StoreResult<Vec<String>> {
        (**self).keys(prefix, pattern)
    }

    fn clear(&self, prefix: &str) -> StoreResult<()> {
        (**self).clear(prefix)
    }

    fn incr(&self, key: &str, delta: i64) -> StoreResult<i64> {
        (**self).incr(key, delta)
    }

    fn decr(&self, key: &str, delta: i64) -> StoreResult<i64> {
        (**self).decr(key, delta)
    }

    fn get_set(&self, key: &str, value: &[u8]) -> StoreResult<Bytes> {
        (**self).get_set(key, value)
    }

    fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        value: &[u8],
        ttl: Duration,
    ) -> StoreResult<bool> {
        (**self).compare_and_swap(key, expected, value, ttl)
    }
}
