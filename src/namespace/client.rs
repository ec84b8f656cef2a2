//! Namespaced Client
//!
//! [`Namespace`] translates business keys into storage keys and forwards every
//! call to a [`Backend`]. It adds no semantics of its own: results and errors
//! come back exactly as the backend produced them. Failures are logged through
//! `tracing` on the way out.

use crate::storage::{Backend, StorageEngine, StoreResult, Ttl, KEY_SEPARATOR};
use bytes::Bytes;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Types usable as business keys.
///
/// Blanket-implemented for anything that converts to and from a string.
pub trait NamespaceKey: AsRef<str> + From<String> + Eq + Hash + Clone {}

impl<T> NamespaceKey for T where T: AsRef<str> + From<String> + Eq + Hash + Clone {}

/// Builder for [`Namespace`].
pub struct NamespaceBuilder<K = String> {
    root: String,
    domain: String,
    backend: Option<Arc<dyn Backend>>,
    log_tag: Option<String>,
    _key: PhantomData<fn() -> K>,
}

impl<K: NamespaceKey> NamespaceBuilder<K> {
    fn new(root: &str, domain: &str) -> Self {
        Self {
            root: root.to_owned(),
            domain: domain.to_owned(),
            backend: None,
            log_tag: None,
            _key: PhantomData,
        }
    }

    /// Uses `backend` for storage instead of a private [`StorageEngine`].
    ///
    /// Share one backend between namespaces by cloning the `Arc`.
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Attaches a tag to every log event emitted by this namespace.
    pub fn log_tag(mut self, tag: impl Into<String>) -> Self {
        self.log_tag = Some(tag.into());
        self
    }

    /// Builds the namespace.
    pub fn build(self) -> Namespace<K> {
        let prefix = format!("{}{}{}", self.root, KEY_SEPARATOR, self.domain);
        let scope = format!("{}{}", prefix, KEY_SEPARATOR);

        Namespace {
            prefix,
            scope,
            backend: self
                .backend
                .unwrap_or_else(|| Arc::new(StorageEngine::new())),
            log_tag: self.log_tag,
            _key: PhantomData,
        }
    }
}

/// A key space `root:domain:` over a storage backend.
///
/// Cloning is cheap and clones share the backend.
pub struct Namespace<K = String> {
    /// `root:domain`
    prefix: String,
    /// `root:domain:`
    scope: String,
    backend: Arc<dyn Backend>,
    log_tag: Option<String>,
    _key: PhantomData<fn() -> K>,
}

impl<K> Clone for Namespace<K> {
    fn clone(&self) -> Self {
        Self {
            prefix: self.prefix.clone(),
            scope: self.scope.clone(),
            backend: Arc::clone(&self.backend),
            log_tag: self.log_tag.clone(),
            _key: PhantomData,
        }
    }
}

impl<K> fmt::Debug for Namespace<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("prefix", &self.prefix)
            .field("log_tag", &self.log_tag)
            .finish()
    }
}

impl Namespace<String> {
    /// Creates a namespace with string keys and its own in-memory engine.
    pub fn new(root: &str, domain: &str) -> Self {
        Self::builder(root, domain).build()
    }
}

impl<K: NamespaceKey> Namespace<K> {
    /// Starts building a namespace.
    pub fn builder(root: &str, domain: &str) -> NamespaceBuilder<K> {
        NamespaceBuilder::new(root, domain)
    }

    /// Returns `root:domain`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the storage key for a business key.
    pub fn storage_key<Q>(&self, key: &Q) -> String
    where
        K: Borrow<Q>,
        Q: AsRef<str> + ?Sized,
    {
        let key = key.as_ref();
        let mut full = String::with_capacity(self.scope.len() + key.len());
        full.push_str(&self.scope);
        full.push_str(key);
        full
    }

    /// Passes `result` through, logging any error except an expected miss.
    fn observe<T>(
        &self,
        op: &'static str,
        key: Option<&str>,
        result: StoreResult<T>,
        miss_expected: bool,
    ) -> StoreResult<T> {
        if let Err(err) = &result {
            if !(miss_expected && err.is_not_found()) {
                error!(
                    tag = self.log_tag.as_deref(),
                    op,
                    key,
                    error = %err,
                    "Storage operation failed"
                );
            }
        }
        result
    }

    pub fn set<Q>(&self, key: &Q, value: &[u8], ttl: Duration) -> StoreResult<()>
    where
        K: Borrow<Q>,
        Q: AsRef<str> + ?Sized,
    {
        let result = self.backend.set(&self.storage_key(key), value, ttl);
        self.observe("set", Some(key.as_ref()), result, false)
    }

    pub fn set_nx<Q>(&self, key: &Q, value: &[u8], ttl: Duration) -> StoreResult<bool>
    where
        K: Borrow<Q>,
        Q: AsRef<str> + ?Sized,
    {
        let result = self.backend.set_nx(&self.storage_key(key), value, ttl);
        self.observe("set_nx", Some(key.as_ref()), result, false)
    }

    pub fn get<Q>(&self, key: &Q) -> StoreResult<Bytes>
    where
        K: Borrow<Q>,
        Q: AsRef<str> + ?Sized,
    {
        let result = self.backend.get(&self.storage_key(key));
        self.observe("get", Some(key.as_ref()), result, true)
    }

    pub fn delete<Q>(&self, key: &Q) -> StoreResult<()>
    where
        K: Borrow<Q>,
        Q: AsRef<str> + ?Sized,
    {
        let result = self.backend.delete(&self.storage_key(key));
        self.observe("delete", Some(key.as_ref()), result, false)
    }

    pub fn exists<Q>(&self, key: &Q) -> StoreResult<bool>
    where
        K: Borrow<Q>,
        Q: AsRef<str> + ?Sized,
    {
        let result = self.backend.exists(&self.storage_key(key));
        self.observe("exists", Some(key.as_ref()), result, false)
    }

    /// Fetches several keys at once. Missing keys are left out of the map.
    pub fn mget<Q>(&self, keys: &[&Q]) -> StoreResult<HashMap<K, Bytes>>
    where
        K: Borrow<Q>,
        Q: AsRef<str> + ?Sized,
    {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let full_keys: Vec<String> = keys.iter().map(|k| self.storage_key(*k)).collect();
        let mut found = self.observe("mget", None, self.backend.mget(&full_keys), false)?;

        let mut result = HashMap::with_capacity(found.len());
        for (key, full) in keys.iter().zip(&full_keys) {
            if let Some(value) = found.remove(full) {
                result.insert(K::from(key.as_ref().to_owned()), value);
            }
        }
        Ok(result)
    }

    /// Stores several pairs with one shared TTL, atomically.
    pub fn mset<Q, V>(&self, pairs: &[(&Q, V)], ttl: Duration) -> StoreResult<()>
    where
        K: Borrow<Q>,
        Q: AsRef<str> + ?Sized,
        V: AsRef<[u8]>,
    {
        if pairs.is_empty() {
            return Ok(());
        }

        let full_pairs: HashMap<String, Bytes> = pairs
            .iter()
            .map(|(k, v)| (self.storage_key(*k), Bytes::copy_from_slice(v.as_ref())))
            .collect();
        let result = self.backend.mset(&full_pairs, ttl);
        self.observe("mset", None, result, false)
    }

    pub fn mdel<Q>(&self, keys: &[&Q]) -> StoreResult<()>
    where
        K: Borrow<Q>,
        Q: AsRef<str> + ?Sized,
    {
        if keys.is_empty() {
            return Ok(());
        }

        let full_keys: Vec<String> = keys.iter().map(|k| self.storage_key(*k)).collect();
        let result = self.backend.mdel(&full_keys);
        self.observe("mdel", None, result, false)
    }

    pub fn ttl<Q>(&self, key: &Q) -> StoreResult<Ttl>
    where
        K: Borrow<Q>,
        Q: AsRef<str> + ?Sized,
    {
        let result = self.backend.ttl(&self.storage_key(key));
        self.observe("ttl", Some(key.as_ref()), result, true)
    }

    pub fn expire<Q>(&self, key: &Q, ttl: Duration) -> StoreResult<()>
    where
        K: Borrow<Q>,
        Q: AsRef<str> + ?Sized,
    {
        let result = self.backend.expire(&self.storage_key(key), ttl);
        self.observe("expire", Some(key.as_ref()), result, true)
    }

    pub fn persist<Q>(&self, key: &Q) -> StoreResult<()>
    where
        K: Borrow<Q>,
        Q: AsRef<str> + ?Sized,
    {
        let result = self.backend.persist(&self.storage_key(key));
        self.observe("persist", Some(key.as_ref()), result, true)
    }

    /// Returns the business keys in this namespace matching `pattern`.
    pub fn keys(&self, pattern: &str) -> StoreResult<Vec<K>> {
        let full_keys = self.observe(
            "keys",
            Some(pattern),
            self.backend.keys(&self.prefix, pattern),
            false,
        )?;

        Ok(full_keys
            .into_iter()
            .filter_map(|full| {
                full.strip_prefix(self.scope.as_str())
                    .filter(|key| !key.is_empty())
                    .map(|key| K::from(key.to_owned()))
            })
            .collect())
    }

    /// Removes every key in this namespace.
    pub fn clear(&self) -> StoreResult<()> {
        let result = self.observe("clear", None, self.backend.clear(&self.prefix), false);
        if result.is_ok() {
            debug!(tag = self.log_tag.as_deref(), prefix = %self.prefix, "Namespace cleared");
        }
        result
    }

    pub fn incr<Q>(&self, key: &Q, delta: i64) -> StoreResult<i64>
    where
        K: Borrow<Q>,
        Q: AsRef<str> + ?Sized,
    {
        let result = self.backend.incr(&self.storage_key(key), delta);
        self.observe("incr", Some(key.as_ref()), result, false)
    }

    pub fn decr<Q>(&self, key: &Q, delta: i64) -> StoreResult<i64>
    where
        K: Borrow<Q>,
        Q: AsRef<str> + ?Sized,
    {
        let result = self.backend.decr(&self.storage_key(key), delta);
        self.observe("decr", Some(key.as_ref()), result, false)
    }

    /// Stores `value` and returns the previous one.
    ///
    /// `Err(StoreError::NotFound)` means there was no previous value; the new
    /// value has been stored regardless.
    pub fn get_set<Q>(&self, key: &Q, value: &[u8]) -> StoreResult<Bytes>
    where
        K: Borrow<Q>,
        Q: AsRef<str> + ?Sized,
    {
        let result = self.backend.get_set(&self.storage_key(key), value);
        self.observe("get_set", Some(key.as_ref()), result, true)
    }

    pub fn compare_and_swap<Q>(
        &self,
        key: &Q,
        expected: &[u8],
        value: &[u8],
        ttl: Duration,
    ) -> StoreResult<bool>
    where
        K: Borrow<Q>,
        Q: AsRef<str> + ?Sized,
    {
        let result = self
            .backend
            .compare_and_swap(&self.storage_key(key), expected, value, ttl);
        self.observe("compare_and_swap", Some(key.as_ref()), result, false)
    }
}
