//! Storage Engine Module
//!
//! This module provides the storage layer for nskv: the [`Backend`] contract,
//! its in-memory implementation [`StorageEngine`], and the error sentinels
//! shared by both.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     trait Backend                           │
//! │   set / get / mget / ttl / keys / incr / compare_and_swap   │
//! └──────────────────────────────┬──────────────────────────────┘
//!                                │ implemented by
//!                                ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │          RwLock<HashMap<String, Entry>>                     │
//! │          lazy expiry, double-checked reads                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **RwLock**: Multiple concurrent readers, exclusive writers
//! - **TTL Support**: Keys can have time-to-live expiry
//! - **Lazy Expiry**: Expired keys are removed by whichever call touches them
//! - **Atomic Primitives**: counters, get-and-set and compare-and-swap
//!
//! ## Example
//!
//! ```
//! use nskv::storage::{Backend, StorageEngine, StoreError};
//! use std::time::Duration;
//!
//! let engine = StorageEngine::new();
//!
//! engine.set("app:session:abc", b"token123", Duration::from_secs(3600)).unwrap();
//! assert!(engine.exists("app:session:abc").unwrap());
//!
//! assert!(engine.compare_and_swap("app:session:abc", b"token123", b"token456", Duration::ZERO).unwrap());
//! assert_eq!(engine.get("app:session:missing"), Err(StoreError::NotFound));
//! ```

pub mod backend;
pub mod engine;
pub mod error;
pub mod pattern;

// Re-export commonly used types
pub use backend::{Backend, Ttl, KEY_SEPARATOR};
pub use engine::{StorageEngine, StorageStats};
pub use error::{StoreError, StoreResult};
pub use pattern::GlobPattern;
