//! # nskv - A Namespaced In-Memory Key-Value Store
//!
//! nskv is a concurrency-safe, in-memory key-value store with per-key
//! expiration, atomic primitives, and namespaced key spaces layered on top.
//!
//! ## Features
//!
//! - **Thread-Safe**: One `RwLock`-guarded table shared by any number of threads
//! - **TTL Support**: Keys can expire; expired keys are removed lazily on access
//! - **Atomic Primitives**: Counters, get-and-set, and compare-and-swap
//! - **Glob Enumeration**: `KEYS`/`CLEAR` scoped to a key prefix
//! - **Namespaces**: `root:domain:` key spaces over a pluggable [`Backend`]
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                               nskv                                  │
//! │                                                                     │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐              │
//! │  │   Session   │───>│  Command    │───>│  Namespace  │              │
//! │  │  (stdin)    │    │  Handler    │    │ root:domain │              │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘              │
//! │                                               │ dyn Backend         │
//! │                                               ▼                     │
//! │                     ┌──────────────────────────────────────────┐    │
//! │                     │              StorageEngine               │    │
//! │                     │   RwLock<HashMap<String, Entry>>         │    │
//! │                     │   lazy expiry, double-checked reads      │    │
//! │                     └──────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use nskv::namespace::Namespace;
//! use nskv::storage::{Backend, StorageEngine, StoreError};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let engine: Arc<dyn Backend> = Arc::new(StorageEngine::new());
//!
//! let users: Namespace = Namespace::builder("myapp", "users")
//!     .backend(Arc::clone(&engine))
//!     .build();
//! let stats: Namespace = Namespace::builder("myapp", "stats")
//!     .backend(Arc::clone(&engine))
//!     .build();
//!
//! users.set("1001", b"Alice", Duration::from_secs(3600)).unwrap();
//! assert_eq!(stats.incr("visits", 1).unwrap(), 1);
//!
//! users.clear().unwrap();
//! assert_eq!(users.get("1001"), Err(StoreError::NotFound));
//! assert_eq!(stats.incr("visits", 1).unwrap(), 2);
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: The [`Backend`] contract and its in-memory engine
//! - [`namespace`]: Prefixed key spaces over a backend
//! - [`commands`]: Line-oriented command execution
//! - [`session`]: The interactive read-execute-reply loop
//!
//! ## Design Highlights
//!
//! ### Lazy Expiry
//!
//! There is no background sweeper. An expired entry is invisible to every
//! operation and is deleted by the first call that touches it. Reads first
//! look under the shared lock, and only upgrade to the exclusive lock when
//! they find an expired entry, re-checking it before deleting.
//!
//! ### Immutable Values
//!
//! Values are copied in on write and handed out as [`bytes::Bytes`], which
//! cannot be mutated, so callers never alias stored data.

pub mod commands;
pub mod namespace;
pub mod session;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::{CommandHandler, Reply};
pub use namespace::{Namespace, NamespaceBuilder, NamespaceKey};
pub use session::{run_session, SessionStats};
pub use storage::{Backend, StorageEngine, StoreError, StoreResult, Ttl};

/// Root prefix used by the shell when none is given
pub const DEFAULT_ROOT: &str = "nskv";

/// Domain used by the shell when none is given
pub const DEFAULT_DOMAIN: &str = "default";

/// Version of nskv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
