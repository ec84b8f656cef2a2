//! Namespace Module
//!
//! A [`Namespace`] scopes every key under a two-level prefix so independent
//! parts of an application can share one storage backend without colliding.
//!
//! ## Key Layout
//!
//! ```text
//!   business key          storage key
//!   ────────────          ─────────────────────────
//!   "user:1001"   ──────> "myapp:users:user:1001"
//!                          └─root┘ └domain┘
//! ```
//!
//! Enumeration goes the other way: `keys` returns business keys with the
//! `root:domain:` prefix stripped.
//!
//! ## Example
//!
//! ```
//! use nskv::namespace::Namespace;
//! use std::time::Duration;
//!
//! let users = Namespace::new("myapp", "users");
//!
//! users.set("user:1001", b"Alice", Duration::from_secs(3600)).unwrap();
//! assert_eq!(users.get("user:1001").unwrap().as_ref(), b"Alice");
//! assert_eq!(users.storage_key("user:1001"), "myapp:users:user:1001");
//! ```
//!
//! ## Typed Keys
//!
//! Any type that converts to and from a string can serve as the key type,
//! which keeps keys of one namespace from being passed to another:
//!
//! ```
//! use nskv::namespace::Namespace;
//! use std::time::Duration;
//!
//! #[derive(Debug, Clone, PartialEq, Eq, Hash)]
//! struct SessionId(String);
//!
//! impl AsRef<str> for SessionId {
//!     fn as_ref(&self) -> &str {
//!         &self.0
//!     }
//! }
//!
//! impl From<String> for SessionId {
//!     fn from(s: String) -> Self {
//!         SessionId(s)
//!     }
//! }
//!
//! let sessions = Namespace::<SessionId>::builder("myapp", "sessions").build();
//! let id = SessionId("abc".into());
//! sessions.set(&id, b"token", Duration::ZERO).unwrap();
//! assert_eq!(sessions.keys("*").unwrap(), vec![id]);
//! ```

pub mod client;

pub use client::{Namespace, NamespaceBuilder, NamespaceKey};
