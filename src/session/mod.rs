//! Session Module
//!
//! Drives one interactive shell: lines in, replies out, until end of input or
//! `QUIT`. The reader and writer are generic so the same loop serves stdin and
//! stdout in the binary and in-memory mocks in tests.
//!
//! ## Example
//!
//! ```ignore
//! use nskv::commands::CommandHandler;
//! use nskv::namespace::Namespace;
//! use nskv::session::{run_session, SessionStats};
//! use nskv::storage::StorageEngine;
//! use std::sync::Arc;
//! use tokio::io::BufReader;
//!
//! let storage = Arc::new(StorageEngine::new());
//! let handler = CommandHandler::new(storage, Namespace::builder("myapp", "users"));
//! let stats = Arc::new(SessionStats::new());
//!
//! run_session(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), handler, stats).await?;
//! ```

pub mod handler;

pub use handler::{run_session, Session, SessionError, SessionStats};
