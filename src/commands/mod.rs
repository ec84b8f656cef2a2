//! Command Module
//!
//! Turns shell input lines into namespace operations and renders the results.
//!
//! ```text
//!   "INCR visits 5"
//!         │ split_args
//!         ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  dispatch, validate, execute
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │   Namespace     │  "visits" -> "root:domain:visits"
//! └────────┬────────┘
//!          │
//!          ▼
//!   Reply::Integer(5)  ──Display──>  "(integer) 5"
//! ```

pub mod handler;
pub mod reply;

pub use handler::{split_args, CommandHandler};
pub use reply::Reply;
