//! SQLite backend for the Setlist track store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Live queries are driven by an
//! in-process change bus: every committed write announces the scopes it
//! touched, and each subscription re-reads its scope when announced.

mod encode;
mod live;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
