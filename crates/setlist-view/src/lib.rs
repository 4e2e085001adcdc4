//! The Setlist track-table engine.
//!
//! A [`TrackTable`] owns everything a client needs to show one group's shared
//! table: the live track feed, one live aggregate-rating query per track, the
//! filter/sort/page state and the derived page, the edit-mode selection, and
//! the mutation entry points. It is driven by a single event loop calling
//! [`TrackTable::next_update`].

pub mod account;
pub mod aggregate;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod feed;
pub mod notice;
pub mod pipeline;
pub mod selection;
pub mod table;

pub use dispatch::Dispatcher;
pub use error::{Error, Result};
pub use notice::{Notice, Severity};
pub use table::{TrackTable, Update};

#[cfg(test)]
mod tests;
