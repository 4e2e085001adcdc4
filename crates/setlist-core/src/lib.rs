//! Core types and trait definitions for the Setlist track-curation engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; the storage backend and the metadata
//! service are reached only through the traits defined here.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod activity;
pub mod comment;
pub mod error;
pub mod group;
pub mod metadata;
pub mod rating;
pub mod session;
pub mod store;
pub mod subscription;
pub mod track;
pub mod user;

pub use error::{Error, Result};
