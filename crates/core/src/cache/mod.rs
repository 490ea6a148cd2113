//! SQLite-backed cache partition storage.
//!
//! This module provides the storage-provider seam for the resolution
//! engine, plus a persistent implementation using SQLite with async access
//! via tokio-rusqlite. It supports:
//!
//! - Named partitions holding request-identity → response entries
//! - Overwrite-on-collision puts (merge, never replace-partition)
//! - Atomic whole-partition deletion
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod key;
pub mod migrations;
pub mod partitions;

pub use crate::Error;

pub use connection::CacheDb;
pub use partitions::{CacheStorage, CachedResource};
