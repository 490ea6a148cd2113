//! Core types and shared functionality for bivvy.
//!
//! This crate provides:
//! - The cache storage provider trait and its SQLite implementation
//! - Request/response value types shared by the agent and the network client
//! - Configuration structures
//! - Unified error types

pub mod cache;
pub mod config;
pub mod error;
pub mod resource;

pub use cache::{CacheDb, CacheStorage, CachedResource};
pub use config::AgentConfig;
pub use error::Error;
pub use resource::{CapturedResponse, Destination, ResourceRequest, ResponseKind};
