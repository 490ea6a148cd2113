//! Network client for bivvy.
//!
//! This crate provides the outbound HTTP layer behind the [`Network`]
//! trait, plus URL canonicalization for consistent request identities.

pub mod fetch;

pub use fetch::{HttpClient, Network, NetworkConfig, NetworkError};
pub use fetch::url::{UrlError, canonicalize};
