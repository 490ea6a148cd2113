//! The request resolution engine.
//!
//! Cache-first with network fallback and offline degradation, per
//! intercepted request:
//!
//! 1. Non-http(s) schemes are not intercepted at all.
//! 2. Cache lookup across the current partitions, static before dynamic;
//!    first match wins, no freshness check, no network call.
//! 3. On miss, fetch. A 200 same-origin response is returned to the caller
//!    and a duplicate is written into the dynamic partition; anything else
//!    is returned uncached.
//! 4. On network failure, degrade: cached root document or a synthesized
//!    offline notice for navigations, a cached placeholder for images,
//!    a 408 for everything else.
//!
//! Each resolution is independent; two concurrent misses for the same
//! resource may both fetch and both write, which is safe because the write
//! is an idempotent overwrite of the same identity.

use std::sync::Arc;

use bivvy_client::Network;
use bivvy_core::cache::key::identity_key;
use bivvy_core::{CacheStorage, CachedResource, CapturedResponse, Destination, ResourceRequest};
use url::Url;

use crate::offline;

/// Outcome of intercepting one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The engine does not intervene; the request proceeds through the
    /// platform's default handling untouched.
    Bypass,
    /// The engine produced the response (cached, fetched, or synthesized).
    Respond(CapturedResponse),
}

/// The fetch interceptor. Holds no global state, only the injected
/// storage and network seams plus the current generation's names.
pub struct ResolutionEngine {
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    static_partition: String,
    dynamic_partition: String,
    root_identity: String,
    placeholder_identity: String,
}

impl ResolutionEngine {
    pub fn new(
        storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>, static_partition: String, dynamic_partition: String,
        root_document: &Url, image_placeholder: &Url,
    ) -> Self {
        Self {
            storage,
            network,
            static_partition,
            dynamic_partition,
            root_identity: identity_key("GET", root_document.as_str()),
            placeholder_identity: identity_key("GET", image_placeholder.as_str()),
        }
    }

    /// Resolve one intercepted request. Infallible: every failure path
    /// terminates in a servable response or a bypass.
    pub async fn resolve(&self, request: &ResourceRequest) -> Resolution {
        if !request.is_interceptable() {
            return Resolution::Bypass;
        }

        let key = request.identity();

        if let Some(cached) = self.lookup(&key).await {
            tracing::debug!("cache hit for {}", request.url);
            return Resolution::Respond(cached);
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    // one duplicate for the cache, the original for the caller
                    self.store_dynamic(request, &key, response.clone()).await;
                }
                Resolution::Respond(response)
            }
            Err(err) => {
                tracing::debug!("network failure for {}: {err}; entering fallback", request.url);
                Resolution::Respond(self.fallback(request).await)
            }
        }
    }

    /// Ordered lookup: static partition first, then dynamic. Lookup errors
    /// degrade to a miss so a storage hiccup cannot fail the request.
    async fn lookup(&self, key: &str) -> Option<CapturedResponse> {
        for partition in [&self.static_partition, &self.dynamic_partition] {
            match self.storage.get(partition, key).await {
                Ok(Some(entry)) => return Some(entry.into_response()),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!("lookup in {partition} failed: {err}");
                }
            }
        }
        None
    }

    /// Write the duplicate into the dynamic partition. Failures are logged
    /// and swallowed; they must never reach the request's caller.
    async fn store_dynamic(&self, request: &ResourceRequest, key: &str, duplicate: CapturedResponse) {
        let entry = CachedResource::capture(key.to_string(), &request.url, &request.method, duplicate);
        match self.storage.put(&self.dynamic_partition, entry).await {
            Ok(()) => tracing::debug!("cached {} into {}", request.url, self.dynamic_partition),
            Err(err) => tracing::warn!("failed to cache {}: {err}", request.url),
        }
    }

    async fn fallback(&self, request: &ResourceRequest) -> CapturedResponse {
        match request.destination {
            Destination::Document => match self.lookup(&self.root_identity).await {
                Some(root) => {
                    tracing::debug!("serving cached root document for {}", request.url);
                    root
                }
                None => offline::notice_page(),
            },
            Destination::Image => match self.lookup(&self.placeholder_identity).await {
                Some(placeholder) => placeholder,
                None => offline::unavailable(),
            },
            _ => offline::unavailable(),
        }
    }
}
