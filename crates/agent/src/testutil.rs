//! Shared test fakes: a recording mock network, a storage wrapper with
//! injectable failures, and small constructors used across modules.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use bivvy_client::{Network, NetworkError};
use bivvy_core::{CacheDb, CacheStorage, CachedResource, CapturedResponse, Error, ResourceRequest, ResponseKind};

use crate::resolve::ResolutionEngine;

/// A 200 same-origin response with the given body.
pub fn basic_response(body: &str) -> CapturedResponse {
    CapturedResponse {
        status: 200,
        kind: ResponseKind::Basic,
        headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
        body: Bytes::copy_from_slice(body.as_bytes()),
    }
}

/// Store `response` for `request` in `partition`.
pub async fn store_entry(storage: &dyn CacheStorage, partition: &str, request: &ResourceRequest, response: CapturedResponse) {
    let entry = CachedResource::capture(request.identity(), &request.url, &request.method, response);
    storage.put(partition, entry).await.unwrap();
}

/// Engine wired to the v1 generation with the conventional fallback URLs.
pub fn engine_for(db: CacheDb, network: Arc<dyn Network>) -> ResolutionEngine {
    ResolutionEngine::new(
        Arc::new(db),
        network,
        "static-v1".to_string(),
        "dynamic-v1".to_string(),
        &Url::parse("https://app.local/").unwrap(),
        &Url::parse("https://app.local/icon-192.png").unwrap(),
    )
}

/// Mock network: routed URLs respond, everything else is a network
/// failure. Records every fetched URL.
pub struct MockNetwork {
    routes: Mutex<HashMap<String, CapturedResponse>>,
    calls: Mutex<Vec<String>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self { routes: Mutex::new(HashMap::new()), calls: Mutex::new(Vec::new()) }
    }

    pub fn route(&self, url: &str, response: CapturedResponse) {
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &ResourceRequest) -> Result<CapturedResponse, NetworkError> {
        self.calls.lock().unwrap().push(request.url.to_string());
        self.routes
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .cloned()
            .ok_or_else(|| NetworkError::Unreachable(format!("no route to {}", request.url)))
    }
}

/// Storage wrapper that delegates to an in-memory `CacheDb` but fails the
/// operations it is told to fail.
pub struct FlakyStorage {
    inner: CacheDb,
    failing_deletes: HashSet<String>,
    failing_puts: bool,
}

impl FlakyStorage {
    pub fn new(inner: CacheDb) -> Self {
        Self { inner, failing_deletes: HashSet::new(), failing_puts: false }
    }

    pub fn fail_delete_of(mut self, name: &str) -> Self {
        self.failing_deletes.insert(name.to_string());
        self
    }

    pub fn fail_puts(mut self) -> Self {
        self.failing_puts = true;
        self
    }
}

#[async_trait]
impl CacheStorage for FlakyStorage {
    async fn open_partition(&self, name: &str) -> Result<(), Error> {
        self.inner.open_partition(name).await
    }

    async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.inner.partition_names().await
    }

    async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        if self.failing_deletes.contains(name) {
            return Err(Error::Storage(format!("injected delete failure for {name}")));
        }
        self.inner.delete_partition(name).await
    }

    async fn put(&self, partition: &str, entry: CachedResource) -> Result<(), Error> {
        if self.failing_puts {
            return Err(Error::Storage("injected put failure".to_string()));
        }
        self.inner.put(partition, entry).await
    }

    async fn get(&self, partition: &str, key: &str) -> Result<Option<CachedResource>, Error> {
        self.inner.get(partition, key).await
    }

    async fn entry_keys(&self, partition: &str) -> Result<Vec<String>, Error> {
        self.inner.entry_keys(partition).await
    }
}
