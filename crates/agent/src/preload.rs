//! Static preload set.
//!
//! At install time the critical resource list is fetched and written into
//! the static partition as one batch: any single failure fails the whole
//! step, so install never silently reports ready with a partial shell.
//! Entries written before the failure are left in place; a retried install
//! overwrites them key-for-key.

use bivvy_client::{Network, NetworkError};
use bivvy_core::{CacheStorage, CachedResource, Destination, ResourceRequest};
use url::Url;

/// A preload batch failure. Carries which URL broke the batch.
#[derive(Debug, thiserror::Error)]
pub enum PreloadError {
    #[error("PRELOAD_FETCH: {url}: {source}")]
    Fetch { url: Url, source: NetworkError },

    #[error("PRELOAD_BAD_STATUS: {url}: status {status}")]
    BadStatus { url: Url, status: u16 },

    #[error("PRELOAD_STORE: {url}: {source}")]
    Store { url: Url, source: bivvy_core::Error },
}

/// Fetch every URL and write it into `partition`. Returns how many entries
/// were written.
///
/// The batch is atomic as a unit of success: the first fetch or store
/// failure aborts and reports, without rolling back earlier writes.
/// Non-success statuses fail the batch too; a 404 shell asset is an
/// install-time bug, not something to cache.
pub async fn preload(
    storage: &dyn CacheStorage, network: &dyn Network, partition: &str, urls: &[Url],
) -> Result<usize, PreloadError> {
    let mut written = 0usize;

    for url in urls {
        let request = ResourceRequest::get(url.clone(), Destination::Other);
        let response = network
            .fetch(&request)
            .await
            .map_err(|source| PreloadError::Fetch { url: url.clone(), source })?;

        if response.status != 200 {
            return Err(PreloadError::BadStatus { url: url.clone(), status: response.status });
        }

        let entry = CachedResource::capture(request.identity(), url, &request.method, response);
        storage
            .put(partition, entry)
            .await
            .map_err(|source| PreloadError::Store { url: url.clone(), source })?;
        written += 1;
    }

    tracing::info!("preloaded {written} static resources into {partition}");
    Ok(written)
}
