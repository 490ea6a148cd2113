//! Cache generation management.
//!
//! Partitions are named `static-<version>` and `dynamic-<version>`; exactly
//! one generation is current per install. Install opens the current pair,
//! activation purges everything outside it.

use std::sync::Arc;

use bivvy_core::{CacheStorage, Error};

/// Owns the generation-qualified partition names and the purge policy.
pub struct GenerationManager {
    storage: Arc<dyn CacheStorage>,
    version: String,
}

/// Result of a stale-generation purge. Failures never abort the purge;
/// they accumulate here so activation can log and move on.
#[derive(Debug, Default)]
pub struct PurgeOutcome {
    pub deleted: Vec<String>,
    pub failed: Vec<(String, Error)>,
}

impl GenerationManager {
    pub fn new(storage: Arc<dyn CacheStorage>, version: impl Into<String>) -> Self {
        Self { storage, version: version.into() }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Name of the current static partition.
    pub fn static_partition(&self) -> String {
        format!("static-{}", self.version)
    }

    /// Name of the current dynamic partition.
    pub fn dynamic_partition(&self) -> String {
        format!("dynamic-{}", self.version)
    }

    /// Partitions that survive a purge.
    pub fn keep_set(&self) -> Vec<String> {
        vec![self.static_partition(), self.dynamic_partition()]
    }

    /// Idempotently create the current generation's partitions.
    ///
    /// Storage exhaustion here is fatal and surfaced to the caller; there
    /// is nothing sensible to retry.
    pub async fn open_current(&self) -> Result<(), Error> {
        self.storage.open_partition(&self.static_partition()).await?;
        self.storage.open_partition(&self.dynamic_partition()).await?;
        Ok(())
    }

    /// Delete every partition not in the keep set.
    ///
    /// Runs to completion: a failure deleting one partition is recorded
    /// and the remaining candidates are still evaluated.
    pub async fn purge_stale(&self) -> Result<PurgeOutcome, Error> {
        let keep = self.keep_set();
        let mut outcome = PurgeOutcome::default();

        for name in self.storage.partition_names().await? {
            if keep.contains(&name) {
                continue;
            }
            match self.storage.delete_partition(&name).await {
                Ok(_) => {
                    tracing::info!("purged stale partition {name}");
                    outcome.deleted.push(name);
                }
                Err(err) => {
                    outcome.failed.push((name, err));
                }
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FlakyStorage;
    use bivvy_core::CacheDb;

    #[tokio::test]
    async fn test_partition_names() {
        let db = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let generations = GenerationManager::new(db, "v2");
        assert_eq!(generations.static_partition(), "static-v2");
        assert_eq!(generations.dynamic_partition(), "dynamic-v2");
        assert_eq!(generations.keep_set(), vec!["static-v2", "dynamic-v2"]);
    }

    #[tokio::test]
    async fn test_open_current_idempotent() {
        let db = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let generations = GenerationManager::new(db.clone(), "v1");
        generations.open_current().await.unwrap();
        generations.open_current().await.unwrap();

        let names = db.partition_names().await.unwrap();
        assert_eq!(names, vec!["dynamic-v1".to_string(), "static-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_purge_keeps_only_current_generation() {
        let db = Arc::new(CacheDb::open_in_memory().await.unwrap());
        for name in ["static-v1", "dynamic-v1", "static-v2", "dynamic-v2"] {
            db.open_partition(name).await.unwrap();
        }

        let generations = GenerationManager::new(db.clone(), "v2");
        let outcome = generations.purge_stale().await.unwrap();

        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.deleted.len(), 2);

        let remaining = db.partition_names().await.unwrap();
        assert_eq!(remaining, vec!["dynamic-v2".to_string(), "static-v2".to_string()]);
    }

    #[tokio::test]
    async fn test_purge_continues_past_failures() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for name in ["static-v1", "dynamic-v1", "static-v2", "dynamic-v2"] {
            db.open_partition(name).await.unwrap();
        }

        let storage = Arc::new(FlakyStorage::new(db.clone()).fail_delete_of("static-v1"));
        let generations = GenerationManager::new(storage, "v2");
        let outcome = generations.purge_stale().await.unwrap();

        // the failing partition is reported, the other stale one still went
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, "static-v1");
        assert_eq!(outcome.deleted, vec!["dynamic-v1".to_string()]);

        let remaining = db.partition_names().await.unwrap();
        assert!(remaining.contains(&"static-v1".to_string()));
        assert!(!remaining.contains(&"dynamic-v1".to_string()));
    }
}
