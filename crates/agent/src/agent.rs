//! Agent wiring and lifecycle handlers.
//!
//! The host drives the agent through discrete events: install → activate →
//! fetch (recurring), plus message, push, notification-click, and sync.
//! Every handler is an explicit async operation whose completion the host
//! awaits; nothing relies on detached work finishing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use bivvy_client::Network;
use bivvy_core::config::ConfigError;
use bivvy_core::{AgentConfig, CacheStorage, ResourceRequest};

use crate::generations::GenerationManager;
use crate::host::{Host, HostError};
use crate::notify::{ACTION_OPEN, Notification};
use crate::preload::{self, PreloadError};
use crate::resolve::{Resolution, ResolutionEngine};
use crate::sync::{self, BACKGROUND_SYNC_TAG, PERIODIC_SYNC_TAG, SyncError, SyncQueue, SyncReport};

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] bivvy_core::Error),

    #[error(transparent)]
    Preload(#[from] PreloadError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// A control-channel message from the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Force this installation to activate now.
    SkipWaiting,
    /// Ask which generation is serving.
    GetVersion,
}

/// Reply to a `get-version` query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub cache: String,
}

/// The resource-caching agent: one per installation.
pub struct Agent {
    config: AgentConfig,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    host: Arc<dyn Host>,
    sync_queue: Arc<dyn SyncQueue>,
    generations: GenerationManager,
    engine: ResolutionEngine,
    static_assets: Vec<Url>,
    root_url: Url,
}

impl Agent {
    pub fn new(
        config: AgentConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>, host: Arc<dyn Host>,
        sync_queue: Arc<dyn SyncQueue>,
    ) -> Result<Self, AgentError> {
        let static_assets = config
            .static_assets
            .iter()
            .map(|asset| config.resolve_asset(asset))
            .collect::<Result<Vec<_>, _>>()?;
        let root_url = config.resolve_asset(&config.root_document)?;
        let placeholder_url = config.resolve_asset(&config.image_placeholder)?;

        let generations = GenerationManager::new(storage.clone(), config.version.clone());
        let engine = ResolutionEngine::new(
            storage.clone(),
            network.clone(),
            generations.static_partition(),
            generations.dynamic_partition(),
            &root_url,
            &placeholder_url,
        );

        Ok(Self { config, storage, network, host, sync_queue, generations, engine, static_assets, root_url })
    }

    pub fn version(&self) -> &str {
        self.generations.version()
    }

    /// Install: open the current generation's partitions and preload the
    /// static set. Any preload failure fails the install; the host must
    /// not consider this installation ready.
    pub async fn install(&self) -> Result<(), AgentError> {
        tracing::info!("installing generation {}", self.version());
        self.generations.open_current().await?;

        preload::preload(
            self.storage.as_ref(),
            self.network.as_ref(),
            &self.generations.static_partition(),
            &self.static_assets,
        )
        .await?;

        self.host.skip_waiting().await?;
        tracing::info!("install complete for generation {}", self.version());
        Ok(())
    }

    /// Activate: purge every partition outside the current generation,
    /// then claim open clients. Individual purge failures are logged and
    /// do not block activation.
    pub async fn activate(&self) -> Result<(), AgentError> {
        tracing::info!("activating generation {}", self.version());
        let outcome = self.generations.purge_stale().await?;
        for (name, err) in &outcome.failed {
            tracing::error!("failed to purge stale partition {name}: {err}");
        }

        self.host.claim_clients().await?;
        tracing::info!(
            "activation complete: {} partitions purged, {} failures",
            outcome.deleted.len(),
            outcome.failed.len()
        );
        Ok(())
    }

    /// Resolve one intercepted request.
    pub async fn handle_fetch(&self, request: &ResourceRequest) -> Resolution {
        self.engine.resolve(request).await
    }

    /// Control-channel message. `get-version` produces a reply; commands
    /// do not.
    pub async fn handle_message(&self, message: ClientMessage) -> Result<Option<VersionInfo>, AgentError> {
        match message {
            ClientMessage::SkipWaiting => {
                self.host.skip_waiting().await?;
                Ok(None)
            }
            ClientMessage::GetVersion => Ok(Some(VersionInfo {
                version: self.config.version.clone(),
                cache: self.generations.static_partition(),
            })),
        }
    }

    /// Push event. A missing payload is ignored; a malformed one still
    /// produces the generic notification.
    pub async fn handle_push(&self, payload: Option<&str>) -> Result<(), AgentError> {
        let Some(raw) = payload else {
            tracing::debug!("push event without payload; ignoring");
            return Ok(());
        };
        self.host.show_notification(Notification::from_push(raw)).await?;
        Ok(())
    }

    /// Notification action click: `open` focuses an existing application
    /// window or opens a new one at the root; anything else just closes.
    pub async fn handle_notification_click(&self, action: &str) -> Result<(), AgentError> {
        if action != ACTION_OPEN {
            return Ok(());
        }

        let origin = self.config.origin_url()?;
        let windows = self.host.window_clients().await?;
        if let Some(window) = windows
            .iter()
            .find(|w| w.focusable && w.url.origin() == origin.origin())
        {
            self.host.focus_window(window.id).await?;
        } else {
            self.host.open_window(self.root_url.as_str()).await?;
        }
        Ok(())
    }

    /// One-shot background sync: drain the application's queue and notify
    /// on a clean drain.
    pub async fn handle_sync(&self, tag: &str) -> Result<SyncReport, AgentError> {
        if tag != BACKGROUND_SYNC_TAG {
            tracing::debug!("ignoring sync event with tag {tag}");
            return Ok(SyncReport::default());
        }

        let report = sync::drain(self.sync_queue.as_ref()).await?;
        if report.all_ok() {
            self.host.show_notification(Notification::sync_complete()).await?;
        }
        Ok(report)
    }

    /// Periodic sync: same drain, no notification.
    pub async fn handle_periodic_sync(&self, tag: &str) -> Result<SyncReport, AgentError> {
        if tag != PERIODIC_SYNC_TAG {
            tracing::debug!("ignoring periodic-sync event with tag {tag}");
            return Ok(SyncReport::default());
        }
        Ok(sync::drain(self.sync_queue.as_ref()).await?)
    }
}
