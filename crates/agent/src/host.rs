//! The hosting-runtime seam.
//!
//! Lifecycle control (skip-waiting, client claiming), notification display,
//! and window management are owned by whatever embeds the agent. Like the
//! storage provider, the host is injected so the agent holds no ambient
//! platform state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::notify::Notification;

#[derive(Debug, thiserror::Error)]
#[error("HOST_ERROR: {0}")]
pub struct HostError(pub String);

/// An open application view the host knows about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowClient {
    pub id: u64,
    pub url: Url,
    pub focusable: bool,
}

/// Outbound operations the agent asks the hosting runtime to perform.
#[async_trait]
pub trait Host: Send + Sync {
    /// Promote this installation immediately instead of waiting for open
    /// clients to close.
    async fn skip_waiting(&self) -> Result<(), HostError>;

    /// Take control of all already-open clients so existing page loads
    /// switch to the new generation without a reload.
    async fn claim_clients(&self) -> Result<(), HostError>;

    /// Display a notification.
    async fn show_notification(&self, notification: Notification) -> Result<(), HostError>;

    /// Enumerate open application windows.
    async fn window_clients(&self) -> Result<Vec<WindowClient>, HostError>;

    /// Bring an existing window to the foreground.
    async fn focus_window(&self, id: u64) -> Result<(), HostError>;

    /// Open a new window at the given URL.
    async fn open_window(&self, url: &str) -> Result<(), HostError>;
}
