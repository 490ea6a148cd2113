//! JSON-lines event protocol between the hosting runtime and the agent.
//!
//! Inbound: one event object per stdin line, tagged by `type`, optionally
//! carrying an `id` the reply echoes back (fetches run concurrently, so
//! replies are not ordered). Outbound: replies and host directives on
//! stdout, one object per line. Logging stays on stderr so stdout carries
//! only protocol traffic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use bivvy_client::canonicalize;
use bivvy_core::{Destination, ResourceRequest, ResponseKind};

use crate::agent::{Agent, AgentError, ClientMessage, VersionInfo};
use crate::host::{Host, HostError, WindowClient};
use crate::notify::Notification;
use crate::resolve::Resolution;
use crate::sync::SyncReport;

/// One inbound event line.
#[derive(Debug, Deserialize)]
pub struct HostEvent {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(flatten)]
    pub kind: EventKind,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Lifecycle and runtime events, mirroring the hosting runtime's callbacks.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EventKind {
    Install,
    Activate,
    Fetch {
        url: String,
        #[serde(default = "default_method")]
        method: String,
        #[serde(default)]
        destination: Destination,
    },
    Message {
        message: ClientMessage,
    },
    Push {
        #[serde(default)]
        payload: Option<String>,
    },
    NotificationClick {
        action: String,
    },
    Sync {
        tag: String,
    },
    PeriodicSync {
        tag: String,
    },
}

/// One outbound reply line.
#[derive(Debug, Serialize)]
pub struct AgentReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(flatten)]
    pub body: ReplyBody,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ReplyBody {
    /// The event ran to completion.
    Completed { event: &'static str },
    /// The event failed; the host must not treat the phase as done.
    Failed { event: &'static str, error: String },
    /// Outcome of a fetch event.
    FetchResult {
        #[serde(flatten)]
        outcome: FetchOutcome,
    },
    /// Reply to a `get-version` message.
    Version {
        #[serde(flatten)]
        info: VersionInfo,
    },
    /// Aggregate result of a sync drain.
    SyncResult {
        #[serde(flatten)]
        report: SyncReport,
    },
}

/// Wire form of a [`Resolution`]. A bypassed request carries nothing: the
/// host lets the platform handle it untouched.
#[derive(Debug, Serialize)]
pub struct FetchOutcome {
    pub intercepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ResponseKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<(String, String)>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_hex: Option<String>,
}

impl From<Resolution> for FetchOutcome {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Bypass => {
                Self { intercepted: false, status: None, kind: None, headers: None, body_hex: None }
            }
            Resolution::Respond(response) => Self {
                intercepted: true,
                status: Some(response.status),
                kind: Some(response.kind),
                headers: Some(response.headers),
                body_hex: Some(hex::encode(&response.body)),
            },
        }
    }
}

/// Parse and handle one event line.
pub async fn dispatch(agent: &Agent, line: &str) -> AgentReply {
    let event: HostEvent = match serde_json::from_str(line) {
        Ok(event) => event,
        Err(err) => {
            return AgentReply { id: None, body: ReplyBody::Failed { event: "parse", error: err.to_string() } };
        }
    };
    let id = event.id;
    AgentReply { id, body: handle(agent, event.kind).await }
}

fn done(event: &'static str, result: Result<(), AgentError>) -> ReplyBody {
    match result {
        Ok(()) => ReplyBody::Completed { event },
        Err(err) => ReplyBody::Failed { event, error: err.to_string() },
    }
}

fn sync_done(event: &'static str, result: Result<SyncReport, AgentError>) -> ReplyBody {
    match result {
        Ok(report) => ReplyBody::SyncResult { report },
        Err(err) => ReplyBody::Failed { event, error: err.to_string() },
    }
}

async fn handle(agent: &Agent, kind: EventKind) -> ReplyBody {
    match kind {
        EventKind::Install => done("install", agent.install().await),
        EventKind::Activate => done("activate", agent.activate().await),
        EventKind::Fetch { url, method, destination } => match canonicalize(&url) {
            Ok(parsed) => {
                let request = ResourceRequest { url: parsed, method, destination };
                ReplyBody::FetchResult { outcome: agent.handle_fetch(&request).await.into() }
            }
            Err(err) => ReplyBody::Failed { event: "fetch", error: err.to_string() },
        },
        EventKind::Message { message } => match agent.handle_message(message).await {
            Ok(Some(info)) => ReplyBody::Version { info },
            Ok(None) => ReplyBody::Completed { event: "message" },
            Err(err) => ReplyBody::Failed { event: "message", error: err.to_string() },
        },
        EventKind::Push { payload } => done("push", agent.handle_push(payload.as_deref()).await),
        EventKind::NotificationClick { action } => {
            done("notification-click", agent.handle_notification_click(&action).await)
        }
        EventKind::Sync { tag } => sync_done("sync", agent.handle_sync(&tag).await),
        EventKind::PeriodicSync { tag } => sync_done("periodic-sync", agent.handle_periodic_sync(&tag).await),
    }
}

/// Directives the agent sends back to the hosting runtime, one JSON
/// object per stdout line. The `type` values are disjoint from reply
/// types so the host can route on them.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HostDirective {
    SkipWaiting,
    ClaimClients,
    ShowNotification { notification: Notification },
    FocusWindow { id: u64 },
    OpenWindow { url: String },
}

/// Host implementation that emits directives over the shared stdout
/// writer channel.
pub struct StdioHost {
    tx: UnboundedSender<String>,
}

impl StdioHost {
    pub fn new(tx: UnboundedSender<String>) -> Self {
        Self { tx }
    }

    fn emit(&self, directive: HostDirective) -> Result<(), HostError> {
        let json = serde_json::to_string(&directive).map_err(|e| HostError(e.to_string()))?;
        self.tx
            .send(json)
            .map_err(|e| HostError(format!("stdout writer gone: {e}")))
    }
}

#[async_trait]
impl Host for StdioHost {
    async fn skip_waiting(&self) -> Result<(), HostError> {
        self.emit(HostDirective::SkipWaiting)
    }

    async fn claim_clients(&self) -> Result<(), HostError> {
        self.emit(HostDirective::ClaimClients)
    }

    async fn show_notification(&self, notification: Notification) -> Result<(), HostError> {
        self.emit(HostDirective::ShowNotification { notification })
    }

    async fn window_clients(&self) -> Result<Vec<WindowClient>, HostError> {
        // a line protocol cannot query the host synchronously; report no
        // windows so clicks degrade to an open-window directive
        Ok(Vec::new())
    }

    async fn focus_window(&self, id: u64) -> Result<(), HostError> {
        self.emit(HostDirective::FocusWindow { id })
    }

    async fn open_window(&self, url: &str) -> Result<(), HostError> {
        self.emit(HostDirective::OpenWindow { url: url.to_string() })
    }
}
