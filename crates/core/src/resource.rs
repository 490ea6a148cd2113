//! Request and response value types.
//!
//! These are the shapes that flow through the resolution engine: an
//! ephemeral per-invocation [`ResourceRequest`], and a [`CapturedResponse`]
//! that is either fetched from the network, read back from a cache
//! partition, or synthesized for offline fallback.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// What kind of resource a request is for, as declared by the requesting
/// context. Drives fallback resolution when the network is unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Destination {
    /// Top-level navigation to a full document.
    Document,
    Image,
    Script,
    Style,
    Font,
    Other,
}

impl Default for Destination {
    fn default() -> Self {
        Destination::Other
    }
}

/// Classification of a captured response relative to the application origin.
///
/// Mirrors the same-origin / cross-origin split: only `Basic` (same-origin)
/// responses have readable bodies the cache can trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseKind {
    /// Same-origin response with a readable body.
    Basic,
    /// Cross-origin response; body treated as opaque.
    Opaque,
    /// Error-class response synthesized below the HTTP layer.
    Error,
}

impl ResponseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Basic => "basic",
            ResponseKind::Opaque => "opaque",
            ResponseKind::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "basic" => Some(ResponseKind::Basic),
            "opaque" => Some(ResponseKind::Opaque),
            "error" => Some(ResponseKind::Error),
            _ => None,
        }
    }
}

/// An intercepted outbound request. Lives only for the duration of one
/// resolution; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub url: Url,
    pub method: String,
    #[serde(default)]
    pub destination: Destination,
}

impl ResourceRequest {
    /// A GET request, which is what the engine sees in practice.
    pub fn get(url: Url, destination: Destination) -> Self {
        Self { url, method: "GET".to_string(), destination }
    }

    /// Cache identity of this request: method + canonical URL.
    pub fn identity(&self) -> String {
        crate::cache::key::identity_key(&self.method, self.url.as_str())
    }

    /// Whether the engine intervenes at all for this request's scheme.
    pub fn is_interceptable(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }
}

/// A captured response: status, kind, headers, body.
///
/// The body is a single value handed to exactly one consumer; `Clone` is the
/// explicit duplicate operation. When a network response is also cached,
/// exactly one clone is taken before the original goes to the caller, and
/// the clone is what gets persisted. `Bytes` makes the duplicate cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedResponse {
    pub status: u16,
    pub kind: ResponseKind,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl CapturedResponse {
    /// Only exact 200 + same-origin responses are cache-eligible. Opaque and
    /// error-class bodies must never poison the cache.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.kind == ResponseKind::Basic
    }

    /// First header value matching `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Synthesize an HTML response, used for the offline notice page.
    pub fn html(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            kind: ResponseKind::Basic,
            headers: vec![("Content-Type".to_string(), "text/html".to_string())],
            body: body.into(),
        }
    }

    /// Synthesize a plain-text response, used for the generic offline error.
    pub fn text(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            kind: ResponseKind::Basic,
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            body: body.into(),
        }
    }
}
