//! Outbound HTTP layer behind the [`Network`] trait.
//!
//! The resolution engine never talks to reqwest directly: it holds a
//! `dyn Network`, which keeps the cache-first decision logic deterministic
//! under test (a mock can record that zero fetches happened on a cache hit).
//!
//! ### Response classification
//! - Final URL on the application origin → `basic` (readable, cacheable)
//! - Anything else → `opaque` (served, never cached)
//!
//! ### Failure signaling
//! Timeouts, DNS failures, and refused connections surface as
//! [`NetworkError`]; the engine maps every variant into offline fallback.
//! HTTP error statuses are NOT errors here - a 404 is a valid response the
//! caller must see, just never cached.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url};
use std::time::{Duration, Instant};

pub use url::{UrlError, canonicalize};

use bivvy_core::resource::{CapturedResponse, ResourceRequest, ResponseKind};

/// Errors from the network layer. Every variant routes the engine into
/// fallback resolution.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Request timed out.
    #[error("NETWORK_TIMEOUT: {0}")]
    Timeout(String),

    /// Connection could not be established (DNS, refused, unreachable).
    #[error("NETWORK_UNREACHABLE: {0}")]
    Unreachable(String),

    /// Connection established but the body could not be read.
    #[error("NETWORK_BODY: {0}")]
    Body(String),

    /// Response body exceeded the configured limit.
    #[error("NETWORK_TOO_LARGE: {got} bytes exceeds {limit}")]
    TooLarge { got: usize, limit: usize },

    /// The request itself could not be built or sent.
    #[error("NETWORK_CLIENT: {0}")]
    Client(String),
}

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Application origin; responses from it are classified `basic`.
    pub origin: Url,

    /// User agent string (default: "bivvy/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,
}

impl NetworkConfig {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            user_agent: "bivvy/0.1".to_string(),
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

/// The network seam the resolution engine fetches through.
#[async_trait]
pub trait Network: Send + Sync {
    /// Issue the request and capture the full response.
    ///
    /// `Err` means the network layer failed below HTTP; an HTTP error
    /// status is returned as an `Ok` response.
    async fn fetch(&self, request: &ResourceRequest) -> Result<CapturedResponse, NetworkError>;
}

/// Classify a response by where it finally came from.
fn classify(final_url: &Url, origin: &Url) -> ResponseKind {
    if final_url.origin() == origin.origin() { ResponseKind::Basic } else { ResponseKind::Opaque }
}

/// Production HTTP client.
pub struct HttpClient {
    http: Client,
    config: NetworkConfig,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration.
    pub fn new(config: NetworkConfig) -> Result<Self, NetworkError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| NetworkError::Client(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }
}

#[async_trait]
impl Network for HttpClient {
    async fn fetch(&self, request: &ResourceRequest) -> Result<CapturedResponse, NetworkError> {
        let start = Instant::now();

        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| NetworkError::Client(format!("invalid method: {}", request.method)))?;

        let response = self
            .http
            .request(method, request.url.as_str())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NetworkError::Timeout(e.to_string())
                } else {
                    NetworkError::Unreachable(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let kind = classify(&final_url, &self.config.origin);

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(NetworkError::TooLarge { got: len as usize, limit: self.config.max_bytes });
        }

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect();

        let body: Bytes = response
            .bytes()
            .await
            .map_err(|e| NetworkError::Body(format!("failed to read response: {e}")))?;

        if body.len() > self.config.max_bytes {
            return Err(NetworkError::TooLarge { got: body.len(), limit: self.config.max_bytes });
        }

        tracing::debug!(
            "fetched {} -> {} status {} kind {} in {}ms ({} bytes)",
            request.url,
            final_url,
            status,
            kind.as_str(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(CapturedResponse { status, kind, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://app.example.com").unwrap()
    }

    #[test]
    fn test_network_config_defaults() {
        let config = NetworkConfig::new(origin());
        assert_eq!(config.user_agent, "bivvy/0.1");
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_classify_same_origin() {
        let final_url = Url::parse("https://app.example.com/assets/app.js").unwrap();
        assert_eq!(classify(&final_url, &origin()), ResponseKind::Basic);
    }

    #[test]
    fn test_classify_cross_origin() {
        for cross in [
            "https://cdn.example.com/react.min.js",
            "http://app.example.com/downgraded",
            "https://app.example.com:8443/other-port",
        ] {
            let final_url = Url::parse(cross).unwrap();
            assert_eq!(classify(&final_url, &origin()), ResponseKind::Opaque, "{cross}");
        }
    }

    #[tokio::test]
    async fn test_http_client_new() {
        let client = HttpClient::new(NetworkConfig::new(origin()));
        assert!(client.is_ok());
    }
}
