//! Agent configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (BIVVY_*)
//! 2. TOML config file (if BIVVY_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Agent configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (BIVVY_*)
/// 2. TOML config file (if BIVVY_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Current cache generation. Bumping this retires every partition of
    /// the previous generation on the next activation.
    ///
    /// Set via BIVVY_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Origin of the application the agent fronts. Responses from this
    /// origin are classified `basic`; everything else is opaque.
    ///
    /// Set via BIVVY_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Critical resources preloaded into the static partition at install.
    /// Paths are resolved against `origin`; absolute URLs pass through.
    ///
    /// Set via BIVVY_STATIC_ASSETS environment variable.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Path served as the offline document fallback for navigations.
    #[serde(default = "default_root_document")]
    pub root_document: String,

    /// Cached image served when an image fetch fails offline.
    #[serde(default = "default_image_placeholder")]
    pub image_placeholder: String,

    /// Path to the SQLite cache database.
    ///
    /// Set via BIVVY_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for outbound requests.
    ///
    /// Set via BIVVY_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via BIVVY_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network request timeout in milliseconds.
    ///
    /// Set via BIVVY_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_version() -> String {
    "v1".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_static_assets() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/manifest.json",
        "/icon-192.png",
        "/icon-512.png",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_root_document() -> String {
    "/".into()
}

fn default_image_placeholder() -> String {
    "/icon-192.png".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./bivvy-cache.sqlite")
}

fn default_user_agent() -> String {
    "bivvy/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            origin: default_origin(),
            static_assets: default_static_assets(),
            root_document: default_root_document(),
            image_placeholder: default_image_placeholder(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AgentConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The application origin as a parsed URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Resolve a configured asset reference against the application origin.
    /// Absolute URLs (third-party bundles) pass through untouched.
    pub fn resolve_asset(&self, asset: &str) -> Result<Url, ConfigError> {
        self.origin_url()?
            .join(asset)
            .map_err(|e| ConfigError::Invalid { field: "static_assets".into(), reason: format!("{asset}: {e}") })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `BIVVY_`
    /// 2. TOML file from `BIVVY_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("BIVVY_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("BIVVY_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AgentConfig::default();
        assert_eq!(config.version, "v1");
        assert_eq!(config.origin, "http://localhost:8080");
        assert_eq!(config.root_document, "/");
        assert_eq!(config.image_placeholder, "/icon-192.png");
        assert_eq!(config.db_path, PathBuf::from("./bivvy-cache.sqlite"));
        assert_eq!(config.user_agent, "bivvy/0.1");
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 20_000);
        assert!(config.static_assets.contains(&"/index.html".to_string()));
    }

    #[test]
    fn test_timeout_duration() {
        let config = AgentConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_resolve_relative_asset() {
        let config = AgentConfig::default();
        let url = config.resolve_asset("/manifest.json").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/manifest.json");
    }

    #[test]
    fn test_resolve_absolute_asset() {
        let config = AgentConfig::default();
        let url = config.resolve_asset("https://cdn.example.com/react.min.js").unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/react.min.js");
    }

    #[test]
    fn test_origin_url_invalid() {
        let config = AgentConfig { origin: "not a url".into(), ..Default::default() };
        assert!(matches!(config.origin_url(), Err(ConfigError::Invalid { .. })));
    }
}
