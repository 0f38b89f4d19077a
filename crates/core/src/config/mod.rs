//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SITECACHE_*)
//! 2. TOML config file (if SITECACHE_CONFIG_FILE set)
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

/// Static assets loaded into the static partition at install time.
pub const DEFAULT_STATIC_MANIFEST: &[&str] = &[
    "/",
    "/index.html",
    "/assets/css/style.css",
    "/assets/js/main.js",
    "/manifest.json",
    "https://fonts.googleapis.com/css2?family=Inter:wght@300;400;500;600;700;800&family=JetBrains+Mono:wght@400;500;600&display=swap",
    "https://unpkg.com/aos@2.3.1/dist/aos.css",
    "https://unpkg.com/aos@2.3.1/dist/aos.js",
];

/// Font and CDN hosts whose responses are treated as static assets.
pub const DEFAULT_STATIC_HOSTS: &[&str] = &["fonts.googleapis.com", "unpkg.com"];

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SITECACHE_*)
/// 2. TOML config file (if SITECACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin the worker is registered on; relative URLs resolve against it.
    ///
    /// Set via SITECACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Prefix shared by both partition names.
    ///
    /// Set via SITECACHE_CACHE_PREFIX environment variable.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version token embedded in partition names. Bumping it evicts every
    /// partition from the previous deployment on the next activation.
    ///
    /// Set via SITECACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Release string reported to pages asking for the worker version.
    ///
    /// Set via SITECACHE_RELEASE environment variable.
    #[serde(default = "default_release")]
    pub release: String,

    /// Path to SQLite cache database.
    ///
    /// Set via SITECACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SITECACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SITECACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// URLs stored in the static partition at install time.
    #[serde(default = "default_static_manifest")]
    pub static_manifest: Vec<String>,

    /// Hosts whose requests are always routed cache-first.
    #[serde(default = "default_static_hosts")]
    pub static_hosts: Vec<String>,

    /// Whether a freshly installed worker asks to activate without waiting.
    ///
    /// Set via SITECACHE_SKIP_WAITING_ON_INSTALL environment variable.
    #[serde(default = "default_true")]
    pub skip_waiting_on_install: bool,
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_cache_prefix() -> String {
    "thinkbit".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_release() -> String {
    "thinkbit-edge-v1.0.0".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./sitecache.sqlite")
}

fn default_user_agent() -> String {
    "sitecache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_static_manifest() -> Vec<String> {
    DEFAULT_STATIC_MANIFEST.iter().map(|s| s.to_string()).collect()
}

fn default_static_hosts() -> Vec<String> {
    DEFAULT_STATIC_HOSTS.iter().map(|s| s.to_string()).collect()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            release: default_release(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            static_manifest: default_static_manifest(),
            static_hosts: default_static_hosts(),
            skip_waiting_on_install: true,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name of the long-lived partition populated at install time.
    pub fn static_partition(&self) -> String {
        format!("{}-static-{}", self.cache_prefix, self.cache_version)
    }

    /// Name of the partition populated at runtime.
    pub fn dynamic_partition(&self) -> String {
        format!("{}-dynamic-{}", self.cache_prefix, self.cache_version)
    }

    /// Parsed origin URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => {
                Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme: {scheme}") })
            }
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SITECACHE_`
    /// 2. TOML file from `SITECACHE_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("SITECACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SITECACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
