//! HTTP fetch pipeline used by the worker strategies.
//!
//! ### Semantics
//! - Any HTTP response, whatever its status, is a successful fetch; only
//!   transport failures (connect, DNS, TLS, timeout, body read) are errors.
//! - Method, headers and body of the request descriptor are forwarded as-is.
//! - Max redirects: 5
//!
//! ### Abstraction
//! - Strategies call through the `Fetcher` trait so the network can be
//!   replaced by a scripted fake in tests.

pub mod error;
pub mod url;

use reqwest::Client;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

pub use error::FetchError;
pub use self::url::{UrlError, is_http, resolve, resolve_http};

use sitecache_core::{AppConfig, Error, Request, Response, ResponseSource};

/// Network access as seen by the worker.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Issue `request` over the network.
    ///
    /// Resolves with whatever the server answered; rejects only when no
    /// response arrived.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "sitecache/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "sitecache/0.1".to_string(), timeout: Duration::from_millis(20000), max_redirects: 5 }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), ..Default::default() }
    }
}

/// reqwest-backed fetch client.
pub struct FetchClient {
    http: Client,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http })
    }

    async fn send(&self, request: &Request) -> Result<Response, FetchError> {
        let start = Instant::now();
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|_| FetchError::InvalidMethod(request.method.to_string()))?;

        let mut builder = self.http.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let bytes = response.bytes().await?;

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: bytes.to_vec(),
            source: ResponseSource::Network,
        })
    }
}

#[async_trait::async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.send(request).await.map_err(Error::from)
    }
}
