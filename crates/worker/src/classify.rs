//! Request classification.
//!
//! Maps a request descriptor to exactly one category. Rules are checked in
//! a fixed order and the first match wins:
//!
//! 1. non-GET method → bypass
//! 2. non-HTTP(S) scheme → bypass
//! 3. stylesheet/script URL or allowlisted font/CDN host → static asset
//! 4. API prefix, contact route or submission marker → API call
//! 5. image destination or image extension → image
//! 6. navigate mode or HTML `Accept` → navigation
//! 7. anything else → other
//!
//! Matching is substring-based on the full URL. The submission marker is
//! a bare `submit`, so `submit-icon.svg` lands in the API bucket ahead of
//! the image rule; that ordering is kept on purpose.

use serde::Serialize;
use sitecache_client::is_http;
use sitecache_core::{Destination, Method, Request, RequestMode};

const STATIC_MARKERS: &[&str] = &[".css", ".js"];
const API_MARKERS: &[&str] = &["/api/", "/contact", "submit"];
const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg"];

/// The bucket a request falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Not intercepted; the request proceeds natively.
    Bypass,
    StaticAsset,
    ApiCall,
    Image,
    Navigation,
    Other,
}

/// How an intercepted request is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    CacheWithFallback,
    Navigation,
    StaleWhileRevalidate,
}

impl Category {
    /// Strategy assignment; `None` for bypassed requests.
    pub fn strategy(self) -> Option<Strategy> {
        match self {
            Category::Bypass => None,
            Category::StaticAsset => Some(Strategy::CacheFirst),
            Category::ApiCall => Some(Strategy::NetworkFirst),
            Category::Image => Some(Strategy::CacheWithFallback),
            Category::Navigation => Some(Strategy::Navigation),
            Category::Other => Some(Strategy::StaleWhileRevalidate),
        }
    }
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::CacheFirst => "cache-first",
            Strategy::NetworkFirst => "network-first",
            Strategy::CacheWithFallback => "cache-with-fallback",
            Strategy::Navigation => "navigation",
            Strategy::StaleWhileRevalidate => "stale-while-revalidate",
        }
    }
}

/// Stateless classifier; the only input besides the request is the host allowlist.
#[derive(Debug, Clone)]
pub struct Classifier {
    static_hosts: Vec<String>,
}

impl Classifier {
    pub fn new(static_hosts: Vec<String>) -> Self {
        Self { static_hosts: static_hosts.into_iter().map(|h| h.to_ascii_lowercase()).collect() }
    }

    pub fn classify(&self, request: &Request) -> Category {
        if request.method != Method::Get || !is_http(&request.url) {
            return Category::Bypass;
        }

        let url = request.url.as_str();

        if self.is_static_asset(request) {
            Category::StaticAsset
        } else if API_MARKERS.iter().any(|m| url.contains(m)) {
            Category::ApiCall
        } else if request.destination == Destination::Image || IMAGE_EXTENSIONS.iter().any(|ext| url.contains(ext)) {
            Category::Image
        } else if is_navigation(request) {
            Category::Navigation
        } else {
            Category::Other
        }
    }

    fn is_static_asset(&self, request: &Request) -> bool {
        let url = request.url.as_str();
        if STATIC_MARKERS.iter().any(|m| url.contains(m)) {
            return true;
        }
        let Some(host) = request.url.host_str() else {
            return false;
        };
        self.static_hosts.iter().any(|allowed| {
            host == allowed || host.strip_suffix(allowed.as_str()).is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

fn is_navigation(request: &Request) -> bool {
    request.mode == RequestMode::Navigate
        || (request.method == Method::Get && request.accept().is_some_and(|accept| accept.contains("text/html")))
}
