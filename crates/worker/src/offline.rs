//! Responses synthesized when neither the network nor the cache can answer.

use serde_json::json;
use sitecache_core::{Response, ResponseSource};

const OFFLINE_PAGE: &str = include_str!("../assets/offline.html");
const IMAGE_PLACEHOLDER: &str = include_str!("../assets/placeholder.svg");

/// 503 for a static asset that was never cached.
pub fn asset_unavailable() -> Response {
    unavailable("Offline content not available")
}

/// 503 for content with no cached copy.
pub fn content_unavailable() -> Response {
    unavailable("Content not available offline")
}

fn unavailable(message: &str) -> Response {
    Response::text(503, message).with_source(ResponseSource::Synthesized)
}

/// 503 JSON body for API calls, flagged `offline` so the page can tell it apart from a server error.
pub fn api_unavailable() -> Response {
    Response::json(503, &json!({ "error": "Network unavailable", "offline": true }))
        .with_source(ResponseSource::Synthesized)
}

/// Neutral 200x200 placeholder standing in for an image.
pub fn image_placeholder() -> Response {
    Response::new(200, IMAGE_PLACEHOLDER.trim_end())
        .with_header("content-type", "image/svg+xml")
        .with_header("cache-control", "no-store")
        .with_source(ResponseSource::Synthesized)
}

/// Branded page shown for navigations while offline.
pub fn offline_page() -> Response {
    Response::new(200, OFFLINE_PAGE)
        .with_header("content-type", "text/html")
        .with_header("cache-control", "no-store")
        .with_source(ResponseSource::Synthesized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_unavailable_body() {
        let response = api_unavailable();
        assert_eq!(response.status, 503);
        assert_eq!(response.status_text, "Service Unavailable");
        assert_eq!(response.content_type(), Some("application/json"));
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body, json!({ "error": "Network unavailable", "offline": true }));
    }

    #[test]
    fn test_text_fallbacks() {
        assert_eq!(asset_unavailable().body_text(), "Offline content not available");
        assert_eq!(content_unavailable().body_text(), "Content not available offline");
        assert_eq!(content_unavailable().status, 503);
    }

    #[test]
    fn test_image_placeholder() {
        let response = image_placeholder();
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type(), Some("image/svg+xml"));
        assert_eq!(response.header("cache-control"), Some("no-store"));
        assert!(response.body_text().starts_with("<svg"));
        assert!(response.body_text().contains("Image unavailable"));
    }

    #[test]
    fn test_offline_page() {
        let response = offline_page();
        let html = response.body_text();
        assert_eq!(response.content_type(), Some("text/html"));
        assert_eq!(response.source, ResponseSource::Synthesized);
        assert!(html.contains("You're Offline"));
        assert!(html.contains("window.location.reload()"));
        assert!(html.contains("addEventListener('online'"));
    }
}
