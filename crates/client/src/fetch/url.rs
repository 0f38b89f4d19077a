//! URL resolution for requests issued by the page.

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a URL string as the page would, relative to `origin`.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Join relative references onto the origin; absolute URLs pass through
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
///
/// Non-HTTP schemes are kept so the classifier can let them bypass the
/// worker; use [`is_http`] where only network URLs make sense.
pub fn resolve(origin: &url::Url, input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        if lowered != host {
            parsed
                .set_host(Some(&lowered))
                .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
        }
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Whether the URL uses a scheme the network client can fetch.
pub fn is_http(url: &url::Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Resolve and require an http(s) scheme.
pub fn resolve_http(origin: &url::Url, input: &str) -> Result<url::Url, UrlError> {
    let url = resolve(origin, input)?;
    if !is_http(&url) {
        return Err(UrlError::UnsupportedScheme(url.scheme().to_string()));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> url::Url {
        url::Url::parse("https://thinkbit.test").unwrap()
    }

    #[test]
    fn test_resolve_relative_path() {
        let url = resolve(&origin(), "/assets/css/style.css").unwrap();
        assert_eq!(url.as_str(), "https://thinkbit.test/assets/css/style.css");
    }

    #[test]
    fn test_resolve_absolute_passthrough() {
        let url = resolve(&origin(), "https://unpkg.com/aos@2.3.1/dist/aos.js").unwrap();
        assert_eq!(url.host_str(), Some("unpkg.com"));
        assert_eq!(url.path(), "/aos@2.3.1/dist/aos.js");
    }

    #[test]
    fn test_resolve_lowercase_host() {
        let url = resolve(&origin(), "https://FONTS.GoogleAPIs.com/css2").unwrap();
        assert_eq!(url.host_str(), Some("fonts.googleapis.com"));
    }

    #[test]
    fn test_resolve_remove_fragment() {
        let url = resolve(&origin(), "/research#labs").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/research");
    }

    #[test]
    fn test_resolve_preserve_query() {
        let url = resolve(&origin(), "/api/metrics?range=7d&b=2").unwrap();
        assert_eq!(url.query(), Some("range=7d&b=2"));
    }

    #[test]
    fn test_resolve_trim_whitespace() {
        let url = resolve(&origin(), "  /team  ").unwrap();
        assert_eq!(url.as_str(), "https://thinkbit.test/team");
    }

    #[test]
    fn test_resolve_keeps_extension_scheme() {
        let url = resolve(&origin(), "chrome-extension://abc/script.js").unwrap();
        assert_eq!(url.scheme(), "chrome-extension");
        assert!(!is_http(&url));
    }

    #[test]
    fn test_resolve_http_rejects_other_schemes() {
        let result = resolve_http(&origin(), "file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve(&origin(), ""), Err(UrlError::Empty)));
        assert!(matches!(resolve(&origin(), "   "), Err(UrlError::Empty)));
    }
}
