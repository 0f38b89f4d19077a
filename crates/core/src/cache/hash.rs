//! Request key generation.

use sha2::{Digest, Sha256};

use crate::http::{Method, Request};

/// Compute the cache key for a request descriptor.
///
/// Bodies only take part for methods that carry one, so two deferred
/// submissions to the same URL stay distinct while GET lookups ignore them.
pub fn compute_cache_key(method: Method, url: &str, body: Option<&[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    if !matches!(method, Method::Get | Method::Head)
        && let Some(body) = body
    {
        hasher.update(b"\n");
        hasher.update(Sha256::digest(body));
    }
    hex::encode(hasher.finalize())
}

/// Cache key for `request`.
pub fn request_key(request: &Request) -> String {
    compute_cache_key(request.method, request.url.as_str(), request.body.as_deref())
}
