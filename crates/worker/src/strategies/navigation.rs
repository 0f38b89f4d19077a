//! Navigation: always try the network first so pages are fresh, and fall
//! back to the cached shell or the offline page.

use sitecache_core::{Request, Response};

use super::StrategyContext;
use crate::offline;

/// Cached documents tried, in order, when a navigation fails.
const SHELL_PATHS: &[&str] = &["/index.html", "/"];

pub async fn run(ctx: &StrategyContext, request: &Request) -> Response {
    match ctx.fetcher.fetch(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("navigation to {} failed, serving offline shell: {}", request.url, e);
            cached_shell(ctx).await.unwrap_or_else(offline::offline_page)
        }
    }
}

async fn cached_shell(ctx: &StrategyContext) -> Option<Response> {
    for path in SHELL_PATHS {
        let Ok(url) = ctx.origin.join(path) else {
            continue;
        };
        if let Some(cached) = ctx.store.lookup_or_miss(&Request::get(url)).await {
            return Some(cached);
        }
    }
    None
}
