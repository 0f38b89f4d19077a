//! Cache-with-fallback for images: cache, then network, then a placeholder
//! so the layout never shows a broken image.

use sitecache_core::{Request, Response};

use super::{StrategyContext, fetch_and_store};
use crate::offline;
use crate::store::Partition;

pub async fn run(ctx: &StrategyContext, request: &Request) -> Response {
    if let Some(cached) = ctx.store.lookup_or_miss(request).await {
        return cached;
    }

    match fetch_and_store(ctx, Partition::Dynamic, request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("image fetch for {} failed: {}", request.url, e);
            offline::image_placeholder()
        }
    }
}
