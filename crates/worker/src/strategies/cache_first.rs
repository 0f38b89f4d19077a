//! Cache-first: answer from any partition, otherwise go to the network and
//! keep a copy in the static partition.

use sitecache_core::{Request, Response};

use super::{StrategyContext, fetch_and_store};
use crate::offline;
use crate::store::Partition;

pub async fn run(ctx: &StrategyContext, request: &Request) -> Response {
    if let Some(cached) = ctx.store.lookup_or_miss(request).await {
        return cached;
    }

    match fetch_and_store(ctx, Partition::Static, request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("cache-first fetch for {} failed: {}", request.url, e);
            offline::asset_unavailable()
        }
    }
}
