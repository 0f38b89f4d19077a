//! Network-first: the freshest answer wins; the dynamic partition is the
//! fallback for when the network is gone.

use sitecache_core::{Request, Response};

use super::{StrategyContext, fetch_and_store};
use crate::offline;
use crate::store::Partition;

pub async fn run(ctx: &StrategyContext, request: &Request) -> Response {
    match fetch_and_store(ctx, Partition::Dynamic, request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("network-first fetch for {} failed, trying cache: {}", request.url, e);
            match ctx.store.lookup_or_miss(request).await {
                Some(cached) => cached,
                None => offline::api_unavailable(),
            }
        }
    }
}
