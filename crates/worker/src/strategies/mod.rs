//! Strategy executor.
//!
//! Every strategy resolves to a response; failures are converted into
//! cached copies or synthesized fallbacks instead of propagating.
//!
//! | strategy | first | on miss/failure |
//! |----------|-------|-----------------|
//! | cache-first | cache | network, then 503 text |
//! | network-first | network | cache, then 503 JSON |
//! | cache-with-fallback | cache | network, then SVG placeholder |
//! | navigation | network | cached `/index.html` or `/`, then offline page |
//! | stale-while-revalidate | cache + background refresh | network, then 503 text |

pub mod cache_first;
pub mod cache_with_fallback;
pub mod navigation;
pub mod network_first;
pub mod stale_while_revalidate;

use std::sync::Arc;

use sitecache_client::Fetcher;
use sitecache_core::{Error, Request, Response};
use tokio::task::JoinHandle;
use url::Url;

pub use crate::classify::Strategy;
use crate::store::{CacheManager, Partition};

/// Everything a strategy needs: the store, the network and the site origin.
#[derive(Clone)]
pub struct StrategyContext {
    pub store: CacheManager,
    pub fetcher: Arc<dyn Fetcher>,
    pub origin: Url,
}

/// Result of running one strategy.
#[derive(Debug)]
pub struct FetchOutcome {
    pub response: Response,
    pub strategy: Strategy,
    /// Background refresh started by stale-while-revalidate on a cache hit.
    pub revalidation: Option<Revalidation>,
}

/// Handle to a background cache refresh.
///
/// Dropping it detaches the task; it still runs to completion.
#[derive(Debug)]
pub struct Revalidation {
    handle: JoinHandle<Result<bool, Error>>,
}

impl Revalidation {
    pub(crate) fn spawn(ctx: StrategyContext, request: Request) -> Self {
        let handle = tokio::spawn(async move {
            let response = ctx.fetcher.fetch(&request).await?;
            Ok(store_if_ok(&ctx, Partition::Dynamic, &request, &response).await)
        });
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the refresh. `Ok(true)` means the cached copy was replaced.
    pub async fn finish(self) -> Result<bool, Error> {
        self.handle.await.map_err(|e| Error::Network(format!("revalidation task: {e}")))?
    }
}

/// Run `strategy` for `request`.
pub async fn execute(ctx: &StrategyContext, strategy: Strategy, request: &Request) -> FetchOutcome {
    let mut revalidation = None;
    let response = match strategy {
        Strategy::CacheFirst => cache_first::run(ctx, request).await,
        Strategy::NetworkFirst => network_first::run(ctx, request).await,
        Strategy::CacheWithFallback => cache_with_fallback::run(ctx, request).await,
        Strategy::Navigation => navigation::run(ctx, request).await,
        Strategy::StaleWhileRevalidate => {
            let (response, refresh) = stale_while_revalidate::run(ctx, request).await;
            revalidation = refresh;
            response
        }
    };

    tracing::debug!("{} {} -> {} via {}", request.method, request.url, response.status, strategy.as_str());
    FetchOutcome { response, strategy, revalidation }
}

/// Copy a 200 response into `partition`; false for any other status.
async fn store_if_ok(ctx: &StrategyContext, partition: Partition, request: &Request, response: &Response) -> bool {
    if response.status != 200 {
        return false;
    }
    ctx.store.put_best_effort(partition, request, response).await;
    true
}

/// Fetch `request` and copy a 200 answer into `partition`.
async fn fetch_and_store(ctx: &StrategyContext, partition: Partition, request: &Request) -> Result<Response, Error> {
    let response = ctx.fetcher.fetch(request).await?;
    store_if_ok(ctx, partition, request, &response).await;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedFetcher, context, site};
    use sitecache_core::ResponseSource;

    #[tokio::test]
    async fn test_execute_reports_strategy() {
        let fetcher = Arc::new(ScriptedFetcher::new().respond("/api/metrics", Response::text(200, "{}")));
        let ctx = context(fetcher).await;

        let outcome = execute(&ctx, Strategy::NetworkFirst, &Request::get(site("/api/metrics"))).await;

        assert_eq!(outcome.strategy, Strategy::NetworkFirst);
        assert!(outcome.revalidation.is_none());
        assert_eq!(outcome.response.status, 200);
        assert_eq!(outcome.response.source, ResponseSource::Network);
    }

    #[tokio::test]
    async fn test_non_200_success_is_not_cached() {
        let fetcher = Arc::new(ScriptedFetcher::new().respond("/api/created", Response::new(201, "made")));
        let ctx = context(fetcher).await;

        let outcome = execute(&ctx, Strategy::NetworkFirst, &Request::get(site("/api/created"))).await;

        assert_eq!(outcome.response.status, 201);
        assert_eq!(ctx.store.count(Partition::Dynamic).await.unwrap(), 0);
    }
}
