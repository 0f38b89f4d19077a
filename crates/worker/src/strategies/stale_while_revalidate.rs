//! Stale-while-revalidate: serve the cached copy at once and refresh it in
//! the background; without a copy, wait for the network.

use sitecache_core::{Request, Response};

use super::{Revalidation, StrategyContext, fetch_and_store};
use crate::offline;
use crate::store::Partition;

pub async fn run(ctx: &StrategyContext, request: &Request) -> (Response, Option<Revalidation>) {
    if let Some(cached) = ctx.store.lookup_or_miss(request).await {
        let refresh = Revalidation::spawn(ctx.clone(), request.clone());
        return (cached, Some(refresh));
    }

    let response = match fetch_and_store(ctx, Partition::Dynamic, request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("no cached copy of {} and fetch failed: {}", request.url, e);
            offline::content_unavailable()
        }
    };
    (response, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedFetcher, context, site};
    use sitecache_core::ResponseSource;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_hit_returns_stale_then_refreshes() {
        let fetcher = Arc::new(ScriptedFetcher::new().respond("/data/feed.xml", Response::text(200, "v2")));
        let ctx = context(fetcher.clone()).await;
        let request = Request::get(site("/data/feed.xml"));
        ctx.store.put(Partition::Dynamic, &request, &Response::text(200, "v1")).await.unwrap();

        let (response, refresh) = run(&ctx, &request).await;

        assert_eq!(response.body_text(), "v1");
        assert_eq!(response.source, ResponseSource::Cache);
        assert!(refresh.unwrap().finish().await.unwrap());
        assert_eq!(fetcher.calls(), 1);
        let cached = ctx.store.lookup(&request).await.unwrap().unwrap();
        assert_eq!(cached.body_text(), "v2");
    }

    #[tokio::test]
    async fn test_repeated_hits_keep_single_entry() {
        let fetcher = Arc::new(ScriptedFetcher::new().respond("/data/feed.xml", Response::text(200, "fresh")));
        let ctx = context(fetcher).await;
        let request = Request::get(site("/data/feed.xml"));
        ctx.store.put(Partition::Dynamic, &request, &Response::text(200, "stale")).await.unwrap();

        for _ in 0..3 {
            let (_, refresh) = run(&ctx, &request).await;
            refresh.unwrap().finish().await.unwrap();
        }

        assert_eq!(ctx.store.count(Partition::Dynamic).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_cached_copy() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.fail("/data/feed.xml");
        let ctx = context(fetcher).await;
        let request = Request::get(site("/data/feed.xml"));
        ctx.store.put(Partition::Dynamic, &request, &Response::text(200, "stale")).await.unwrap();

        let (response, refresh) = run(&ctx, &request).await;

        assert_eq!(response.body_text(), "stale");
        let err = refresh.unwrap().finish().await.unwrap_err();
        assert!(err.is_network());
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(ctx.store.lookup(&request).await.unwrap().unwrap().body_text(), "stale");
    }

    #[tokio::test]
    async fn test_miss_waits_for_network_and_stores() {
        let fetcher = Arc::new(ScriptedFetcher::new().respond("/data/feed.xml", Response::text(200, "live")));
        let ctx = context(fetcher).await;
        let request = Request::get(site("/data/feed.xml"));

        let (response, refresh) = run(&ctx, &request).await;

        assert!(refresh.is_none());
        assert_eq!(response.body_text(), "live");
        assert_eq!(ctx.store.count(Partition::Dynamic).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_two_requests_from_empty_store_leave_one_entry() {
        let fetcher = Arc::new(ScriptedFetcher::new().respond("/data/feed.xml", Response::text(200, "R")));
        let ctx = context(fetcher.clone()).await;
        let request = Request::get(site("/data/feed.xml"));

        let (first, refresh) = run(&ctx, &request).await;
        assert!(refresh.is_none());
        assert_eq!(first.body_text(), "R");

        let (second, refresh) = run(&ctx, &request).await;
        assert_eq!(second.body_text(), "R");
        assert!(refresh.unwrap().finish().await.unwrap());

        assert_eq!(fetcher.calls_to("/data/feed.xml"), 2);
        assert_eq!(ctx.store.count(Partition::Dynamic).await.unwrap(), 1);
        let stored = ctx.store.lookup(&request).await.unwrap().unwrap();
        assert_eq!(stored.status, 200);
        assert_eq!(stored.body_text(), "R");
    }

    #[tokio::test]
    async fn test_miss_offline_is_503() {
        let ctx = context(Arc::new(ScriptedFetcher::new())).await;

        let (response, refresh) = run(&ctx, &Request::get(site("/data/feed.xml"))).await;

        assert!(refresh.is_none());
        assert_eq!(response.status, 503);
        assert_eq!(response.body_text(), "Content not available offline");
    }
}
