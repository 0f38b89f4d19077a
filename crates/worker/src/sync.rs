//! Deferred submissions and background refresh.
//!
//! Contact form posts made while offline are parked in the dynamic
//! partition and re-sent when the `contact-form-sync` trigger fires. The
//! `content-sync` trigger refreshes the cached site root.

use std::sync::Arc;

use serde::Serialize;
use sitecache_client::Fetcher;
use sitecache_core::{Error, Method, Request, Response, ResponseSource};
use url::Url;

use crate::store::{CacheManager, Partition};

/// Sync tag that replays deferred contact form submissions.
pub const CONTACT_FORM_SYNC: &str = "contact-form-sync";
/// Periodic sync tag that refreshes the site root.
pub const CONTENT_SYNC: &str = "content-sync";
/// URL substring identifying a contact form submission.
pub const SUBMISSION_MARKER: &str = "contact-submit";

/// Outcome of one replay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Submissions the network answered; removed from the queue.
    pub replayed: usize,
    /// Submissions that hit a network failure; left for the next trigger.
    pub failed: usize,
}

#[derive(Clone)]
pub struct SyncQueue {
    store: CacheManager,
    fetcher: Arc<dyn Fetcher>,
    origin: Url,
}

fn is_submission(request: &Request) -> bool {
    request.method == Method::Post && request.url.as_str().contains(SUBMISSION_MARKER)
}

impl SyncQueue {
    pub fn new(store: CacheManager, fetcher: Arc<dyn Fetcher>, origin: Url) -> Self {
        Self { store, fetcher, origin }
    }

    /// Park a submission until the next `contact-form-sync` trigger.
    ///
    /// The stored response is a synthesized 202 placeholder.
    pub async fn defer(&self, request: &Request) -> Result<(), Error> {
        if !is_submission(request) {
            return Err(Error::InvalidInput(format!(
                "only POST requests to {SUBMISSION_MARKER} can be deferred, got {} {}",
                request.method, request.url
            )));
        }
        let placeholder = Response::new(202, Vec::new()).with_source(ResponseSource::Synthesized);
        self.store.put(Partition::Dynamic, request, &placeholder).await?;
        tracing::info!("deferred submission to {}", request.url);
        Ok(())
    }

    /// Submissions waiting for replay, oldest first.
    pub async fn pending(&self) -> Result<Vec<Request>, Error> {
        let keys = self.store.db().keys(self.store.name(Partition::Dynamic)).await?;
        Ok(keys.into_iter().filter(is_submission).collect())
    }

    /// Re-send every parked submission.
    ///
    /// Any network response, whatever its status, counts as delivered and
    /// removes the entry. A network failure leaves it in place.
    pub async fn replay(&self) -> Result<SyncReport, Error> {
        let mut report = SyncReport::default();
        for request in self.pending().await? {
            match self.fetcher.fetch(&request).await {
                Ok(response) => {
                    tracing::info!("replayed submission to {} ({})", request.url, response.status);
                    report.replayed += 1;
                    if let Err(e) = self.store.db().delete_entry(self.store.name(Partition::Dynamic), &request).await {
                        tracing::warn!("delivered submission to {} still queued: {}", request.url, e);
                    }
                }
                Err(e) => {
                    tracing::warn!("replay of submission to {} failed: {}", request.url, e);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    /// Fetch the site root and, on 2xx, store it in the dynamic partition.
    ///
    /// Returns whether the cached copy was refreshed; failures are logged.
    pub async fn refresh_content(&self) -> bool {
        let Ok(root) = self.origin.join("/") else {
            return false;
        };
        let request = Request::get(root);
        match self.fetcher.fetch(&request).await {
            Ok(response) if response.is_ok() => match self.store.put(Partition::Dynamic, &request, &response).await {
                Ok(()) => {
                    tracing::info!("refreshed {}", request.url);
                    true
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    false
                }
            },
            Ok(response) => {
                tracing::warn!("content refresh of {} answered {}", request.url, response.status);
                false
            }
            Err(e) => {
                tracing::warn!("content refresh of {} failed: {}", request.url, e);
                false
            }
        }
    }
}
