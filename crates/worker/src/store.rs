//! Cache store manager.
//!
//! Owns the two versioned partitions the worker writes to and the
//! install/activate housekeeping around them:
//!
//! - install populates the static partition from the manifest, all or nothing
//! - activate deletes every partition whose name is not a current one
//! - runtime writes from the strategies are best-effort

use std::sync::Arc;

use sitecache_client::Fetcher;
use sitecache_core::{AppConfig, CacheDb, Error, Request, Response};
use tokio::task::JoinSet;
use url::Url;

/// Which of the two current partitions a write goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    /// Populated at install time; survives until the next version bump.
    Static,
    /// Populated at runtime by the strategies and the sync manager.
    Dynamic,
}

/// Cache store manager for one worker version.
#[derive(Clone)]
pub struct CacheManager {
    db: CacheDb,
    static_name: String,
    dynamic_name: String,
}

impl CacheManager {
    pub fn new(db: CacheDb, config: &AppConfig) -> Self {
        Self { db, static_name: config.static_partition(), dynamic_name: config.dynamic_partition() }
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    /// Name of the partition backing `partition` for this version.
    pub fn name(&self, partition: Partition) -> &str {
        match partition {
            Partition::Static => &self.static_name,
            Partition::Dynamic => &self.dynamic_name,
        }
    }

    fn is_current(&self, name: &str) -> bool {
        name == self.static_name || name == self.dynamic_name
    }

    /// Look `request` up across every partition, oldest first.
    pub async fn lookup(&self, request: &Request) -> Result<Option<Response>, Error> {
        let hit = self.db.match_any(request).await?;
        if hit.is_some() {
            tracing::debug!("cache hit for {}", request.url);
        }
        Ok(hit)
    }

    /// Lookup that treats a store error as a miss.
    pub async fn lookup_or_miss(&self, request: &Request) -> Option<Response> {
        match self.lookup(request).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!("cache lookup for {} failed: {}", request.url, e);
                None
            }
        }
    }

    /// Lookup that fails with `Error::CacheMiss` when nothing is stored.
    pub async fn cached(&self, request: &Request) -> Result<Response, Error> {
        self.lookup(request).await?.ok_or_else(|| Error::CacheMiss(format!("{} {}", request.method, request.url)))
    }

    pub async fn put(&self, partition: Partition, request: &Request, response: &Response) -> Result<(), Error> {
        self.db
            .put(self.name(partition), request, response)
            .await
            .map_err(|e| Error::CacheWrite(format!("{} in {}: {e}", request.url, self.name(partition))))
    }

    /// Store a copy of `response`; a failed write is logged and dropped.
    pub async fn put_best_effort(&self, partition: Partition, request: &Request, response: &Response) {
        if let Err(e) = self.put(partition, request, response).await {
            tracing::warn!("{}", e);
        }
    }

    /// Populate the static partition from `manifest`.
    ///
    /// Every URL is fetched concurrently and must answer 2xx. Entries are only
    /// written once all of them have, in a single transaction, so a failed
    /// install leaves nothing behind. Returns the number of entries stored.
    pub async fn install(&self, fetcher: Arc<dyn Fetcher>, manifest: &[Url]) -> Result<usize, Error> {
        self.db.open_partition(&self.static_name).await?;

        let mut join_set = JoinSet::new();
        for (index, url) in manifest.iter().cloned().enumerate() {
            let fetcher = Arc::clone(&fetcher);
            join_set.spawn(async move {
                let request = Request::get(url);
                let result = fetcher.fetch(&request).await;
                (index, request, result)
            });
        }

        let mut fetched: Vec<Option<(Request, Response)>> = vec![None; manifest.len()];
        while let Some(joined) = join_set.join_next().await {
            let (index, request, result) = joined.map_err(|e| Error::InstallFailed(e.to_string()))?;
            let response = match result {
                Ok(response) if response.is_ok() => response,
                Ok(response) => {
                    join_set.shutdown().await;
                    return Err(self.install_failed(format!("{} answered {}", request.url, response.status)));
                }
                Err(e) => {
                    join_set.shutdown().await;
                    return Err(self.install_failed(format!("{}: {e}", request.url)));
                }
            };
            fetched[index] = Some((request, response));
        }

        let pairs: Vec<(Request, Response)> = fetched.into_iter().flatten().collect();
        let stored = pairs.len();
        self.db
            .put_all(&self.static_name, pairs)
            .await
            .map_err(|e| self.install_failed(format!("writing {}: {e}", self.static_name)))?;

        tracing::info!("installed {} static entries into {}", stored, self.static_name);
        Ok(stored)
    }

    fn install_failed(&self, detail: String) -> Error {
        let err = Error::InstallFailed(detail);
        tracing::error!("{}", err);
        err
    }

    /// Delete every partition not belonging to this version.
    ///
    /// Returns the evicted names, oldest first.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        let mut evicted = Vec::new();
        for name in self.db.partition_names().await? {
            if self.is_current(&name) {
                continue;
            }
            if self.db.delete_partition(&name).await? {
                tracing::info!("deleted stale partition {}", name);
                evicted.push(name);
            }
        }
        Ok(evicted)
    }

    pub async fn partitions(&self) -> Result<Vec<String>, Error> {
        self.db.partition_names().await
    }

    pub async fn count(&self, partition: Partition) -> Result<u64, Error> {
        self.db.count_entries(self.name(partition)).await
    }
}
