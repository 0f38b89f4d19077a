//! The worker: owns its store, network, lifecycle and host, and routes each
//! event to its handler.

use std::sync::Arc;

use serde_json::{Value, json};
use sitecache_client::{Fetcher, resolve_http};
use sitecache_core::{AppConfig, CacheDb, Error, Request};
use url::Url;

use crate::classify::Classifier;
use crate::events::{ActivationReport, Event, EventKind, EventOutcome, FetchDecision, Message, WorkerMessage};
use crate::host::{ClientHost, EXPLORE_ACTION, Notification};
use crate::lifecycle::Lifecycle;
use crate::store::CacheManager;
use crate::strategies::{self, StrategyContext};
use crate::sync::{CONTACT_FORM_SYNC, CONTENT_SYNC, SyncQueue};

pub struct Worker {
    release: String,
    skip_waiting_on_install: bool,
    manifest: Vec<Url>,
    classifier: Classifier,
    ctx: StrategyContext,
    sync: SyncQueue,
    lifecycle: Lifecycle,
    host: Arc<dyn ClientHost>,
}

impl Worker {
    /// Build a worker for the version described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the origin or a manifest entry does not
    /// resolve to an http(s) URL.
    pub fn new(
        config: &AppConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>, host: Arc<dyn ClientHost>,
    ) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let manifest = config
            .static_manifest
            .iter()
            .map(|entry| resolve_http(&origin, entry).map_err(|e| Error::InvalidUrl(format!("{entry}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        let store = CacheManager::new(db, config);
        let sync = SyncQueue::new(store.clone(), Arc::clone(&fetcher), origin.clone());

        Ok(Self {
            release: config.release.clone(),
            skip_waiting_on_install: config.skip_waiting_on_install,
            manifest,
            classifier: Classifier::new(config.static_hosts.clone()),
            ctx: StrategyContext { store, fetcher, origin },
            sync,
            lifecycle: Lifecycle::new(),
            host,
        })
    }

    pub fn origin(&self) -> &Url {
        &self.ctx.origin
    }

    /// Release string reported to pages.
    pub fn release(&self) -> &str {
        &self.release
    }

    pub fn store(&self) -> &CacheManager {
        &self.ctx.store
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn sync_queue(&self) -> &SyncQueue {
        &self.sync
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Handle one event.
    pub async fn dispatch(&self, event: Event) -> Result<EventOutcome, Error> {
        let kind = event.kind();
        tracing::debug!("dispatching {} event", kind.as_str());
        match event {
            Event::Install => self.on_install().await,
            Event::Activate => self.activate().await.map(EventOutcome::Activated),
            Event::Fetch(request) => Ok(EventOutcome::Fetch(self.on_fetch(&request).await)),
            Event::Sync { tag } => self.on_sync(&tag).await,
            Event::PeriodicSync { tag } => Ok(self.on_periodic_sync(&tag).await),
            Event::Push => self.on_push().await,
            Event::NotificationClick { action } => self.on_notification_click(action.as_deref()).await,
            Event::Message(message) => self.on_message(message).await,
            Event::Superseded => {
                self.lifecycle.mark_redundant().await;
                Ok(EventOutcome::Retired)
            }
        }
    }

    async fn on_install(&self) -> Result<EventOutcome, Error> {
        self.lifecycle.begin_install().await?;
        let stored = match self.ctx.store.install(Arc::clone(&self.ctx.fetcher), &self.manifest).await {
            Ok(stored) => stored,
            Err(e) => {
                self.lifecycle.fail_install().await?;
                return Err(e);
            }
        };
        self.lifecycle.finish_install().await?;

        if self.skip_waiting_on_install {
            self.lifecycle.skip_waiting().await;
        }
        let activation = self.activate_if_waiting_skipped().await?;
        Ok(EventOutcome::Installed { stored, activation })
    }

    async fn activate_if_waiting_skipped(&self) -> Result<Option<ActivationReport>, Error> {
        if self.lifecycle.should_activate().await { self.activate().await.map(Some) } else { Ok(None) }
    }

    /// Evict other versions' partitions and take control of open pages.
    async fn activate(&self) -> Result<ActivationReport, Error> {
        self.lifecycle.begin_activate().await?;
        let evicted = match self.ctx.store.activate().await {
            Ok(evicted) => evicted,
            Err(e) => {
                self.lifecycle.fail_activate().await?;
                return Err(e);
            }
        };
        self.lifecycle.finish_activate(self.host.as_ref()).await?;
        Ok(ActivationReport { evicted })
    }

    async fn on_fetch(&self, request: &Request) -> FetchDecision {
        let category = self.classifier.classify(request);
        let Some(strategy) = category.strategy() else {
            tracing::debug!("passing through {} {}", request.method, request.url);
            return FetchDecision::Passthrough;
        };
        FetchDecision::Respond(strategies::execute(&self.ctx, strategy, request).await)
    }

    async fn on_sync(&self, tag: &str) -> Result<EventOutcome, Error> {
        if tag != CONTACT_FORM_SYNC {
            return Ok(ignored(EventKind::Sync, format!("unknown sync tag {tag}")));
        }
        let report = self.sync.replay().await?;
        tracing::info!("contact form sync: {} replayed, {} failed", report.replayed, report.failed);
        Ok(EventOutcome::Synced(report))
    }

    async fn on_periodic_sync(&self, tag: &str) -> EventOutcome {
        if tag != CONTENT_SYNC {
            return ignored(EventKind::PeriodicSync, format!("unknown periodic sync tag {tag}"));
        }
        EventOutcome::Refreshed { updated: self.sync.refresh_content().await }
    }

    async fn on_push(&self) -> Result<EventOutcome, Error> {
        let notification = Notification::site_update(chrono::Utc::now());
        self.host.show_notification(&notification).await?;
        Ok(EventOutcome::NotificationShown)
    }

    async fn on_notification_click(&self, action: Option<&str>) -> Result<EventOutcome, Error> {
        self.host.close_notification().await?;
        if action != Some(EXPLORE_ACTION) {
            return Ok(EventOutcome::NotificationClicked { opened: None });
        }
        let root = self.ctx.origin.join("/").map_err(|e| Error::InvalidUrl(e.to_string()))?;
        self.host.open_window(&root).await?;
        Ok(EventOutcome::NotificationClicked { opened: Some(root) })
    }

    async fn on_message(&self, message: Message) -> Result<EventOutcome, Error> {
        let parsed = match serde_json::from_value::<WorkerMessage>(message.data.clone()) {
            Ok(parsed) => parsed,
            Err(e) => return Ok(ignored(EventKind::Message, format!("unrecognized message {}: {e}", message.data))),
        };

        match parsed {
            WorkerMessage::SkipWaiting => {
                self.lifecycle.skip_waiting().await;
                let activation = self.activate_if_waiting_skipped().await?;
                Ok(EventOutcome::Replied { reply: None, activation })
            }
            WorkerMessage::GetVersion => {
                let reply = self.version_reply();
                if let Some(port) = message.reply
                    && port.send(reply.clone()).is_err()
                {
                    tracing::debug!("version reply dropped, page went away");
                }
                Ok(EventOutcome::Replied { reply: Some(reply), activation: None })
            }
        }
    }

    fn version_reply(&self) -> Value {
        json!({ "version": self.release })
    }

    /// Park a contact form submission for the next `contact-form-sync`.
    pub async fn defer(&self, request: &Request) -> Result<(), Error> {
        self.sync.defer(request).await
    }
}

fn ignored(kind: EventKind, detail: String) -> EventOutcome {
    tracing::debug!("ignoring {} event: {}", kind.as_str(), detail);
    EventOutcome::Ignored { kind, detail }
}
