//! Events delivered to the worker and what handling them produced.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sitecache_core::Request;
use tokio::sync::oneshot;
use url::Url;

use crate::strategies::FetchOutcome;
use crate::sync::SyncReport;

/// An event from the platform or a controlled page.
#[derive(Debug)]
pub enum Event {
    Install,
    Activate,
    Fetch(Request),
    Sync { tag: String },
    PeriodicSync { tag: String },
    Push,
    NotificationClick { action: Option<String> },
    Message(Message),
    /// A newer version took control of the site's pages.
    Superseded,
}

/// A message posted by a page, with an optional reply port.
#[derive(Debug)]
pub struct Message {
    pub data: Value,
    pub reply: Option<oneshot::Sender<Value>>,
}

impl Message {
    pub fn new(data: Value) -> Self {
        Self { data, reply: None }
    }

    /// Message plus the receiving end of its reply port.
    pub fn with_reply(data: Value) -> (Self, oneshot::Receiver<Value>) {
        let (tx, rx) = oneshot::channel();
        (Self { data, reply: Some(tx) }, rx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Install,
    Activate,
    Fetch,
    Sync,
    PeriodicSync,
    Push,
    NotificationClick,
    Message,
    Superseded,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Install => "install",
            EventKind::Activate => "activate",
            EventKind::Fetch => "fetch",
            EventKind::Sync => "sync",
            EventKind::PeriodicSync => "periodicsync",
            EventKind::Push => "push",
            EventKind::NotificationClick => "notificationclick",
            EventKind::Message => "message",
            EventKind::Superseded => "superseded",
        }
    }
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Install => EventKind::Install,
            Event::Activate => EventKind::Activate,
            Event::Fetch(_) => EventKind::Fetch,
            Event::Sync { .. } => EventKind::Sync,
            Event::PeriodicSync { .. } => EventKind::PeriodicSync,
            Event::Push => EventKind::Push,
            Event::NotificationClick { .. } => EventKind::NotificationClick,
            Event::Message(_) => EventKind::Message,
            Event::Superseded => EventKind::Superseded,
        }
    }
}

/// Control messages a page can post.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerMessage {
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
    #[serde(rename = "GET_VERSION")]
    GetVersion,
}

/// Whether the worker answered a fetch or let it through.
#[derive(Debug)]
pub enum FetchDecision {
    /// Not intercepted; the request goes out natively.
    Passthrough,
    Respond(FetchOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    /// Partitions deleted because they belong to another version.
    pub evicted: Vec<String>,
}

/// What handling one event produced.
#[derive(Debug)]
pub enum EventOutcome {
    /// Static partition populated. `activation` is set when skip-waiting
    /// let the worker activate straight away.
    Installed { stored: usize, activation: Option<ActivationReport> },
    Activated(ActivationReport),
    Fetch(FetchDecision),
    Synced(SyncReport),
    Refreshed { updated: bool },
    NotificationShown,
    NotificationClicked { opened: Option<Url> },
    Replied { reply: Option<Value>, activation: Option<ActivationReport> },
    /// The worker is now redundant.
    Retired,
    /// Unknown tag or message type.
    Ignored { kind: EventKind, detail: String },
}
