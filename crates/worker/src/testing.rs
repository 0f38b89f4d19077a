//! Test doubles for the network and the host.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use sitecache_client::Fetcher;
use sitecache_core::{AppConfig, CacheDb, Error, Request, Response};
use url::Url;

use crate::host::{ClientHost, Notification};
use crate::store::CacheManager;
use crate::strategies::StrategyContext;

pub const SITE: &str = "https://thinkbit.test";

/// Absolute URL on the test site.
pub fn site(path: &str) -> Url {
    Url::parse(SITE).unwrap().join(path).unwrap()
}

/// Strategy context over a fresh in-memory store.
pub async fn context(fetcher: Arc<ScriptedFetcher>) -> StrategyContext {
    let db = CacheDb::open_in_memory().await.unwrap();
    StrategyContext { store: CacheManager::new(db, &AppConfig::default()), fetcher, origin: Url::parse(SITE).unwrap() }
}

fn route_key(target: &str) -> String {
    if target.starts_with("http://") || target.starts_with("https://") {
        Url::parse(target).unwrap().to_string()
    } else {
        site(target).to_string()
    }
}

/// A `Fetcher` answering from a fixed route table.
///
/// Unscripted URLs fail with a network error, as if offline.
#[derive(Default)]
pub struct ScriptedFetcher {
    routes: Mutex<HashMap<String, Result<Response, String>>>,
    seen: Mutex<Vec<Request>>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, target: &str, response: Response) -> Self {
        self.set(target, response);
        self
    }

    /// Replace the scripted answer for `target`.
    pub fn set(&self, target: &str, response: Response) {
        self.routes.lock().unwrap().insert(route_key(target), Ok(response));
    }

    /// Make `target` fail at the transport level.
    pub fn fail(&self, target: &str) {
        self.routes.lock().unwrap().insert(route_key(target), Err("connection refused".into()));
    }

    /// Drop every route so all requests fail.
    pub fn go_offline(&self) {
        self.routes.lock().unwrap().clear();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_to(&self, target: &str) -> usize {
        let key = route_key(target);
        self.seen.lock().unwrap().iter().filter(|r| r.url.as_str() == key).count()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());
        let route = self.routes.lock().unwrap().get(request.url.as_str()).cloned();
        match route {
            Some(Ok(response)) => Ok(response),
            Some(Err(reason)) => Err(Error::Network(format!("{}: {reason}", request.url))),
            None => Err(Error::Network(format!("{}: offline", request.url))),
        }
    }
}

/// What the worker asked the host to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    ClaimClients,
    ShowNotification(Notification),
    CloseNotification,
    OpenWindow(Url),
}

/// A `ClientHost` that records every call.
#[derive(Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ClientHost for RecordingHost {
    async fn claim_clients(&self) -> Result<(), Error> {
        self.calls.lock().unwrap().push(HostCall::ClaimClients);
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        self.calls.lock().unwrap().push(HostCall::ShowNotification(notification.clone()));
        Ok(())
    }

    async fn close_notification(&self) -> Result<(), Error> {
        self.calls.lock().unwrap().push(HostCall::CloseNotification);
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        self.calls.lock().unwrap().push(HostCall::OpenWindow(url.clone()));
        Ok(())
    }
}
