//! JSON-lines transport.
//!
//! Each stdin line is one event object tagged by `event`:
//!
//! ```json
//! {"event": "fetch", "url": "/assets/css/style.css", "destination": "style"}
//! {"event": "message", "data": {"type": "GET_VERSION"}}
//! {"event": "match", "url": "/index.html"}
//! ```
//!
//! Each event produces exactly one result line on stdout. Host requests
//! (claiming pages, notifications, opening windows) are written to the same
//! stream as `{"host": ...}` records.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value, json};
use sitecache_client::resolve;
use sitecache_core::{Destination, Error, Method, Request, RequestMode, Response};
use sitecache_worker::{ClientHost, Event, EventOutcome, FetchDecision, Message, Notification, Revalidation, Worker};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use url::Url;

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum Inbound {
    Install,
    Activate,
    Fetch(RequestInput),
    /// Park a contact form submission made while offline.
    Defer(RequestInput),
    /// Inspect the stored copy of a request.
    Match(RequestInput),
    Sync {
        tag: String,
    },
    PeriodicSync {
        tag: String,
    },
    Push,
    NotificationClick {
        #[serde(default)]
        action: Option<String>,
    },
    Message {
        data: Value,
    },
    Superseded,
}

impl Inbound {
    fn name(&self) -> &'static str {
        match self {
            Inbound::Install => "install",
            Inbound::Activate => "activate",
            Inbound::Fetch(_) => "fetch",
            Inbound::Defer(_) => "defer",
            Inbound::Match(_) => "match",
            Inbound::Sync { .. } => "sync",
            Inbound::PeriodicSync { .. } => "periodicsync",
            Inbound::Push => "push",
            Inbound::NotificationClick { .. } => "notificationclick",
            Inbound::Message { .. } => "message",
            Inbound::Superseded => "superseded",
        }
    }
}

/// A request as a page describes it; `url` may be relative to the origin.
#[derive(Debug, Deserialize)]
struct RequestInput {
    #[serde(default)]
    method: Method,
    url: String,
    #[serde(default)]
    destination: Destination,
    #[serde(default)]
    mode: RequestMode,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    body: Option<String>,
}

impl RequestInput {
    fn into_request(self, origin: &Url) -> Result<Request, Error> {
        let url = resolve(origin, &self.url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", self.url)))?;
        let mut request = Request::new(self.method, url).with_destination(self.destination).with_mode(self.mode);
        for (name, value) in self.headers {
            request = request.with_header(&name, value);
        }
        if let Some(body) = self.body {
            request = request.with_body(body);
        }
        Ok(request)
    }
}

/// Sending half of the stdout stream.
#[derive(Clone)]
pub struct Output {
    tx: mpsc::UnboundedSender<Value>,
}

impl Output {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, value: Value) {
        if self.tx.send(value).is_err() {
            tracing::debug!("output closed, dropping record");
        }
    }
}

/// Drain `rx` to `writer`, one JSON document per line.
pub async fn write_lines<W: AsyncWrite + Unpin>(
    mut rx: mpsc::UnboundedReceiver<Value>, mut writer: W,
) -> std::io::Result<()> {
    while let Some(value) = rx.recv().await {
        let mut line = value.to_string();
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}

/// Host that reports every request as a `{"host": ...}` record.
pub struct StdioHost {
    out: Output,
}

impl StdioHost {
    pub fn new(out: Output) -> Self {
        Self { out }
    }
}

#[async_trait::async_trait]
impl ClientHost for StdioHost {
    async fn claim_clients(&self) -> Result<(), Error> {
        self.out.emit(json!({ "host": "claim_clients" }));
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        self.out.emit(json!({ "host": "show_notification", "notification": notification }));
        Ok(())
    }

    async fn close_notification(&self) -> Result<(), Error> {
        self.out.emit(json!({ "host": "close_notification" }));
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        self.out.emit(json!({ "host": "open_window", "url": url.as_str() }));
        Ok(())
    }
}

pub struct Transport {
    worker: Worker,
    out: Output,
    revalidations: Vec<Revalidation>,
}

impl Transport {
    pub fn new(worker: Worker, out: Output) -> Self {
        Self { worker, out, revalidations: Vec::new() }
    }

    /// Read events until EOF, then wait for outstanding background refreshes.
    pub async fn run<R: AsyncBufRead + Unpin>(mut self, input: R) -> anyhow::Result<()> {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let result = self.handle_line(&line).await;
            self.out.emit(result);
        }

        for revalidation in self.revalidations.drain(..) {
            log_revalidation(revalidation.finish().await);
        }
        Ok(())
    }

    /// Drop handles of refreshes that have already completed.
    async fn reap_revalidations(&mut self) {
        let (done, running): (Vec<_>, Vec<_>) = self.revalidations.drain(..).partition(Revalidation::is_finished);
        self.revalidations = running;
        for revalidation in done {
            log_revalidation(revalidation.finish().await);
        }
    }

    /// Handle one input line and build its result record.
    pub async fn handle_line(&mut self, line: &str) -> Value {
        self.reap_revalidations().await;
        let inbound: Inbound = match serde_json::from_str(line) {
            Ok(inbound) => inbound,
            Err(e) => return failure(None, &Error::InvalidInput(e.to_string())),
        };
        let name = inbound.name();

        match self.handle(inbound).await {
            Ok(fields) => {
                let mut record = Map::new();
                record.insert("event".into(), name.into());
                record.insert("ok".into(), true.into());
                record.extend(fields);
                Value::Object(record)
            }
            Err(e) => {
                tracing::warn!("{} event failed: {}", name, e);
                failure(Some(name), &e)
            }
        }
    }

    async fn handle(&mut self, inbound: Inbound) -> Result<Map<String, Value>, Error> {
        let event = match inbound {
            Inbound::Install => Event::Install,
            Inbound::Activate => Event::Activate,
            Inbound::Fetch(input) => Event::Fetch(input.into_request(self.worker.origin())?),
            Inbound::Defer(input) => {
                let request = input.into_request(self.worker.origin())?;
                self.worker.defer(&request).await?;
                return Ok(fields(json!({ "deferred": request.url.as_str() })));
            }
            Inbound::Match(input) => {
                let request = input.into_request(self.worker.origin())?;
                let response = self.worker.store().cached(&request).await?;
                return Ok(fields(json!({ "response": response_json(&response) })));
            }
            Inbound::Sync { tag } => Event::Sync { tag },
            Inbound::PeriodicSync { tag } => Event::PeriodicSync { tag },
            Inbound::Push => Event::Push,
            Inbound::NotificationClick { action } => Event::NotificationClick { action },
            Inbound::Message { data } => Event::Message(Message::new(data)),
            Inbound::Superseded => Event::Superseded,
        };

        let outcome = self.worker.dispatch(event).await?;
        Ok(self.describe(outcome))
    }

    fn describe(&mut self, outcome: EventOutcome) -> Map<String, Value> {
        let value = match outcome {
            EventOutcome::Installed { stored, activation } => json!({ "stored": stored, "activation": activation }),
            EventOutcome::Activated(report) => json!({ "activation": report }),
            EventOutcome::Fetch(FetchDecision::Passthrough) => json!({ "decision": "passthrough" }),
            EventOutcome::Fetch(FetchDecision::Respond(outcome)) => {
                let value = json!({
                    "decision": "respond",
                    "strategy": outcome.strategy,
                    "response": response_json(&outcome.response),
                });
                if let Some(revalidation) = outcome.revalidation {
                    self.revalidations.push(revalidation);
                }
                value
            }
            EventOutcome::Synced(report) => json!({ "sync": report }),
            EventOutcome::Refreshed { updated } => json!({ "updated": updated }),
            EventOutcome::NotificationShown => json!({}),
            EventOutcome::NotificationClicked { opened } => json!({ "opened": opened.map(String::from) }),
            EventOutcome::Replied { reply, activation } => json!({ "reply": reply, "activation": activation }),
            EventOutcome::Retired => json!({ "state": "redundant" }),
            EventOutcome::Ignored { detail, .. } => json!({ "ignored": detail }),
        };
        fields(value)
    }
}

fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn log_revalidation(result: Result<bool, Error>) {
    match result {
        Ok(updated) => tracing::debug!("revalidation finished, updated: {}", updated),
        Err(e) => tracing::debug!("revalidation failed: {}", e),
    }
}

/// Binary bodies are reported by length only.
fn response_json(response: &Response) -> Value {
    let body = is_textual(response).then(|| response.body_text());
    json!({
        "status": response.status,
        "statusText": response.status_text,
        "headers": response.headers,
        "source": response.source,
        "body": body,
        "bodyLength": response.body.len(),
    })
}

fn is_textual(response: &Response) -> bool {
    match response.content_type() {
        Some(content_type) => {
            let content_type = content_type.to_ascii_lowercase();
            content_type.starts_with("text/")
                || ["json", "xml", "javascript"].iter().any(|kind| content_type.contains(kind))
        }
        None => std::str::from_utf8(&response.body).is_ok(),
    }
}

fn failure(event: Option<&str>, err: &Error) -> Value {
    json!({
        "event": event,
        "ok": false,
        "error": { "code": err.code(), "message": err.to_string() },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitecache_client::Fetcher;
    use sitecache_core::{AppConfig, CacheDb};
    use sitecache_worker::Partition;
    use std::sync::Arc;

    struct Offline;

    #[async_trait::async_trait]
    impl Fetcher for Offline {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            Err(Error::Network(format!("{}: offline", request.url)))
        }
    }

    async fn transport() -> (Transport, mpsc::UnboundedReceiver<Value>) {
        let config = AppConfig { origin: "https://thinkbit.test".into(), ..Default::default() };
        let db = CacheDb::open_in_memory().await.unwrap();
        let (out, rx) = Output::channel();
        let host = Arc::new(StdioHost::new(out.clone()));
        let worker = Worker::new(&config, db, Arc::new(Offline), host).unwrap();
        (Transport::new(worker, out), rx)
    }

    #[tokio::test]
    async fn test_offline_navigation_line() {
        let (mut transport, _rx) = transport().await;

        let result = transport.handle_line(r#"{"event":"fetch","url":"/research","mode":"navigate"}"#).await;

        assert_eq!(result["ok"], true);
        assert_eq!(result["strategy"], "navigation");
        assert_eq!(result["response"]["status"], 200);
        assert_eq!(result["response"]["source"], "synthesized");
        assert!(result["response"]["body"].as_str().unwrap().contains("You're Offline"));
    }

    #[tokio::test]
    async fn test_post_fetch_passes_through() {
        let (mut transport, _rx) = transport().await;

        let line = r#"{"event":"fetch","method":"POST","url":"/contact-submit","body":"a=1"}"#;
        let result = transport.handle_line(line).await;

        assert_eq!(result["decision"], "passthrough");
    }

    #[tokio::test]
    async fn test_defer_then_sync_keeps_submission() {
        let (mut transport, _rx) = transport().await;

        let line = r#"{"event":"defer","method":"POST","url":"/contact-submit","body":"a=1"}"#;
        let deferred = transport.handle_line(line).await;
        assert_eq!(deferred["deferred"], "https://thinkbit.test/contact-submit");

        let synced = transport.handle_line(r#"{"event":"sync","tag":"contact-form-sync"}"#).await;
        assert_eq!(synced["sync"]["failed"], 1);
        assert_eq!(synced["sync"]["replayed"], 0);
    }

    #[tokio::test]
    async fn test_get_version_line() {
        let (mut transport, _rx) = transport().await;

        let result = transport.handle_line(r#"{"event":"message","data":{"type":"GET_VERSION"}}"#).await;

        assert_eq!(result["reply"]["version"], "thinkbit-edge-v1.0.0");
    }

    #[tokio::test]
    async fn test_push_emits_host_record() {
        let (mut transport, mut rx) = transport().await;

        transport.handle_line(r#"{"event":"push"}"#).await;

        let record = rx.recv().await.unwrap();
        assert_eq!(record["host"], "show_notification");
        assert_eq!(record["notification"]["title"], "ThinkBit Edge Corp");
    }

    #[tokio::test]
    async fn test_failures_carry_error_code() {
        let (mut transport, _rx) = transport().await;

        let garbage = transport.handle_line("not json").await;
        assert_eq!(garbage["ok"], false);
        assert_eq!(garbage["error"]["code"], "INVALID_INPUT");

        let install = transport.handle_line(r#"{"event":"install"}"#).await;
        assert_eq!(install["event"], "install");
        assert_eq!(install["error"]["code"], "INSTALL_FAILED");
    }

    #[tokio::test]
    async fn test_write_lines() {
        let (out, rx) = Output::channel();
        out.emit(json!({ "a": 1 }));
        out.emit(json!({ "b": 2 }));
        drop(out);

        let mut buffer = Vec::new();
        write_lines(rx, &mut buffer).await.unwrap();

        assert_eq!(String::from_utf8(buffer).unwrap(), "{\"a\":1}\n{\"b\":2}\n");
    }

    #[tokio::test]
    async fn test_finished_revalidations_are_released() {
        let (mut transport, _rx) = transport().await;
        let feed = Request::get(transport.worker.origin().join("/data/feed.xml").unwrap());
        transport.worker.store().put(Partition::Dynamic, &feed, &Response::text(200, "feed")).await.unwrap();

        for _ in 0..50 {
            let result = transport.handle_line(r#"{"event":"fetch","url":"/data/feed.xml"}"#).await;
            assert_eq!(result["strategy"], "stale-while-revalidate");
            assert_eq!(result["response"]["body"], "feed");
            while !transport.revalidations.iter().all(Revalidation::is_finished) {
                tokio::task::yield_now().await;
            }
        }

        assert_eq!(transport.revalidations.len(), 1);
    }

    #[tokio::test]
    async fn test_match_line_reports_miss_then_hit() {
        let (mut transport, _rx) = transport().await;
        let line = r#"{"event":"match","url":"/team"}"#;

        let miss = transport.handle_line(line).await;
        assert_eq!(miss["event"], "match");
        assert_eq!(miss["error"]["code"], "CACHE_MISS");

        let team = Request::get(transport.worker.origin().join("/team").unwrap());
        transport.worker.store().put(Partition::Dynamic, &team, &Response::text(200, "team")).await.unwrap();

        let hit = transport.handle_line(line).await;
        assert_eq!(hit["ok"], true);
        assert_eq!(hit["response"]["body"], "team");
    }

    #[tokio::test]
    async fn test_superseded_line() {
        let (mut transport, _rx) = transport().await;

        let result = transport.handle_line(r#"{"event":"superseded"}"#).await;

        assert_eq!(result["ok"], true);
        assert_eq!(result["state"], "redundant");
    }

    #[test]
    fn test_binary_body_reported_by_length() {
        let png = Response::new(200, vec![0x89, b'P', b'N', b'G', 0xff]).with_header("content-type", "image/png");
        let value = response_json(&png);
        assert!(value["body"].is_null());
        assert_eq!(value["bodyLength"], 5);

        let svg = Response::new(200, "<svg/>").with_header("content-type", "image/svg+xml");
        assert_eq!(response_json(&svg)["body"], "<svg/>");
    }
}
