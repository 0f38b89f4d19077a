//! Request and response model.
//!
//! These are the descriptors that flow between the page, the worker, the
//! cache store and the network client. Header names are always stored
//! lower-cased so lookups are case-insensitive.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// HTTP request method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "OPTIONS" => Ok(Method::Options),
            other => Err(Error::InvalidInput(format!("unsupported method: {other}"))),
        }
    }
}

/// What the requested resource will be used for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    #[default]
    Empty,
    Document,
    Image,
    Script,
    Style,
    Font,
    Manifest,
    Worker,
    Other,
}

/// Request mode as reported by the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    #[default]
    NoCors,
    Cors,
}

/// An outgoing request descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    #[serde(default)]
    pub destination: Destination,
    #[serde(default)]
    pub mode: RequestMode,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            destination: Destination::default(),
            mode: RequestMode::default(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// A plain GET request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    /// A POST request carrying `body`.
    pub fn post(url: Url, body: impl Into<Vec<u8>>) -> Self {
        Self::new(Method::Post, url).with_body(body)
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn accept(&self) -> Option<&str> {
        self.header("accept")
    }
}

/// Where a response handed back to the page came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    #[default]
    Network,
    Cache,
    Synthesized,
}

/// A response, real or synthesized.
///
/// `source` is bookkeeping for logs and callers; it is not part of what the
/// cache store persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Vec<u8>,
    #[serde(default, skip_serializing)]
    pub source: ResponseSource,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: reason_phrase(status).to_string(),
            headers: BTreeMap::new(),
            body: body.into(),
            source: ResponseSource::Network,
        }
    }

    /// Plain-text body.
    pub fn text(status: u16, body: &str) -> Self {
        Self::new(status, body).with_header("content-type", "text/plain; charset=utf-8")
    }

    /// JSON body.
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string()).with_header("content-type", "application/json")
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_source(mut self, source: ResponseSource) -> Self {
        self.source = source;
        self
    }

    /// True for any 2xx status.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("post".parse::<Method>().unwrap(), Method::Post);
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert!("BREW".parse::<Method>().is_err());
    }

    #[test]
    fn test_request_headers_case_insensitive() {
        let request = Request::get(url("https://example.com/")).with_header("Accept", "text/html");
        assert_eq!(request.accept(), Some("text/html"));
        assert_eq!(request.header("ACCEPT"), Some("text/html"));
        assert!(request.headers.contains_key("accept"));
    }

    #[test]
    fn test_request_deserialize_defaults() {
        let request: Request = serde_json::from_str(r#"{"method":"GET","url":"https://example.com/a.png"}"#).unwrap();
        assert_eq!(request.destination, Destination::Empty);
        assert_eq!(request.mode, RequestMode::NoCors);
        assert!(request.body.is_none());
    }

    #[test]
    fn test_mode_serde_names() {
        let mode: RequestMode = serde_json::from_str(r#""same-origin""#).unwrap();
        assert_eq!(mode, RequestMode::SameOrigin);
        assert_eq!(serde_json::to_string(&RequestMode::Navigate).unwrap(), r#""navigate""#);
    }

    #[test]
    fn test_response_json() {
        let response = Response::json(503, &serde_json::json!({ "offline": true }));
        assert_eq!(response.status_text, "Service Unavailable");
        assert_eq!(response.content_type(), Some("application/json"));
        assert!(!response.is_ok());
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["offline"], true);
    }

    #[test]
    fn test_response_is_ok_range() {
        assert!(Response::new(200, "").is_ok());
        assert!(Response::new(204, "").is_ok());
        assert!(!Response::new(304, "").is_ok());
        assert!(!Response::new(404, "").is_ok());
    }
}
