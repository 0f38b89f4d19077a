//! Client code for sitecache.
//!
//! This crate provides the network side of the worker: the `Fetcher`
//! abstraction the strategies call through, its reqwest-backed
//! implementation, and URL resolution against the site origin.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, FetchError, Fetcher, UrlError, is_http, resolve, resolve_http};
