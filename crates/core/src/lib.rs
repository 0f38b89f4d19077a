//! Core types and shared functionality for sitecache.
//!
//! This crate provides:
//! - Partitioned response cache with SQLite backend
//! - Request/response model shared by the client and the worker
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, StoredEntry};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Destination, Method, Request, RequestMode, Response, ResponseSource};
