//! SQLite-backed partitioned response cache.
//!
//! This module provides a persistent request → response store using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Named partitions, created on first use and deleted as a whole
//! - Request keys derived with SHA-256 over method, URL and body
//! - Lookups scoped to one partition or across all of them
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod partitions;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::StoredEntry;
