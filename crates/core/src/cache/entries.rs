//! Entry CRUD operations.
//!
//! Provides functions for storing, matching, listing and deleting
//! request/response pairs inside a partition.

use std::collections::BTreeMap;

use super::connection::CacheDb;
use super::hash::request_key;
use crate::Error;
use crate::http::{Method, Request, Response, ResponseSource};
use serde::Serialize;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

const ENTRY_COLUMNS: &str = "e.partition_name, e.key_hash, e.method, e.url, e.request_headers_json, e.request_body,
    e.status, e.status_text, e.headers_json, e.body, e.stored_at";

/// A stored request/response pair.
#[derive(Debug, Clone, Serialize)]
pub struct StoredEntry {
    pub partition: String,
    pub key_hash: String,
    pub request: Request,
    pub response: Response,
    pub stored_at: String,
}

/// Row as it sits in the database, before URL and header decoding.
struct RawEntry {
    partition: String,
    key_hash: String,
    method: String,
    url: String,
    request_headers_json: String,
    request_body: Option<Vec<u8>>,
    status: i64,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

impl RawEntry {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            partition: row.get(0)?,
            key_hash: row.get(1)?,
            method: row.get(2)?,
            url: row.get(3)?,
            request_headers_json: row.get(4)?,
            request_body: row.get(5)?,
            status: row.get(6)?,
            status_text: row.get(7)?,
            headers_json: row.get(8)?,
            body: row.get(9)?,
            stored_at: row.get(10)?,
        })
    }

    fn into_entry(self) -> Result<StoredEntry, Error> {
        let method: Method = self.method.parse()?;
        let url = url::Url::parse(&self.url).map_err(|e| Error::CorruptEntry(format!("{}: {e}", self.url)))?;
        let request_headers: BTreeMap<String, String> = serde_json::from_str(&self.request_headers_json)
            .map_err(|e| Error::CorruptEntry(format!("request headers for {}: {e}", self.url)))?;
        let headers: BTreeMap<String, String> = serde_json::from_str(&self.headers_json)
            .map_err(|e| Error::CorruptEntry(format!("response headers for {}: {e}", self.url)))?;
        let status =
            u16::try_from(self.status).map_err(|_| Error::CorruptEntry(format!("status {}", self.status)))?;

        let mut request = Request::new(method, url);
        request.headers = request_headers;
        request.body = self.request_body;

        let response =
            Response { status, status_text: self.status_text, headers, body: self.body, source: ResponseSource::Cache };

        Ok(StoredEntry {
            partition: self.partition,
            key_hash: self.key_hash,
            request,
            response,
            stored_at: self.stored_at,
        })
    }
}

/// Owned parameters for one UPSERT, built before entering the connection thread.
struct NewEntry {
    key_hash: String,
    method: &'static str,
    url: String,
    request_headers_json: String,
    request_body: Option<Vec<u8>>,
    status: i64,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
}

impl NewEntry {
    fn build(request: &Request, response: &Response) -> Result<Self, Error> {
        let request_headers_json =
            serde_json::to_string(&request.headers).map_err(|e| Error::CacheWrite(e.to_string()))?;
        let headers_json = serde_json::to_string(&response.headers).map_err(|e| Error::CacheWrite(e.to_string()))?;
        Ok(Self {
            key_hash: request_key(request),
            method: request.method.as_str(),
            url: request.url.to_string(),
            request_headers_json,
            request_body: request.body.clone(),
            status: i64::from(response.status),
            status_text: response.status_text.clone(),
            headers_json,
            body: response.body.clone(),
        })
    }
}

fn upsert(conn: &rusqlite::Connection, partition: &str, entry: &NewEntry, stored_at: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
        params![partition, stored_at],
    )?;
    conn.execute(
        "INSERT INTO entries (
            partition_name, key_hash, method, url, request_headers_json, request_body,
            status, status_text, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(partition_name, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            request_headers_json = excluded.request_headers_json,
            request_body = excluded.request_body,
            status = excluded.status,
            status_text = excluded.status_text,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            partition,
            &entry.key_hash,
            entry.method,
            &entry.url,
            &entry.request_headers_json,
            &entry.request_body,
            entry.status,
            &entry.status_text,
            &entry.headers_json,
            &entry.body,
            stored_at,
        ],
    )?;
    Ok(())
}

impl CacheDb {
    /// Store a response under `request` in `partition`.
    ///
    /// Opens the partition if needed. Uses UPSERT semantics: a second put for
    /// the same request replaces the first, so the last writer wins.
    pub async fn put(&self, partition: &str, request: &Request, response: &Response) -> Result<(), Error> {
        self.put_all(partition, vec![(request.clone(), response.clone())]).await
    }

    /// Store several pairs in one transaction; either all land or none do.
    pub async fn put_all(&self, partition: &str, pairs: Vec<(Request, Response)>) -> Result<(), Error> {
        let partition = partition.to_string();
        let entries = pairs
            .iter()
            .map(|(request, response)| NewEntry::build(request, response))
            .collect::<Result<Vec<_>, _>>()?;
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for entry in &entries {
                    upsert(&tx, &partition, entry, &stored_at)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look `request` up in one partition.
    pub async fn match_in(&self, partition: &str, request: &Request) -> Result<Option<Response>, Error> {
        let partition = partition.to_string();
        let key_hash = request_key(request);
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<RawEntry>, Error> {
                let sql =
                    format!("SELECT {ENTRY_COLUMNS} FROM entries e WHERE e.partition_name = ?1 AND e.key_hash = ?2");
                let result = conn.query_row(&sql, params![partition, key_hash], RawEntry::from_row);

                match result {
                    Ok(raw) => Ok(Some(raw)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        raw.map(|raw| raw.into_entry().map(|entry| entry.response)).transpose()
    }

    /// Look `request` up across every partition, oldest partition first.
    pub async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        let key_hash = request_key(request);
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<RawEntry>, Error> {
                let sql = format!(
                    "SELECT {ENTRY_COLUMNS} FROM entries e
                    JOIN partitions p ON p.name = e.partition_name
                    WHERE e.key_hash = ?1
                    ORDER BY p.seq ASC
                    LIMIT 1"
                );
                let result = conn.query_row(&sql, params![key_hash], RawEntry::from_row);

                match result {
                    Ok(raw) => Ok(Some(raw)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        raw.map(|raw| raw.into_entry().map(|entry| entry.response)).transpose()
    }

    /// Every entry in a partition, in storage order.
    pub async fn entries(&self, partition: &str) -> Result<Vec<StoredEntry>, Error> {
        let partition = partition.to_string();
        let raws = self
            .conn
            .call(move |conn| -> Result<Vec<RawEntry>, Error> {
                let sql =
                    format!("SELECT {ENTRY_COLUMNS} FROM entries e WHERE e.partition_name = ?1 ORDER BY e.rowid ASC");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![partition], RawEntry::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        raws.into_iter().map(RawEntry::into_entry).collect()
    }

    /// The request descriptors stored in a partition.
    pub async fn keys(&self, partition: &str) -> Result<Vec<Request>, Error> {
        Ok(self.entries(partition).await?.into_iter().map(|entry| entry.request).collect())
    }

    /// Remove the entry stored under `request`.
    ///
    /// Returns false if nothing was stored under it.
    pub async fn delete_entry(&self, partition: &str, request: &Request) -> Result<bool, Error> {
        let partition = partition.to_string();
        let key_hash = request_key(request);
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE partition_name = ?1 AND key_hash = ?2",
                    params![partition, key_hash],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a partition.
    pub async fn count_entries(&self, partition: &str) -> Result<u64, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition_name = ?1", params![partition], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
