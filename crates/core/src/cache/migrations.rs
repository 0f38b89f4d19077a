//! Schema migrations for the partition store.
//!
//! The applied schema version lives in SQLite's `user_version` pragma.
//! Each pending migration runs in its own transaction together with the
//! version bump, so a failed step leaves the previous version intact.

use super::Error;
use tokio_rusqlite::Connection;
use tokio_rusqlite::rusqlite;

/// Ordered schema steps; the step at index `i` produces version `i + 1`.
const MIGRATIONS: &[&str] = &[
    include_str!("../../migrations/001_partitions.sql"),
    include_str!("../../migrations/002_entries.sql"),
];

fn user_version(conn: &rusqlite::Connection) -> rusqlite::Result<i64> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

/// Bring the schema up to the latest version.
///
/// # Errors
///
/// Returns `Error::MigrationFailed` naming the step that failed.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        let current = user_version(conn)?;

        for (index, sql) in MIGRATIONS.iter().enumerate() {
            let version = index as i64 + 1;
            if version <= current {
                continue;
            }
            let tx = conn.transaction()?;
            tx.execute_batch(sql)
                .and_then(|()| tx.pragma_update(None, "user_version", version))
                .map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
            tx.commit()?;
            tracing::debug!("applied cache schema version {}", version);
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

/// Schema version currently applied.
pub async fn schema_version(conn: &Connection) -> Result<i64, Error> {
    conn.call(|conn| -> Result<i64, Error> { Ok(user_version(conn)?) })
        .await
        .map_err(Error::from)
}
