//! sitecache worker entry point.
//!
//! Hosts the worker on a JSON-lines stdio transport.
//! Logging goes to stderr to avoid interfering with the result stream on stdout.

use std::sync::Arc;

use anyhow::Result;
use sitecache_client::{FetchClient, FetchConfig};
use sitecache_core::{AppConfig, CacheDb};
use sitecache_worker::Worker;
use tracing_subscriber::EnvFilter;

mod transport;

use transport::{Output, StdioHost, Transport};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!("Starting sitecache worker {} for {}", config.release, config.origin);

    let db = CacheDb::open(&config.db_path).await?;
    let fetcher = Arc::new(FetchClient::new(FetchConfig::from(&config))?);

    let (out, rx) = Output::channel();
    let writer = tokio::spawn(transport::write_lines(rx, tokio::io::stdout()));

    let host = Arc::new(StdioHost::new(out.clone()));
    let worker = Worker::new(&config, db.clone(), fetcher, host)?;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    Transport::new(worker, out).run(stdin).await?;

    writer.await??;
    db.close().await?;

    Ok(())
}
