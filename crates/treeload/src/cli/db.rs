//! `treeload init-db` and `treeload check`.

use crate::cli::error::HelpfulError;
use crate::cli::scan::open_sink;
use anyhow::{Context, Result};
use treeload_protocol::Sink;

pub async fn init_db(url: &str) -> Result<()> {
    let sink = open_sink(url).await?;
    sink.initialize_schema()
        .await
        .with_context(|| format!("Failed to initialize schema in {}", url))?;
    sink.close().await;
    println!("Database ready: {}", url);
    Ok(())
}

pub async fn check(url: &str) -> Result<()> {
    let sink = open_sink(url).await?;
    let healthy = sink.test_connection().await;
    sink.close().await;

    if !healthy {
        return Err(HelpfulError::database_unavailable(url, "Connection test failed").into());
    }
    println!("OK: {}", url);
    Ok(())
}
