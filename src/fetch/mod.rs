//! Snapshot retrieval over HTTP or from disk.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result, bail};
use std::path::Path;
use tracing::info;

/// Public stall list endpoint.
pub const DEFAULT_STALL_LIST_URL: &str = "https://moonlight-stall-db.pirategames.online/stall/list";

pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?.error_for_status()?;
    let bytes = resp.bytes().await?.to_vec();

    ensure_not_empty(bytes, url)
}

/// Loads snapshot bytes from a URL (anything starting with `http`) or a local
/// file path.
#[tracing::instrument(skip(client))]
pub async fn load_source<C: HttpClient>(client: &C, source: &str) -> Result<Vec<u8>> {
    let bytes = if source.starts_with("http") {
        fetch_bytes(client, source).await?
    } else {
        let raw = std::fs::read(Path::new(source))
            .with_context(|| format!("failed to read snapshot {source}"))?;
        ensure_not_empty(raw, source)?
    };

    info!(bytes = bytes.len(), "Snapshot loaded");
    Ok(bytes)
}

fn ensure_not_empty(bytes: Vec<u8>, source: &str) -> Result<Vec<u8>> {
    if bytes.is_empty() {
        bail!("received empty binary content from {source}");
    }
    Ok(bytes)
}
