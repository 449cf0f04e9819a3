pub mod auth;
mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::Result;
use bytes::Bytes;
use std::time::Duration;

/// Upper bound on a single feed fetch. Kept well below the poll interval so
/// a hung upstream cannot stack cycles behind it.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Bytes> {
    let mut req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);
    *req.timeout_mut() = Some(FETCH_TIMEOUT);

    let resp = client.execute(req).await?;
    if !resp.status().is_success() {
        anyhow::bail!("upstream returned HTTP {}", resp.status());
    }
    Ok(resp.bytes().await?)
}
