//! Source adapters that fetch and normalize articles from one origin each.
//!
//! Every adapter satisfies the same [`SourceAdapter`] contract regardless of
//! how it fetches internally:
//!
//! | Source | Module | Method |
//! |--------|--------|--------|
//! | AP News | [`ap`] | Homepage scrape, then per-article page fetch |
//! | NHK World | [`nhk`] | JSON manifest poll, then per-article detail fetch |
//!
//! # Failure discipline
//!
//! Per-item failures are caught inside the adapter, logged with the item's
//! URL, and skipped; the adapter returns whatever subset succeeded. Only an
//! adapter-level failure (homepage or manifest unreachable) propagates, and
//! the acquisition coordinator turns that into an empty result for the
//! source rather than failing the run.
//!
//! # Rate limiting
//!
//! Adapters sleep [`ARTICLE_FETCH_DELAY`] between successive per-article
//! fetches to avoid throttling. The sleeps are local to each adapter's task
//! and do not stall the other adapters.

use crate::models::SourceItems;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;

pub mod ap;
pub mod nhk;

/// Delay between successive per-article fetches within one adapter.
pub const ARTICLE_FETCH_DELAY: Duration = Duration::from_secs(1);

/// Timeout for scraping requests.
const FETCH_TIMEOUT: Duration = Duration::from_secs(120);

/// Some origins serve different (or no) markup to obvious bots.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/136.0.0.0 Safari/537.36";

/// One news origin that can be fetched and normalized into [`SourceItems`].
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Short source label used in logs and result maps.
    fn name(&self) -> &'static str;

    /// Fetch all current items from this source.
    ///
    /// Implementations must swallow per-item failures (log and continue) and
    /// return only on adapter-level failure, e.g. the landing document being
    /// unreachable.
    async fn fetch(&self) -> Result<SourceItems>;
}

/// Build the HTTP client shared by an adapter's fetches: browser user agent,
/// finite timeout.
pub fn http_client() -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(FETCH_TIMEOUT)
        .build()
        .context("failed to build scraper HTTP client")
}
