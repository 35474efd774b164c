//! NHK World feed poller.
//!
//! NHK publishes a JSON manifest of current English articles plus one JSON
//! detail document per article, so no homepage scraping is needed. The
//! manifest carries an `updated_at` epoch-millisecond timestamp used to drop
//! anything older than the freshness window; the detail document carries the
//! title and an HTML fragment that renders to the body text.

use crate::models::{Item, SourceItems};
use crate::scrapers::{ARTICLE_FETCH_DELAY, SourceAdapter, http_client};
use crate::utils::ProgressMeter;
use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::Html;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{error, info, instrument};

const NHK_ORIGIN: &str = "https://www3.nhk.or.jp";

/// Feed entries older than this relative to fetch time are discarded.
pub const FRESHNESS_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Deserialize)]
struct Manifest {
    data: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    #[serde(deserialize_with = "epoch_ms")]
    pub updated_at: i64,
    pub page_url: String,
}

#[derive(Debug, Deserialize)]
struct Detail {
    data: DetailData,
}

#[derive(Debug, Deserialize)]
struct DetailData {
    title: String,
    page_url: String,
    detail: String,
}

/// The feed serves `updated_at` as a decimal string; accept a bare number
/// too rather than depending on that quirk.
fn epoch_ms<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// Whether a feed entry is inside the freshness window at `now_ms`.
pub fn is_fresh(updated_at_ms: i64, now_ms: i64) -> bool {
    now_ms - updated_at_ms <= FRESHNESS_WINDOW_MS
}

/// Render the detail HTML fragment to plain text.
pub fn detail_text(detail_html: &str) -> String {
    Html::parse_fragment(detail_html)
        .root_element()
        .text()
        .collect()
}

pub struct NhkAdapter {
    client: reqwest::Client,
    origin: String,
}

impl NhkAdapter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            origin: NHK_ORIGIN.to_string(),
        })
    }

    async fn fetch_item(&self, article_id: &str) -> Result<Item> {
        let detail_url = format!("{}/nhkworld/data/en/news/{}.json", self.origin, article_id);
        let detail: Detail = self
            .client
            .get(&detail_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("failed to read NHK detail: {detail_url}"))?;

        Ok(Item {
            title: detail.data.title,
            url: format!("{}{}", self.origin, detail.data.page_url),
            content: detail_text(&detail.data.detail),
        })
    }
}

#[async_trait]
impl SourceAdapter for NhkAdapter {
    fn name(&self) -> &'static str {
        "NHK"
    }

    #[instrument(level = "info", skip_all)]
    async fn fetch(&self) -> Result<SourceItems> {
        let manifest_url = format!("{}/nhkworld/data/en/news/all.json", self.origin);
        let manifest: Manifest = self
            .client
            .get(&manifest_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("failed to read NHK manifest")?;

        let now_ms = chrono::Utc::now().timestamp_millis();
        let mut fresh_articles = Vec::new();
        for entry in manifest.data {
            if !is_fresh(entry.updated_at, now_ms) {
                info!(url = %format!("{}{}", self.origin, entry.page_url), "skipping stale NHK article");
                continue;
            }
            fresh_articles.push(entry);
        }

        info!(count = fresh_articles.len(), "found fresh NHK articles");

        let started = std::time::Instant::now();
        let progress = ProgressMeter::new(fresh_articles.len(), "tried NHK items");

        let mut items = SourceItems::new();
        for entry in fresh_articles {
            info!(article_id = %entry.id, "getting content for NHK article");

            match self.fetch_item(&entry.id).await {
                Ok(item) => {
                    items.insert(item.url.clone(), item);
                }
                Err(e) => {
                    error!(article_id = %entry.id, error = %e, "failed to handle NHK article");
                }
            }

            progress.increment();
            sleep(ARTICLE_FETCH_DELAY).await;
        }

        info!(
            count = items.len(),
            elapsed_secs = started.elapsed().as_secs_f64(),
            "loaded NHK items"
        );
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW_MS: i64 = 1_700_000_000_000;

    #[test]
    fn test_freshness_window_boundaries() {
        // one millisecond past the window: stale
        assert!(!is_fresh(NOW_MS - FRESHNESS_WINDOW_MS - 1, NOW_MS));
        // exactly at the window edge: still fresh
        assert!(is_fresh(NOW_MS - FRESHNESS_WINDOW_MS, NOW_MS));
        // 23h59m59s old: fresh
        assert!(is_fresh(NOW_MS - (FRESHNESS_WINDOW_MS - 1000), NOW_MS));
    }

    #[test]
    fn test_manifest_entry_accepts_string_and_number_timestamps() {
        let from_string: ManifestEntry = serde_json::from_str(
            r#"{"id": "20260829_01", "updated_at": "1700000000000", "page_url": "/nhkworld/en/news/20260829_01/"}"#,
        )
        .unwrap();
        assert_eq!(from_string.updated_at, 1_700_000_000_000);

        let from_number: ManifestEntry = serde_json::from_str(
            r#"{"id": "20260829_02", "updated_at": 1700000000000, "page_url": "/nhkworld/en/news/20260829_02/"}"#,
        )
        .unwrap();
        assert_eq!(from_number.updated_at, 1_700_000_000_000);
    }

    #[test]
    fn test_detail_text_renders_fragment() {
        let text = detail_text("<p>First line.</p><p>Second <em>part</em>.</p>");
        assert_eq!(text, "First line.Second part.");
    }
}
