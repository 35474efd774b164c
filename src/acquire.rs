//! Acquisition coordinator: runs every source adapter concurrently and
//! merges their results into one deduplicated, shuffled item collection.
//!
//! Each adapter gets its own spawned task, so a failing or panicking source
//! contributes zero items while its siblings run to completion. Merging and
//! deduplication happen single-threaded after all tasks join; no locks guard
//! the item store because no task writes to it.

use crate::models::{Item, SourceItems, merge_item};
use crate::scrapers::SourceAdapter;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Run all adapters concurrently and wait for every one of them.
///
/// The merged collection applies the longer-title-wins dedup rule across
/// sources and is shuffled before being returned. The shuffle is intentional:
/// it keeps source order and fetch order from systematically biasing what the
/// classifier and the final digest see first.
#[instrument(level = "info", skip_all, fields(sources = adapters.len()))]
pub async fn acquire(adapters: Vec<Arc<dyn SourceAdapter>>) -> Vec<Item> {
    let mut handles = Vec::with_capacity(adapters.len());
    for adapter in adapters {
        let source = adapter.name();
        handles.push((source, tokio::spawn(async move { adapter.fetch().await })));
    }

    let mut merged = SourceItems::new();
    for (source, handle) in handles {
        let items = match handle.await {
            Ok(Ok(items)) => items,
            Ok(Err(e)) => {
                error!(source, error = %e, "failed to get items for source");
                continue;
            }
            Err(e) => {
                error!(source, error = %e, "source task panicked");
                continue;
            }
        };

        info!(source, count = items.len(), "merging source items");
        for item in items.into_values() {
            merge_item(&mut merged, item);
        }
    }

    let mut all_items: Vec<Item> = merged.into_values().collect();
    all_items.shuffle(&mut rand::rng());

    info!(count = all_items.len(), "acquired news items");
    all_items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceItems;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::collections::HashSet;

    struct FixedAdapter {
        name: &'static str,
        items: Vec<Item>,
    }

    #[async_trait]
    impl SourceAdapter for FixedAdapter {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self) -> Result<SourceItems> {
            let mut items = SourceItems::new();
            for item in &self.items {
                items.insert(item.url.clone(), item.clone());
            }
            Ok(items)
        }
    }

    struct FailingAdapter;

    #[async_trait]
    impl SourceAdapter for FailingAdapter {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn fetch(&self) -> Result<SourceItems> {
            Err(anyhow!("manifest unreachable"))
        }
    }

    fn item(title: &str, url: &str) -> Item {
        Item {
            title: title.to_string(),
            url: url.to_string(),
            content: format!("content of {url}"),
        }
    }

    #[tokio::test]
    async fn test_failing_adapter_does_not_poison_siblings() {
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(FixedAdapter {
                name: "AP",
                items: vec![item("ap story", "https://ap/1"), item("more ap", "https://ap/2")],
            }),
            Arc::new(FailingAdapter),
            Arc::new(FixedAdapter {
                name: "NHK",
                items: vec![item("nhk story", "https://nhk/1")],
            }),
        ];

        let merged = acquire(adapters).await;
        let urls: HashSet<&str> = merged.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(
            urls,
            HashSet::from(["https://ap/1", "https://ap/2", "https://nhk/1"])
        );
    }

    #[tokio::test]
    async fn test_cross_source_dedup_keeps_longer_title() {
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(FixedAdapter {
                name: "AP",
                items: vec![item("short", "https://shared/story")],
            }),
            Arc::new(FixedAdapter {
                name: "NHK",
                items: vec![item("much longer title", "https://shared/story")],
            }),
        ];

        let merged = acquire(adapters).await;
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "much longer title");
    }
}
