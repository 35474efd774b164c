//! Classification stage: a bounded-parallel relevance filter over items.
//!
//! Every item gets one cheap Gemini call that looks at the title only and
//! answers a single structured boolean, `isFrontPageNews`. Calls fan out
//! over a `buffer_unordered` stream with fixed concurrency; results come
//! back in completion order, not submission order, and kept items preserve
//! that completion order. This is an accepted nondeterminism of the final
//! digest ordering when the run is not cache-restored.
//!
//! Per-call failures (transport errors, malformed responses) drop the item,
//! count nothing toward cost, and never abort the batch. The stage driver
//! inspects each [`ClassificationOutcome`] explicitly rather than relying on
//! unwinding for its continue-on-failure policy.

use crate::api::GeminiClient;
use crate::models::{CostEstimate, Item};
use crate::utils::{ProgressMeter, truncate_for_log};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, instrument};

/// Fixed worker count for classification calls. Keeps us clear of
/// rate limits while still draining a typical homepage in a few minutes.
const CLASSIFY_CONCURRENCY: usize = 8;

const FILTER_MODEL: &str = "gemini-2.5-flash";

const FILTER_PROMPT_TEMPLATE: &str = include_str!("../prompts/filter.txt");

/// The structured verdict of one successful classification call.
#[derive(Debug, Clone, Copy)]
pub struct Verdict {
    pub is_front_page_news: bool,
    pub cost: CostEstimate,
}

/// One item's result from the fan-out: the item plus either a verdict or
/// the failure that dropped it.
struct ClassificationOutcome {
    item: Item,
    verdict: Result<Verdict>,
}

/// Anything that can judge a title. The pipeline uses [`GeminiClient`];
/// tests substitute a canned implementation.
#[async_trait]
pub trait TitleClassifier: Sync {
    async fn judge_title(&self, title: &str) -> Result<Verdict>;
}

#[derive(Debug, Deserialize)]
struct FilterAnswer {
    #[serde(rename = "isFrontPageNews")]
    is_front_page_news: bool,
}

#[async_trait]
impl TitleClassifier for GeminiClient {
    async fn judge_title(&self, title: &str) -> Result<Verdict> {
        let prompt = FILTER_PROMPT_TEMPLATE.replace("{title}", title);
        let response_schema = json!({
            "type": "object",
            "properties": {
                "isFrontPageNews": {"type": "boolean"}
            },
            "required": ["isFrontPageNews"]
        });

        let res = self
            .generate_json(FILTER_MODEL, &prompt, response_schema)
            .await?;
        let cost = res.estimate_cost()?;

        let text = res.text()?;
        let answer: FilterAnswer = serde_json::from_str(&text).with_context(|| {
            format!(
                "non-conforming classifier response: {}",
                truncate_for_log(&text, 300)
            )
        })?;

        Ok(Verdict {
            is_front_page_news: answer.is_front_page_news,
            cost,
        })
    }
}

/// Filter `items` down to front-page news, returning the kept items in
/// completion order together with the accumulated cost of all successful
/// calls.
#[instrument(level = "info", skip_all, fields(count = items.len()))]
pub async fn classify<C: TitleClassifier>(
    classifier: &C,
    items: Vec<Item>,
) -> (Vec<Item>, CostEstimate) {
    info!(count = items.len(), "testing news items");
    let started = std::time::Instant::now();
    let progress = ProgressMeter::new(items.len(), "tested items");
    let progress = &progress;

    let mut outcomes = stream::iter(items)
        .map(|item| async move {
            let verdict = classifier.judge_title(&item.title).await;
            progress.increment();
            ClassificationOutcome { item, verdict }
        })
        .buffer_unordered(CLASSIFY_CONCURRENCY);

    let mut front_page_items = Vec::new();
    let mut test_cost = CostEstimate::default();
    while let Some(outcome) = outcomes.next().await {
        let verdict = match outcome.verdict {
            Ok(verdict) => verdict,
            Err(e) => {
                error!(url = %outcome.item.url, error = %e, "failed to test item");
                continue;
            }
        };

        test_cost.add(verdict.cost);
        if verdict.is_front_page_news {
            front_page_items.push(outcome.item);
        } else {
            info!(url = %outcome.item.url, "ignoring item");
        }
    }

    info!(
        elapsed_secs = started.elapsed().as_secs_f64(),
        cost_usd = test_cost.total(),
        kept = front_page_items.len(),
        "done testing items"
    );
    (front_page_items, test_cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::HashSet;

    /// Keeps titles containing "keep", fails titles containing "fail".
    struct CannedClassifier {
        per_call_cost: CostEstimate,
    }

    #[async_trait]
    impl TitleClassifier for CannedClassifier {
        async fn judge_title(&self, title: &str) -> Result<Verdict> {
            if title.contains("fail") {
                return Err(anyhow!("transport error"));
            }
            Ok(Verdict {
                is_front_page_news: title.contains("keep"),
                cost: self.per_call_cost,
            })
        }
    }

    fn item(title: &str) -> Item {
        Item {
            title: title.to_string(),
            url: format!("https://example.com/{}", title.replace(' ', "-")),
            content: String::new(),
        }
    }

    #[tokio::test]
    async fn test_partition_and_cost() {
        let classifier = CannedClassifier {
            per_call_cost: CostEstimate {
                input_cost: 0.001,
                output_cost: 0.0005,
            },
        };
        let items: Vec<Item> = [
            "keep one", "drop one", "keep two", "fail hard", "drop two",
            "keep three", "drop three", "drop four", "drop five", "drop six",
        ]
        .into_iter()
        .map(item)
        .collect();

        let (kept, cost) = classify(&classifier, items).await;

        let kept_titles: HashSet<&str> = kept.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(
            kept_titles,
            HashSet::from(["keep one", "keep two", "keep three"])
        );

        // 9 successful calls counted, the failed one contributes nothing
        assert!((cost.total() - 9.0 * 0.0015).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_all_failures_yield_empty_batch() {
        let classifier = CannedClassifier {
            per_call_cost: CostEstimate::default(),
        };
        let items = vec![item("fail a"), item("fail b")];

        let (kept, cost) = classify(&classifier, items).await;
        assert!(kept.is_empty());
        assert_eq!(cost, CostEstimate::default());
    }

    #[tokio::test]
    async fn test_kept_items_flow_through_assembly_and_cache() {
        let classifier = CannedClassifier {
            per_call_cost: CostEstimate::default(),
        };
        let items: Vec<Item> = (0..10)
            .map(|i| {
                let title = if i % 3 == 0 {
                    format!("keep story {i}")
                } else {
                    format!("drop story {i}")
                };
                Item {
                    title,
                    url: format!("https://example.com/{i}"),
                    content: format!("body {i}"),
                }
            })
            .collect();

        let (kept, _) = classify(&classifier, items).await;
        assert_eq!(kept.len(), 4); // 0, 3, 6, 9

        let items_xml = crate::artifact::assemble(&kept);
        assert_eq!(items_xml.matches("<item>").count(), 4);
        for item in &kept {
            assert!(items_xml.contains(&format!("<title>{}</title>", item.title)));
            assert!(items_xml.contains(&format!("<url>{}</url>", item.url)));
            assert!(items_xml.contains(&format!("<content>{}</content>", item.content)));
        }

        // a cache-restored run reproduces the artifact byte for byte
        let path = std::env::temp_dir().join(format!(
            "news_digest_classify_e2e_{}.xml",
            std::process::id()
        ));
        crate::artifact::write_cache(&path, &items_xml).await.unwrap();
        let restored = crate::artifact::read_cache(&path).await.unwrap().unwrap();
        assert_eq!(restored, items_xml);
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[test]
    fn test_filter_answer_parses_schema_shape() {
        let answer: FilterAnswer =
            serde_json::from_str(r#"{"isFrontPageNews": true}"#).unwrap();
        assert!(answer.is_front_page_news);
    }
}
