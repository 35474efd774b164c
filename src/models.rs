//! Core data structures for the digest pipeline.
//!
//! This module defines:
//! - [`Item`]: one normalized news article, the unit that flows through the
//!   whole pipeline
//! - [`SourceItems`]: the per-source `url -> Item` map produced by one
//!   adapter invocation, and the [`merge_item`] dedup rule applied to it
//! - [`CostEstimate`]: the running dollar cost of Gemini calls in a run,
//!   derived from token usage and the [`MODEL_PRICING`] table

use std::collections::HashMap;

/// One normalized news article.
///
/// Created by a source adapter from raw fetched markup and immutable
/// afterwards. `content` may legally be empty; adapters log that but keep
/// the item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Display title, non-empty after trimming.
    pub title: String,
    /// Canonical article URL, the dedup key within a run.
    pub url: String,
    /// Extracted body text.
    pub content: String,
}

/// Mapping from article URL to [`Item`], scoped to one adapter invocation.
pub type SourceItems = HashMap<String, Item>;

/// Whether an already-known title beats a candidate for the same URL.
///
/// Articles can be linked to multiple times, e.g. once in a regular section
/// and again in a "popular" section. We prefer the variant with the most
/// information in the title. The comparison counts characters and uses `>=`,
/// so an equally long later title never replaces the first one seen.
pub fn title_outranks(known_title: &str, candidate_title: &str) -> bool {
    known_title.chars().count() >= candidate_title.chars().count()
}

/// Insert `item` into `items`, applying the longer-title-wins dedup rule.
///
/// Returns `true` if the item was inserted or replaced an existing entry.
pub fn merge_item(items: &mut SourceItems, item: Item) -> bool {
    if let Some(known) = items.get(&item.url)
        && title_outranks(&known.title, &item.title)
    {
        return false;
    }
    items.insert(item.url.clone(), item);
    true
}

/// Per-token prices for one Gemini model, in dollars.
#[derive(Debug, Clone, Copy)]
pub struct ModelPricing {
    pub input_token_cost: f64,
    pub output_token_cost: f64,
}

/// Pricing per <https://ai.google.dev/gemini-api/docs/pricing>, valid for
/// requests up to 200k input tokens.
pub const MODEL_PRICING: &[(&str, ModelPricing)] = &[
    (
        "gemini-2.5-pro",
        ModelPricing {
            input_token_cost: 1.25 / 1_000_000.0,
            output_token_cost: 10.0 / 1_000_000.0,
        },
    ),
    (
        "gemini-2.5-flash",
        ModelPricing {
            input_token_cost: 0.30 / 1_000_000.0,
            output_token_cost: 2.50 / 1_000_000.0,
        },
    ),
];

/// Look up pricing for a reported model version.
///
/// The API reports versioned or prefixed variants (`gemini-2.5-flash-001`,
/// `models/gemini-2.5-pro`), so matching is by substring containment against
/// each canonical name.
pub fn pricing_for(model_version: &str) -> Option<ModelPricing> {
    MODEL_PRICING
        .iter()
        .find(|(name, _)| model_version.contains(name))
        .map(|(_, pricing)| *pricing)
}

/// Accumulated dollar cost of Gemini calls across a run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostEstimate {
    pub input_cost: f64,
    pub output_cost: f64,
}

impl CostEstimate {
    pub fn add(&mut self, other: CostEstimate) {
        self.input_cost += other.input_cost;
        self.output_cost += other.output_cost;
    }

    pub fn total(&self) -> f64 {
        self.input_cost + self.output_cost
    }
}
