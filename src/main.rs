//! # News Digest
//!
//! A scheduled pipeline that gathers news articles from multiple sources,
//! filters them down to front-page news with a cheap Gemini classifier,
//! summarizes the survivors into a digest, and posts the digest to Slack.
//!
//! ## Architecture
//!
//! 1. **Acquisition**: every source adapter runs concurrently; per-item
//!    failures are isolated inside each adapter, per-source failures are
//!    isolated by the coordinator
//! 2. **Merge**: items are deduplicated by URL (longer title wins) and
//!    shuffled to avoid source-order bias
//! 3. **Classification**: one title-only Gemini call per item, 8 at a time;
//!    kept items accumulate in completion order
//! 4. **Assembly**: kept items become an `<item>`-block artifact, optionally
//!    cached so the next run can skip straight to summarization
//! 5. **Summarization + posting**: one `gemini-2.5-pro` call renders the
//!    digest markdown, which is converted to Slack blocks and posted
//!
//! ## Usage
//!
//! ```sh
//! GEMINI_API_KEY=... SLACK_BOT_TOKEN=... SLACK_CHANNEL_ID=... news_digest
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod acquire;
mod api;
mod artifact;
mod classify;
mod cli;
mod models;
mod scrapers;
mod slack;
mod summarize;
mod utils;

use api::GeminiClient;
use cli::Cli;
use models::CostEstimate;
use scrapers::{SourceAdapter, ap::ApAdapter, nhk::NhkAdapter};
use slack::SlackClient;
use utils::digest_date;

#[tokio::main]
#[instrument]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_digest starting up");

    let args = Cli::parse();
    debug!(
        read_item_cache = args.read_item_cache,
        write_item_cache = args.write_item_cache,
        item_cache_path = %args.item_cache_path,
        "Parsed CLI arguments"
    );

    // Collaborator clients are built once here and passed down by reference;
    // nothing else in the pipeline holds credentials.
    let gemini = GeminiClient::new(args.gemini_api_key)?;
    let slack = SlackClient::new(args.slack_bot_token, args.slack_channel_id)?;

    let cache_path = Path::new(&args.item_cache_path);
    let mut run_cost = CostEstimate::default();

    // Cache short-circuit: a restored artifact skips acquisition and
    // classification wholesale. There is no partial cache use.
    let mut items_xml = if args.read_item_cache {
        artifact::read_cache(cache_path).await?.unwrap_or_default()
    } else {
        String::new()
    };

    if items_xml.is_empty() {
        let adapters: Vec<Arc<dyn SourceAdapter>> =
            vec![Arc::new(ApAdapter::new()?), Arc::new(NhkAdapter::new()?)];

        let all_items = acquire::acquire(adapters).await;

        let (front_page_items, test_cost) = classify::classify(&gemini, all_items).await;
        run_cost.add(test_cost);

        items_xml = artifact::assemble(&front_page_items);

        if args.write_item_cache {
            artifact::write_cache(cache_path, &items_xml).await?;
        }
    }

    if items_xml.is_empty() {
        info!("aborting, no news items");
        return Ok(());
    }

    let (digest_markdown, summary_cost) = summarize::summarize(&gemini, &items_xml).await?;
    run_cost.add(summary_cost);
    info!(cost_usd = run_cost.total(), "total run cost");

    let blocks = slack::make_blocks(&digest_markdown)?;
    slack
        .post_digest(&blocks, &format!("News for {}", digest_date()))
        .await?;

    let elapsed = start_time.elapsed();
    info!(
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
