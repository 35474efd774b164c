//! Artifact assembly: serialize kept items into the intermediate document
//! fed to summarization, and optionally persist it as a cache file.
//!
//! The document is a flat concatenation of `<item>` blocks in the order the
//! items are given (classification-completion order on a live run). Field
//! values are XML-escaped defensively so a title containing `<` or `&`
//! cannot corrupt the block structure.
//!
//! The cache file, when enabled, lets the next run skip acquisition and
//! classification entirely: its text is the artifact, verbatim.

use crate::models::Item;
use anyhow::{Context, Result};
use quick_xml::escape::escape;
use std::path::Path;
use tracing::{info, instrument};

/// Serialize one item into its `<item>` block.
fn render_item(item: &Item) -> String {
    format!(
        "<item>\n  <title>{}</title>\n  <url>{}</url>\n  <content>{}</content>\n</item>\n",
        escape(item.title.as_str()),
        escape(item.url.as_str()),
        escape(item.content.as_str()),
    )
}

/// Concatenate all items' blocks in the given order.
///
/// Pure and idempotent: the same sequence always yields the same text.
pub fn assemble(items: &[Item]) -> String {
    items.iter().map(render_item).collect()
}

/// Load a previous run's artifact, if present.
///
/// Absence is not an error; a read failure on an existing file is.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn read_cache(path: &Path) -> Result<Option<String>> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Ok(None);
    }
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read item cache: {}", path.display()))?;
    info!("found cached news items");
    Ok(Some(text))
}

/// Persist the artifact, overwriting any prior content.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_cache(path: &Path, items_xml: &str) -> Result<()> {
    tokio::fs::write(path, items_xml)
        .await
        .with_context(|| format!("failed to write item cache: {}", path.display()))?;
    info!(bytes = items_xml.len(), "wrote item cache");
    Ok(())
}
