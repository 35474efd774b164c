//! Slack rendering and posting.
//!
//! The summarization model emits markdown with one top-level heading, then
//! `##` sections each followed by an unordered list. [`make_blocks`] is a
//! pure, order-preserving transform of that markdown into Slack Block Kit
//! blocks; [`SlackClient::post_digest`] sends them to the configured
//! channel with a plain-text fallback for notifications.

use anyhow::{Context, Result, anyhow};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{info, instrument};

const SLACK_POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

static LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());
static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap());

/// Convert one markdown list item's text to Slack mrkdwn:
/// `[text](url)` becomes `<url|text>` and `**bold**` becomes `*bold*`.
fn to_mrkdwn(text: &str) -> String {
    let text = LINK_RE.replace_all(text, "<$2|$1>");
    BOLD_RE.replace_all(&text, "*$1*").into_owned()
}

fn header_block(text: &str) -> Value {
    json!({
        "type": "header",
        "text": {
            "type": "plain_text",
            "text": text,
        }
    })
}

/// Render digest markdown into Slack blocks.
///
/// The digest title (the single `#` heading) becomes a header block; each
/// `##` heading becomes a header plus divider; each `- ` item under a `##`
/// becomes a `◆ `-prefixed mrkdwn section. Errors if the markdown has no
/// top-level heading.
pub fn make_blocks(markdown: &str) -> Result<Vec<Value>> {
    let mut blocks = Vec::new();
    let mut saw_title = false;
    let mut in_section = false;

    for line in markdown.lines() {
        let line = line.trim_end();
        if let Some(title) = line.strip_prefix("# ") {
            if !saw_title {
                blocks.push(header_block(title.trim()));
                saw_title = true;
            }
        } else if let Some(heading) = line.strip_prefix("## ") {
            blocks.push(header_block(heading.trim()));
            blocks.push(json!({"type": "divider"}));
            in_section = true;
        } else if let Some(item) = line
            .strip_prefix("- ")
            .or_else(|| line.strip_prefix("* "))
        {
            if in_section {
                blocks.push(json!({
                    "type": "section",
                    "text": {
                        "type": "mrkdwn",
                        "text": format!("◆ {}", to_mrkdwn(item.trim())),
                    }
                }));
            }
        }
    }

    if !saw_title {
        return Err(anyhow!("digest markdown has no top-level heading"));
    }
    Ok(blocks)
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
}

#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    token: String,
    channel: String,
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl SlackClient {
    pub fn new(token: String, channel: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build Slack HTTP client")?;
        Ok(Self {
            http,
            token,
            channel,
        })
    }

    /// Post digest blocks to the configured channel.
    ///
    /// `fallback_text` only shows up in notifications; the blocks carry the
    /// actual message.
    #[instrument(level = "info", skip_all, fields(channel = %self.channel))]
    pub async fn post_digest(&self, blocks: &[Value], fallback_text: &str) -> Result<()> {
        info!("pinging slack");

        let response = self
            .http
            .post(SLACK_POST_MESSAGE_URL)
            .bearer_auth(&self.token)
            .json(&json!({
                "channel": self.channel,
                "blocks": blocks,
                "text": fallback_text,
            }))
            .send()
            .await?
            .error_for_status()?;

        let posted: PostMessageResponse = response.json().await?;
        if !posted.ok {
            return Err(anyhow!(
                "Slack chat.postMessage failed: {}",
                posted.error.unwrap_or_else(|| "unknown error".to_string())
            ));
        }

        info!("posted digest");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# News for Friday, August 29, 2026

## World

- **Ceasefire talks resume** after [AP reports](https://apnews.com/article/x) progress.
- Quiet day elsewhere.

## Japan

- [NHK](https://www3.nhk.or.jp/nhkworld/en/news/1/) covers the typhoon's landfall.
";

    #[test]
    fn test_make_blocks_structure() {
        let blocks = make_blocks(SAMPLE).unwrap();

        assert_eq!(blocks[0]["type"], "header");
        assert_eq!(blocks[0]["text"]["text"], "News for Friday, August 29, 2026");

        // World header, divider, two sections, Japan header, divider, one section
        assert_eq!(blocks.len(), 8);
        assert_eq!(blocks[1]["text"]["text"], "World");
        assert_eq!(blocks[2]["type"], "divider");
        assert_eq!(blocks[3]["type"], "section");
        assert_eq!(blocks[5]["text"]["text"], "Japan");
    }

    #[test]
    fn test_make_blocks_mrkdwn_conversion() {
        let blocks = make_blocks(SAMPLE).unwrap();
        let first_item = blocks[3]["text"]["text"].as_str().unwrap();
        assert_eq!(
            first_item,
            "◆ *Ceasefire talks resume* after <https://apnews.com/article/x|AP reports> progress."
        );
        assert!(first_item.starts_with('◆'));
    }

    #[test]
    fn test_make_blocks_requires_title() {
        assert!(make_blocks("## Only a section\n- item\n").is_err());
    }

    #[test]
    fn test_list_items_before_any_section_are_ignored() {
        let blocks = make_blocks("# Title\n- stray item\n## S\n- real item\n").unwrap();
        let sections: Vec<_> = blocks.iter().filter(|b| b["type"] == "section").collect();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0]["text"]["text"], "◆ real item");
    }

    #[test]
    fn test_to_mrkdwn_plain_text_unchanged() {
        assert_eq!(to_mrkdwn("no markup at all"), "no markup at all");
    }
}
