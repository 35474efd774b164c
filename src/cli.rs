//! Command-line interface definitions.
//!
//! Every option can come from a flag or an environment variable; on the
//! scheduled deployment everything arrives through the environment (a local
//! `.env` file is honored in development).

use clap::Parser;

/// Parse cache toggles supplied as `0`/`1` as well as `true`/`false`.
fn parse_switch(s: &str) -> Result<bool, String> {
    match s {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(format!("expected 0/1/true/false, got {other:?}")),
    }
}

/// Command-line arguments for the news digest pipeline.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Gemini API key used for classification and summarization
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: String,

    /// Slack bot token used to post the digest
    #[arg(long, env = "SLACK_BOT_TOKEN", hide_env_values = true)]
    pub slack_bot_token: String,

    /// Slack channel ID the digest is posted to
    #[arg(long, env = "SLACK_CHANNEL_ID")]
    pub slack_channel_id: String,

    /// Load the item artifact from the cache file when it exists, skipping
    /// acquisition and classification entirely
    #[arg(long, env = "READ_ITEM_CACHE", default_value = "0", value_parser = parse_switch, action = clap::ArgAction::Set)]
    pub read_item_cache: bool,

    /// Write the assembled item artifact to the cache file
    #[arg(long, env = "WRITE_ITEM_CACHE", default_value = "0", value_parser = parse_switch, action = clap::ArgAction::Set)]
    pub write_item_cache: bool,

    /// Path of the item cache file
    #[arg(long, env = "ITEM_CACHE_PATH", default_value = "items.xml")]
    pub item_cache_path: String,
}
