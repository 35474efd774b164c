//! Final digest summarization.
//!
//! One blocking `generateContent` exchange with the larger model turns the
//! assembled item artifact into digest markdown. Unlike every earlier stage
//! this call is neither retried nor isolated: a failure here is fatal to the
//! run. That asymmetry is deliberate and inherited.
//
// TODO: retries?

use crate::api::GeminiClient;
use crate::models::CostEstimate;
use crate::utils::digest_date;
use anyhow::Result;
use tracing::{info, instrument};

const SUMMARY_MODEL: &str = "gemini-2.5-pro";

const TRANSFORM_PROMPT_TEMPLATE: &str = include_str!("../prompts/transform.txt");

/// Fill the transform template with today's date and the item artifact.
pub fn make_prompt(items_xml: &str) -> String {
    TRANSFORM_PROMPT_TEMPLATE
        .replace("{date}", &digest_date())
        .replace("{items_xml}", items_xml)
}

/// Summarize the artifact into digest markdown.
///
/// Logs the prompt's token count up front so oversized runs are visible
/// before money is spent, then the full response text, token usage,
/// latency, and estimated cost.
#[instrument(level = "info", skip_all)]
pub async fn summarize(client: &GeminiClient, items_xml: &str) -> Result<(String, CostEstimate)> {
    let prompt = make_prompt(items_xml);

    let total_tokens = client.count_tokens(SUMMARY_MODEL, &prompt).await?;
    info!(total_tokens, "summarizing tokens");

    let started = std::time::Instant::now();
    let res = client.generate(SUMMARY_MODEL, &prompt).await?;
    let latency = started.elapsed();

    let text = res.text()?;
    info!("{}", text);
    info!(input_tokens = res.usage_metadata.prompt_token_count, "input tokens");
    info!(output_tokens = ?res.usage_metadata.candidates_token_count, "output tokens");
    info!(latency_secs = latency.as_secs_f64(), "summarization latency");

    let cost = res.estimate_cost()?;
    info!(cost_usd = cost.total(), "summarization cost");

    Ok((text, cost))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_prompt_substitutes_placeholders() {
        let prompt = make_prompt("<item>\n  <title>T</title>\n</item>\n");
        assert!(prompt.contains("<title>T</title>"));
        assert!(!prompt.contains("{items_xml}"));
        assert!(!prompt.contains("{date}"));
    }
}
