//! Gemini API client.
//!
//! A thin `reqwest` wrapper over the `generateContent` and `countTokens`
//! endpoints. All pipeline calls go through one [`GeminiClient`] constructed
//! at startup and passed down by reference; there is no ambient global
//! client state.
//!
//! Responses carry the usage metadata needed for cost accounting, exposed
//! through [`GenerateResponse::estimate_cost`].

use crate::models::{CostEstimate, pricing_for};
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, instrument};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Request timeout for Gemini calls. Generous because `gemini-2.5-pro`
/// summarization of a full day of articles can run over a minute.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(rename = "responseSchema", skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Serialize)]
struct CountTokensRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Deserialize)]
pub struct CountTokensResponse {
    #[serde(rename = "totalTokens")]
    pub total_tokens: u64,
}

/// A `generateContent` response, reduced to the fields the pipeline uses.
#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "modelVersion", default)]
    pub model_version: String,
    #[serde(rename = "usageMetadata")]
    pub usage_metadata: UsageMetadata,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
pub struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    pub prompt_token_count: u64,
    #[serde(rename = "candidatesTokenCount")]
    pub candidates_token_count: Option<u64>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    pub fn text(&self) -> Result<String> {
        let candidate = self
            .candidates
            .first()
            .ok_or_else(|| anyhow!("no candidates in Gemini response"))?;
        Ok(candidate
            .content
            .parts
            .iter()
            .map(|part| part.text.as_str())
            .collect())
    }

    /// Dollar cost of this call, from token usage and the pricing table.
    ///
    /// `candidates_token_count` is sometimes absent from responses, unclear
    /// why; that contributes zero output cost and is logged as an anomaly,
    /// not treated as an error.
    pub fn estimate_cost(&self) -> Result<CostEstimate> {
        let pricing = pricing_for(&self.model_version)
            .ok_or_else(|| anyhow!("no pricing known for model {:?}", self.model_version))?;

        let input_cost =
            self.usage_metadata.prompt_token_count as f64 * pricing.input_token_cost;

        let output_cost = match self.usage_metadata.candidates_token_count {
            Some(count) => count as f64 * pricing.output_token_cost,
            None => {
                info!("no candidates_token_count, unable to estimate output cost");
                0.0
            }
        };

        Ok(CostEstimate {
            input_cost,
            output_cost,
        })
    }
}

impl GeminiClient {
    pub fn new(api_key: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build Gemini HTTP client")?;
        Ok(Self {
            http,
            api_key,
            base_url: GEMINI_API_URL.to_string(),
        })
    }

    fn user_contents(prompt: &str) -> Vec<Content<'_>> {
        vec![Content {
            role: "user",
            parts: vec![Part { text: prompt }],
        }]
    }

    /// Free-form generation at temperature 0.
    pub async fn generate(&self, model: &str, prompt: &str) -> Result<GenerateResponse> {
        self.generate_inner(model, prompt, None).await
    }

    /// Structured JSON generation at temperature 0, constrained by a JSON
    /// schema; the response `text()` is a JSON document.
    pub async fn generate_json(
        &self,
        model: &str,
        prompt: &str,
        response_schema: Value,
    ) -> Result<GenerateResponse> {
        self.generate_inner(model, prompt, Some(response_schema)).await
    }

    #[instrument(level = "debug", skip_all, fields(%model))]
    async fn generate_inner(
        &self,
        model: &str,
        prompt: &str,
        response_schema: Option<Value>,
    ) -> Result<GenerateResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let request = GenerateRequest {
            contents: Self::user_contents(prompt),
            generation_config: GenerationConfig {
                temperature: 0.0,
                response_mime_type: response_schema.is_some().then_some("application/json"),
                response_schema,
            },
        };

        debug!(prompt_bytes = prompt.len(), "Gemini generateContent request");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error ({status}): {error_text}"));
        }

        Ok(response.json().await?)
    }

    /// Count the tokens a prompt would consume, without generating.
    #[instrument(level = "debug", skip_all, fields(%model))]
    pub async fn count_tokens(&self, model: &str, prompt: &str) -> Result<u64> {
        let url = format!("{}/models/{}:countTokens", self.base_url, model);
        let request = CountTokensRequest {
            contents: Self::user_contents(prompt),
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini countTokens error ({status}): {error_text}"));
        }

        let counted: CountTokensResponse = response.json().await?;
        Ok(counted.total_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_json(model_version: &str, candidates_token_count: Option<u64>) -> String {
        let count = match candidates_token_count {
            Some(n) => n.to_string(),
            None => "null".to_string(),
        };
        format!(
            r#"{{
                "candidates": [
                    {{"content": {{"parts": [{{"text": "{{\"isFrontPageNews\": true}}"}}], "role": "model"}}}}
                ],
                "modelVersion": "{model_version}",
                "usageMetadata": {{"promptTokenCount": 100, "candidatesTokenCount": {count}}}
            }}"#
        )
    }

    #[test]
    fn test_response_text_and_cost() {
        let res: GenerateResponse =
            serde_json::from_str(&response_json("gemini-2.5-flash-001", Some(10))).unwrap();
        assert_eq!(res.text().unwrap(), r#"{"isFrontPageNews": true}"#);

        let cost = res.estimate_cost().unwrap();
        assert!((cost.input_cost - 100.0 * 0.30 / 1_000_000.0).abs() < 1e-15);
        assert!((cost.output_cost - 10.0 * 2.50 / 1_000_000.0).abs() < 1e-15);
    }

    #[test]
    fn test_missing_candidates_token_count_is_zero_output_cost() {
        let res: GenerateResponse =
            serde_json::from_str(&response_json("gemini-2.5-pro", None)).unwrap();
        let cost = res.estimate_cost().unwrap();
        assert_eq!(cost.output_cost, 0.0);
        assert!(cost.input_cost > 0.0);
    }

    #[test]
    fn test_unknown_model_is_an_error() {
        let res: GenerateResponse =
            serde_json::from_str(&response_json("gemini-1.0-ultra", Some(5))).unwrap();
        assert!(res.estimate_cost().is_err());
    }

    #[test]
    fn test_no_candidates_text_is_an_error() {
        let res: GenerateResponse = serde_json::from_str(
            r#"{"candidates": [], "modelVersion": "gemini-2.5-flash", "usageMetadata": {"promptTokenCount": 1}}"#,
        )
        .unwrap();
        assert!(res.text().is_err());
    }
}
