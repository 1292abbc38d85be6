use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::GenerationConfig;
use crate::error::{JimakuError, Result};
use super::{Generator, GenerationResponse, GenerationSettings, SafetySetting};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "no_safety_settings")]
    safety_settings: &'a [SafetySetting],
    generation_config: &'a GenerationSettings,
}

fn no_safety_settings(settings: &&[SafetySetting]) -> bool {
    settings.is_empty()
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Generator backed by the Gemini generateContent REST API
pub struct GeminiGenerator {
    client: Client,
    config: GenerationConfig,
    api_key: String,
}

impl GeminiGenerator {
    pub fn new(config: GenerationConfig) -> Result<Self> {
        let api_key = config.resolve_api_key()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config, api_key })
    }

    fn generate_url(&self) -> String {
        let model = self.config.model.strip_prefix("models/").unwrap_or(&self.config.model);
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            model
        )
    }
}

fn extract_text(response: GenerateContentResponse) -> Result<String> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(JimakuError::Generation(format!("Prompt blocked: {}", reason)));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| JimakuError::Generation("Response contained no candidates".to_string()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(JimakuError::Generation(format!(
            "Candidate has no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    Ok(text)
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate(
        &self,
        prompt: &str,
        safety_settings: &[SafetySetting],
        settings: &GenerationSettings,
    ) -> Result<GenerationResponse> {
        let request = GenerateContentRequest {
            contents: vec![Content { role: "user", parts: vec![RequestPart { text: prompt }] }],
            safety_settings,
            generation_config: settings,
        };

        let url = self.generate_url();
        debug!("Sending generation request to: {}", url);

        let response = self.client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| JimakuError::Generation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(JimakuError::Generation(format!(
                "Generation API error {}: {}", status, error_text
            )));
        }

        let body: GenerateContentResponse = response.json().await
            .map_err(|e| JimakuError::Generation(format!("Failed to parse response: {}", e)))?;

        let text = extract_text(body)?;
        debug!("Raw generation response: {}", text);

        Ok(GenerationResponse { text })
    }

    fn model_name(&self) -> String {
        self.config.model.clone()
    }
}
