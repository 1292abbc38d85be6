// Generation call abstraction
//
// The translation protocol only needs "prompt in, text out". This module owns
// that seam:
// - Generator: the trait every backend implements (mocked in tests)
// - gemini: the generateContent REST implementation

pub mod gemini;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use gemini::GeminiGenerator;

use crate::config::GenerationConfig;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmCategory {
    HarmCategoryHarassment,
    HarmCategoryHateSpeech,
    HarmCategorySexuallyExplicit,
    HarmCategoryDangerousContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    BlockNone,
    BlockOnlyHigh,
    BlockMediumAndAbove,
    BlockLowAndAbove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

impl SafetySetting {
    /// Filters off for every category. Subtitle dialogue trips the defaults.
    pub fn block_none() -> Vec<SafetySetting> {
        [
            HarmCategory::HarmCategoryHarassment,
            HarmCategory::HarmCategoryHateSpeech,
            HarmCategory::HarmCategorySexuallyExplicit,
            HarmCategory::HarmCategoryDangerousContent,
        ]
        .into_iter()
        .map(|category| SafetySetting { category, threshold: HarmBlockThreshold::BlockNone })
        .collect()
    }
}

/// Sampling and output-format knobs for a single call
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// "application/json" asks the backend for transport-level JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

impl GenerationSettings {
    pub fn json(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            response_mime_type: Some("application/json".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub text: String,
}

/// A black-box text generation call
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        safety_settings: &[SafetySetting],
        settings: &GenerationSettings,
    ) -> Result<GenerationResponse>;

    /// Model identifier for logs and reports
    fn model_name(&self) -> String;
}

/// Factory for creating generator instances
pub struct GeneratorFactory;

impl GeneratorFactory {
    pub fn create_generator(config: GenerationConfig) -> Result<Box<dyn Generator>> {
        Ok(Box::new(GeminiGenerator::new(config)?))
    }
}
