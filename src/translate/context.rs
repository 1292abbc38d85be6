use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::generation::{GenerationSettings, Generator};
use super::prompt::{build_context_prompt, sample_document};

/// Produces a reusable style/glossary guide for a whole document
pub struct ContextAnalyzer {
    generator: Arc<dyn Generator>,
}

impl ContextAnalyzer {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// One generation call over a sample of `full_text`. The guide is returned
    /// as free-form text written in `target_lang`.
    pub async fn analyze_context(&self, full_text: &str, source_lang: &str, target_lang: &str) -> Result<String> {
        let sample = sample_document(full_text);
        info!(
            "Analyzing context from a {}-character sample ({} -> {})",
            sample.chars().count(),
            source_lang,
            target_lang
        );

        let prompt = build_context_prompt(&sample, source_lang, target_lang);
        let response = self.generator
            .generate(&prompt, &[], &GenerationSettings::default())
            .await?;

        Ok(response.text.trim().to_string())
    }
}
