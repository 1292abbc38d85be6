use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::TranslateConfig;
use crate::error::Result;
use crate::generation::{GenerationSettings, Generator, SafetySetting};
use super::common::{
    round_seconds, BatchStatus, Diagnostics, TranslationOptions, TranslationRequest, TranslationResult,
};
use super::prompt::build_translation_prompt;
use super::reconcile::{reconcile_response, Reconciled};

/// Translates one batch of lines per call with ID-anchored JSON and fail-soft retries
pub struct BatchTranslator {
    generator: Arc<dyn Generator>,
    max_retries: u32,
    retry_delay: Duration,
}

impl BatchTranslator {
    pub fn new(generator: Arc<dyn Generator>, config: &TranslateConfig) -> Self {
        Self::with_retry_policy(
            generator,
            config.max_retries,
            Duration::from_millis(config.retry_delay_ms),
        )
    }

    pub fn with_retry_policy(generator: Arc<dyn Generator>, max_retries: u32, retry_delay: Duration) -> Self {
        Self { generator, max_retries, retry_delay }
    }

    /// Translate `texts` in one call. The returned texts always have the same
    /// length as the input; on failure they are the input unchanged and the
    /// diagnostics carry the error.
    pub async fn translate_batch(&self, texts: &[String], options: &TranslationOptions) -> TranslationResult {
        let started = Instant::now();
        let request = TranslationRequest::new(texts, options);
        let mut diagnostics = Diagnostics::for_request(&request);

        if texts.is_empty() {
            diagnostics.status = BatchStatus::Success;
            return TranslationResult { translated_texts: Vec::new(), diagnostics };
        }

        let payload = match request.payload_json() {
            Ok(payload) => payload,
            Err(e) => {
                diagnostics.status = BatchStatus::Error(e.to_string());
                return passthrough(texts, diagnostics, started);
            }
        };
        diagnostics.request_payload = payload.clone();

        let prompt = build_translation_prompt(&request, &payload);
        let safety_settings = SafetySetting::block_none();
        let settings = GenerationSettings::json(request.temperature());
        let total_attempts = self.max_retries + 1;

        for attempt in 1..=total_attempts {
            diagnostics.attempt_count = attempt;

            match self.attempt(&prompt, &safety_settings, &settings, texts, &mut diagnostics).await {
                Ok(reconciled) => {
                    if !reconciled.missing_ids.is_empty() {
                        warn!(
                            "│ {} of {} lines missing from response, kept source text for ids {:?}",
                            reconciled.missing_ids.len(),
                            texts.len(),
                            reconciled.missing_ids
                        );
                    }
                    diagnostics.status = BatchStatus::Success;
                    diagnostics.missing_ids = reconciled.missing_ids;
                    diagnostics.duration_seconds = round_seconds(started.elapsed().as_secs_f64());
                    debug!("│ Batch translated in {}s (attempt {})", diagnostics.duration_seconds, attempt);
                    return TranslationResult { translated_texts: reconciled.texts, diagnostics };
                }
                Err(e) => {
                    warn!("│ Attempt {}/{} failed: {}", attempt, total_attempts, e);
                    diagnostics.status = BatchStatus::Error(e.to_string());
                    if attempt < total_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        info!("│ Giving up after {} attempts, keeping source text", total_attempts);
        passthrough(texts, diagnostics, started)
    }

    async fn attempt(
        &self,
        prompt: &str,
        safety_settings: &[SafetySetting],
        settings: &GenerationSettings,
        texts: &[String],
        diagnostics: &mut Diagnostics,
    ) -> Result<Reconciled> {
        // Diagnostics describe the latest attempt only
        diagnostics.raw_response.clear();
        let response = self.generator.generate(prompt, safety_settings, settings).await?;
        diagnostics.raw_response = response.text;
        reconcile_response(&diagnostics.raw_response, texts)
    }
}

fn passthrough(texts: &[String], mut diagnostics: Diagnostics, started: Instant) -> TranslationResult {
    diagnostics.duration_seconds = round_seconds(started.elapsed().as_secs_f64());
    TranslationResult { translated_texts: texts.to_vec(), diagnostics }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JimakuError;
    use crate::generation::{GenerationResponse, MockGenerator};
    use crate::translate::common::{ReasoningMode, NO_CONTEXT_MARKER};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn texts(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn options() -> TranslationOptions {
        TranslationOptions::new("English", "Korean")
    }

    fn translator(mock: MockGenerator) -> BatchTranslator {
        BatchTranslator::with_retry_policy(Arc::new(mock), 1, Duration::ZERO)
    }

    fn responding(body: &'static str) -> MockGenerator {
        let mut mock = MockGenerator::new();
        mock.expect_generate()
            .returning(move |_, _, _| Ok(GenerationResponse { text: body.to_string() }));
        mock
    }

    #[tokio::test]
    async fn test_reconciles_partial_response() {
        let mock = responding(r#"{"translated_items":[{"id":2,"text":"C"},{"id":0,"text":"A"}]}"#);
        let result = translator(mock).translate_batch(&texts(&["a", "b", "c"]), &options()).await;

        assert_eq!(result.translated_texts, vec!["A", "b", "C"]);
        assert_eq!(result.diagnostics.status, BatchStatus::Success);
        assert_eq!(result.diagnostics.attempt_count, 1);
        assert_eq!(result.diagnostics.missing_ids, vec![1]);
    }

    #[tokio::test]
    async fn test_exhausted_retries_pass_source_through() {
        let mut mock = MockGenerator::new();
        mock.expect_generate()
            .times(2)
            .returning(|_, _, _| Err(JimakuError::Generation("quota exceeded".to_string())));

        let result = translator(mock).translate_batch(&texts(&["x", "y"]), &options()).await;

        assert_eq!(result.translated_texts, vec!["x", "y"]);
        assert_eq!(result.diagnostics.attempt_count, 2);
        match &result.diagnostics.status {
            BatchStatus::Error(reason) => assert!(reason.contains("quota exceeded")),
            other => panic!("expected error status, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_then_valid_succeeds_on_retry() {
        let calls = AtomicUsize::new(0);
        let mut mock = MockGenerator::new();
        mock.expect_generate().times(2).returning(move |_, _, _| {
            let body = if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                "I could not do that."
            } else {
                r#"{"translated_items":[{"id":0,"text":"안녕"}]}"#
            };
            Ok(GenerationResponse { text: body.to_string() })
        });

        let result = translator(mock).translate_batch(&texts(&["hello"]), &options()).await;

        assert_eq!(result.translated_texts, vec!["안녕"]);
        assert_eq!(result.diagnostics.status, BatchStatus::Success);
        assert_eq!(result.diagnostics.attempt_count, 2);
        assert!(result.diagnostics.raw_response.contains("안녕"));
    }

    #[tokio::test]
    async fn test_transport_failure_clears_previous_response() {
        let calls = AtomicUsize::new(0);
        let mut mock = MockGenerator::new();
        mock.expect_generate().times(2).returning(move |_, _, _| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(GenerationResponse { text: "not json at all".to_string() })
            } else {
                Err(JimakuError::Generation("connection reset".to_string()))
            }
        });

        let result = translator(mock).translate_batch(&texts(&["hello"]), &options()).await;

        assert_eq!(result.translated_texts, vec!["hello"]);
        assert_eq!(result.diagnostics.attempt_count, 2);
        assert!(matches!(&result.diagnostics.status, BatchStatus::Error(msg) if msg.contains("connection reset")));
        assert!(result.diagnostics.raw_response.is_empty());
    }

    #[tokio::test]
    async fn test_zero_retries_means_single_attempt() {
        let mut mock = MockGenerator::new();
        mock.expect_generate()
            .times(1)
            .returning(|_, _, _| Ok(GenerationResponse { text: "{}".to_string() }));

        let translator = BatchTranslator::with_retry_policy(Arc::new(mock), 0, Duration::ZERO);
        let result = translator.translate_batch(&texts(&["a"]), &options()).await;

        assert_eq!(result.translated_texts, vec!["a"]);
        assert_eq!(result.diagnostics.attempt_count, 1);
        assert!(!result.diagnostics.status.is_success());
    }

    #[tokio::test]
    async fn test_empty_batch_skips_generation() {
        let mut mock = MockGenerator::new();
        mock.expect_generate().never();

        let result = translator(mock).translate_batch(&[], &options()).await;

        assert!(result.translated_texts.is_empty());
        assert_eq!(result.diagnostics.status, BatchStatus::Success);
        assert_eq!(result.diagnostics.attempt_count, 0);
    }

    #[tokio::test]
    async fn test_cardinality_holds_for_any_response() {
        let bodies = [
            r#"{"translated_items":[{"id":0,"text":"A"},{"id":1,"text":"B"},{"id":2,"text":"C"}]}"#,
            r#"{"translated_items":[{"id":1,"text":"B"}]}"#,
            r#"{"translated_items":[{"id":0,"text":"A"},{"id":9,"text":"?"},{"id":10,"text":"?"},{"id":11,"text":"?"}]}"#,
            r#"{"result":[{"id":2,"text":"C"}]}"#,
            r#"{"a":[],"b":[]}"#,
            r#"{"translated_items":"oops"}"#,
            "```json\n{\"translated_items\": [\n```",
            "",
            "null",
        ];
        let source = texts(&["a", "b", "c"]);

        for body in bodies {
            let result = translator(responding(body)).translate_batch(&source, &options()).await;
            assert_eq!(result.translated_texts.len(), source.len(), "cardinality broken for {:?}", body);
        }

        let mut failing = MockGenerator::new();
        failing.expect_generate()
            .returning(|_, _, _| Err(JimakuError::Generation("network down".to_string())));
        let result = translator(failing).translate_batch(&source, &options()).await;
        assert_eq!(result.translated_texts, source);
    }

    #[tokio::test]
    async fn test_call_carries_json_mode_and_safety_settings() {
        let mut mock = MockGenerator::new();
        mock.expect_generate()
            .withf(|prompt, safety, settings| {
                prompt.contains(r#"{"items":[{"id":0,"text":"hello"}]}"#)
                    && safety.len() == 4
                    && settings.temperature == Some(0.1)
                    && settings.response_mime_type.as_deref() == Some("application/json")
            })
            .times(1)
            .returning(|_, _, _| Ok(GenerationResponse { text: r#"{"translated_items":[{"id":0,"text":"hi"}]}"#.to_string() }));

        let result = translator(mock).translate_batch(&texts(&["hello"]), &options()).await;
        assert_eq!(result.translated_texts, vec!["hi"]);
        assert_eq!(result.diagnostics.request_payload, r#"{"items":[{"id":0,"text":"hello"}]}"#);
        assert_eq!(result.diagnostics.context_used, NO_CONTEXT_MARKER);
        assert_eq!(result.diagnostics.reasoning_mode, ReasoningMode::Off);
    }

    #[tokio::test]
    async fn test_reasoning_and_context_reach_prompt() {
        let mut mock = MockGenerator::new();
        mock.expect_generate()
            .withf(|prompt, _, settings| {
                prompt.contains("[MAX REASONING MODE: ON]")
                    && prompt.contains("Glossary: Ray")
                    && settings.temperature == Some(0.2)
            })
            .times(1)
            .returning(|_, _, _| Ok(GenerationResponse { text: r#"{"translated_items":[{"id":0,"text":"레이"}]}"#.to_string() }));

        let options = options().with_reasoning(true).with_context_guide("Glossary: Ray");
        let result = translator(mock).translate_batch(&texts(&["Ray"]), &options).await;

        assert_eq!(result.translated_texts, vec!["레이"]);
        assert_eq!(result.diagnostics.context_used, "Glossary: Ray");
        assert_eq!(result.diagnostics.reasoning_mode, ReasoningMode::On);
    }
}
