use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Marker written to diagnostics when no context guide was supplied
pub const NO_CONTEXT_MARKER: &str = "None";

/// One line of a request, anchored by its position within the batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationItem {
    pub id: usize,
    pub text: String,
}

/// Caller-facing knobs shared by every batch of a job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationOptions {
    pub source_lang: String,
    pub target_lang: String,
    /// Style/glossary guide; empty means none
    #[serde(default)]
    pub context_guide: String,
    #[serde(default)]
    pub reasoning: bool,
}

impl TranslationOptions {
    pub fn new(source_lang: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            ..Default::default()
        }
    }

    pub fn with_context_guide(mut self, guide: impl Into<String>) -> Self {
        self.context_guide = guide.into();
        self
    }

    pub fn with_reasoning(mut self, reasoning: bool) -> Self {
        self.reasoning = reasoning;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    pub items: Vec<TranslationItem>,
    pub context_guide: Option<String>,
    pub reasoning_enabled: bool,
    pub source_lang: String,
    pub target_lang: String,
}

#[derive(Serialize)]
struct RequestPayload<'a> {
    items: &'a [TranslationItem],
}

impl TranslationRequest {
    pub fn new(texts: &[String], options: &TranslationOptions) -> Self {
        let items = texts
            .iter()
            .enumerate()
            .map(|(id, text)| TranslationItem { id, text: text.clone() })
            .collect();

        let guide = options.context_guide.trim();
        Self {
            items,
            context_guide: (!guide.is_empty()).then(|| options.context_guide.clone()),
            reasoning_enabled: options.reasoning,
            source_lang: options.source_lang.clone(),
            target_lang: options.target_lang.clone(),
        }
    }

    /// The `{"items": [...]}` document embedded in the prompt
    pub fn payload_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&RequestPayload { items: &self.items })?)
    }

    /// Reasoning mode trades a little determinism for fluency
    pub fn temperature(&self) -> f32 {
        if self.reasoning_enabled { 0.2 } else { 0.1 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    Success,
    Error(String),
}

impl BatchStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "Success"),
            Self::Error(reason) => write!(f, "Error: {}", reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReasoningMode {
    On,
    Off,
}

impl From<bool> for ReasoningMode {
    fn from(enabled: bool) -> Self {
        if enabled { Self::On } else { Self::Off }
    }
}

/// Record of one `translate_batch` call. A retry of the same batch produces a
/// fresh record that replaces the old one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub request_payload: String,
    pub raw_response: String,
    pub status: BatchStatus,
    pub attempt_count: u32,
    pub duration_seconds: f64,
    pub context_used: String,
    pub reasoning_mode: ReasoningMode,
    /// Positions that fell back to the source text during reconciliation
    #[serde(default)]
    pub missing_ids: Vec<usize>,
}

impl Diagnostics {
    pub fn for_request(request: &TranslationRequest) -> Self {
        Self {
            request_payload: String::new(),
            raw_response: String::new(),
            status: BatchStatus::Error("not attempted".to_string()),
            attempt_count: 0,
            duration_seconds: 0.0,
            context_used: request
                .context_guide
                .clone()
                .unwrap_or_else(|| NO_CONTEXT_MARKER.to_string()),
            reasoning_mode: request.reasoning_enabled.into(),
            missing_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    /// Always the same length as the input batch
    pub translated_texts: Vec<String>,
    pub diagnostics: Diagnostics,
}

/// Seconds rounded to two decimals
pub fn round_seconds(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}
