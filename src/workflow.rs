use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::chunker::{chunk, Batch};
use crate::config::Config;
use crate::error::{JimakuError, Result};
use crate::generation::{Generator, GeneratorFactory};
use crate::subtitle::{parse_with_report, rebuild, TimedRecord};
use crate::translate::{BatchTranslator, ContextAnalyzer, Diagnostics, TranslationOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkStatus {
    Waiting,
    Running,
    Success,
    Error,
}

/// Observable progress of one batch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChunkState {
    pub status: ChunkStatus,
    pub duration_seconds: f64,
}

impl Default for ChunkState {
    fn default() -> Self {
        Self { status: ChunkStatus::Waiting, duration_seconds: 0.0 }
    }
}

/// Progress event emitted when a batch starts and when it finishes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchProgress {
    pub index: usize,
    pub total: usize,
    pub state: ChunkState,
}

/// Shared flag checked between batches
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Cancel on the first interrupt signal. Returns true once a second
    /// signal arrives, meaning the caller should exit without waiting.
    pub async fn watch_interrupts<F, Fut>(&self, mut next_signal: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::io::Result<()>>,
    {
        if next_signal().await.is_err() {
            return false;
        }
        warn!("Interrupt received, stopping after the current batch (press Ctrl-C again to quit)");
        self.cancel();

        next_signal().await.is_ok()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub index: usize,
    pub records: usize,
    pub state: ChunkState,
    pub diagnostics: Option<Diagnostics>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub source_language: String,
    pub target_language: String,
    pub total_records: usize,
    pub batches: Vec<BatchReport>,
}

/// State of one document translation: records, batches, and per-batch
/// results, diagnostics and states, all indexed by batch position.
pub struct TranslationJob {
    id: Uuid,
    records: Vec<TimedRecord>,
    batches: Vec<Batch>,
    results: Vec<Option<Vec<String>>>,
    diagnostics: Vec<Option<Diagnostics>>,
    chunk_states: Vec<ChunkState>,
    options: TranslationOptions,
    batch_delay: Duration,
    cancel: CancelHandle,
}

impl TranslationJob {
    /// Parse and chunk `content`. A document with no recognizable block fails here.
    pub fn new(content: &str, chunk_size: usize, options: TranslationOptions) -> Result<Self> {
        let report = parse_with_report(content);
        if report.records.is_empty() {
            return Err(JimakuError::Parse("no subtitle blocks found".to_string()));
        }
        if report.skipped_lines > 0 {
            warn!(
                "Parsed {} records, skipped {} lines outside recognizable blocks",
                report.records.len(),
                report.skipped_lines
            );
        } else {
            info!("Parsed {} records", report.records.len());
        }

        let batches = chunk(&report.records, chunk_size);
        let total = batches.len();
        info!("Split into {} batches (chunk size {})", total, chunk_size);

        Ok(Self {
            id: Uuid::new_v4(),
            records: report.records,
            batches,
            results: vec![None; total],
            diagnostics: vec![None; total],
            chunk_states: vec![ChunkState::default(); total],
            options,
            batch_delay: Duration::ZERO,
            cancel: CancelHandle::default(),
        })
    }

    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn records(&self) -> &[TimedRecord] {
        &self.records
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn chunk_states(&self) -> &[ChunkState] {
        &self.chunk_states
    }

    pub fn diagnostics(&self) -> &[Option<Diagnostics>] {
        &self.diagnostics
    }

    pub fn options(&self) -> &TranslationOptions {
        &self.options
    }

    pub fn set_context_guide(&mut self, guide: impl Into<String>) {
        self.options.context_guide = guide.into();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Translate every batch in order. Cancellation is checked before each
    /// batch; the batch in flight always completes.
    pub async fn start<F>(&mut self, translator: &BatchTranslator, mut on_progress: F) -> JobSummary
    where
        F: FnMut(BatchProgress),
    {
        let total = self.batches.len();
        let mut summary = JobSummary::default();

        for i in 0..total {
            if self.cancel.is_cancelled() {
                warn!("Stopped at batch {}/{}", i + 1, total);
                summary.cancelled = true;
                break;
            }
            if i > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }

            info!("┌─ Translating batch {}/{} ({} lines) ────────", i + 1, total, self.batches[i].len());
            self.chunk_states[i].status = ChunkStatus::Running;
            on_progress(BatchProgress { index: i, total, state: self.chunk_states[i] });

            let ok = self.run_batch(i, translator).await;
            if ok { summary.succeeded += 1 } else { summary.failed += 1 }
            on_progress(BatchProgress { index: i, total, state: self.chunk_states[i] });
        }

        summary
    }

    /// Re-translate a single batch, replacing its previous result and diagnostics
    pub async fn retry_batch(&mut self, index: usize, translator: &BatchTranslator) -> Result<bool> {
        if index >= self.batches.len() {
            return Err(JimakuError::InvalidBatch(index));
        }

        info!("┌─ Retrying batch {}/{} ────────", index + 1, self.batches.len());
        self.chunk_states[index].status = ChunkStatus::Running;
        Ok(self.run_batch(index, translator).await)
    }

    /// Retry every batch whose last run ended in error; returns how many now succeed
    pub async fn retry_failed(&mut self, translator: &BatchTranslator) -> usize {
        let failed: Vec<usize> = self
            .chunk_states
            .iter()
            .enumerate()
            .filter(|(_, s)| s.status == ChunkStatus::Error)
            .map(|(i, _)| i)
            .collect();

        let mut recovered = 0;
        for index in failed {
            if self.cancel.is_cancelled() {
                break;
            }
            if matches!(self.retry_batch(index, translator).await, Ok(true)) {
                recovered += 1;
            }
        }
        recovered
    }

    async fn run_batch(&mut self, index: usize, translator: &BatchTranslator) -> bool {
        let texts = self.batches[index].texts();
        let result = translator.translate_batch(&texts, &self.options).await;
        let diagnostics = result.diagnostics;
        let ok = diagnostics.status.is_success();

        if ok {
            info!("└─ Batch {} done in {}s", index + 1, diagnostics.duration_seconds);
        } else {
            warn!("└─ Batch {} failed: {}", index + 1, diagnostics.status);
        }

        self.chunk_states[index] = ChunkState {
            status: if ok { ChunkStatus::Success } else { ChunkStatus::Error },
            duration_seconds: diagnostics.duration_seconds,
        };
        self.results[index] = Some(result.translated_texts);
        self.diagnostics[index] = Some(diagnostics);
        ok
    }

    /// Rebuild the document. Batches that never ran keep their source text.
    pub fn final_text(&self) -> String {
        let texts: Vec<Vec<String>> = self
            .batches
            .iter()
            .zip(self.results.iter())
            .map(|(batch, result)| result.clone().unwrap_or_else(|| batch.texts()))
            .collect();
        rebuild(&self.records, &texts)
    }

    pub fn report(&self) -> JobReport {
        JobReport {
            job_id: self.id,
            generated_at: Utc::now(),
            source_language: self.options.source_lang.clone(),
            target_language: self.options.target_lang.clone(),
            total_records: self.records.len(),
            batches: self
                .batches
                .iter()
                .enumerate()
                .map(|(index, batch)| BatchReport {
                    index,
                    records: batch.len(),
                    state: self.chunk_states[index],
                    diagnostics: self.diagnostics[index].clone(),
                })
                .collect(),
        }
    }
}

/// Per-file translation settings coming from the command line
#[derive(Debug, Clone, Default)]
pub struct TranslateFileOptions {
    pub context_guide: Option<String>,
    pub analyze_context: bool,
    pub report_path: Option<PathBuf>,
    pub retry_failed: bool,
}

pub struct Workflow {
    config: Config,
    generator: Arc<dyn Generator>,
    cancel: CancelHandle,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let generator = GeneratorFactory::create_generator(config.generation.clone())?;
        info!("Using generation model: {}", generator.model_name());
        Ok(Self::with_generator(config, Arc::from(generator)))
    }

    pub fn with_generator(config: Config, generator: Arc<dyn Generator>) -> Self {
        Self { config, generator, cancel: CancelHandle::default() }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    fn translation_options(&self) -> TranslationOptions {
        TranslationOptions::new(
            self.config.translate.source_language.clone(),
            self.config.translate.target_language.clone(),
        )
        .with_reasoning(self.config.translate.reasoning)
    }

    fn target_tag(&self) -> String {
        self.config.translate.target_language.to_lowercase().replace(' ', "_")
    }

    /// Default output path: `<stem>.<target>.srt` next to the input
    pub fn default_output_path(&self, input: &Path) -> PathBuf {
        let stem = input.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        input.with_file_name(format!("{}.{}.srt", stem, self.target_tag()))
    }

    /// True for files this workflow wrote itself (`*.<target>.srt`)
    fn is_translated_output(&self, path: &Path) -> bool {
        let suffix = format!(".{}.srt", self.target_tag());
        path.file_name()
            .map(|name| name.to_string_lossy().to_lowercase().ends_with(&suffix))
            .unwrap_or(false)
    }

    /// Build the context guide for a subtitle file
    pub async fn analyze_file(&self, input: &Path) -> Result<String> {
        let content = read_subtitle_file(input).await?;
        ContextAnalyzer::new(self.generator.clone())
            .analyze_context(
                &content,
                &self.config.translate.source_language,
                &self.config.translate.target_language,
            )
            .await
    }

    /// Translate one subtitle file and write the result
    pub async fn translate_file<F>(
        &self,
        input: &Path,
        output: Option<&Path>,
        options: &TranslateFileOptions,
        on_progress: F,
    ) -> Result<(PathBuf, JobSummary)>
    where
        F: FnMut(BatchProgress),
    {
        info!("Translating subtitles: {}", input.display());
        let content = read_subtitle_file(input).await?;

        let mut job = TranslationJob::new(&content, self.config.translate.chunk_size, self.translation_options())?
            .with_batch_delay(Duration::from_millis(self.config.translate.batch_delay_ms));
        job.cancel = self.cancel.clone();

        let guide = match (&options.context_guide, options.analyze_context) {
            (Some(guide), _) => guide.clone(),
            (None, true) => {
                ContextAnalyzer::new(self.generator.clone())
                    .analyze_context(
                        &content,
                        &self.config.translate.source_language,
                        &self.config.translate.target_language,
                    )
                    .await?
            }
            (None, false) => String::new(),
        };
        job.set_context_guide(guide);

        let translator = BatchTranslator::new(self.generator.clone(), &self.config.translate);
        let mut summary = job.start(&translator, on_progress).await;

        if options.retry_failed && summary.failed > 0 && !summary.cancelled {
            info!("Retrying {} failed batches", summary.failed);
            let recovered = job.retry_failed(&translator).await;
            summary.succeeded += recovered;
            summary.failed -= recovered;
        }

        let output = output.map(Path::to_path_buf).unwrap_or_else(|| self.default_output_path(input));
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&output, job.final_text()).await?;
        info!("Wrote {}", output.display());

        if let Some(report_path) = &options.report_path {
            if let Some(parent) = report_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).await?;
            }
            let report = serde_json::to_string_pretty(&job.report())?;
            fs::write(report_path, report).await?;
            info!("Wrote job report {}", report_path.display());
        }

        Ok((output, summary))
    }

    /// Translate every `.srt` file under `input_dir`. Failing files are logged and skipped.
    ///
    /// Outputs and reports mirror the input tree below `output_dir` and
    /// `report_path`. Previous outputs and anything inside `output_dir` are
    /// not picked up as inputs.
    pub async fn translate_directory(
        &self,
        input_dir: &Path,
        output_dir: Option<&Path>,
        options: &TranslateFileOptions,
    ) -> Result<Vec<PathBuf>> {
        if !input_dir.is_dir() {
            return Err(JimakuError::Config("Input path is not a directory".to_string()));
        }

        let root = input_dir.canonicalize()?;
        let excluded = output_dir.and_then(|dir| dir.canonicalize().ok());

        let mut subtitle_files: Vec<PathBuf> = WalkDir::new(&root)
            .into_iter()
            .filter_entry(|e| excluded.as_deref() != Some(e.path()))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("srt")))
            .filter(|p| !self.is_translated_output(p))
            .collect();
        subtitle_files.sort();

        info!("Found {} subtitle files to translate", subtitle_files.len());

        let mut written = Vec::new();
        for input in subtitle_files {
            if self.cancel.is_cancelled() {
                warn!("Cancelled before {}", input.display());
                break;
            }

            let relative = input.strip_prefix(&root).unwrap_or(input.as_path()).to_path_buf();
            let output = output_dir.map(|dir| {
                let default = self.default_output_path(&relative);
                dir.join(default)
            });
            let mut file_options = options.clone();
            file_options.report_path = options.report_path.as_ref().map(|dir| {
                let stem = relative.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
                dir.join(relative.with_file_name(format!("{}.report.json", stem)))
            });

            match self.translate_file(&input, output.as_deref(), &file_options, |_| {}).await {
                Ok((path, summary)) => {
                    info!(
                        "Translated {} ({} ok, {} failed)",
                        input.display(),
                        summary.succeeded,
                        summary.failed
                    );
                    written.push(path);
                }
                Err(e) => warn!("Failed to translate {}: {}", input.display(), e),
            }
        }

        Ok(written)
    }
}

/// Read a subtitle file as UTF-8, replacing invalid sequences
pub async fn read_subtitle_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(JimakuError::FileNotFound(path.display().to_string()));
    }
    let bytes = fs::read(path).await?;
    let (content, replaced) = decode_lossy(bytes);
    if replaced {
        warn!(
            "{} is not valid UTF-8; undecodable bytes were replaced with U+FFFD. Re-save it as UTF-8 for a clean translation.",
            path.display()
        );
    }
    Ok(content)
}

/// Decode UTF-8, reporting whether any bytes had to be replaced
fn decode_lossy(bytes: Vec<u8>) -> (String, bool) {
    match String::from_utf8(bytes) {
        Ok(content) => (content, false),
        Err(e) => (String::from_utf8_lossy(e.as_bytes()).into_owned(), true),
    }
}
