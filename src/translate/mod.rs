// Chunk translation protocol
//
// - common: request, options and diagnostics types
// - prompt: translation and context-analysis prompt builders
// - reconcile: response parsing and ID-anchored realignment
// - protocol: BatchTranslator, the fail-soft translate-one-batch call
// - context: ContextAnalyzer, the document-level style/glossary guide

pub mod common;
pub mod prompt;
pub mod reconcile;
pub mod protocol;
pub mod context;

pub use common::*;
pub use context::ContextAnalyzer;
pub use protocol::BatchTranslator;
pub use reconcile::{reconcile, reconcile_response, Reconciled};
