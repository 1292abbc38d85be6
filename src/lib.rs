//! Jimaku - chunked subtitle translation
//!
//! Splits subtitle files into size-bounded batches, translates each batch
//! through an LLM generation endpoint using an ID-anchored JSON protocol,
//! and reassembles the result with the original timing.

pub mod cli;
pub mod config;
pub mod workflow;
pub mod subtitle;
pub mod chunker;
pub mod sanitize;
pub mod generation;
pub mod translate;
pub mod error;
