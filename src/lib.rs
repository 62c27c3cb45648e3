//! Universal Translator - batch, in-place document translation library
//!
//! Walks a file or directory tree, backs every supported document up to
//! `<name>.bak` and replaces its human-readable text with machine
//! translations while keeping the document's structure. Supported formats:
//! XML markup, plain text, JSON/YAML, PDF, DOCX, XLSX and PPTX.

#![forbid(unsafe_code)]

pub mod cli;
pub mod core;
pub mod orchestrator;
pub mod processors;

// Re-export key types for convenience
pub use crate::core::{
    batch::BatchTranslator,
    client::HttpProvider,
    config::TranslatorConfig,
    errors::TranslationError,
    models::{FileOutcome, FileStatus, ProcessReport, RunSummary},
    provider::TranslationProvider,
};

pub use orchestrator::FileOrchestrator;
pub use processors::{DocumentFormat, FormatAdapter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
