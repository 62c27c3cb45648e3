//! Format processors: locate translatable text in a file and write the
//! translations back in place.
//!
//! Every processor implements [`FormatAdapter`]; [`process_file`] drives the
//! shared read → extract → translate → reinsert → write pipeline so that a
//! file is written at most once, after all of its units are handled. A file
//! with nothing to replace is not rewritten.

use std::fmt::{self, Debug};
use std::path::Path;
use tracing::{debug, info};

use crate::core::batch::BatchTranslator;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{is_blank, ProcessReport, TranslatableUnit};

pub mod markup;
pub mod ooxml;
pub mod page;
pub mod plain_text;
pub mod presentation;
pub mod spreadsheet;
pub mod structured;
pub mod word;

pub use markup::MarkupProcessor;
pub use page::PageProcessor;
pub use plain_text::PlainTextProcessor;
pub use presentation::PresentationProcessor;
pub use spreadsheet::SpreadsheetProcessor;
pub use structured::StructuredProcessor;
pub use word::WordProcessor;

/// Extraction and reinsertion for one document format
pub trait FormatAdapter {
    /// In-memory form of one opened file
    type Document;
    /// Where a unit sits inside the document
    type Locator: Clone + Debug;

    /// Open the raw file contents
    fn parse(&self, path: &Path, bytes: Vec<u8>) -> Result<Self::Document>;

    /// Units in document order
    fn extract(&self, doc: &Self::Document) -> Vec<TranslatableUnit<Self::Locator>>;

    /// Apply replacements; each carries the locator it was extracted with
    fn reinsert(
        &self,
        doc: &mut Self::Document,
        replacements: Vec<(Self::Locator, String)>,
    ) -> Result<()>;

    /// Bytes to write back to the original path
    fn serialize(&self, doc: Self::Document) -> Result<Vec<u8>>;
}

/// Run one file through `adapter` and overwrite it with the result
pub async fn process_file<A: FormatAdapter>(
    adapter: &A,
    path: &Path,
    target_lang: &str,
    translator: &BatchTranslator,
) -> Result<ProcessReport> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| TranslationError::FileError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    let mut doc = adapter.parse(path, bytes)?;
    let units = adapter.extract(&doc);
    debug!("Extracted {} units from {}", units.len(), path.display());

    let texts: Vec<String> = units.iter().map(|u| u.text.clone()).collect();
    let translated = translator.translate(&texts, target_lang).await;

    let replacements: Vec<(A::Locator, String)> = units
        .into_iter()
        .zip(translated)
        .filter(|(unit, translation)| {
            !unit.is_blank() && !is_blank(translation) && *translation != unit.text
        })
        .map(|(unit, translation)| (unit.locator, translation))
        .collect();

    let report = ProcessReport {
        units: texts.len(),
        replaced: replacements.len(),
    };

    if replacements.is_empty() {
        info!("Nothing to replace in {}, leaving it untouched", path.display());
        return Ok(report);
    }

    adapter.reinsert(&mut doc, replacements)?;
    let output = adapter.serialize(doc)?;

    tokio::fs::write(path, output)
        .await
        .map_err(|e| TranslationError::FileError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    info!(
        "Translated: {} ({}/{} units)",
        path.display(),
        report.replaced,
        report.units
    );
    Ok(report)
}

/// Supported document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Markup,
    PlainText,
    StructuredData,
    PageDocument,
    WordDocument,
    Spreadsheet,
    Presentation,
}

impl DocumentFormat {
    /// Resolve a path's extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        Self::from_extension(&ext)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "xml" => Some(Self::Markup),
            "txt" => Some(Self::PlainText),
            "json" | "yaml" | "yml" => Some(Self::StructuredData),
            "pdf" => Some(Self::PageDocument),
            "docx" => Some(Self::WordDocument),
            "xlsx" => Some(Self::Spreadsheet),
            "pptx" => Some(Self::Presentation),
            _ => None,
        }
    }

    /// Zip-packaged office formats
    pub fn is_office(&self) -> bool {
        matches!(
            self,
            Self::WordDocument | Self::Spreadsheet | Self::Presentation
        )
    }

    /// Translate `path` with the processor for this format
    pub async fn process(
        &self,
        path: &Path,
        target_lang: &str,
        translator: &BatchTranslator,
    ) -> Result<ProcessReport> {
        match self {
            Self::Markup => process_file(&MarkupProcessor::new()?, path, target_lang, translator).await,
            Self::PlainText => process_file(&PlainTextProcessor, path, target_lang, translator).await,
            Self::StructuredData => {
                process_file(&StructuredProcessor, path, target_lang, translator).await
            }
            Self::PageDocument => process_file(&PageProcessor, path, target_lang, translator).await,
            Self::WordDocument => process_file(&WordProcessor, path, target_lang, translator).await,
            Self::Spreadsheet => {
                process_file(&SpreadsheetProcessor, path, target_lang, translator).await
            }
            Self::Presentation => {
                process_file(&PresentationProcessor, path, target_lang, translator).await
            }
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Markup => "markup",
            Self::PlainText => "plain text",
            Self::StructuredData => "structured data",
            Self::PageDocument => "page document",
            Self::WordDocument => "word document",
            Self::Spreadsheet => "spreadsheet",
            Self::Presentation => "presentation",
        };
        f.write_str(name)
    }
}
