//! Core data models for translation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A batch of texts sent to the provider in one call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub texts: Vec<String>,
    pub source_lang: Option<String>,
    pub target_lang: String,
}

impl BatchRequest {
    pub fn new(texts: Vec<String>, target_lang: impl Into<String>) -> Self {
        Self {
            texts,
            source_lang: None,
            target_lang: target_lang.into(),
        }
    }

    pub fn with_source_lang(mut self, source_lang: impl Into<String>) -> Self {
        self.source_lang = Some(source_lang.into());
        self
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

/// A piece of text and where it lives inside its document.
///
/// Locators are computed fresh on every run and never outlive the document
/// they were extracted from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatableUnit<L> {
    pub locator: L,
    pub text: String,
}

impl<L> TranslatableUnit<L> {
    pub fn new(locator: L, text: impl Into<String>) -> Self {
        Self {
            locator,
            text: text.into(),
        }
    }

    /// Blank units are never sent to the provider and never replaced
    pub fn is_blank(&self) -> bool {
        is_blank(&self.text)
    }
}

/// Empty or whitespace-only
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// What one processor run did to one file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessReport {
    /// Units extracted from the document
    pub units: usize,
    /// Units whose text was actually replaced
    pub replaced: usize,
}

/// Result of handling one candidate file
#[derive(Debug)]
pub enum FileStatus {
    Translated(ProcessReport),
    Skipped(String),
    Failed(String),
}

#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            FileStatus::Translated(report) => write!(
                f,
                "✅ Success: {} ({}/{} units translated)",
                self.path.display(),
                report.replaced,
                report.units
            ),
            FileStatus::Skipped(reason) => {
                write!(f, "⏩ Skipped: {} ({})", self.path.display(), reason)
            }
            FileStatus::Failed(cause) => {
                write!(f, "⚠ Failed to process {}: {}", self.path.display(), cause)
            }
        }
    }
}

/// Outcomes for a whole run, in processing order
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<FileOutcome>,
}

impl RunSummary {
    pub fn translated(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Translated(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&FileStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}
