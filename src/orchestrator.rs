//! Batch runs over a file or directory tree

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::core::backup::{backup, backup_path};
use crate::core::batch::BatchTranslator;
use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{FileOutcome, FileStatus, RunSummary};
use crate::core::provider::TranslationProvider;
use crate::processors::DocumentFormat;

/// Dispatches every candidate file to backup and its format processor.
///
/// A failure while backing up or processing one file is recorded in its
/// outcome and never stops the run.
#[derive(Debug, Clone)]
pub struct FileOrchestrator {
    translator: BatchTranslator,
    office_per_unit: bool,
}

impl FileOrchestrator {
    pub fn new(translator: BatchTranslator) -> Self {
        Self {
            translator,
            office_per_unit: false,
        }
    }

    /// Create from configuration
    pub fn from_config(provider: Arc<dyn TranslationProvider>, config: &TranslatorConfig) -> Self {
        Self::new(BatchTranslator::from_config(provider, config))
            .with_office_per_unit(config.office_per_unit)
    }

    /// Translate office documents one unit per provider call
    pub fn with_office_per_unit(mut self, enabled: bool) -> Self {
        self.office_per_unit = enabled;
        self
    }

    /// Files under `path` in name order; `path` itself when it is a file
    pub fn collect_files(path: &Path) -> Result<Vec<PathBuf>> {
        if !path.exists() {
            return Err(TranslationError::FileError {
                path: path.display().to_string(),
                message: "path does not exist".to_string(),
            });
        }

        if path.is_file() {
            return Ok(vec![path.to_path_buf()]);
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(path).sort_by_file_name() {
            match entry {
                Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable entry under {}: {}", path.display(), e),
            }
        }

        debug!("Found {} files under {}", files.len(), path.display());
        Ok(files)
    }

    /// Translate every supported file at `path` into `target_lang`.
    ///
    /// `on_outcome` is called once per file as soon as it is handled.
    pub async fn run<F>(
        &self,
        path: &Path,
        target_lang: &str,
        batch_size: usize,
        on_outcome: F,
    ) -> Result<RunSummary>
    where
        F: FnMut(&FileOutcome),
    {
        let files = Self::collect_files(path)?;
        Ok(self.run_files(files, target_lang, batch_size, on_outcome).await)
    }

    /// Translate an already collected list of files, in order
    pub async fn run_files<F>(
        &self,
        files: Vec<PathBuf>,
        target_lang: &str,
        batch_size: usize,
        mut on_outcome: F,
    ) -> RunSummary
    where
        F: FnMut(&FileOutcome),
    {
        let translator = self.translator.clone().with_batch_size(batch_size);
        info!(
            "Translating {} files into '{}' (batch size {})",
            files.len(),
            target_lang,
            translator.batch_size()
        );

        let mut summary = RunSummary::default();
        for file in files {
            let status = self.process_one(&file, target_lang, &translator).await;
            let outcome = FileOutcome { path: file, status };
            on_outcome(&outcome);
            summary.outcomes.push(outcome);
        }

        info!(
            "Run finished: {} translated, {} skipped, {} failed",
            summary.translated(),
            summary.skipped(),
            summary.failed()
        );
        summary
    }

    async fn process_one(
        &self,
        path: &Path,
        target_lang: &str,
        translator: &BatchTranslator,
    ) -> FileStatus {
        let Some(format) = DocumentFormat::from_path(path) else {
            let skipped = TranslationError::UnsupportedFormat {
                extension: path
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            };
            info!("{}: {}", skipped, path.display());
            return FileStatus::Skipped(skipped.to_string());
        };

        if let Err(e) = backup(path).await {
            error!("Backup failed for {}: {}", path.display(), e);
            return FileStatus::Failed(e.to_string());
        }

        let result = if format.is_office() && self.office_per_unit {
            format.process(path, target_lang, &translator.per_unit()).await
        } else {
            format.process(path, target_lang, translator).await
        };

        match result {
            Ok(report) => FileStatus::Translated(report),
            Err(e) if e.is_parse_failure() => {
                error!(
                    "Cannot read {} as {}, original kept at {}: {}",
                    path.display(),
                    format,
                    backup_path(path).display(),
                    e
                );
                FileStatus::Failed(e.to_string())
            }
            Err(e) => {
                error!("Failed to process {} as {}: {}", path.display(), format, e);
                FileStatus::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::provider::mock::{RecordingProvider, UppercaseProvider};
    use crate::processors::ooxml::fixtures::package;
    use std::fs;
    use std::time::Duration;

    fn orchestrator(provider: Arc<dyn TranslationProvider>) -> FileOrchestrator {
        FileOrchestrator::new(
            BatchTranslator::new(provider, 20)
                .with_chunk_delay(Duration::ZERO)
                .with_unit_delay(Duration::ZERO),
        )
    }

    fn names(summary: &RunSummary, root: &Path) -> Vec<String> {
        summary
            .outcomes
            .iter()
            .map(|o| {
                o.path
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[tokio::test]
    async fn test_one_bad_file_does_not_stop_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("a.txt"), "Hello").unwrap();
        fs::write(root.join("b.json"), "{ broken").unwrap();
        fs::write(root.join("c.md"), "# Title").unwrap();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("sub/d.txt"), "World").unwrap();

        let summary = orchestrator(Arc::new(UppercaseProvider))
            .run(root, "id", 20, |_| {})
            .await
            .unwrap();

        assert_eq!(names(&summary, root), vec!["a.txt", "b.json", "c.md", "sub/d.txt"]);
        assert!(matches!(summary.outcomes[0].status, FileStatus::Translated(_)));
        assert!(matches!(summary.outcomes[1].status, FileStatus::Failed(_)));
        assert!(
            matches!(&summary.outcomes[2].status, FileStatus::Skipped(reason) if reason == "Unsupported format: md")
        );
        assert!(matches!(summary.outcomes[3].status, FileStatus::Translated(_)));
        assert_eq!((summary.translated(), summary.skipped(), summary.failed()), (2, 1, 1));

        assert_eq!(fs::read_to_string(root.join("a.txt")).unwrap(), "HELLO");
        assert_eq!(fs::read_to_string(root.join("sub/d.txt")).unwrap(), "WORLD");
        assert_eq!(fs::read_to_string(root.join("b.json")).unwrap(), "{ broken");
    }

    #[tokio::test]
    async fn test_backups_only_for_supported_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("a.txt"), "Hello").unwrap();
        fs::write(root.join("b.json"), "{ broken").unwrap();
        fs::write(root.join("c.md"), "# Title").unwrap();

        orchestrator(Arc::new(UppercaseProvider))
            .run(root, "id", 20, |_| {})
            .await
            .unwrap();

        assert_eq!(
            fs::read_to_string(backup_path(&root.join("a.txt"))).unwrap(),
            "Hello"
        );
        assert_eq!(
            fs::read_to_string(backup_path(&root.join("b.json"))).unwrap(),
            "{ broken"
        );
        assert!(!backup_path(&root.join("c.md")).exists());
    }

    #[tokio::test]
    async fn test_single_file_and_callback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.TXT");
        fs::write(&path, "one\ntwo").unwrap();

        let mut seen = Vec::new();
        let summary = orchestrator(Arc::new(UppercaseProvider))
            .run(&path, "id", 1, |outcome| seen.push(outcome.to_string()))
            .await
            .unwrap();

        assert_eq!(summary.outcomes.len(), 1);
        assert_eq!(seen.len(), 1);
        assert!(seen[0].starts_with("✅ Success:"));
        assert!(seen[0].ends_with("(2/2 units translated)"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "ONE\nTWO");
    }

    #[tokio::test]
    async fn test_missing_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = orchestrator(Arc::new(UppercaseProvider))
            .run(&dir.path().join("nope"), "id", 20, |_| {})
            .await;

        assert!(matches!(result, Err(TranslationError::FileError { .. })));
    }

    #[tokio::test]
    async fn test_run_batch_size_controls_chunking() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lines.txt");
        fs::write(&path, "a\nb\nc").unwrap();

        let provider = Arc::new(RecordingProvider::default());
        orchestrator(provider.clone())
            .run(&path, "id", 2, |_| {})
            .await
            .unwrap();

        let sizes: Vec<usize> = provider.calls().iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_office_per_unit_sends_one_text_per_call() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memo.docx");
        let document = concat!(
            r#"<w:document xmlns:w="w"><w:body>"#,
            r#"<w:p><w:r><w:t>First</w:t></w:r></w:p>"#,
            r#"<w:p><w:r><w:t>Second</w:t></w:r></w:p>"#,
            r#"</w:body></w:document>"#
        );
        fs::write(
            &path,
            package(&[("[Content_Types].xml", "<Types/>"), ("word/document.xml", document)]),
        )
        .unwrap();

        let provider = Arc::new(RecordingProvider::default());
        let summary = orchestrator(provider.clone())
            .with_office_per_unit(true)
            .run(&path, "id", 20, |_| {})
            .await
            .unwrap();

        assert_eq!(summary.translated(), 1);
        let sizes: Vec<usize> = provider.calls().iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![1, 1]);
    }

    #[tokio::test]
    async fn test_failed_backup_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("a.txt"), "Hello").unwrap();
        fs::write(root.join("b.txt"), "World").unwrap();
        // a directory where the backup should go makes the copy fail
        fs::create_dir(backup_path(&root.join("a.txt"))).unwrap();

        let summary = orchestrator(Arc::new(UppercaseProvider))
            .run(root, "id", 20, |_| {})
            .await
            .unwrap();

        let a = summary
            .outcomes
            .iter()
            .find(|o| o.path.ends_with("a.txt"))
            .unwrap();
        assert!(matches!(&a.status, FileStatus::Failed(cause) if cause.starts_with("Backup failed")));
        assert_eq!(fs::read(root.join("a.txt")).unwrap(), b"Hello");

        let b = summary
            .outcomes
            .iter()
            .find(|o| o.path.ends_with("b.txt"))
            .unwrap();
        assert!(matches!(b.status, FileStatus::Translated(_)));
        assert_eq!(fs::read_to_string(root.join("b.txt")).unwrap(), "WORLD");
    }

    #[tokio::test]
    async fn test_empty_directory_finishes_with_no_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let summary = orchestrator(Arc::new(UppercaseProvider))
            .run(dir.path(), "id", 20, |_| {})
            .await
            .unwrap();

        assert!(summary.outcomes.is_empty());
    }
}
