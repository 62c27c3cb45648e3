//! CLI command handlers

use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::core::client::HttpProvider;
use crate::core::config::TranslatorConfig;
use crate::core::models::FileOutcome;
use crate::orchestrator::FileOrchestrator;

/// Write one status line to `out` with the progress bar cleared.
///
/// The line is written even when the bar is hidden (no terminal attached).
pub fn print_outcome<W: Write>(
    pb: &ProgressBar,
    out: &mut W,
    outcome: &FileOutcome,
) -> std::io::Result<()> {
    pb.suspend(|| writeln!(out, "{}", outcome))
}

/// Handle the translate command: every supported file under `path`, in place
pub async fn handle_translate(
    path: &Path,
    target_lang: &str,
    batch_size: usize,
    config: TranslatorConfig,
) -> anyhow::Result<()> {
    let start_time = Instant::now();

    info!("Starting translation");
    info!("Input: {}", path.display());
    info!("Target language: {}", target_lang);
    info!("Batch size: {}", batch_size);

    let provider = Arc::new(HttpProvider::new(config.clone())?);
    let orchestrator = FileOrchestrator::from_config(provider, &config);

    let files = FileOrchestrator::collect_files(path)?;
    if files.is_empty() {
        info!("No files found under {}", path.display());
    }

    // Create progress bar
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )?
        .progress_chars("=>-"),
    );

    let mut stdout = std::io::stdout();
    let summary = orchestrator
        .run_files(files, target_lang, batch_size, |outcome| {
            if let Err(e) = print_outcome(&pb, &mut stdout, outcome) {
                warn!("Could not write status line: {}", e);
            }
            pb.set_message(format!("Last: {}", outcome.path.display()));
            pb.inc(1);
        })
        .await;

    pb.finish_with_message("Completed");

    let duration = start_time.elapsed();
    info!(
        "Completed: {} translated, {} skipped, {} failed in {:?}",
        summary.translated(),
        summary.skipped(),
        summary.failed(),
        duration
    );

    println!("\n✅ Translation completed!");
    println!("   Processed: {}", summary.translated());
    println!("   Skipped: {}", summary.skipped());
    println!("   Failed: {}", summary.failed());
    println!("   Time: {:?}", duration);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::FileStatus;
    use std::path::PathBuf;

    #[test]
    fn test_status_lines_written_without_terminal() {
        let pb = ProgressBar::hidden();
        let mut out = Vec::new();

        let skipped = FileOutcome {
            path: PathBuf::from("pd/c.md"),
            status: FileStatus::Skipped("Unsupported format: md".to_string()),
        };
        let failed = FileOutcome {
            path: PathBuf::from("pd/b.json"),
            status: FileStatus::Failed("Parse error".to_string()),
        };
        print_outcome(&pb, &mut out, &skipped).unwrap();
        print_outcome(&pb, &mut out, &failed).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("⏩ Skipped: pd/c.md (Unsupported format: md)\n"));
        assert!(text.contains("⚠ Failed to process pd/b.json: Parse error\n"));
    }

    #[tokio::test]
    async fn test_empty_directory_completes() {
        let dir = tempfile::tempdir().unwrap();
        let result = handle_translate(dir.path(), "id", 20, TranslatorConfig::default()).await;
        assert!(result.is_ok());
    }
}
