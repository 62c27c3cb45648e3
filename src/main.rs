//! Main entry point for the Universal Translator CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use universal_translator::cli;
use universal_translator::{TranslatorConfig, NAME, VERSION};

/// Universal Translator - translate documents in place, keeping a .bak copy
#[derive(Parser, Debug)]
#[command(name = "universal-translator", version, about, long_about = None)]
struct Args {
    /// File or directory to translate (directories are walked recursively)
    #[arg(long)]
    path: PathBuf,

    /// Target language code [default: id, or TARGET_LANG]
    #[arg(long)]
    lang: Option<String>,

    /// Texts per provider request [default: 20, or BATCH_SIZE]
    #[arg(long)]
    batch: Option<usize>,

    /// JSON configuration file (overrides environment variables)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("universal_translator={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("{} v{}", NAME, VERSION);

    let mut config = match &args.config {
        Some(path) => TranslatorConfig::from_file(path)?,
        None => TranslatorConfig::from_env()?,
    };

    // Override config with CLI args if provided
    if let Some(lang) = args.lang {
        config.target_lang = lang;
    }
    if let Some(batch) = args.batch {
        config.batch_size = batch;
    }
    config.validate()?;

    let target_lang = config.target_lang.clone();
    let batch_size = config.batch_size;
    cli::handle_translate(&args.path, &target_lang, batch_size, config).await?;

    Ok(())
}
