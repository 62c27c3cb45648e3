//! Chunked, rate-limited translation of ordered text sequences

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::core::config::TranslatorConfig;
use crate::core::models::{is_blank, BatchRequest};
use crate::core::provider::TranslationProvider;

/// Splits texts into chunks, calls the provider once per chunk and sleeps
/// after every chunk.
///
/// The output always has the same length and order as the input. Blank
/// inputs are never sent; a chunk whose provider call fails (or returns the
/// wrong number of texts) comes back unchanged.
#[derive(Debug, Clone)]
pub struct BatchTranslator {
    provider: Arc<dyn TranslationProvider>,
    source_lang: Option<String>,
    batch_size: usize,
    chunk_delay: Duration,
    unit_delay: Duration,
}

impl BatchTranslator {
    /// Create a translator with the default pacing (1s between chunks)
    pub fn new(provider: Arc<dyn TranslationProvider>, batch_size: usize) -> Self {
        Self {
            provider,
            source_lang: None,
            batch_size: batch_size.max(1),
            chunk_delay: Duration::from_secs(1),
            unit_delay: Duration::from_millis(500),
        }
    }

    /// Create from configuration
    pub fn from_config(provider: Arc<dyn TranslationProvider>, config: &TranslatorConfig) -> Self {
        let mut translator = Self::new(provider, config.batch_size)
            .with_chunk_delay(config.chunk_delay())
            .with_unit_delay(config.unit_delay());
        if config.source_lang != "auto" {
            translator = translator.with_source_lang(config.source_lang.clone());
        }
        translator
    }

    pub fn with_source_lang(mut self, source_lang: impl Into<String>) -> Self {
        self.source_lang = Some(source_lang.into());
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    pub fn with_unit_delay(mut self, delay: Duration) -> Self {
        self.unit_delay = delay;
        self
    }

    /// One text per provider call, paced by the unit delay
    pub fn per_unit(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            source_lang: self.source_lang.clone(),
            batch_size: 1,
            chunk_delay: self.unit_delay,
            unit_delay: self.unit_delay,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Translate `texts` into `target_lang`
    pub async fn translate(&self, texts: &[String], target_lang: &str) -> Vec<String> {
        let mut results = texts.to_vec();

        let pending: Vec<usize> = texts
            .iter()
            .enumerate()
            .filter(|(_, text)| !is_blank(text))
            .map(|(idx, _)| idx)
            .collect();

        if pending.is_empty() {
            return results;
        }

        let total_chunks = pending.len().div_ceil(self.batch_size);

        for (chunk_idx, chunk) in pending.chunks(self.batch_size).enumerate() {
            let chunk_texts: Vec<String> = chunk.iter().map(|&idx| texts[idx].clone()).collect();
            let mut request = BatchRequest::new(chunk_texts, target_lang);
            if let Some(source_lang) = &self.source_lang {
                request = request.with_source_lang(source_lang.clone());
            }

            debug!(
                "Translating chunk {}/{} ({} texts)",
                chunk_idx + 1,
                total_chunks,
                request.len()
            );

            match self.provider.translate(&request).await {
                Ok(translated) if translated.len() == chunk.len() => {
                    for (&idx, text) in chunk.iter().zip(translated) {
                        results[idx] = text;
                    }
                }
                Ok(translated) => {
                    warn!(
                        "Chunk {}/{} returned {} translations for {} texts, keeping original text",
                        chunk_idx + 1,
                        total_chunks,
                        translated.len(),
                        chunk.len()
                    );
                }
                Err(e) => {
                    warn!(
                        "Chunk {}/{} failed, keeping original text: {}",
                        chunk_idx + 1,
                        total_chunks,
                        e
                    );
                }
            }

            if !self.chunk_delay.is_zero() {
                sleep(self.chunk_delay).await;
            }
        }

        results
    }
}
