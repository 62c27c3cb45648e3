//! HTTP translation client with retry logic

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::BatchRequest;
use crate::core::provider::TranslationProvider;

/// Client for a Google-Translate-style `translate_a/single` endpoint
#[derive(Debug, Clone)]
pub struct HttpProvider {
    client: reqwest::Client,
    config: Arc<TranslatorConfig>,
}

impl HttpProvider {
    /// Create a new HTTP provider
    pub fn new(config: TranslatorConfig) -> Result<Self> {
        config.validate().map_err(|e| TranslationError::ConfigError {
            message: e.to_string(),
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    /// Translate one text, retrying with exponential backoff
    async fn translate_text(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                debug!("Retry attempt {} for text of {} bytes", attempt, text.len());
                sleep(backoff_delay(self.config.retry_delay_ms, attempt)).await;
            }

            match self.send_request(text, source_lang, target_lang).await {
                Ok(translation) => {
                    if attempt > 0 {
                        info!("Successfully translated after {} retries", attempt);
                    }
                    return Ok(translation);
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or(TranslationError::TimeoutError))
    }

    /// Send actual HTTP request
    async fn send_request(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", source_lang),
                ("tl", target_lang),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TranslationError::TimeoutError
                } else {
                    TranslationError::NetworkError {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();

        if status.is_success() {
            let json: serde_json::Value = response
                .json()
                .await
                .map_err(|e| TranslationError::InvalidResponseError {
                    message: e.to_string(),
                })?;

            parse_response(&json)
        } else {
            let status_code = status.as_u16();

            if status_code == 429 {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok());
                return Err(TranslationError::RateLimitError { retry_after });
            }

            let error_text = response.text().await.unwrap_or_default();
            Err(TranslationError::ApiError {
                status: status_code,
                message: error_text,
            })
        }
    }
}

/// Delay before retry `attempt` (1-based): base, 2x base, 4x base, ...
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 2_u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(base_ms.saturating_mul(factor))
}

/// Join the translated segments of a `translate_a/single` response.
///
/// The payload looks like `[[["Halo","Hello",null,null,10], ...], null, "en"]`.
fn parse_response(json: &serde_json::Value) -> Result<String> {
    let segments = json
        .get(0)
        .and_then(|s| s.as_array())
        .ok_or_else(|| TranslationError::InvalidResponseError {
            message: "No translation in response".to_string(),
        })?;

    let translation: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(|t| t.as_str()))
        .collect();

    Ok(translation)
}

#[async_trait]
impl TranslationProvider for HttpProvider {
    async fn translate(&self, request: &BatchRequest) -> Result<Vec<String>> {
        let source_lang = request
            .source_lang
            .as_deref()
            .unwrap_or(self.config.source_lang.as_str());

        let mut results = Vec::with_capacity(request.len());
        for text in &request.texts {
            results.push(
                self.translate_text(text, source_lang, &request.target_lang)
                    .await?,
            );
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_creation() {
        let provider = HttpProvider::new(TranslatorConfig::default());
        assert!(provider.is_ok());
    }

    #[test]
    fn test_provider_rejects_invalid_config() {
        let config = TranslatorConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            HttpProvider::new(config),
            Err(TranslationError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_parse_response_joins_segments() {
        let payload = json!([
            [["Halo. ", "Hello. ", null, null, 10], ["Apa kabar?", "How are you?", null, null, 10]],
            null,
            "en"
        ]);
        assert_eq!(parse_response(&payload).unwrap(), "Halo. Apa kabar?");
    }

    #[test]
    fn test_parse_response_rejects_unexpected_shape() {
        let payload = json!({"error": "bad request"});
        assert!(matches!(
            parse_response(&payload),
            Err(TranslationError::InvalidResponseError { .. })
        ));
    }

    #[test]
    fn test_backoff_doubles_and_saturates() {
        assert_eq!(backoff_delay(1000, 1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(1000, 2), Duration::from_millis(2000));
        assert_eq!(backoff_delay(1000, 4), Duration::from_millis(8000));
        assert_eq!(backoff_delay(1000, 200), Duration::from_millis(u64::MAX));
    }
}
