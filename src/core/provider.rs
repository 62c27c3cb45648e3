//! Translation provider abstraction

use async_trait::async_trait;
use std::fmt::Debug;

use crate::core::errors::Result;
use crate::core::models::BatchRequest;

/// A remote translation service.
///
/// Implementations receive a non-empty ordered list of texts and must return
/// translations of the same length and order, or an error. Callers treat any
/// error as transient and fall back to the original text.
#[async_trait]
pub trait TranslationProvider: Send + Sync + Debug {
    /// Translate every text in the request
    async fn translate(&self, request: &BatchRequest) -> Result<Vec<String>>;
}
