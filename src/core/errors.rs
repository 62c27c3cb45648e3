//! Custom error types for translation operations

use thiserror::Error;

/// Translation-related errors
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Backup copy could not be created; the file must not be touched
    #[error("Backup failed: {path} - {message}")]
    BackupError {
        path: String,
        message: String,
    },

    /// Document could not be opened in its expected format
    #[error("Parse error: {path} - {message}")]
    ParseError {
        path: String,
        message: String,
    },

    /// Extension not handled by any processor
    #[error("Unsupported format: {extension}")]
    UnsupportedFormat {
        extension: String,
    },

    /// API request failed
    #[error("API error: {status} - {message}")]
    ApiError {
        status: u16,
        message: String,
    },

    /// Rate limit exceeded
    #[error("Rate limit exceeded. Retry after {retry_after:?} seconds")]
    RateLimitError {
        retry_after: Option<u64>,
    },

    /// Network error
    #[error("Network error: {message}")]
    NetworkError {
        message: String,
    },

    /// Invalid response from API
    #[error("Invalid response: {message}")]
    InvalidResponseError {
        message: String,
    },

    /// Request timeout
    #[error("Request timeout")]
    TimeoutError,

    /// File operation error
    #[error("File error: {path} - {message}")]
    FileError {
        path: String,
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Zip container error
    #[error("Zip error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    /// XML error
    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    /// Invalid pattern
    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),

    /// PDF error
    #[error("PDF error: {0}")]
    PdfError(#[from] lopdf::Error),
}

impl TranslationError {
    /// Wrap any displayable error as a parse failure for `path`
    pub fn parse(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        TranslationError::ParseError {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// Whether this error means the document itself could not be read
    pub fn is_parse_failure(&self) -> bool {
        matches!(
            self,
            TranslationError::ParseError { .. }
                | TranslationError::JsonError(_)
                | TranslationError::YamlError(_)
                | TranslationError::ZipError(_)
                | TranslationError::XmlError(_)
                | TranslationError::PdfError(_)
        )
    }
}

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_parse_helper_keeps_path() {
        let err = TranslationError::parse(Path::new("a/b.json"), "unexpected EOF");
        assert!(err.is_parse_failure());
        assert_eq!(err.to_string(), "Parse error: a/b.json - unexpected EOF");
    }

    #[test]
    fn test_backup_error_is_not_parse_failure() {
        let err = TranslationError::BackupError {
            path: "x.txt".to_string(),
            message: "permission denied".to_string(),
        };
        assert!(!err.is_parse_failure());
    }
}
