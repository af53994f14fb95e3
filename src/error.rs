//! Errors raised by the Mistral OCR client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("MISTRAL_API_KEY not set")]
    MissingApiKey,

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mistral {endpoint} API error ({status}): {body}")]
    Api {
        endpoint: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
