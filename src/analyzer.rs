//! Simple document metrics derived from an OCR response.

use serde::{Deserialize, Serialize};

use crate::normalizer::{self, ExtractedText};
use crate::ocr::OcrResponse;

const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    pub total_characters: usize,
    pub total_words: usize,
    pub total_lines: usize,
    /// Coarse heuristic: the raw response mentions "image" anywhere.
    /// Any key or text containing the word counts, so false positives happen.
    pub has_images: bool,
    /// Not exposed reliably by the service; always "unknown".
    pub document_type: String,
    /// Not exposed reliably by the service; always "unknown".
    pub processing_time: String,
}

impl Default for DocumentAnalysis {
    fn default() -> Self {
        Self {
            total_characters: 0,
            total_words: 0,
            total_lines: 0,
            has_images: false,
            document_type: UNKNOWN.to_string(),
            processing_time: UNKNOWN.to_string(),
        }
    }
}

pub fn analyze(response: &OcrResponse) -> DocumentAnalysis {
    let text = normalizer::extract_text(response);
    analyze_with_text(response, &text)
}

/// Same as [`analyze`] when the text was already extracted.
pub fn analyze_with_text(response: &OcrResponse, text: &ExtractedText) -> DocumentAnalysis {
    let mut analysis = DocumentAnalysis::default();

    if let Some(content) = text.content().filter(|c| !c.is_empty()) {
        analysis.total_characters = content.chars().count();
        analysis.total_words = content.split_whitespace().count();
        analysis.total_lines = content.matches('\n').count() + 1;
    }

    analysis.has_images = response
        .as_value()
        .to_string()
        .to_lowercase()
        .contains("image");

    analysis
}
