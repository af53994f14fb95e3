//! Text extraction from OCR responses of unpredictable shape.
//!
//! Tries, in order: per-page markdown, a fixed list of top-level text fields,
//! then a depth-limited walk of the whole payload. Never fails; when nothing
//! plausible is found the result is [`ExtractedText::NotFound`].

use std::fmt;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::ocr::{OcrResponse, ResponseShape};

pub const NO_TEXT_FOUND: &str = "No text found in the OCR response";

/// Top-level fields probed when the response has no usable pages.
const FALLBACK_FIELDS: [&str; 5] = ["text", "content", "markdown", "extracted_text", "ocr_text"];

/// Keys preferred during the recursive search.
const CONTENT_KEYS: [&str; 3] = ["text", "content", "markdown"];

const MAX_SEARCH_DEPTH: usize = 3;

/// Strings this short are IDs or flags, not content.
const MIN_CONTENT_CHARS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedText {
    Found(String),
    NotFound,
    Failed(String),
}

impl ExtractedText {
    /// The content, if any was found.
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Found(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Unicode scalar count of the content; 0 for the sentinels.
    pub fn char_count(&self) -> usize {
        self.content().map_or(0, |t| t.chars().count())
    }

    /// Whitespace-delimited tokens in the content; 0 for the sentinels.
    pub fn word_count(&self) -> usize {
        self.content().map_or(0, |t| t.split_whitespace().count())
    }
}

impl fmt::Display for ExtractedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found(text) => f.write_str(text),
            Self::NotFound => f.write_str(NO_TEXT_FOUND),
            Self::Failed(msg) => write!(f, "Error extracting text: {}", msg),
        }
    }
}

/// Best-effort text of an OCR response.
pub fn extract_text(response: &OcrResponse) -> ExtractedText {
    let found = match response.shape() {
        ResponseShape::PageList { pages, fields } => join_page_markdown(pages).or_else(|| {
            debug!("Response has {} pages but no markdown, trying fallbacks", pages.len());
            text_from_fields(fields)
        }),
        ResponseShape::FlatFields(fields) => text_from_fields(fields),
        ResponseShape::Opaque(value) => find_text_recursive(value, 0).map(str::to_string),
    };

    match found {
        Some(text) => ExtractedText::Found(text),
        None => {
            warn!("No text found in OCR response");
            ExtractedText::NotFound
        }
    }
}

fn text_from_fields(fields: &Map<String, Value>) -> Option<String> {
    probe_fallback_fields(fields)
        .or_else(|| search_object(fields, 0))
        .map(str::to_string)
}

/// Parse a saved response and extract its text.
pub fn extract_text_from_json(raw: &str) -> ExtractedText {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => extract_text(&OcrResponse::new(value)),
        Err(e) => {
            warn!("Saved OCR response is not valid JSON: {}", e);
            ExtractedText::Failed(e.to_string())
        }
    }
}

fn join_page_markdown(pages: &[Value]) -> Option<String> {
    let mut text = String::new();
    for page in pages {
        if let Some(markdown) = page.get("markdown").and_then(Value::as_str) {
            if !markdown.is_empty() {
                text.push_str(markdown);
                text.push_str("\n\n");
            }
        }
    }
    let trimmed = text.trim_end();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn probe_fallback_fields(fields: &Map<String, Value>) -> Option<&str> {
    FALLBACK_FIELDS.iter().find_map(|key| match fields.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.as_str()),
        Value::Object(nested) => nested.get("text").and_then(Value::as_str),
        _ => None,
    })
}

fn find_text_recursive(value: &Value, depth: usize) -> Option<&str> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }
    match value {
        Value::String(s) if is_content(s) => Some(s.as_str()),
        Value::Object(map) => search_object(map, depth),
        Value::Array(items) => items
            .iter()
            .find_map(|item| find_text_recursive(item, depth + 1)),
        _ => None,
    }
}

fn search_object(map: &Map<String, Value>, depth: usize) -> Option<&str> {
    map.iter().find_map(|(key, child)| match child {
        Value::String(s) if CONTENT_KEYS.contains(&key.as_str()) && is_content(s) => {
            Some(s.as_str())
        }
        _ => find_text_recursive(child, depth + 1),
    })
}

fn is_content(s: &str) -> bool {
    s.chars().count() > MIN_CONTENT_CHARS
}

/// One line per top-level key: name, JSON type and a short preview.
pub fn describe_response(response: &OcrResponse) -> Vec<String> {
    let Some(fields) = response.fields() else {
        return vec![format!(
            "{}: {}",
            type_name(response.as_value()),
            preview(response.as_value(), 100)
        )];
    };

    fields
        .iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("{} (string): {}", key, truncate(s, 200)),
            Value::Object(map) => format!(
                "{} (object): keys [{}]",
                key,
                map.keys().cloned().collect::<Vec<_>>().join(", ")
            ),
            Value::Array(items) => format!("{} (array, {} items)", key, items.len()),
            other => format!("{} ({}): {}", key, type_name(other), preview(other, 100)),
        })
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn preview(value: &Value, max_chars: usize) -> String {
    truncate(&value.to_string(), max_chars)
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    } else {
        s.to_string()
    }
}
