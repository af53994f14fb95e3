//! OCR response model and the processing abstraction the drivers consume.
//!
//! [`OcrResponse`] keeps the remote payload exactly as it arrived; nothing in
//! this crate assumes a schema for it. [`DocumentProcessor`] is the
//! "process one file" capability injected into the batch, comparison and
//! benchmark drivers.

pub mod mistral;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Raw OCR payload as returned by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OcrResponse(Value);

/// Known response layouts, classified on demand.
#[derive(Debug, Clone, Copy)]
pub enum ResponseShape<'a> {
    /// Object with a `pages` array, plus the object itself for fallbacks.
    PageList {
        pages: &'a [Value],
        fields: &'a Map<String, Value>,
    },
    /// Any other object.
    FlatFields(&'a Map<String, Value>),
    /// Arrays, strings and other scalars.
    Opaque(&'a Value),
}

impl OcrResponse {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn shape(&self) -> ResponseShape<'_> {
        match &self.0 {
            Value::Object(map) => match map.get("pages") {
                Some(Value::Array(pages)) => ResponseShape::PageList { pages, fields: map },
                _ => ResponseShape::FlatFields(map),
            },
            other => ResponseShape::Opaque(other),
        }
    }

    /// Top-level object view, if the payload is an object.
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        self.0.as_object()
    }
}

/// What kind of remote URL is being submitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    #[default]
    Document,
    Image,
}

impl DocumentKind {
    /// Value of the `type` field in the OCR request document.
    pub fn wire_type(self) -> &'static str {
        match self {
            Self::Document => "document_url",
            Self::Image => "image_url",
        }
    }
}

/// Processes a single local file.
///
/// `Ok(None)` signals a recoverable failure (the implementation already
/// logged why); `Err` is an unrecoverable one. Drivers treat both as a
/// per-file failure and move on.
#[async_trait::async_trait]
pub trait DocumentProcessor: Send + Sync {
    fn name(&self) -> &str;
    async fn process(&self, path: &Path) -> anyhow::Result<Option<OcrResponse>>;
}
