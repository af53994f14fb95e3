//! Mistral OCR client (uses Mistral's OCR and Files APIs).

use super::{DocumentKind, DocumentProcessor, OcrResponse};
use crate::config::Settings;
use crate::error::OcrError;
use crate::files;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct MistralOcrClient {
    api_key: String,
    api_url: String,
    model: String,
    include_image_base64: bool,
    client: reqwest::Client,
}

impl MistralOcrClient {
    pub fn new(settings: &Settings) -> Result<Self, OcrError> {
        let api_key = settings.api_key.clone().ok_or(OcrError::MissingApiKey)?;
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()?;
        Ok(Self {
            api_key,
            api_url: settings.api_url.clone(),
            model: settings.model.clone(),
            include_image_base64: settings.include_image_base64,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Strategy that sends the file inline as a base64 data URL.
    pub fn local(&self) -> LocalStrategy {
        LocalStrategy {
            client: self.clone(),
        }
    }

    /// Strategy that uploads the file to the Files API first.
    pub fn upload(&self) -> UploadStrategy {
        UploadStrategy {
            client: self.clone(),
        }
    }
}

// ── Mistral API request/response types ──────────────────────────────────────

#[derive(Serialize)]
struct OcrRequest<'a> {
    model: &'a str,
    document: DocumentSource,
    include_image_base64: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum DocumentSource {
    #[serde(rename = "document_url")]
    Document { document_url: String },
    #[serde(rename = "image_url")]
    Image { image_url: String },
}

impl DocumentSource {
    fn new(kind: DocumentKind, url: String) -> Self {
        match kind {
            DocumentKind::Document => Self::Document { document_url: url },
            DocumentKind::Image => Self::Image { image_url: url },
        }
    }
}

#[derive(Deserialize)]
struct FileUploadResponse {
    id: String,
}

#[derive(Deserialize)]
struct SignedUrlResponse {
    url: String,
}

// ── OCR calls ───────────────────────────────────────────────────────────────

impl MistralOcrClient {
    /// OCR a remote document or image URL.
    pub async fn process_url(&self, url: &str, kind: DocumentKind) -> Result<OcrResponse, OcrError> {
        info!("MistralOcrClient: processing {} from URL {}", kind.wire_type(), url);
        self.run_ocr(DocumentSource::new(kind, url.to_string())).await
    }

    /// OCR raw bytes sent inline as a data URL.
    pub async fn process_bytes(&self, filename: &str, data: &[u8]) -> Result<OcrResponse, OcrError> {
        let path = Path::new(filename);
        let mime = files::mime_type(path)
            .ok_or_else(|| OcrError::UnsupportedFormat(filename.to_string()))?;
        let kind = if files::is_image(path) {
            DocumentKind::Image
        } else {
            DocumentKind::Document
        };

        info!(
            "MistralOcrClient: processing {} ({} bytes) inline",
            filename,
            data.len()
        );
        self.run_ocr(DocumentSource::new(kind, data_url(mime, data)))
            .await
    }

    /// OCR a local file inline. Unsupported or missing files yield `Ok(None)`.
    pub async fn process_local_file(&self, path: &Path) -> Result<Option<OcrResponse>, OcrError> {
        if !files::is_supported(path) {
            warn!("Unsupported file format: {:?}", path);
            return Ok(None);
        }
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("File not found: {:?}", path);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let response = self.process_bytes(&files::display_name(path), &data).await?;
        Ok(Some(response))
    }

    /// Upload a local file to the Files API, then OCR its signed URL.
    pub async fn upload_and_process_file(&self, path: &Path) -> Result<OcrResponse, OcrError> {
        let filename = files::display_name(path);
        let data = tokio::fs::read(path).await?;
        let file_id = self.upload_file(&filename, data).await?;
        let signed_url = self.signed_url(&file_id).await?;
        self.run_ocr(DocumentSource::Document {
            document_url: signed_url,
        })
        .await
    }

    async fn run_ocr(&self, document: DocumentSource) -> Result<OcrResponse, OcrError> {
        let body = OcrRequest {
            model: &self.model,
            document,
            include_image_base64: self.include_image_base64,
        };

        let resp = self
            .client
            .post(format!("{}/ocr", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(OcrError::Api {
                endpoint: "OCR",
                status,
                body,
            });
        }

        let raw_text = resp.text().await?;
        debug!(
            "MistralOcrClient: raw response ({} bytes): {}",
            raw_text.len(),
            preview(&raw_text, 500)
        );
        let value: Value = serde_json::from_str(&raw_text)?;
        Ok(OcrResponse::new(value))
    }

    /// Upload raw bytes to Mistral Files API, return the file_id.
    async fn upload_file(&self, filename: &str, data: Vec<u8>) -> Result<String, OcrError> {
        use reqwest::multipart::{Form, Part};

        info!(
            "MistralOcrClient: uploading {} ({} bytes) to Files API",
            filename,
            data.len()
        );

        let mime = files::mime_type(Path::new(filename)).unwrap_or("application/octet-stream");
        let part = Part::bytes(data)
            .file_name(filename.to_string())
            .mime_str(mime)?;

        let form = Form::new().part("file", part).text("purpose", "ocr");

        let resp = self
            .client
            .post(format!("{}/files", self.api_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(OcrError::Api {
                endpoint: "Files",
                status,
                body,
            });
        }

        let upload: FileUploadResponse = resp.json().await?;
        info!("MistralOcrClient: uploaded file_id={}", upload.id);
        Ok(upload.id)
    }

    async fn signed_url(&self, file_id: &str) -> Result<String, OcrError> {
        let resp = self
            .client
            .get(format!("{}/files/{}/url", self.api_url, file_id))
            .query(&[("expiry", "24")])
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(OcrError::Api {
                endpoint: "signed URL",
                status,
                body,
            });
        }

        let signed: SignedUrlResponse = resp.json().await?;
        Ok(signed.url)
    }
}

fn data_url(mime: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64.encode(data))
}

fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

// ── Processing strategies ───────────────────────────────────────────────────

pub struct LocalStrategy {
    client: MistralOcrClient,
}

pub struct UploadStrategy {
    client: MistralOcrClient,
}

#[async_trait::async_trait]
impl DocumentProcessor for LocalStrategy {
    fn name(&self) -> &str {
        "local"
    }

    async fn process(&self, path: &Path) -> anyhow::Result<Option<OcrResponse>> {
        Ok(self.client.process_local_file(path).await?)
    }
}

#[async_trait::async_trait]
impl DocumentProcessor for UploadStrategy {
    fn name(&self) -> &str {
        "upload"
    }

    async fn process(&self, path: &Path) -> anyhow::Result<Option<OcrResponse>> {
        Ok(Some(self.client.upload_and_process_file(path).await?))
    }
}
