//! Runtime settings.
//!
//! Settings come from an optional JSON file (`OCR_CONFIG`, or `ocr_explorer.json`
//! in the working directory) and are then overridden by environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const DEFAULT_CONFIG_FILE: &str = "ocr_explorer.json";

/// Folders created under the documents directory on startup.
const DOCUMENT_SUBFOLDERS: [&str; 3] = ["pdf", "word", "images"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Never read from the config file; only from `MISTRAL_API_KEY`.
    #[serde(skip)]
    pub api_key: Option<String>,
    pub model: String,
    pub api_url: String,
    pub results_dir: PathBuf,
    pub documents_dir: PathBuf,
    pub bind_addr: String,
    /// Files above this size are better served by the upload strategy.
    pub large_file_mb: u64,
    /// Maximum number of files a single benchmark request may time.
    pub benchmark_limit: usize,
    pub request_timeout_secs: u64,
    pub include_image_base64: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "mistral-ocr-latest".to_string(),
            api_url: "https://api.mistral.ai/v1".to_string(),
            results_dir: PathBuf::from("results"),
            documents_dir: PathBuf::from("documents"),
            bind_addr: "0.0.0.0:3000".to_string(),
            large_file_mb: 10,
            benchmark_limit: 3,
            request_timeout_secs: 300,
            include_image_base64: true,
        }
    }
}

impl Settings {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let explicit = std::env::var("OCR_CONFIG").ok().map(PathBuf::from);
        let mut settings = match explicit {
            Some(path) => Self::from_file(&path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let settings: Settings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Apply overrides from a variable lookup (the process environment in production).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("MISTRAL_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(model) = lookup("MISTRAL_OCR_MODEL") {
            self.model = model;
        }
        if let Some(url) = lookup("MISTRAL_API_URL") {
            self.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(dir) = lookup("OCR_RESULTS_DIR") {
            self.results_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("OCR_DOCUMENTS_DIR") {
            self.documents_dir = PathBuf::from(dir);
        }
        if let Some(addr) = lookup("OCR_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(mb) = lookup("OCR_LARGE_FILE_MB") {
            self.large_file_mb = mb
                .parse()
                .with_context(|| format!("OCR_LARGE_FILE_MB is not a number: {}", mb))?;
        }
        if let Some(limit) = lookup("OCR_BENCHMARK_LIMIT") {
            self.benchmark_limit = limit
                .parse()
                .with_context(|| format!("OCR_BENCHMARK_LIMIT is not a number: {}", limit))?;
        }
        if let Some(secs) = lookup("OCR_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = secs
                .parse()
                .with_context(|| format!("OCR_REQUEST_TIMEOUT_SECS is not a number: {}", secs))?;
        }
        if let Some(flag) = lookup("OCR_INCLUDE_IMAGES") {
            self.include_image_base64 = matches!(
                flag.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        Ok(())
    }

    pub fn large_file_threshold_bytes(&self) -> u64 {
        self.large_file_mb * 1024 * 1024
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Document subfolders scanned when a batch request names no folder.
    pub fn document_folders(&self) -> Vec<PathBuf> {
        DOCUMENT_SUBFOLDERS
            .iter()
            .map(|sub| self.documents_dir.join(sub))
            .collect()
    }

    /// Create the documents subfolders and the results folder.
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in self
            .document_folders()
            .iter()
            .chain(std::iter::once(&self.results_dir))
        {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {:?}", dir))?;
        }
        Ok(())
    }
}
