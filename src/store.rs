//! Result artifacts on disk: raw OCR responses and markdown reports.
//!
//! Writes are best-effort. A failed save is logged and reported as `None`;
//! it never aborts the run that produced the response.

use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::ocr::OcrResponse;

/// Persists a raw response under a name, returning where it landed.
pub trait ResultSink: Send + Sync {
    fn save(&self, response: &OcrResponse, filename: &str) -> Option<PathBuf>;
}

/// True when `name` is a bare file name that stays inside the results folder.
pub fn is_plain_name(name: &str) -> bool {
    Path::new(name).file_name() == Some(OsStr::new(name))
}

fn checked_name(name: &str) -> Result<&str> {
    anyhow::ensure!(is_plain_name(name), "Invalid result file name: {:?}", name);
    Ok(name)
}

/// Results folder on the local filesystem.
#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Default name for a single result: `ocr_result_<YYYYmmdd_HHMMSS>.json`.
    pub fn timestamped_name() -> String {
        format!(
            "ocr_result_{}.json",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        )
    }

    fn try_save(&self, response: &OcrResponse, filename: &str) -> Result<PathBuf> {
        let filename = checked_name(filename)?;
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create results folder: {:?}", self.dir))?;
        let path = self.dir.join(filename);
        let json = serde_json::to_string_pretty(response)?;
        std::fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(path)
    }

    /// Write a report file into the results folder.
    pub fn write_report(&self, filename: &str, content: &str) -> Result<PathBuf> {
        let filename = checked_name(filename)?;
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create results folder: {:?}", self.dir))?;
        let path = self.dir.join(filename);
        std::fs::write(&path, content).with_context(|| format!("Failed to write {:?}", path))?;
        info!("Report written to {:?}", path);
        Ok(path)
    }

    /// Saved `*.json` results, sorted by path.
    pub fn list_results(&self) -> Result<Vec<PathBuf>> {
        let mut results = Vec::new();
        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read results folder: {:?}", self.dir))?
        {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|e| e == "json") {
                results.push(path);
            }
        }
        results.sort();
        Ok(results)
    }

    /// Delete every file in the results folder. Returns how many were removed.
    pub fn clean(&self) -> Result<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to delete {:?}", path))?;
                removed += 1;
            }
        }
        info!("Removed {} files from {:?}", removed, self.dir);
        Ok(removed)
    }
}

impl ResultSink for ResultStore {
    fn save(&self, response: &OcrResponse, filename: &str) -> Option<PathBuf> {
        match self.try_save(response, filename) {
            Ok(path) => {
                info!("Results saved to {:?}", path);
                Some(path)
            }
            Err(e) => {
                error!("Failed to save results {}: {:#}", filename, e);
                None
            }
        }
    }
}
