//! Sequential batch processing with per-file failure isolation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::analyzer::{self, DocumentAnalysis};
use crate::files;
use crate::normalizer;
use crate::ocr::{DocumentProcessor, OcrResponse};
use crate::store::ResultSink;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub total_files: usize,
    pub processed_files: usize,
    pub failed_files: usize,
    pub results: Vec<FileResult>,
    pub summary: BatchSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_characters: usize,
    pub total_words: usize,
    pub processing_errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileResult {
    Success(ProcessedFile),
    Failure(FailedFile),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedFile {
    pub filename: String,
    pub success: bool,
    pub character_count: usize,
    pub word_count: usize,
    pub analysis: DocumentAnalysis,
    pub result_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedFile {
    pub filename: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Name under which a batch file's raw response is saved.
pub fn result_filename(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    format!("batch_{}_ocr.json", stem)
}

impl BatchResult {
    fn record_success(&mut self, file: ProcessedFile) {
        self.processed_files += 1;
        self.summary.total_characters += file.character_count;
        self.summary.total_words += file.word_count;
        self.results.push(FileResult::Success(file));
    }

    fn record_failure(&mut self, filename: String, message: String, error: Option<String>) {
        self.failed_files += 1;
        self.summary.processing_errors.push(message);
        self.results.push(FileResult::Failure(FailedFile {
            filename,
            success: false,
            error,
        }));
    }

    pub fn success_rate(&self) -> f64 {
        self.processed_files as f64 / self.total_files.max(1) as f64 * 100.0
    }
}

/// Process `files` one at a time, in order. A failing file never stops the batch.
pub async fn run_batch(
    files: &[PathBuf],
    processor: &dyn DocumentProcessor,
    sink: &dyn ResultSink,
) -> BatchResult {
    let mut batch = BatchResult {
        total_files: files.len(),
        ..BatchResult::default()
    };

    info!(
        "Batch: {} files to process with {} strategy",
        files.len(),
        processor.name()
    );

    for (i, path) in files.iter().enumerate() {
        let filename = files::display_name(path);
        info!("Batch: processing {}/{}: {}", i + 1, files.len(), filename);

        match processor.process(path).await {
            Ok(Some(response)) => {
                let processed = process_response(path, &filename, &response, sink);
                batch.record_success(processed);
            }
            Ok(None) => {
                warn!("Batch: no OCR result for {}", filename);
                batch.record_failure(
                    filename.clone(),
                    format!("Error processing {}", filename),
                    None,
                );
            }
            Err(e) => {
                error!("Batch: error processing {}: {:#}", filename, e);
                batch.record_failure(
                    filename.clone(),
                    format!("{}: {}", filename, e),
                    Some(e.to_string()),
                );
            }
        }
    }

    info!(
        "Batch complete: {} processed, {} failed",
        batch.processed_files, batch.failed_files
    );
    batch
}

fn process_response(
    path: &Path,
    filename: &str,
    response: &OcrResponse,
    sink: &dyn ResultSink,
) -> ProcessedFile {
    let result_file = result_filename(path);
    if sink.save(response, &result_file).is_none() {
        warn!("Batch: could not save {} for {}", result_file, filename);
    }

    let text = normalizer::extract_text(response);
    let analysis = analyzer::analyze_with_text(response, &text);

    ProcessedFile {
        filename: filename.to_string(),
        success: true,
        character_count: text.char_count(),
        word_count: text.word_count(),
        analysis,
        result_file,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    impl FileResult {
        fn filename(&self) -> &str {
            match self {
                FileResult::Success(f) => &f.filename,
                FileResult::Failure(f) => &f.filename,
            }
        }
    }

    enum Outcome {
        Text(&'static str),
        Nothing,
        Fail(&'static str),
    }

    struct FakeProcessor {
        outcomes: HashMap<PathBuf, Outcome>,
    }

    impl FakeProcessor {
        fn new(outcomes: Vec<(&str, Outcome)>) -> Self {
            Self {
                outcomes: outcomes
                    .into_iter()
                    .map(|(p, o)| (PathBuf::from(p), o))
                    .collect(),
            }
        }
    }

    #[async_trait::async_trait]
    impl DocumentProcessor for FakeProcessor {
        fn name(&self) -> &str {
            "fake"
        }

        async fn process(&self, path: &Path) -> anyhow::Result<Option<OcrResponse>> {
            match self.outcomes.get(path) {
                Some(Outcome::Text(text)) => Ok(Some(OcrResponse::new(
                    json!({"pages": [{"markdown": text}]}),
                ))),
                Some(Outcome::Nothing) | None => Ok(None),
                Some(Outcome::Fail(msg)) => anyhow::bail!("{}", msg),
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        saved: Mutex<Vec<String>>,
        fail: bool,
    }

    impl ResultSink for RecordingSink {
        fn save(&self, _response: &OcrResponse, filename: &str) -> Option<PathBuf> {
            self.saved.lock().unwrap().push(filename.to_string());
            (!self.fail).then(|| PathBuf::from("results").join(filename))
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort() {
        let processor = FakeProcessor::new(vec![
            ("docs/a.pdf", Outcome::Text("alpha beta")),
            ("docs/b.pdf", Outcome::Fail("API error (500)")),
            ("docs/c.png", Outcome::Text("gamma")),
        ]);
        let sink = RecordingSink::default();

        let batch = run_batch(&paths(&["docs/a.pdf", "docs/b.pdf", "docs/c.png"]), &processor, &sink).await;

        assert_eq!(batch.total_files, 3);
        assert_eq!(batch.processed_files, 2);
        assert_eq!(batch.failed_files, 1);
        assert_eq!(batch.summary.processing_errors, vec!["b.pdf: API error (500)"]);
        assert_eq!(batch.summary.total_characters, 15);
        assert_eq!(batch.summary.total_words, 3);

        let order: Vec<&str> = batch.results.iter().map(|r| r.filename()).collect();
        assert_eq!(order, vec!["a.pdf", "b.pdf", "c.png"]);
        assert_eq!(
            *sink.saved.lock().unwrap(),
            vec!["batch_a_ocr.json", "batch_c_ocr.json"]
        );
    }

    #[tokio::test]
    async fn test_none_result_is_generic_failure() {
        let processor = FakeProcessor::new(vec![("scan.avif", Outcome::Nothing)]);
        let batch = run_batch(&paths(&["scan.avif"]), &processor, &RecordingSink::default()).await;

        assert_eq!(batch.processed_files, 0);
        assert_eq!(batch.failed_files, 1);
        assert_eq!(batch.summary.processing_errors, vec!["Error processing scan.avif"]);
        match &batch.results[0] {
            FileResult::Failure(f) => assert!(f.error.is_none()),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let processor = FakeProcessor::new(vec![]);
        let batch = run_batch(&[], &processor, &RecordingSink::default()).await;

        assert_eq!(batch, BatchResult::default());
        assert_eq!(batch.success_rate(), 0.0);
    }

    #[tokio::test]
    async fn test_save_failure_is_not_fatal() {
        let processor = FakeProcessor::new(vec![("a.pdf", Outcome::Text("still counted"))]);
        let sink = RecordingSink {
            fail: true,
            ..RecordingSink::default()
        };

        let batch = run_batch(&paths(&["a.pdf"]), &processor, &sink).await;
        assert_eq!(batch.processed_files, 1);
        match &batch.results[0] {
            FileResult::Success(f) => {
                assert_eq!(f.result_file, "batch_a_ocr.json");
                assert_eq!(f.word_count, 2);
                assert_eq!(f.analysis.total_words, 2);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_result_filename() {
        assert_eq!(result_filename(Path::new("docs/Invoice 2024.pdf")), "batch_Invoice 2024_ocr.json");
        assert_eq!(result_filename(Path::new("archive.tar.gz")), "batch_archive.tar_ocr.json");
    }

    #[test]
    fn test_serialized_shape() {
        let mut batch = BatchResult {
            total_files: 1,
            ..BatchResult::default()
        };
        batch.record_failure("x.pdf".into(), "Error processing x.pdf".into(), None);

        let value = serde_json::to_value(&batch).unwrap();
        assert_eq!(value["results"][0], json!({"filename": "x.pdf", "success": false}));
        assert_eq!(value["summary"]["processing_errors"][0], "Error processing x.pdf");
    }
}
