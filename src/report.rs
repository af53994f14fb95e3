//! Markdown reports and saved-results analysis.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::batch::{BatchResult, FileResult};
use crate::files;
use crate::normalizer;
use crate::store::ResultStore;

pub const BATCH_REPORT_FILE: &str = "batch_processing_report.md";
pub const ANALYSIS_REPORT_FILE: &str = "ocr_analysis_report.md";

const SUPPORTED_FORMATS: &str = "PDF, DOCX, PPTX, PNG, JPEG, AVIF";

/// Totals over every saved result in the results folder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsSummary {
    pub total_files: usize,
    pub total_characters: usize,
    pub total_words: usize,
    pub files_processed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultsSummary {
    fn failed(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Self::default()
        }
    }
}

/// `1234567` -> `1,234,567`.
pub fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn render_batch_report(batch: &BatchResult, model: &str) -> String {
    let mut report = String::new();
    let avg_words = batch.summary.total_words / batch.processed_files.max(1);

    let _ = write!(
        report,
        "# Batch Processing Report\n\n\
         ## Summary\n\n\
         - **Total files**: {}\n\
         - **Processed successfully**: {}\n\
         - **Failed**: {}\n\
         - **Success rate**: {:.1}%\n\n\
         ## Content Statistics\n\n\
         - **Total characters extracted**: {}\n\
         - **Total words extracted**: {}\n\
         - **Average words per file**: {}\n\n\
         ## Processed Files\n\n",
        batch.total_files,
        batch.processed_files,
        batch.failed_files,
        batch.success_rate(),
        thousands(batch.summary.total_characters),
        thousands(batch.summary.total_words),
        thousands(avg_words),
    );

    for result in &batch.results {
        if let FileResult::Success(file) = result {
            let _ = write!(
                report,
                "### {}\n\
                 - **Characters**: {}\n\
                 - **Words**: {}\n\
                 - **Result file**: `{}`\n\n",
                file.filename,
                thousands(file.character_count),
                thousands(file.word_count),
                file.result_file,
            );
        }
    }

    if !batch.summary.processing_errors.is_empty() {
        report.push_str("## Processing Errors\n\n");
        for error in &batch.summary.processing_errors {
            let _ = writeln!(report, "- {}", error);
        }
        report.push('\n');
    }

    let _ = write!(
        report,
        "## Technical Details\n\n\
         - **OCR model**: {}\n\
         - **Processing method**: Local (Base64)\n\
         - **Formats**: {}\n",
        model, SUPPORTED_FORMATS,
    );

    report
}

pub fn render_analysis_report(summary: &ResultsSummary, model: &str) -> String {
    let mut report = String::new();
    let avg_words = summary.total_words / summary.total_files.max(1);

    let _ = write!(
        report,
        "# OCR Analysis Report\n\n\
         ## General Statistics\n\n\
         - **Total result files**: {}\n\
         - **Total characters extracted**: {}\n\
         - **Total words extracted**: {}\n\
         - **Average words per document**: {}\n\n\
         ## Result Files\n\n",
        summary.total_files,
        thousands(summary.total_characters),
        thousands(summary.total_words),
        thousands(avg_words),
    );

    for (i, name) in summary.files_processed.iter().enumerate() {
        let _ = writeln!(report, "{}. `{}`", i + 1, name);
    }

    let _ = write!(
        report,
        "\n## Technical Information\n\n\
         - **Model**: {}\n\
         - **Generated at**: {}\n\
         - **Supported formats**: {}\n",
        model,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        SUPPORTED_FORMATS,
    );

    report
}

/// Fold every saved `*.json` result in `dir` into one summary.
///
/// Aggregate problems (missing folder, no results) are reported through
/// [`ResultsSummary::error`]. Unreadable files are listed but add nothing
/// to the totals.
pub fn analyze_results(dir: &Path) -> ResultsSummary {
    if !dir.is_dir() {
        return ResultsSummary::failed("Results folder does not exist");
    }

    let store = ResultStore::new(dir);
    let json_files = match store.list_results() {
        Ok(files) => files,
        Err(e) => {
            warn!("Could not list results in {:?}: {:#}", dir, e);
            return ResultsSummary::failed(&e.to_string());
        }
    };
    if json_files.is_empty() {
        return ResultsSummary::failed("No result files found");
    }

    let mut summary = ResultsSummary {
        total_files: json_files.len(),
        ..ResultsSummary::default()
    };

    for path in &json_files {
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                let text = normalizer::extract_text_from_json(&raw);
                summary.total_characters += text.char_count();
                summary.total_words += text.word_count();
            }
            Err(e) => warn!("Error analyzing {:?}: {}", path, e),
        }
        summary.files_processed.push(files::display_name(path));
    }

    summary
}

/// Analyze the results folder and write `ocr_analysis_report.md` into it.
pub fn generate_analysis_report(store: &ResultStore, model: &str) -> anyhow::Result<PathBuf> {
    let summary = analyze_results(store.dir());
    if let Some(error) = &summary.error {
        anyhow::bail!("{}", error);
    }
    let path = store.write_report(ANALYSIS_REPORT_FILE, &render_analysis_report(&summary, model))?;
    info!("Analysis report generated at {:?}", path);
    Ok(path)
}

/// Write `batch_processing_report.md` for a finished batch.
pub fn generate_batch_report(
    store: &ResultStore,
    batch: &BatchResult,
    model: &str,
) -> anyhow::Result<PathBuf> {
    store.write_report(BATCH_REPORT_FILE, &render_batch_report(batch, model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::DocumentAnalysis;
    use crate::batch::{BatchSummary, FailedFile, ProcessedFile};

    fn sample_batch() -> BatchResult {
        BatchResult {
            total_files: 3,
            processed_files: 2,
            failed_files: 1,
            results: vec![
                FileResult::Success(ProcessedFile {
                    filename: "a.pdf".into(),
                    success: true,
                    character_count: 12_345,
                    word_count: 2_000,
                    analysis: DocumentAnalysis::default(),
                    result_file: "batch_a_ocr.json".into(),
                }),
                FileResult::Failure(FailedFile {
                    filename: "b.pdf".into(),
                    success: false,
                    error: Some("timeout".into()),
                }),
                FileResult::Success(ProcessedFile {
                    filename: "c.png".into(),
                    success: true,
                    character_count: 100,
                    word_count: 1_001,
                    analysis: DocumentAnalysis::default(),
                    result_file: "batch_c_ocr.json".into(),
                }),
            ],
            summary: BatchSummary {
                total_characters: 12_445,
                total_words: 3_001,
                processing_errors: vec!["b.pdf: timeout".into()],
            },
        }
    }

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1_000), "1,000");
        assert_eq!(thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn test_batch_report_statistics() {
        let report = render_batch_report(&sample_batch(), "mistral-ocr-latest");

        assert!(report.contains("- **Total files**: 3"));
        assert!(report.contains("- **Success rate**: 66.7%"));
        assert!(report.contains("- **Total characters extracted**: 12,445"));
        assert!(report.contains("- **Average words per file**: 1,500"));
        assert!(report.contains("### a.pdf"));
        assert!(!report.contains("### b.pdf"));
        assert!(report.contains("- b.pdf: timeout"));
        assert!(report.contains("`batch_c_ocr.json`"));
    }

    #[test]
    fn test_batch_report_empty_batch() {
        let report = render_batch_report(&BatchResult::default(), "m");
        assert!(report.contains("- **Success rate**: 0.0%"));
        assert!(report.contains("- **Average words per file**: 0"));
        assert!(!report.contains("## Processing Errors"));
    }

    #[test]
    fn test_analysis_report() {
        let summary = ResultsSummary {
            total_files: 2,
            total_characters: 40,
            total_words: 9,
            files_processed: vec!["a.json".into(), "b.json".into()],
            error: None,
        };
        let report = render_analysis_report(&summary, "mistral-ocr-latest");
        assert!(report.contains("- **Average words per document**: 4"));
        assert!(report.contains("1. `a.json`\n2. `b.json`"));
        assert!(report.contains("- **Model**: mistral-ocr-latest"));
    }

    #[test]
    fn test_analyze_missing_folder() {
        let summary = analyze_results(Path::new("/definitely/not/here"));
        assert_eq!(summary.error.as_deref(), Some("Results folder does not exist"));
    }

    #[test]
    fn test_analyze_empty_folder() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.md"), "# not json").unwrap();
        let summary = analyze_results(dir.path());
        assert_eq!(summary.error.as_deref(), Some("No result files found"));
    }

    #[test]
    fn test_analyze_saved_results() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"{"pages": [{"markdown": "hello world"}]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("b.json"), r#"{"text": "three words here"}"#).unwrap();
        std::fs::write(dir.path().join("c.json"), "{broken").unwrap();

        let summary = analyze_results(dir.path());
        assert!(summary.error.is_none());
        assert_eq!(summary.total_files, 3);
        assert_eq!(summary.total_characters, 11 + 16);
        assert_eq!(summary.total_words, 5);
        assert_eq!(summary.files_processed, vec!["a.json", "b.json", "c.json"]);
    }

    #[test]
    fn test_generate_reports() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path());

        assert!(generate_analysis_report(&store, "m").is_err());

        std::fs::write(dir.path().join("a.json"), r#"{"text": "some words"}"#).unwrap();
        let path = generate_analysis_report(&store, "m").unwrap();
        assert_eq!(path, dir.path().join(ANALYSIS_REPORT_FILE));

        let path = generate_batch_report(&store, &sample_batch(), "m").unwrap();
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.starts_with("# Batch Processing Report"));
    }
}
