//! Side-by-side comparison of processing strategies on one file.

use serde::{Deserialize, Serialize, Serializer};
use std::path::Path;
use tracing::{info, warn};

use crate::normalizer;
use crate::ocr::DocumentProcessor;

pub const BOTH_WORKED: &str = "Both methods worked correctly";
pub const PREFER_UPLOAD: &str = "For large files, the upload method may be more efficient";
pub const PREFER_LOCAL: &str = "For small files, the local method is faster";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub file: String,
    /// In the order the strategies ran; serialized as a map.
    #[serde(serialize_with = "serialize_methods")]
    pub methods: Vec<(String, MethodOutcome)>,
    pub best_method: Option<String>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn serialize_methods<S: Serializer>(
    methods: &[(String, MethodOutcome)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(methods.iter().map(|(name, outcome)| (name, outcome)))
}

/// Human-readable label for the strategies this crate ships.
fn processing_type(method: &str) -> String {
    match method {
        "local" => "Base64 encoding".to_string(),
        "upload" => "File upload".to_string(),
        other => other.to_string(),
    }
}

/// Run every strategy on `file` and pick the one that extracted the most text.
///
/// `large_file_bytes` is the size above which the upload strategy is recommended.
pub async fn compare(
    file: &Path,
    strategies: &[&dyn DocumentProcessor],
    large_file_bytes: u64,
) -> ComparisonResult {
    info!("Comparing {} strategies on {:?}", strategies.len(), file);

    if strategies.is_empty() {
        return ComparisonResult {
            file: file.display().to_string(),
            methods: Vec::new(),
            best_method: None,
            recommendations: Vec::new(),
            error: Some("No strategies to compare".to_string()),
        };
    }

    let mut outcomes: Vec<(String, MethodOutcome)> = Vec::with_capacity(strategies.len());
    for strategy in strategies {
        let outcome = match strategy.process(file).await {
            Ok(Some(response)) => {
                let text = normalizer::extract_text(&response);
                MethodOutcome {
                    success: true,
                    character_count: Some(text.char_count()),
                    word_count: Some(text.word_count()),
                    processing_type: Some(processing_type(strategy.name())),
                    error: None,
                }
            }
            Ok(None) => MethodOutcome::default(),
            Err(e) => {
                warn!("Strategy {} failed on {:?}: {:#}", strategy.name(), file, e);
                MethodOutcome {
                    error: Some(e.to_string()),
                    ..MethodOutcome::default()
                }
            }
        };
        outcomes.push((strategy.name().to_string(), outcome));
    }

    let file_size = match std::fs::metadata(file) {
        Ok(meta) => meta.len(),
        Err(e) => {
            warn!("Could not read size of {:?}: {}", file, e);
            0
        }
    };

    let (best_method, recommendations) = pick_best(&outcomes, file_size, large_file_bytes);

    ComparisonResult {
        file: file.display().to_string(),
        methods: outcomes,
        best_method,
        recommendations,
        error: None,
    }
}

/// Best strategy (strictly greatest character count, first wins ties) and advice.
pub fn pick_best(
    outcomes: &[(String, MethodOutcome)],
    file_size: u64,
    large_file_bytes: u64,
) -> (Option<String>, Vec<String>) {
    let successful: Vec<&(String, MethodOutcome)> =
        outcomes.iter().filter(|(_, o)| o.success).collect();

    let mut best: Option<&(String, MethodOutcome)> = None;
    for candidate in successful.iter().copied() {
        let count = candidate.1.character_count.unwrap_or(0);
        if best.map_or(true, |b| count > b.1.character_count.unwrap_or(0)) {
            best = Some(candidate);
        }
    }

    let Some((best_name, _)) = best else {
        return (None, Vec::new());
    };

    let mut recommendations = Vec::new();
    if successful.len() > 1 {
        recommendations.push(BOTH_WORKED.to_string());
    }
    if file_size > large_file_bytes {
        recommendations.push(PREFER_UPLOAD.to_string());
    } else {
        recommendations.push(PREFER_LOCAL.to_string());
    }

    (Some(best_name.clone()), recommendations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::OcrResponse;
    use serde_json::json;

    const TEN_MB: u64 = 10 * 1024 * 1024;

    struct Fixed {
        name: &'static str,
        text: Option<&'static str>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl DocumentProcessor for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn process(&self, _path: &Path) -> anyhow::Result<Option<OcrResponse>> {
            if self.fail {
                anyhow::bail!("upload rejected");
            }
            Ok(self.text.map(|t| OcrResponse::new(json!({"pages": [{"markdown": t}]}))))
        }
    }

    impl ComparisonResult {
        fn outcome(&self, method: &str) -> Option<&MethodOutcome> {
            self.methods
                .iter()
                .find(|(name, _)| name == method)
                .map(|(_, outcome)| outcome)
        }
    }

    fn ok(name: &'static str, text: &'static str) -> Fixed {
        Fixed { name, text: Some(text), fail: false }
    }

    fn outcome(success: bool, chars: usize) -> MethodOutcome {
        MethodOutcome {
            success,
            character_count: success.then_some(chars),
            ..MethodOutcome::default()
        }
    }

    #[tokio::test]
    async fn test_only_one_succeeds() {
        let local = ok("local", "some text");
        let upload = Fixed { name: "upload", text: None, fail: true };

        let result = compare(Path::new("missing.pdf"), &[&local, &upload], TEN_MB).await;

        assert_eq!(result.best_method.as_deref(), Some("local"));
        assert_eq!(result.recommendations, vec![PREFER_LOCAL]);
        let upload_outcome = result.outcome("upload").unwrap();
        assert!(!upload_outcome.success);
        assert_eq!(upload_outcome.error.as_deref(), Some("upload rejected"));
    }

    #[tokio::test]
    async fn test_both_succeed_more_text_wins() {
        let local = ok("local", "short");
        let upload = ok("upload", "a much longer text");

        let result = compare(Path::new("missing.pdf"), &[&local, &upload], TEN_MB).await;

        assert_eq!(result.best_method.as_deref(), Some("upload"));
        assert_eq!(result.recommendations, vec![BOTH_WORKED, PREFER_LOCAL]);
        let value = serde_json::to_value(&result).unwrap();
        let keys: Vec<&String> = value["methods"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["local", "upload"]);
        let local_outcome = result.outcome("local").unwrap();
        assert_eq!(local_outcome.character_count, Some(5));
        assert_eq!(local_outcome.processing_type.as_deref(), Some("Base64 encoding"));
    }

    #[tokio::test]
    async fn test_none_succeed() {
        let local = Fixed { name: "local", text: None, fail: false };
        let upload = Fixed { name: "upload", text: None, fail: true };

        let result = compare(Path::new("missing.pdf"), &[&local, &upload], TEN_MB).await;

        assert!(result.best_method.is_none());
        assert!(result.recommendations.is_empty());
        assert_eq!(result.methods.len(), 2);
    }

    #[tokio::test]
    async fn test_no_strategies() {
        let result = compare(Path::new("a.pdf"), &[], TEN_MB).await;
        assert_eq!(result.error.as_deref(), Some("No strategies to compare"));
        assert!(result.best_method.is_none());
    }

    #[test]
    fn test_tie_goes_to_first() {
        let outcomes = vec![
            ("local".to_string(), outcome(true, 7)),
            ("upload".to_string(), outcome(true, 7)),
        ];
        let (best, _) = pick_best(&outcomes, 0, TEN_MB);
        assert_eq!(best.as_deref(), Some("local"));
    }

    #[test]
    fn test_large_file_recommends_upload() {
        let outcomes = vec![
            ("local".to_string(), outcome(false, 0)),
            ("upload".to_string(), outcome(true, 3)),
        ];
        let (best, recs) = pick_best(&outcomes, TEN_MB + 1, TEN_MB);
        assert_eq!(best.as_deref(), Some("upload"));
        assert_eq!(recs, vec![PREFER_UPLOAD]);

        let (_, recs) = pick_best(&outcomes, TEN_MB, TEN_MB);
        assert_eq!(recs, vec![PREFER_LOCAL]);
    }

    #[tokio::test]
    async fn test_reads_real_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.pdf");
        std::fs::write(&path, vec![0u8; 2048]).unwrap();

        let upload = ok("upload", "text");
        let result = compare(&path, &[&upload], 1024).await;
        assert_eq!(result.recommendations, vec![PREFER_UPLOAD]);
    }
}
