//! Timing of per-file processing and throughput statistics.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

use crate::files;
use crate::normalizer;
use crate::ocr::DocumentProcessor;

/// Source of timestamps for measuring processing calls.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub test_files: usize,
    pub results: Vec<BenchmarkEntry>,
    pub average_time: f64,
    pub total_time: f64,
    pub characters_per_second: f64,
    pub words_per_second: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkEntry {
    pub filename: String,
    /// Seconds spent in the processing call.
    pub processing_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chars_per_second: Option<f64>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn per_second(amount: usize, seconds: f64) -> f64 {
    if seconds > 0.0 {
        amount as f64 / seconds
    } else {
        0.0
    }
}

pub async fn benchmark(files: &[PathBuf], processor: &dyn DocumentProcessor) -> BenchmarkResult {
    benchmark_with_clock(files, processor, &SystemClock).await
}

/// Time `processor` on each file, one at a time.
pub async fn benchmark_with_clock(
    files: &[PathBuf],
    processor: &dyn DocumentProcessor,
    clock: &dyn Clock,
) -> BenchmarkResult {
    let mut result = BenchmarkResult {
        test_files: files.len(),
        ..BenchmarkResult::default()
    };
    let mut total_characters = 0;
    let mut total_words = 0;
    let mut successes = 0;

    info!("Benchmark: starting with {} files", files.len());

    for (i, path) in files.iter().enumerate() {
        let filename = files::display_name(path);
        info!("Benchmark {}/{}: {}", i + 1, files.len(), filename);

        let start = clock.now();
        let outcome = processor.process(path).await;
        let elapsed = clock.now().saturating_duration_since(start).as_secs_f64();

        let entry = match outcome {
            Ok(Some(response)) => {
                let text = normalizer::extract_text(&response);
                let (chars, words) = (text.char_count(), text.word_count());
                result.total_time += elapsed;
                total_characters += chars;
                total_words += words;
                successes += 1;
                BenchmarkEntry {
                    filename,
                    processing_time: elapsed,
                    character_count: Some(chars),
                    word_count: Some(words),
                    chars_per_second: Some(per_second(chars, elapsed)),
                    success: true,
                    error: None,
                }
            }
            Ok(None) => BenchmarkEntry {
                filename,
                processing_time: elapsed,
                character_count: None,
                word_count: None,
                chars_per_second: None,
                success: false,
                error: None,
            },
            Err(e) => {
                warn!("Benchmark: error on {}: {:#}", filename, e);
                BenchmarkEntry {
                    filename,
                    processing_time: elapsed,
                    character_count: None,
                    word_count: None,
                    chars_per_second: None,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        };
        result.results.push(entry);
    }

    if successes > 0 {
        result.average_time = result.total_time / successes as f64;
        result.characters_per_second = per_second(total_characters, result.total_time);
        result.words_per_second = per_second(total_words, result.total_time);
    }

    info!("Benchmark completed in {:.2} seconds", result.total_time);
    result
}
