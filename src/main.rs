//! OCR Explorer - HTTP front-end over the Mistral OCR API.
//!
//! Submits documents by URL, local path or upload, then extracts, mines and
//! reports on the returned text. Batch, comparison and benchmark runs process
//! one file at a time.

mod analyzer;
mod batch;
mod benchmark;
mod compare;
mod config;
mod error;
mod files;
mod normalizer;
mod ocr;
mod report;
mod store;
mod structured;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use config::Settings;
use ocr::mistral::MistralOcrClient;
use ocr::{DocumentKind, DocumentProcessor, OcrResponse};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use store::{is_plain_name, ResultSink, ResultStore};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    settings: Arc<Settings>,
    client: MistralOcrClient,
    store: ResultStore,
}

type ApiError = (StatusCode, String);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "ocr_explorer=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load()?;
    settings.ensure_directories()?;

    let client = MistralOcrClient::new(&settings)?;
    info!("Mistral OCR client initialized (model: {})", client.model());

    let bind_addr = settings.bind_addr.clone();
    let state = AppState {
        store: ResultStore::new(settings.results_dir.clone()),
        settings: Arc::new(settings),
        client,
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/ocr/url", post(ocr_url))
        .route("/ocr/local", post(ocr_local))
        .route("/ocr/upload", post(ocr_upload))
        .route("/structured", post(structured_data))
        .route("/batch", post(run_batch))
        .route("/compare", post(compare_methods))
        .route("/benchmark", post(run_benchmark))
        .route("/results/analysis", get(results_analysis))
        .route("/results/report", post(results_report))
        .route("/results", delete(clean_results))
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024)) // 100MB
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> &'static str {
    "ok"
}

/// Text, metrics and mined data for one processed document.
#[derive(Serialize)]
struct DocumentOutcome {
    result_file: Option<String>,
    text_found: bool,
    text: String,
    analysis: analyzer::DocumentAnalysis,
    structured: structured::StructuredData,
}

#[derive(Deserialize)]
struct UrlRequest {
    url: String,
    #[serde(default)]
    kind: DocumentKind,
    save_as: Option<String>,
}

/// OCR a remote document or image.
async fn ocr_url(
    State(state): State<AppState>,
    Json(req): Json<UrlRequest>,
) -> Result<Json<DocumentOutcome>, ApiError> {
    check_save_as(req.save_as.as_deref())?;
    let response = state
        .client
        .process_url(&req.url, req.kind)
        .await
        .map_err(|e| {
            error!("OCR from URL failed: {}", e);
            (StatusCode::BAD_GATEWAY, format!("OCR failed: {}", e))
        })?;
    Ok(Json(summarize(&state, &response, req.save_as)))
}

#[derive(Deserialize)]
struct PathRequest {
    path: PathBuf,
    save_as: Option<String>,
}

/// OCR a file on the server's filesystem.
async fn ocr_local(
    State(state): State<AppState>,
    Json(req): Json<PathRequest>,
) -> Result<Json<DocumentOutcome>, ApiError> {
    check_save_as(req.save_as.as_deref())?;
    let response = state
        .client
        .process_local_file(&req.path)
        .await
        .map_err(|e| {
            error!("OCR of {:?} failed: {}", req.path, e);
            (StatusCode::BAD_GATEWAY, format!("OCR failed: {}", e))
        })?
        .ok_or_else(|| {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Missing or unsupported file: {}", req.path.display()),
            )
        })?;
    Ok(Json(summarize(&state, &response, req.save_as)))
}

/// OCR an uploaded document (multipart field `file`).
async fn ocr_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<DocumentOutcome>, ApiError> {
    let mut filename = String::new();
    let mut file_data = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (StatusCode::BAD_REQUEST, format!("Multipart error: {}", e))
    })? {
        if field.name() == Some("file") {
            filename = field.file_name().unwrap_or("document.pdf").to_string();
            file_data = field.bytes().await.map_err(|e| {
                (StatusCode::BAD_REQUEST, format!("Failed to read file: {}", e))
            })?.to_vec();
            break;
        }
    }

    if file_data.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No file uploaded".to_string()));
    }

    info!("Received file: {} ({} bytes)", filename, file_data.len());

    let response = state
        .client
        .process_bytes(&filename, &file_data)
        .await
        .map_err(|e| match e {
            error::OcrError::UnsupportedFormat(_) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, e.to_string()),
            other => {
                error!("OCR of upload {} failed: {}", filename, other);
                (StatusCode::BAD_GATEWAY, format!("OCR failed: {}", other))
            }
        })?;
    Ok(Json(summarize(&state, &response, None)))
}

#[derive(Deserialize)]
struct TextRequest {
    text: String,
}

async fn structured_data(Json(req): Json<TextRequest>) -> Json<structured::StructuredData> {
    Json(structured::extract_structured(&req.text))
}

#[derive(Deserialize, Default)]
struct BatchRequest {
    folder: Option<PathBuf>,
}

#[derive(Serialize)]
struct FolderBatch {
    folder: String,
    result: batch::BatchResult,
    report: Option<String>,
}

/// Batch-process one folder, or every document subfolder when none is given.
async fn run_batch(
    State(state): State<AppState>,
    body: Option<Json<BatchRequest>>,
) -> Result<Json<Vec<FolderBatch>>, ApiError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let folders = match req.folder {
        Some(folder) => vec![folder],
        None => state
            .settings
            .document_folders()
            .into_iter()
            .filter(|f| f.is_dir())
            .collect(),
    };

    let local = state.client.local();
    let mut runs = Vec::new();
    for folder in folders {
        let files = files::discover(&folder)
            .map_err(|e| (StatusCode::NOT_FOUND, format!("{:#}", e)))?;
        if files.is_empty() {
            info!("No supported files in {:?}, skipping", folder);
            continue;
        }

        let result = batch::run_batch(&files, &local, &state.store).await;
        let report = match report::generate_batch_report(&state.store, &result, &state.settings.model) {
            Ok(path) => Some(path.display().to_string()),
            Err(e) => {
                error!("Failed to write batch report: {:#}", e);
                None
            }
        };
        runs.push(FolderBatch {
            folder: folder.display().to_string(),
            result,
            report,
        });
    }

    if runs.is_empty() {
        return Err((StatusCode::NOT_FOUND, "No supported files found".to_string()));
    }
    Ok(Json(runs))
}

/// Compare the local and upload strategies on one file.
async fn compare_methods(
    State(state): State<AppState>,
    Json(req): Json<PathRequest>,
) -> Json<compare::ComparisonResult> {
    let local = state.client.local();
    let upload = state.client.upload();
    let strategies: [&dyn DocumentProcessor; 2] = [&local, &upload];
    Json(compare::compare(&req.path, &strategies, state.settings.large_file_threshold_bytes()).await)
}

#[derive(Deserialize, Default)]
struct BenchmarkRequest {
    paths: Option<Vec<PathBuf>>,
}

/// Time the local strategy on the given files, or on discovered documents.
async fn run_benchmark(
    State(state): State<AppState>,
    body: Option<Json<BenchmarkRequest>>,
) -> Result<Json<benchmark::BenchmarkResult>, ApiError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let mut paths = match req.paths {
        Some(paths) => paths,
        None => state
            .settings
            .document_folders()
            .iter()
            .filter(|f| f.is_dir())
            .filter_map(|f| files::discover(f).ok())
            .flatten()
            .collect(),
    };
    if paths.is_empty() {
        return Err((StatusCode::NOT_FOUND, "No files to benchmark".to_string()));
    }
    if paths.len() > state.settings.benchmark_limit {
        warn!(
            "Benchmark limited to {} of {} files",
            state.settings.benchmark_limit,
            paths.len()
        );
        paths.truncate(state.settings.benchmark_limit);
    }

    let local = state.client.local();
    Ok(Json(benchmark::benchmark(&paths, &local).await))
}

async fn results_analysis(State(state): State<AppState>) -> Json<report::ResultsSummary> {
    Json(report::analyze_results(state.store.dir()))
}

/// Write `ocr_analysis_report.md` and return its path.
async fn results_report(State(state): State<AppState>) -> Result<Json<String>, ApiError> {
    report::generate_analysis_report(&state.store, &state.settings.model)
        .map(|path| Json(path.display().to_string()))
        .map_err(|e| (StatusCode::NOT_FOUND, format!("{:#}", e)))
}

#[derive(Serialize)]
struct CleanResponse {
    removed: usize,
}

async fn clean_results(State(state): State<AppState>) -> Result<Json<CleanResponse>, ApiError> {
    state
        .store
        .clean()
        .map(|removed| Json(CleanResponse { removed }))
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)))
}

// ============================================================================
// Helper functions
// ============================================================================

/// Reject client-supplied result names that would land outside the results folder.
fn check_save_as(save_as: Option<&str>) -> Result<(), ApiError> {
    match save_as {
        Some(name) if !is_plain_name(name) => Err((
            StatusCode::BAD_REQUEST,
            format!("save_as must be a plain file name: {:?}", name),
        )),
        _ => Ok(()),
    }
}

/// Save the raw response and derive text, analysis and structured data.
fn summarize(state: &AppState, response: &OcrResponse, save_as: Option<String>) -> DocumentOutcome {
    for line in normalizer::describe_response(response) {
        debug!("OCR response: {}", line);
    }

    let filename = save_as.unwrap_or_else(ResultStore::timestamped_name);
    let result_file = state
        .store
        .save(response, &filename)
        .map(|p| p.display().to_string());

    let text = normalizer::extract_text(response);
    let analysis = analyzer::analyze_with_text(response, &text);
    let structured = text
        .content()
        .map(structured::extract_structured)
        .unwrap_or_default();
    if structured.is_empty() {
        debug!("No structured data found in {}", filename);
    }

    DocumentOutcome {
        result_file,
        text_found: text.is_found(),
        text: text.to_string(),
        analysis,
        structured,
    }
}
