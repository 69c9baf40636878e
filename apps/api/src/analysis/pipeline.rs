//! Analysis Orchestrator — drives the strictly sequential pipeline:
//! rasterize the resume, extract text per page via the model, then synthesize
//! the match report against the job description.
//!
//! Nothing here raises: every failure arrives as an error marker object and
//! is passed along as ordinary data. There is no retry and no per-step
//! timeout beyond the transport client's.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::analysis::prompts::{synthesis_prompt, EXTRACTION_INSTRUCTION};
use crate::llm_client::{is_error_marker, ModelQuery, KIND_IMAGE, KIND_TEXT};
use crate::rasterizer::rasterize;
use crate::session::Session;

/// Rasterization settings threaded from config.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub image_dir: PathBuf,
    pub dpi: u32,
}

/// Runs the full pipeline in a detached task that records its result on the
/// session. Once an analysis begins it always reaches the Report phase,
/// whether or not the caller keeps waiting on the returned handle — a
/// dropped request must not strand the session in Analyzing.
pub fn spawn_analysis(
    model: Arc<dyn ModelQuery>,
    session: Arc<RwLock<Session>>,
    document_path: PathBuf,
    job_description: String,
    settings: RenderSettings,
) -> JoinHandle<Value> {
    tokio::spawn(async move {
        let report = analyze(model.as_ref(), &document_path, &job_description, &settings).await;
        if let Err(e) = session.write().await.complete_analysis(report.clone()) {
            error!(error = %e, "Failed to record analysis result on the session");
        }
        report
    })
}

/// Full pipeline: rasterize, then analyze the resulting pages.
/// Pdfium is not async-safe, so rasterization runs under `spawn_blocking`.
pub async fn analyze(
    model: &dyn ModelQuery,
    document_path: &Path,
    job_description: &str,
    settings: &RenderSettings,
) -> Value {
    let document = document_path.to_path_buf();
    let image_dir = settings.image_dir.clone();
    let dpi = settings.dpi;

    let pages = tokio::task::spawn_blocking(move || rasterize(&document, &image_dir, dpi))
        .await
        .unwrap_or_else(|e| {
            error!(error = %e, "Rasterization task panicked");
            Vec::new()
        });

    info!(pages = pages.len(), "Rasterization complete");
    analyze_pages(model, &pages, job_description).await
}

/// Steps 2-5: extract each page in order (no short-circuit on per-page
/// failure), then invoke the synthesis call once and return its result
/// verbatim — report, error marker, or empty.
pub async fn analyze_pages(
    model: &dyn ModelQuery,
    pages: &[PathBuf],
    job_description: &str,
) -> Value {
    let mut extracted = Vec::with_capacity(pages.len());
    for page in pages {
        let payload = Value::String(page.display().to_string());
        let result = model.query(&payload, EXTRACTION_INSTRUCTION, KIND_IMAGE).await;
        if is_error_marker(&result) {
            warn!(page = %page.display(), "Page extraction failed; continuing");
        }
        extracted.push(result);
    }

    // The extraction list is positional: page order is the only indexing the
    // synthesis prompt gets.
    let extracted = Value::Array(extracted);
    let instruction = synthesis_prompt(job_description, &extracted);
    model.query(&extracted, &instruction, KIND_TEXT).await
}
