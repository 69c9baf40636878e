use std::path::Path;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use anyhow::anyhow;

use crate::analysis::pipeline::{spawn_analysis, RenderSettings};
use crate::analysis::report::ReportView;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct UploadResponse {
    pub file_name: String,
}

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub job_description: String,
}

/// POST /api/v1/resume
/// Accepts a multipart PDF upload and attaches it to the session.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        let Some(file_name) = field.file_name().map(sanitize_file_name) else {
            continue;
        };

        if !file_name.to_lowercase().ends_with(".pdf") {
            return Err(AppError::Validation(
                "only PDF resumes are accepted".to_string(),
            ));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("failed to read upload: {e}")))?;
        if data.is_empty() {
            return Err(AppError::Validation("uploaded file is empty".to_string()));
        }

        tokio::fs::create_dir_all(&state.config.upload_dir)
            .await
            .map_err(|e| AppError::Upload(e.to_string()))?;
        let path = state.config.upload_dir.join(&file_name);
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| AppError::Upload(e.to_string()))?;

        state.session.write().await.attach_resume(path.clone())?;
        info!(file = %path.display(), bytes = data.len(), "Resume uploaded");

        return Ok(Json(UploadResponse { file_name }));
    }

    Err(AppError::Validation(
        "multipart body contained no file".to_string(),
    ))
}

/// DELETE /api/v1/resume
pub async fn handle_remove_resume(
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let mut session = state.session.write().await;
    let path = session.resume_path().cloned();
    session.clear_resume()?;
    drop(session);

    if let Some(path) = path {
        // Best effort; the session no longer references the file either way.
        let _ = tokio::fs::remove_file(&path).await;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/analyze
/// Runs the whole pipeline synchronously and returns the raw model report
/// verbatim — an error marker object is still a 200 with that object as data.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<Value>, AppError> {
    if req.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description must not be empty".to_string(),
        ));
    }

    let document_path = state.session.write().await.begin_analysis()?;

    let settings = RenderSettings {
        image_dir: state.config.image_dir.clone(),
        dpi: state.config.render_dpi,
    };

    // Detached: if the client disconnects and this future is dropped, the
    // task still runs to completion and moves the session to Report.
    let task = spawn_analysis(
        state.llm.clone(),
        state.session.clone(),
        document_path,
        req.job_description.clone(),
        settings,
    );

    match task.await {
        Ok(report) => Ok(Json(report)),
        Err(e) => {
            // The task died without reporting; unwedge the session.
            let _ = state.session.write().await.abort_analysis();
            Err(AppError::Internal(anyhow!("analysis task failed: {e}")))
        }
    }
}

/// GET /api/v1/report
/// The shaped dashboard view of the most recent analysis.
pub async fn handle_get_report(
    State(state): State<AppState>,
) -> Result<Json<ReportView>, AppError> {
    let session = state.session.read().await;
    let report = session
        .report()
        .ok_or_else(|| AppError::NotFound("no analysis report available".to_string()))?;
    Ok(Json(ReportView::from_result(report)))
}

/// POST /api/v1/reset
/// Back to the upload phase; the uploaded resume is kept for re-analysis.
pub async fn handle_reset(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.session.write().await.reset()?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct SessionStatus {
    pub phase: crate::session::Phase,
    pub resume_uploaded: bool,
}

/// GET /api/v1/session
/// Current phase of the session state machine, for the dashboard's navigation.
pub async fn handle_session_status(State(state): State<AppState>) -> Json<SessionStatus> {
    let session = state.session.read().await;
    Json(SessionStatus {
        phase: session.phase(),
        resume_uploaded: session.resume_path().is_some(),
    })
}

/// Strips any path components a client might smuggle into the file name.
fn sanitize_file_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "resume.pdf".to_string())
}
