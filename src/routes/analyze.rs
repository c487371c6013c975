//! Analyze endpoints.
//!
//! Both accept an optional `multipart/form-data` body with a `file` part and an
//! optional `local_file_path` text part. A request without a multipart body
//! analyzes the configured default document.

use std::path::PathBuf;
use std::time::Duration;

use axum::{
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        State,
    },
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::analyzer::{JobResult, DOCUMENT_ANALYZER, LAYOUT_ANALYZER};
use crate::document::DocumentSource;
use crate::models::{AnalysisRequest, AppState};
use crate::types::{AppError, AppResult};

const FILE_FIELD: &str = "file";
const LOCAL_PATH_FIELD: &str = "local_file_path";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/analyze/layout", post(analyze_layout))
        .route("/analyze/document", post(analyze_document))
        .with_state(state)
}

async fn analyze_layout(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<JobResult>> {
    let timeout = state.config.analysis.layout_timeout;
    run_analysis(&state, LAYOUT_ANALYZER, timeout, multipart).await
}

async fn analyze_document(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<JobResult>> {
    let timeout = state.config.analysis.document_timeout;
    run_analysis(&state, DOCUMENT_ANALYZER, timeout, multipart).await
}

async fn run_analysis(
    state: &AppState,
    analyzer: &'static str,
    timeout: Duration,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<JobResult>> {
    let request_id = Uuid::new_v4();
    let span = info_span!("analyze", %request_id, analyzer);

    async move {
        let source = read_form(multipart).await?;
        info!(source = %source.describe(), "Analysis request received");

        let data = source.load(&state.config.analysis).await?;
        let request = AnalysisRequest::new(analyzer, data, timeout);
        let result = state.analyzer.analyze(&request).await?;

        info!(status = result.raw_status(), "Analysis complete");
        Ok(Json(result))
    }
    .instrument(span)
    .await
}

async fn read_form(
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<DocumentSource> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        // No multipart content type at all: nothing was uploaded.
        Err(MultipartRejection::InvalidBoundary(_)) => return Ok(DocumentSource::Default),
        Err(rejection) => {
            return Err(AppError::Form {
                status: rejection.status(),
                message: rejection.body_text(),
            })
        }
    };

    let mut upload: Option<(Option<String>, Bytes)> = None;
    let mut local_path: Option<PathBuf> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(form_error)?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                let filename = field.file_name().map(str::to_string);
                let data = field.bytes().await.map_err(form_error)?;
                // Browsers send an empty, unnamed part when no file was picked.
                if data.is_empty() && filename.as_deref().map_or(true, str::is_empty) {
                    continue;
                }
                upload = Some((filename, data));
            }
            Some(LOCAL_PATH_FIELD) => {
                let value = field.text().await.map_err(form_error)?;
                let value = value.trim();
                if !value.is_empty() {
                    local_path = Some(PathBuf::from(value));
                }
            }
            other => debug!(field = ?other, "Ignoring unknown form field"),
        }
    }

    Ok(DocumentSource::resolve(upload, local_path))
}

fn form_error(err: MultipartError) -> AppError {
    AppError::Form {
        status: err.status(),
        message: err.body_text(),
    }
}
