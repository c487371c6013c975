// Error type shared by the credential, analyzer and route layers

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::{error, warn};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Non-success answer from the remote service. Status and body are relayed verbatim.
    #[error("Upstream service responded with status {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The remote job reached `failed` or `canceled`.
    #[error("Analyzer job ended with status {status}")]
    JobFailed { status: String, result: Value },

    #[error("Analyzer result polling timed out")]
    Timeout,

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Multipart body could not be read. Keeps the extractor's status, e.g. 413 over the body limit.
    #[error("Invalid form data: {message}")]
    Form { status: StatusCode, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Form { status, .. } => *status,
            AppError::JobFailed { .. }
            | AppError::Credential(_)
            | AppError::Http(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Value placed under `detail` in the error body.
    pub fn detail(&self) -> Value {
        match self {
            AppError::Upstream { body, .. } => Value::String(body.clone()),
            AppError::JobFailed { result, .. } => result.clone(),
            AppError::InvalidRequest(msg) | AppError::Internal(msg) => Value::String(msg.clone()),
            AppError::Form { message, .. } => Value::String(message.clone()),
            other => Value::String(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}
