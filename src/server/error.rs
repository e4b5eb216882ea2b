use crate::error::ConvertError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failure of an HTTP request, rendered as `{ success: false, message, error }`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request itself is unusable (no files, unknown format, bad quality).
    #[error("{0}")]
    BadRequest(String),

    /// Download of an artifact that is not in the output directory.
    #[error("File not found")]
    FileNotFound { filename: String },

    #[error("Service overloaded, please try again later")]
    Overloaded,

    /// The operation ran but produced nothing. `message` is the endpoint's
    /// summary line, `detail` the underlying error.
    #[error("{message}: {detail}")]
    Failed { message: String, detail: String },
}

impl ApiError {
    /// Map a library error, using `message` as the summary for server-side
    /// failures. Caller mistakes become 400s.
    pub fn from_convert(err: ConvertError, message: &str) -> Self {
        match err {
            ConvertError::EmptyBatch
            | ConvertError::UnknownFormat(_)
            | ConvertError::UnknownMergeType(_)
            | ConvertError::InvalidQuality(_)
            | ConvertError::UnsupportedConversion { .. } => ApiError::BadRequest(err.to_string()),
            other => ApiError::Failed {
                message: message.to_string(),
                detail: other.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, error) = match self {
            ApiError::FileNotFound { filename } => {
                let body = Json(json!({
                    "error": "File not found",
                    "filename": filename,
                }));
                return (StatusCode::NOT_FOUND, body).into_response();
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone(), message),
            ApiError::Overloaded => {
                let message = ApiError::Overloaded.to_string();
                (StatusCode::SERVICE_UNAVAILABLE, message.clone(), message)
            }
            ApiError::Failed { message, detail } => {
                tracing::error!("{}: {}", message, detail);
                (StatusCode::INTERNAL_SERVER_ERROR, message, detail)
            }
        };

        let body = Json(json!({
            "success": false,
            "message": message,
            "error": error,
        }));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
