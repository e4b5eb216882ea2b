use super::error::{ApiError, Result};
use super::AppState;
use crate::compose::CompositeSpec;
use crate::format::{self, TargetFormat};
use crate::pipeline::storage;
use crate::report::{CompressRequest, CompressResponse, ConvertRequest, ConvertResponse, MergeRequest, MergeResponse};
use crate::source::SourceFile;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::SemaphorePermit;

pub async fn index() -> impl IntoResponse {
    Json(json!({ "message": "Files Converter API is running!" }))
}

pub async fn convert(State(state): State<AppState>, Json(req): Json<ConvertRequest>) -> Result<impl IntoResponse> {
    if req.files.is_empty() {
        return Err(ApiError::BadRequest("No files provided for conversion".into()));
    }
    let target: TargetFormat = match req.output_format.as_deref().map(str::trim) {
        None | Some("") => return Err(ApiError::BadRequest("Output format not specified".into())),
        Some(raw) => raw
            .parse()
            .map_err(|e| ApiError::from_convert(e, "No files could be converted"))?,
    };
    tracing::info!("Convert request: {} file(s) to {}", req.files.len(), target);

    let files = confine_all(&state, req.files).await?;
    let _permit = admit(&state).await?;
    let result = state
        .converter
        .convert_batch(&files, target)
        .await
        .map_err(|e| ApiError::from_convert(e, "No files could be converted"))?;

    Ok(Json(ConvertResponse::from(&result)))
}

pub async fn merge(State(state): State<AppState>, Json(req): Json<MergeRequest>) -> Result<impl IntoResponse> {
    if req.files.is_empty() {
        return Err(ApiError::BadRequest("No files provided for merge".into()));
    }
    let mode = req.mode().map_err(|e| ApiError::from_convert(e, "Merge failed"))?;
    tracing::info!("Merge request: {} file(s) as {}", req.files.len(), mode);

    let files = confine_all(&state, req.files).await?;
    let _permit = admit(&state).await?;
    let merged = state
        .converter
        .assemble(&CompositeSpec::new(files, mode))
        .await
        .map_err(|e| ApiError::from_convert(e, "Merge failed"))?;

    Ok(Json(MergeResponse::from(&merged)))
}

pub async fn compress(State(state): State<AppState>, Json(req): Json<CompressRequest>) -> Result<impl IntoResponse> {
    let quality = req.quality().map_err(|e| ApiError::from_convert(e, "Compression failed"))?;
    if req.files.is_empty() {
        return Err(ApiError::BadRequest("No files provided for compression".into()));
    }
    tracing::info!("Compress request: {} file(s) at quality {}", req.files.len(), quality);

    let files = confine_all(&state, req.files).await?;
    let _permit = admit(&state).await?;
    let result = state
        .converter
        .compress_batch(&files, quality)
        .await
        .map_err(|e| ApiError::from_convert(e, "Compression failed"))?;

    Ok(Json(CompressResponse::from(&result)))
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub name: Option<String>,
}

pub async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response> {
    let not_found = || ApiError::FileNotFound {
        filename: filename.clone(),
    };
    let path = storage::resolve_download(state.converter.output_dir(), &filename)
        .await
        .ok_or_else(not_found)?;
    let bytes = tokio::fs::read(&path).await.map_err(|_| not_found())?;

    let display_name = query
        .name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(&filename);
    tracing::info!("Download {} as {:?} ({} bytes)", filename, display_name, bytes.len());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, format::mime_type(&filename))
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(header::CONTENT_DISPOSITION, content_disposition(display_name))
        .body(Body::from(bytes))
        .map_err(|e| ApiError::Failed {
            message: "Download failed".into(),
            detail: e.to_string(),
        })
}

/// `attachment; filename="..."` with characters that would break the
/// header value replaced.
fn content_disposition(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() || !c.is_ascii() => '_',
            c => c,
        })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

async fn admit(state: &AppState) -> Result<SemaphorePermit<'_>> {
    state.semaphore.acquire().await.map_err(|_| ApiError::Overloaded)
}

async fn confine_all(state: &AppState, files: Vec<SourceFile>) -> Result<Vec<SourceFile>> {
    let mut confined = Vec::with_capacity(files.len());
    for mut file in files {
        match state.confine_upload(&file.path).await {
            Some(path) => file.path = path,
            None => {
                tracing::warn!("Rejected upload path {}", file.path.display());
                return Err(ApiError::BadRequest(format!(
                    "File '{}' is outside the upload directory",
                    file.original_name
                )));
            }
        }
        confined.push(file);
    }
    Ok(confined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_is_quoted_and_sanitised() {
        assert_eq!(content_disposition("report.pdf"), "attachment; filename=\"report.pdf\"");
        assert_eq!(content_disposition("a\"b\r\n.pdf"), "attachment; filename=\"a_b__.pdf\"");
        assert_eq!(content_disposition("résumé.txt"), "attachment; filename=\"r_sum_.txt\"");
    }
}
