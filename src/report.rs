//! Wire shapes for the HTTP boundary.
//!
//! Requests carry the upload collaborator's file records verbatim; responses
//! echo those records back with the conversion fields added, so a client can
//! match results to what it sent without keeping its own index.

use crate::compose::CompositionMode;
use crate::error::{ConvertError, FileError};
use crate::output::{BatchResult, CompressedFile, CompressionResult, ConvertedFile, MergedFile, SkippedInput};
use crate::source::SourceFile;
use serde::{Deserialize, Serialize};

/// Compression quality used when a request does not name one.
pub const DEFAULT_QUALITY: u8 = 80;

/// Relative URL a stored artifact is served from.
pub fn download_url(filename: &str) -> String {
    format!("/api/download/{filename}")
}

// ── Requests ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    #[serde(default)]
    pub files: Vec<SourceFile>,
    #[serde(default)]
    pub output_format: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    #[serde(default)]
    pub files: Vec<SourceFile>,
    #[serde(default)]
    pub merge_type: Option<String>,
}

impl MergeRequest {
    /// Parse `mergeType`; absent or unknown values are rejected.
    pub fn mode(&self) -> Result<CompositionMode, ConvertError> {
        self.merge_type
            .as_deref()
            .unwrap_or_default()
            .parse()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressRequest {
    #[serde(default)]
    pub files: Vec<SourceFile>,
    #[serde(default)]
    pub quality: Option<Quality>,
}

/// Quality as clients send it: `75` or `"75"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Quality {
    Number(f64),
    Text(String),
}

impl Quality {
    /// Integer quality in 1–100.
    ///
    /// Numbers are truncated. Strings are read up to the first non-digit,
    /// so `"75%"` is 75 and `"abc"` is rejected.
    pub fn resolve(&self) -> Result<u8, ConvertError> {
        let invalid = || ConvertError::InvalidQuality(self.to_string());
        let value = match self {
            Quality::Number(n) if n.is_finite() => n.trunc() as i64,
            Quality::Number(_) => return Err(invalid()),
            Quality::Text(s) => leading_integer(s).ok_or_else(invalid)?,
        };
        u8::try_from(value)
            .ok()
            .filter(|q| (1..=100).contains(q))
            .ok_or_else(invalid)
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quality::Number(n) => write!(f, "{n}"),
            Quality::Text(s) => f.write_str(s),
        }
    }
}

impl CompressRequest {
    pub fn quality(&self) -> Result<u8, ConvertError> {
        self.quality
            .as_ref()
            .map_or(Ok(DEFAULT_QUALITY), Quality::resolve)
    }
}

fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

// ── Responses ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub success: bool,
    pub message: String,
    pub converted_files: Vec<ConvertedFileReport>,
    pub failed_files: Vec<FailedFileReport>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedFileReport {
    #[serde(flatten)]
    pub source: SourceFile,
    pub converted_format: String,
    pub converted_filename: String,
    pub download_url: String,
    pub original_size: u64,
    pub converted_size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedFileReport {
    pub originalname: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResponse {
    pub success: bool,
    pub message: String,
    pub merged_file: MergedFileReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedFileReport {
    pub filename: String,
    pub download_url: String,
    pub original_total_size: u64,
    pub merged_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_files: Vec<SkippedInput>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressResponse {
    pub success: bool,
    pub message: String,
    pub compressed_files: Vec<CompressedFileReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_files: Vec<FailedFileReport>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressedFileReport {
    #[serde(flatten)]
    pub source: SourceFile,
    pub compressed_filename: String,
    pub download_url: String,
    pub original_size: u64,
    pub compressed_size: u64,
    /// Percent saved, one decimal place.
    pub compression_ratio: String,
}

impl From<&ConvertedFile> for ConvertedFileReport {
    fn from(file: &ConvertedFile) -> Self {
        Self {
            source: file.source.clone(),
            converted_format: file.target.to_string(),
            converted_filename: file.output_filename.clone(),
            download_url: download_url(&file.output_filename),
            original_size: file.original_size,
            converted_size: file.converted_size,
        }
    }
}

impl From<&FileError> for FailedFileReport {
    fn from(err: &FileError) -> Self {
        Self {
            originalname: err.file().to_string(),
            error: err.to_string(),
        }
    }
}

impl From<&BatchResult> for ConvertResponse {
    fn from(result: &BatchResult) -> Self {
        let converted_files: Vec<ConvertedFileReport> = result.converted().map(Into::into).collect();
        Self {
            success: true,
            message: format!("{} files converted successfully", converted_files.len()),
            converted_files,
            failed_files: result.failures().map(Into::into).collect(),
        }
    }
}

impl From<&MergedFile> for MergedFileReport {
    fn from(merged: &MergedFile) -> Self {
        Self {
            filename: merged.filename.clone(),
            download_url: download_url(&merged.filename),
            original_total_size: merged.original_total_size,
            merged_size: merged.merged_size,
            page_count: merged.page_count,
            skipped_files: merged.skipped.clone(),
        }
    }
}

impl From<&MergedFile> for MergeResponse {
    fn from(merged: &MergedFile) -> Self {
        Self {
            success: true,
            message: "Files merged successfully".to_string(),
            merged_file: merged.into(),
        }
    }
}

impl From<&CompressedFile> for CompressedFileReport {
    fn from(file: &CompressedFile) -> Self {
        Self {
            source: file.source.clone(),
            compressed_filename: file.output_filename.clone(),
            download_url: download_url(&file.output_filename),
            original_size: file.original_size,
            compressed_size: file.compressed_size,
            compression_ratio: format!("{:.1}", file.compression_ratio()),
        }
    }
}

impl From<&CompressionResult> for CompressResponse {
    fn from(result: &CompressionResult) -> Self {
        Self {
            success: true,
            message: "Images compressed successfully".to_string(),
            compressed_files: result.compressed().map(Into::into).collect(),
            failed_files: result.failures().map(Into::into).collect(),
        }
    }
}
