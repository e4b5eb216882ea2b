//! Uploaded files as the core sees them.

use crate::format::{self, FormatFamily};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A file already placed on local storage by the upload step.
///
/// Immutable once created. Field names on the wire follow the upload
/// collaborator (`originalname`, `mimetype`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Where the bytes live.
    pub path: PathBuf,
    /// Name the client uploaded the file under. Drives classification.
    #[serde(rename = "originalname")]
    pub original_name: String,
    /// Declared size in bytes.
    #[serde(default)]
    pub size: u64,
    /// Storage name chosen by the upload step, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, original_name: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            original_name: original_name.into(),
            size,
            filename: None,
            mimetype: None,
        }
    }

    /// Describe an existing local file, taking its size from the filesystem.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let meta = tokio::fs::metadata(path).await?;
        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            path: path.to_path_buf(),
            filename: Some(original_name.clone()),
            original_name,
            size: meta.len(),
            mimetype: None,
        })
    }

    /// Lowercased extension of the original name.
    pub fn extension(&self) -> String {
        format::extension_of(&self.original_name)
    }

    pub fn family(&self) -> Option<FormatFamily> {
        format::classify(&self.original_name)
    }

    /// Original name without its extension.
    pub fn stem(&self) -> String {
        Path::new(&self.original_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.original_name.clone())
    }
}
