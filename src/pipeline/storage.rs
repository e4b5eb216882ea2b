//! Artifact naming, atomic writes and download lookup.
//!
//! Names embed a millisecond timestamp plus a short random suffix, so two
//! requests finishing in the same millisecond still get distinct artifacts.

use crate::error::FailureReason;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Longest stem kept from an original name.
const MAX_STEM_CHARS: usize = 80;

/// `{millis}-{8 hex chars}`.
pub fn stamp() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let id = Uuid::new_v4().simple().to_string();
    format!("{millis}-{}", &id[..8])
}

/// Keep a stem safe to use as a path component and in a URL.
fn sanitize_stem(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .take(MAX_STEM_CHARS)
        .collect();
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `{prefix}-{stamp}-{stem}.{ext}`, e.g. `converted-1718000000000-1a2b3c4d-report.html`.
pub fn output_filename(prefix: &str, stem: &str, ext: &str) -> String {
    format!("{prefix}-{}-{}.{ext}", stamp(), sanitize_stem(stem))
}

/// `merged-{stamp}.{ext}`.
pub fn merged_filename(ext: &str) -> String {
    format!("merged-{}.{ext}", stamp())
}

/// Write `bytes` to `dir/filename` via a temp file and rename, so readers
/// never observe a partial artifact.
pub async fn write_artifact(dir: &Path, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(filename);
    let tmp_path = dir.join(format!(".{filename}.tmp"));
    tokio::fs::write(&tmp_path, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

/// Confirm the artifact exists and is non-empty, returning its length.
///
/// A zero-length artifact is removed before failing.
pub async fn verify_artifact(path: &Path) -> Result<u64, FailureReason> {
    let missing = || FailureReason::MissingOutput {
        output: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(meta.len()),
        Ok(meta) => {
            if meta.is_file() {
                warn!("Removing empty artifact {}", path.display());
                let _ = tokio::fs::remove_file(path).await;
            }
            Err(missing())
        }
        Err(_) => Err(missing()),
    }
}

/// True for a bare file name: no separators, no `..`, not hidden.
pub fn is_plain_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains(['/', '\\', '\0'])
        && !filename.contains("..")
        && !filename.starts_with('.')
}

/// Resolve a download request to a stored artifact inside `output_dir`.
///
/// Anything that is not a plain file name, or does not name an existing
/// file, resolves to `None`.
pub async fn resolve_download(output_dir: &Path, filename: &str) -> Option<PathBuf> {
    if !is_plain_filename(filename) {
        warn!("Rejected download name {:?}", filename);
        return None;
    }
    let path = output_dir.join(filename);
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Some(path),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_pattern() {
        let name = output_filename("converted", "Quarterly Report", "html");
        assert!(name.starts_with("converted-"), "{name}");
        assert!(name.ends_with("-Quarterly_Report.html"), "{name}");
        assert!(merged_filename("pdf").starts_with("merged-"));
        assert_ne!(merged_filename("pdf"), merged_filename("pdf"));
    }

    #[test]
    fn stems_are_sanitised() {
        assert_eq!(sanitize_stem("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_stem("..."), "file");
        assert_eq!(sanitize_stem("résumé"), "r_sum_");
        assert_eq!(sanitize_stem(&"a".repeat(200)).len(), MAX_STEM_CHARS);
    }

    #[test]
    fn plain_filenames() {
        assert!(is_plain_filename("converted-1-abc-x.pdf"));
        assert!(!is_plain_filename("../secret"));
        assert!(!is_plain_filename("a/b.pdf"));
        assert!(!is_plain_filename("a\\b.pdf"));
        assert!(!is_plain_filename(".a.pdf.tmp"));
        assert!(!is_plain_filename(""));
    }

    #[tokio::test]
    async fn write_then_verify() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested");
        let path = write_artifact(&out, "a.txt", b"abc").await.unwrap();
        assert_eq!(verify_artifact(&path).await.unwrap(), 3);
        assert!(!out.join(".a.txt.tmp").exists());
    }

    #[tokio::test]
    async fn empty_artifact_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_artifact(dir.path(), "empty.txt", b"").await.unwrap();
        let err = verify_artifact(&path).await.unwrap_err();
        assert!(matches!(err, FailureReason::MissingOutput { .. }));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn download_resolution() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("ok.pdf"), b"x").await.unwrap();
        assert!(resolve_download(dir.path(), "ok.pdf").await.is_some());
        assert!(resolve_download(dir.path(), "missing.pdf").await.is_none());
        assert!(resolve_download(dir.path(), "../ok.pdf").await.is_none());
    }
}
