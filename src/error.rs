//! Error types for the file-converter library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ConvertError`] — **Fatal**: the call cannot produce what was asked
//!   for (every file in a batch failed, a composite merge aborted, the output
//!   directory is unusable). Returned as `Err(ConvertError)` from the
//!   top-level [`crate::Converter`] methods.
//!
//! * [`FileError`] — **Non-fatal**: a single file in a batch failed (unknown
//!   extension, codec error, timeout) but the rest of the batch is fine.
//!   Stored inside [`crate::output::BatchResult`] so callers can inspect
//!   partial success rather than losing the whole batch to one bad file.

use crate::compose::CompositionStage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the file-converter library.
///
/// Per-file failures use [`FileError`] and are stored in
/// [`crate::output::BatchResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Classification errors ─────────────────────────────────────────────
    /// The (family, target) pair is not in the compatibility table, or the
    /// extension is not recognised at all.
    #[error("Unsupported conversion: '{}' to '{target}'", display_extension(.extension))]
    UnsupportedConversion { extension: String, target: String },

    /// The requested output format is not one this service produces.
    #[error("Unknown output format '{0}'")]
    UnknownFormat(String),

    /// The requested merge mode is not one of `pdf`, `images`, `docs`.
    #[error("Unknown merge type '{0}'")]
    UnknownMergeType(String),

    /// Compression quality outside 1–100 or not a number.
    #[error("Invalid quality '{0}': expected a number from 1 to 100")]
    InvalidQuality(String),

    // ── Batch errors ──────────────────────────────────────────────────────
    /// The request carried no files.
    #[error("No files provided for conversion")]
    EmptyBatch,

    /// Every file in the batch failed; there is nothing to return.
    #[error("No files could be converted ({total} attempted).\nFirst error: {first_error}")]
    NoFilesConverted { total: usize, first_error: String },

    // ── Composition errors ────────────────────────────────────────────────
    /// An all-or-nothing composite assembly aborted.
    #[error("Composition failed during {stage}{}: {reason}", display_input(.input))]
    CompositionFailed {
        stage: CompositionStage,
        input: Option<String>,
        reason: String,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create the output directory.
    #[error("Failed to prepare output directory '{path}': {source}")]
    OutputDirUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn display_extension(ext: &str) -> String {
    if ext.is_empty() {
        "(no extension)".to_string()
    } else {
        format!(".{ext}")
    }
}

fn display_input(input: &Option<String>) -> String {
    input
        .as_deref()
        .map(|name| format!(" on '{name}'"))
        .unwrap_or_default()
}

/// A non-fatal error for a single file in a batch.
///
/// The overall batch continues unless ALL files fail.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
pub enum FileError {
    /// The classifier rejected this file for the requested target.
    #[error("{file}: unsupported conversion '{}' to '{target}'", display_extension(.extension))]
    UnsupportedConversion {
        file: String,
        extension: String,
        target: String,
    },

    /// The codec call or its output handling failed.
    #[error("{file}: conversion failed: {reason}")]
    ConversionFailed { file: String, reason: FailureReason },
}

impl FileError {
    /// Original name of the file this error belongs to.
    pub fn file(&self) -> &str {
        match self {
            FileError::UnsupportedConversion { file, .. } => file,
            FileError::ConversionFailed { file, .. } => file,
        }
    }

    pub(crate) fn failed(file: impl Into<String>, reason: FailureReason) -> Self {
        FileError::ConversionFailed {
            file: file.into(),
            reason,
        }
    }
}

/// Why a supported conversion still failed.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
pub enum FailureReason {
    /// The stored upload is gone.
    #[error("input file not found at '{path}'")]
    InputMissing { path: String },

    /// The codec raised an error.
    #[error("{0}")]
    Codec(String),

    /// The codec call did not finish within the configured timeout.
    #[error("codec call timed out after {secs}s")]
    TimedOut { secs: u64 },

    /// The codec reported success but the artifact is absent or empty.
    #[error("output file '{output}' was not created or is empty")]
    MissingOutput { output: String },

    /// Reading the input or writing the artifact failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// The blocking codec task panicked.
    #[error("codec task panicked: {0}")]
    Panicked(String),
}
