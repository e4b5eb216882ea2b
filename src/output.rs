//! Result types produced by the orchestrator and the assembler.

use crate::compose::CompositionMode;
use crate::error::FileError;
use crate::format::TargetFormat;
use crate::source::SourceFile;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One successfully converted file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertedFile {
    pub source: SourceFile,
    pub target: TargetFormat,
    pub output_path: PathBuf,
    /// Bare file name of the artifact inside the output directory.
    pub output_filename: String,
    /// Declared input size in bytes.
    pub original_size: u64,
    /// Stored artifact length in bytes; measured after the artifact exists.
    pub converted_size: u64,
}

/// Per-file result of a batch conversion.
pub type ConversionOutcome = Result<ConvertedFile, FileError>;

/// Result of [`crate::Converter::convert_batch`].
///
/// `outcomes` holds one entry per input file, in input order.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub outcomes: Vec<ConversionOutcome>,
    pub stats: BatchStats,
}

impl BatchResult {
    pub fn converted(&self) -> impl Iterator<Item = &ConvertedFile> {
        self.outcomes.iter().filter_map(|o| o.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileError> {
        self.outcomes.iter().filter_map(|o| o.as_ref().err())
    }

    pub fn into_converted(self) -> Vec<ConvertedFile> {
        self.outcomes.into_iter().filter_map(Result::ok).collect()
    }
}

/// Aggregate numbers for a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_files: usize,
    pub converted_files: usize,
    pub failed_files: usize,
    /// Sum of declared sizes of the converted inputs.
    pub original_bytes: u64,
    pub converted_bytes: u64,
    pub duration_ms: u64,
}

/// The single artifact produced by [`crate::Converter::assemble`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedFile {
    pub mode: CompositionMode,
    pub output_path: PathBuf,
    pub filename: String,
    /// Sum of the declared sizes of every input in the spec.
    pub original_total_size: u64,
    pub merged_size: u64,
    /// Page count for PDF outputs.
    pub page_count: Option<usize>,
    /// Inputs left out of a text concatenation.
    pub skipped: Vec<SkippedInput>,
}

/// An input the assembler did not use, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedInput {
    pub file: String,
    pub reason: String,
}

/// One recompressed image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressedFile {
    pub source: SourceFile,
    pub output_path: PathBuf,
    pub output_filename: String,
    pub original_size: u64,
    pub compressed_size: u64,
}

impl CompressedFile {
    /// Size reduction in percent; negative when the output grew, 0 for an
    /// empty original.
    pub fn compression_ratio(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        let original = self.original_size as f64;
        (original - self.compressed_size as f64) / original * 100.0
    }
}

/// Result of [`crate::Converter::compress_batch`], in input order.
#[derive(Debug, Clone)]
pub struct CompressionResult {
    pub outcomes: Vec<Result<CompressedFile, FileError>>,
    pub stats: BatchStats,
}

impl CompressionResult {
    pub fn compressed(&self) -> impl Iterator<Item = &CompressedFile> {
        self.outcomes.iter().filter_map(|o| o.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileError> {
        self.outcomes.iter().filter_map(|o| o.as_ref().err())
    }
}
