//! # file-converter
//!
//! Batch conversion of documents, spreadsheets and images, plus composite
//! assembly of many inputs into one artifact (merged PDF, image-stack PDF,
//! concatenated text).
//!
//! ## Pipeline Overview
//!
//! ```text
//! SourceFile[]
//!  │
//!  ├─ 1. Classify  extension → FormatFamily, (family, target) → CodecOp
//!  ├─ 2. Route     CodecOp → codec calls (CPU-bound, spawn_blocking + timeout)
//!  ├─ 3. Store     atomic write into the output directory, then verify
//!  └─ 4. Report    per-file outcomes in input order + size metrics
//! ```
//!
//! A file that fails never ends its batch; it becomes an `Err` outcome.
//! Composite assembly is the opposite: any bad input aborts the merge.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use file_converter::{Converter, ConverterConfig, SourceFile, TargetFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = Converter::new(ConverterConfig::default());
//!     let files = vec![
//!         SourceFile::from_path("notes.docx").await?,
//!         SourceFile::from_path("photo.png").await?,
//!     ];
//!     let result = converter.convert_batch(&files, TargetFormat::Html).await?;
//!     for failure in result.failures() {
//!         eprintln!("skipped: {failure}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Conversions
//!
//! | Family | Extensions | Targets |
//! |--------|------------|---------|
//! | Image | jpg jpeg png gif webp | jpg, jpeg, png, webp, pdf |
//! | Document | docx | html, txt |
//! | Plain text | txt | html |
//! | Spreadsheet | xlsx xls | csv, json |
//! | Delimited text | csv | xlsx |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `server` | on | HTTP API (axum + tower-http) |
//! | `cli`    | on | The `file-converter` binary (clap + anyhow + tracing-subscriber + indicatif); implies `server` |
//!
//! Library only:
//! ```toml
//! file-converter = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod codec;
pub mod compose;
pub mod config;
pub mod convert;
pub mod error;
pub mod format;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod report;
#[cfg(feature = "server")]
pub mod server;
pub mod source;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use codec::{Codec, CodecError, NativeCodec};
pub use compose::{CompositeSpec, CompositionMode, CompositionStage, TEXT_DELIMITER};
pub use config::{ConverterConfig, ConverterConfigBuilder};
pub use convert::Converter;
pub use error::{ConvertError, FailureReason, FileError};
pub use format::{FormatFamily, TargetFormat};
pub use output::{
    BatchResult, BatchStats, CompressedFile, CompressionResult, ConversionOutcome, ConvertedFile, MergedFile,
    SkippedInput,
};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use source::SourceFile;
