//! Batch conversion entry points.
//!
//! [`Converter`] owns the configuration and the codec set. It exposes the
//! per-file router ([`Converter::convert_one`]), the batch orchestrator
//! ([`Converter::convert_batch`]), image recompression
//! ([`Converter::compress_batch`]) and, in [`crate::compose`], the composite
//! assembler.
//!
//! A file that cannot be converted never ends the batch. It becomes an
//! `Err(FileError)` entry in the result, and only a batch in which *every*
//! file failed is reported as a fatal [`ConvertError::NoFilesConverted`].

use crate::codec::{Codec, CodecError, NativeCodec};
use crate::config::ConverterConfig;
use crate::error::{ConvertError, FailureReason, FileError};
use crate::format::{self, FormatFamily, TargetFormat};
use crate::output::{BatchResult, BatchStats, CompressedFile, CompressionResult, ConversionOutcome, ConvertedFile};
use crate::pipeline::{router, storage};
use crate::source::SourceFile;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Converts, compresses and merges files into the configured output directory.
///
/// Cheap to clone; clones share the codec set.
///
/// # Example
/// ```rust,no_run
/// use file_converter::{Converter, ConverterConfig, SourceFile, TargetFormat};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let converter = Converter::new(ConverterConfig::builder().output_dir("out").build()?);
/// let files = vec![SourceFile::from_path("report.docx").await?];
/// let result = converter.convert_batch(&files, TargetFormat::Html).await?;
/// for file in result.converted() {
///     println!("{} -> {}", file.source.original_name, file.output_filename);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Converter {
    pub(crate) config: ConverterConfig,
    pub(crate) codec: Arc<dyn Codec>,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("config", &self.config)
            .field("codec", &"<dyn Codec>")
            .finish()
    }
}

impl Converter {
    /// Converter backed by [`NativeCodec`].
    pub fn new(config: ConverterConfig) -> Self {
        let codec = Arc::new(NativeCodec::new(config.jpeg_quality));
        Self { config, codec }
    }

    /// Converter backed by a caller-supplied codec set.
    pub fn with_codec(config: ConverterConfig, codec: Arc<dyn Codec>) -> Self {
        Self { config, codec }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    pub(crate) async fn ensure_output_dir(&self) -> Result<(), ConvertError> {
        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|source| ConvertError::OutputDirUnavailable {
                path: self.config.output_dir.clone(),
                source,
            })
    }

    /// Run a codec call on the blocking pool under the per-call timeout.
    ///
    /// On timeout the call is abandoned, not cancelled: the blocking thread
    /// runs to completion and its result is dropped.
    pub(crate) async fn run_codec<T, F>(&self, f: F) -> Result<T, FailureReason>
    where
        F: FnOnce(&dyn Codec) -> Result<T, CodecError> + Send + 'static,
        T: Send + 'static,
    {
        let codec = Arc::clone(&self.codec);
        let secs = self.config.codec_timeout_secs;
        let task = tokio::task::spawn_blocking(move || f(&*codec));
        match tokio::time::timeout(Duration::from_secs(secs), task).await {
            Err(_) => Err(FailureReason::TimedOut { secs }),
            Ok(Err(join_err)) => Err(FailureReason::Panicked(join_err.to_string())),
            Ok(Ok(Err(codec_err))) => Err(FailureReason::Codec(codec_err.to_string())),
            Ok(Ok(Ok(value))) => Ok(value),
        }
    }

    /// Convert one file to `target`.
    ///
    /// Never panics and never returns a fatal error: every failure is a
    /// [`FileError`] naming the file.
    pub async fn convert_one(&self, file: &SourceFile, target: TargetFormat) -> ConversionOutcome {
        let name = file.original_name.as_str();

        // ── Step 1: Classify and select the codec op ────────────────────
        let (family, op) = match format::resolve(name, target) {
            Ok(resolved) => resolved,
            Err(ConvertError::UnsupportedConversion { extension, target }) => {
                return Err(FileError::UnsupportedConversion {
                    file: name.to_string(),
                    extension,
                    target,
                });
            }
            Err(other) => return Err(FileError::failed(name, FailureReason::Codec(other.to_string()))),
        };
        debug!("{}: {} -> {} via {:?}", name, family, target, op);

        // ── Step 2: Read the stored upload ──────────────────────────────
        let input = read_input(file).await.map_err(|r| FileError::failed(name, r))?;

        // ── Step 3: Transform ───────────────────────────────────────────
        let bytes = self
            .run_codec(move |codec| router::run_op(codec, op, &input))
            .await
            .map_err(|r| FileError::failed(name, r))?;

        // ── Step 4: Store atomically ────────────────────────────────────
        let output_filename = storage::output_filename("converted", &file.stem(), target.extension());
        let output_path = storage::write_artifact(&self.config.output_dir, &output_filename, &bytes)
            .await
            .map_err(|e| FileError::failed(name, FailureReason::Io(e.to_string())))?;

        // ── Step 5: Verify before reporting a size ──────────────────────
        let converted_size = storage::verify_artifact(&output_path)
            .await
            .map_err(|r| FileError::failed(name, r))?;

        Ok(ConvertedFile {
            source: file.clone(),
            target,
            output_path,
            output_filename,
            original_size: file.size,
            converted_size,
        })
    }

    /// Convert every file in `files` to `target`.
    ///
    /// Outcomes are returned in input order regardless of completion order.
    ///
    /// # Errors
    /// * [`ConvertError::EmptyBatch`] when `files` is empty
    /// * [`ConvertError::OutputDirUnavailable`] when the output directory
    ///   cannot be created
    /// * [`ConvertError::NoFilesConverted`] when every file failed
    pub async fn convert_batch(&self, files: &[SourceFile], target: TargetFormat) -> Result<BatchResult, ConvertError> {
        if files.is_empty() {
            return Err(ConvertError::EmptyBatch);
        }
        self.ensure_output_dir().await?;

        let start = Instant::now();
        info!("Converting {} file(s) to {}", files.len(), target);
        let outcomes = self
            .run_batch(files, |file| self.convert_one(file, target), |c: &ConvertedFile| c.converted_size)
            .await;

        let stats = BatchStats {
            total_files: files.len(),
            converted_files: outcomes.iter().filter(|o| o.is_ok()).count(),
            failed_files: outcomes.iter().filter(|o| o.is_err()).count(),
            original_bytes: outcomes.iter().flatten().map(|c| c.original_size).sum(),
            converted_bytes: outcomes.iter().flatten().map(|c: &ConvertedFile| c.converted_size).sum(),
            duration_ms: start.elapsed().as_millis() as u64,
        };
        check_any_succeeded(&outcomes, &stats)?;

        info!(
            "Batch complete: {}/{} converted, {}ms",
            stats.converted_files, stats.total_files, stats.duration_ms
        );
        Ok(BatchResult { outcomes, stats })
    }

    /// Re-encode images as JPEG at `quality` (1–100).
    ///
    /// Same isolation rules as [`Self::convert_batch`]: non-images fail on
    /// their own, and only an all-failed batch is fatal.
    pub async fn compress_batch(&self, files: &[SourceFile], quality: u8) -> Result<CompressionResult, ConvertError> {
        if !(1..=100).contains(&quality) {
            return Err(ConvertError::InvalidQuality(quality.to_string()));
        }
        if files.is_empty() {
            return Err(ConvertError::EmptyBatch);
        }
        self.ensure_output_dir().await?;

        let start = Instant::now();
        info!("Compressing {} file(s) at quality {}", files.len(), quality);
        let outcomes = self
            .run_batch(files, |file| self.compress_one(file, quality), |c: &CompressedFile| c.compressed_size)
            .await;

        let stats = BatchStats {
            total_files: files.len(),
            converted_files: outcomes.iter().filter(|o| o.is_ok()).count(),
            failed_files: outcomes.iter().filter(|o| o.is_err()).count(),
            original_bytes: outcomes.iter().flatten().map(|c| c.original_size).sum(),
            converted_bytes: outcomes.iter().flatten().map(|c: &CompressedFile| c.compressed_size).sum(),
            duration_ms: start.elapsed().as_millis() as u64,
        };
        check_any_succeeded(&outcomes, &stats)?;
        Ok(CompressionResult { outcomes, stats })
    }

    async fn compress_one(&self, file: &SourceFile, quality: u8) -> Result<CompressedFile, FileError> {
        let name = file.original_name.as_str();
        if file.family() != Some(FormatFamily::Image) {
            return Err(FileError::UnsupportedConversion {
                file: name.to_string(),
                extension: file.extension(),
                target: "jpg".into(),
            });
        }

        let input = read_input(file).await.map_err(|r| FileError::failed(name, r))?;
        let bytes = self
            .run_codec(move |codec| codec.compress_image(&input, quality))
            .await
            .map_err(|r| FileError::failed(name, r))?;

        let output_filename = storage::output_filename("compressed", &file.stem(), "jpg");
        let output_path = storage::write_artifact(&self.config.output_dir, &output_filename, &bytes)
            .await
            .map_err(|e| FileError::failed(name, FailureReason::Io(e.to_string())))?;
        let compressed_size = storage::verify_artifact(&output_path)
            .await
            .map_err(|r| FileError::failed(name, r))?;

        Ok(CompressedFile {
            source: file.clone(),
            output_path,
            output_filename,
            original_size: file.size,
            compressed_size,
        })
    }

    /// Drive `job` over `files` with bounded concurrency, firing progress
    /// events and logging each isolated failure.
    async fn run_batch<'a, T, Fut>(
        &'a self,
        files: &'a [SourceFile],
        job: impl Fn(&'a SourceFile) -> Fut,
        artifact_size: impl Fn(&T) -> u64,
    ) -> Vec<Result<T, FileError>>
    where
        Fut: Future<Output = Result<T, FileError>> + 'a,
    {
        let total = files.len();
        let callback = self.config.progress_callback.as_ref();
        if let Some(cb) = callback {
            cb.on_batch_start(total);
        }

        // Futures are built up front so no closure-bearing adaptor ends up in
        // the returned future; start events fire when `buffered` first polls.
        let mut jobs = Vec::with_capacity(total);
        for (i, file) in files.iter().enumerate() {
            let index = i + 1;
            let fut = job(file);
            jobs.push(async move {
                if let Some(cb) = callback {
                    cb.on_file_start(index, total, &file.original_name);
                }
                (index, file, fut.await)
            });
        }

        let mut running = stream::iter(jobs).buffered(self.config.concurrency.max(1));
        let mut outcomes: Vec<Result<T, FileError>> = Vec::with_capacity(total);
        while let Some((index, file, outcome)) = running.next().await {
            match &outcome {
                Ok(artifact) => {
                    let size = artifact_size(artifact);
                    debug!("{}: done ({} bytes)", file.original_name, size);
                    if let Some(cb) = callback {
                        cb.on_file_complete(index, total, &file.original_name, size);
                    }
                }
                Err(e) => {
                    warn!("Skipping {}: {}", file.original_name, e);
                    if let Some(cb) = callback {
                        cb.on_file_error(index, total, &file.original_name, &e.to_string());
                    }
                }
            }
            outcomes.push(outcome);
        }

        if let Some(cb) = callback {
            cb.on_batch_complete(total, outcomes.iter().filter(|o| o.is_ok()).count());
        }
        outcomes
    }
}

async fn read_input(file: &SourceFile) -> Result<Vec<u8>, FailureReason> {
    tokio::fs::read(&file.path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => FailureReason::InputMissing {
            path: file.path.display().to_string(),
        },
        _ => FailureReason::Io(e.to_string()),
    })
}

fn check_any_succeeded<T>(outcomes: &[Result<T, FileError>], stats: &BatchStats) -> Result<(), ConvertError> {
    if stats.converted_files > 0 {
        return Ok(());
    }
    let first_error = outcomes
        .iter()
        .find_map(|o| o.as_ref().err())
        .map(|e| e.to_string())
        .unwrap_or_else(|| "Unknown error".to_string());
    warn!("No files converted out of {}", stats.total_files);
    Err(ConvertError::NoFilesConverted {
        total: stats.total_files,
        first_error,
    })
}
