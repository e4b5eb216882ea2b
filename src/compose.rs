//! Composite document assembly: many inputs, exactly one artifact.
//!
//! Unlike a batch conversion, a composite is all-or-nothing. One unreadable
//! input aborts the whole merge and no artifact is written. Failures carry
//! the stage they happened in and, when known, the input that caused them.
//!
//! ```text
//! Received ──▶ Validating ──▶ Composing ──▶ Done
//!                  │               │
//!                  └──────┬────────┘
//!                         ▼
//!                       Failed
//! ```

use crate::codec::{Codec, CodecError, EmbeddedImage, LoadedPdf, PdfPage};
use crate::convert::Converter;
use crate::error::{ConvertError, FailureReason};
use crate::format::FormatFamily;
use crate::output::{MergedFile, SkippedInput};
use crate::pipeline::layout::PageLayout;
use crate::pipeline::storage;
use crate::source::SourceFile;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Written after each concatenated text input.
pub const TEXT_DELIMITER: &str = "\n\n---\n\n";

/// How the inputs of a composite are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompositionMode {
    /// Every page of every PDF, in input order.
    #[serde(rename = "pdf")]
    PdfMerge,
    /// One A4 page per image, scaled and centred.
    #[serde(rename = "images")]
    ImageStackToPdf,
    /// Plain-text inputs joined with [`TEXT_DELIMITER`].
    #[serde(rename = "docs")]
    TextConcat,
}

impl CompositionMode {
    /// Extension of the artifact this mode produces.
    pub fn extension(self) -> &'static str {
        match self {
            CompositionMode::PdfMerge | CompositionMode::ImageStackToPdf => "pdf",
            CompositionMode::TextConcat => "txt",
        }
    }
}

impl fmt::Display for CompositionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompositionMode::PdfMerge => "pdf",
            CompositionMode::ImageStackToPdf => "images",
            CompositionMode::TextConcat => "docs",
        })
    }
}

impl FromStr for CompositionMode {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(CompositionMode::PdfMerge),
            "images" => Ok(CompositionMode::ImageStackToPdf),
            "docs" => Ok(CompositionMode::TextConcat),
            _ => Err(ConvertError::UnknownMergeType(s.to_string())),
        }
    }
}

/// Lifecycle stage of an assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositionStage {
    Received,
    Validating,
    Composing,
    Done,
    Failed,
}

impl fmt::Display for CompositionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompositionStage::Received => "received",
            CompositionStage::Validating => "validating",
            CompositionStage::Composing => "composing",
            CompositionStage::Done => "done",
            CompositionStage::Failed => "failed",
        })
    }
}

/// Ordered inputs plus the way to combine them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeSpec {
    pub inputs: Vec<SourceFile>,
    pub mode: CompositionMode,
}

impl CompositeSpec {
    pub fn new(inputs: Vec<SourceFile>, mode: CompositionMode) -> Self {
        Self { inputs, mode }
    }
}

fn failed(stage: CompositionStage, input: Option<&SourceFile>, reason: impl ToString) -> ConvertError {
    ConvertError::CompositionFailed {
        stage,
        input: input.map(|f| f.original_name.clone()),
        reason: reason.to_string(),
    }
}

fn composing(input: &SourceFile, reason: impl ToString) -> ConvertError {
    failed(CompositionStage::Composing, Some(input), reason)
}

impl Converter {
    /// Combine `spec.inputs` into a single artifact.
    ///
    /// # Errors
    /// [`ConvertError::CompositionFailed`] for any validation or composition
    /// failure; [`ConvertError::OutputDirUnavailable`] when the output
    /// directory cannot be created.
    pub async fn assemble(&self, spec: &CompositeSpec) -> Result<MergedFile, ConvertError> {
        info!(
            "Assembling {} input(s) as '{}' ({})",
            spec.inputs.len(),
            spec.mode,
            CompositionStage::Received
        );

        let result = self.assemble_inner(spec).await;
        match &result {
            Ok(merged) => info!(
                "Composite {} {}: {} bytes",
                merged.filename,
                CompositionStage::Done,
                merged.merged_size
            ),
            Err(e) => warn!("Composite {}: {}", CompositionStage::Failed, e),
        }
        result
    }

    async fn assemble_inner(&self, spec: &CompositeSpec) -> Result<MergedFile, ConvertError> {
        self.validate(spec).await?;
        self.ensure_output_dir().await?;

        debug!("Composite stage: {}", CompositionStage::Composing);
        let (bytes, page_count, skipped) = match spec.mode {
            CompositionMode::PdfMerge => {
                let (bytes, pages) = self.merge_pdfs(&spec.inputs).await?;
                (bytes, Some(pages), Vec::new())
            }
            CompositionMode::ImageStackToPdf => {
                let (bytes, pages) = self.stack_images(&spec.inputs).await?;
                (bytes, Some(pages), Vec::new())
            }
            CompositionMode::TextConcat => {
                let (bytes, skipped) = self.concat_text(&spec.inputs).await?;
                (bytes, None, skipped)
            }
        };

        let filename = storage::merged_filename(spec.mode.extension());
        let output_path = storage::write_artifact(&self.config.output_dir, &filename, &bytes)
            .await
            .map_err(|e| failed(CompositionStage::Composing, None, format!("failed to write output: {e}")))?;
        let merged_size = storage::verify_artifact(&output_path)
            .await
            .map_err(|r| failed(CompositionStage::Composing, None, r))?;

        Ok(MergedFile {
            mode: spec.mode,
            output_path,
            filename,
            original_total_size: spec.inputs.iter().map(|f| f.size).sum(),
            merged_size,
            page_count,
            skipped,
        })
    }

    async fn validate(&self, spec: &CompositeSpec) -> Result<(), ConvertError> {
        let stage = CompositionStage::Validating;
        if spec.inputs.is_empty() {
            return Err(failed(stage, None, "no input files"));
        }
        for input in &spec.inputs {
            match tokio::fs::metadata(&input.path).await {
                Ok(meta) if meta.is_file() => {}
                _ => return Err(failed(stage, Some(input), "input file not found")),
            }
        }
        match spec.mode {
            CompositionMode::ImageStackToPdf => {
                if let Some(input) = spec.inputs.iter().find(|f| f.family() != Some(FormatFamily::Image)) {
                    return Err(failed(stage, Some(input), "not an image"));
                }
            }
            CompositionMode::TextConcat => {
                if !spec.inputs.iter().any(|f| f.family() == Some(FormatFamily::PlainText)) {
                    return Err(failed(stage, None, "no plain-text (.txt) inputs"));
                }
            }
            CompositionMode::PdfMerge => {}
        }
        Ok(())
    }

    /// Decode each input concurrently, keeping input order. The first
    /// failure in input order wins.
    async fn decode_all<T>(
        &self,
        inputs: &[SourceFile],
        decode: fn(&dyn Codec, &[u8]) -> Result<T, CodecError>,
    ) -> Result<Vec<T>, ConvertError>
    where
        T: Send + 'static,
    {
        let mut jobs = Vec::with_capacity(inputs.len());
        for input in inputs {
            jobs.push(async move {
                let bytes = tokio::fs::read(&input.path)
                    .await
                    .map_err(|e| composing(input, FailureReason::Io(e.to_string())))?;
                self.run_codec(move |codec| decode(codec, &bytes))
                    .await
                    .map_err(|r| composing(input, r))
            });
        }

        let mut running = stream::iter(jobs).buffered(self.config.concurrency.max(1));
        let mut decoded = Vec::with_capacity(inputs.len());
        while let Some(result) = running.next().await {
            decoded.push(result?);
        }
        Ok(decoded)
    }

    async fn merge_pdfs(&self, inputs: &[SourceFile]) -> Result<(Vec<u8>, usize), ConvertError> {
        let loaded: Vec<LoadedPdf> = self
            .decode_all(inputs, |codec, bytes| codec.load_pdf(bytes))
            .await?;
        for (input, pdf) in inputs.iter().zip(&loaded) {
            debug!("{}: {} page(s)", input.original_name, pdf.page_count);
        }
        let pages = loaded.into_iter().map(PdfPage::Document).collect();
        self.compose(pages).await
    }

    async fn stack_images(&self, inputs: &[SourceFile]) -> Result<(Vec<u8>, usize), ConvertError> {
        let images: Vec<EmbeddedImage> = self
            .decode_all(inputs, |codec, bytes| codec.embed_image(bytes))
            .await?;
        let pages = images
            .into_iter()
            .map(|image| {
                let layout = PageLayout::stacked(image.width, image.height);
                PdfPage::Image { image, layout }
            })
            .collect();
        self.compose(pages).await
    }

    async fn compose(&self, pages: Vec<PdfPage>) -> Result<(Vec<u8>, usize), ConvertError> {
        let composed = self
            .run_codec(move |codec| codec.compose_pdf(pages))
            .await
            .map_err(|r| failed(CompositionStage::Composing, None, r))?;
        Ok((composed.bytes, composed.page_count))
    }

    async fn concat_text(&self, inputs: &[SourceFile]) -> Result<(Vec<u8>, Vec<SkippedInput>), ConvertError> {
        let mut merged = String::new();
        let mut skipped = Vec::new();
        for input in inputs {
            if input.family() != Some(FormatFamily::PlainText) {
                let ext = input.extension();
                warn!("Leaving {} out of text merge", input.original_name);
                skipped.push(SkippedInput {
                    file: input.original_name.clone(),
                    reason: if ext.is_empty() {
                        "not a plain-text file".to_string()
                    } else {
                        format!("not a plain-text file (.{ext})")
                    },
                });
                continue;
            }
            let bytes = tokio::fs::read(&input.path)
                .await
                .map_err(|e| composing(input, FailureReason::Io(e.to_string())))?;
            merged.push_str(&String::from_utf8_lossy(&bytes));
            merged.push_str(TEXT_DELIMITER);
        }
        Ok((merged.into_bytes(), skipped))
    }
}
