//! Codec capability set: the byte-level transforms the core dispatches to.
//!
//! The core never touches a file format directly. It reads bytes, hands them
//! to a [`Codec`] and writes whatever comes back. [`NativeCodec`] is the
//! in-crate implementation; tests swap in their own to simulate slow or
//! failing codecs.
//!
//! Every method is synchronous and CPU-bound. Callers run them on the
//! blocking pool (see [`crate::Converter`]).
//!
//! | Submodule | Formats | Crates |
//! |-----------|---------|--------|
//! | [`raster`]   | jpg/png/gif/webp | `image` |
//! | [`pdf`]      | PDF load and compose | `lopdf` |
//! | [`document`] | docx extraction, text→HTML | `zip`, `quick-xml` |
//! | [`sheet`]    | xlsx/xls read, CSV, JSON | `calamine`, `csv`, `serde_json` |
//! | `xlsx`       | xlsx write | `zip` |

pub mod document;
pub mod pdf;
pub mod raster;
pub mod sheet;
mod xlsx;

pub use pdf::{ComposedPdf, EmbeddedImage, LoadedPdf, PdfPage};
pub use sheet::{Cell, Sheet, Workbook};

use crate::format::RasterFormat;
use thiserror::Error;

/// Failure inside a codec call.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("image codec: {0}")]
    Image(#[from] ::image::ImageError),

    #[error("PDF codec: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    /// Input decoded but is not usable for the requested operation.
    #[error("{0}")]
    Malformed(String),
}

/// Byte-level conversion operations.
pub trait Codec: Send + Sync {
    /// Decode any supported raster image and re-encode it as `format`.
    fn reencode_image(&self, input: &[u8], format: RasterFormat) -> Result<Vec<u8>, CodecError>;

    /// Re-encode as JPEG at an explicit quality (1–100).
    fn compress_image(&self, input: &[u8], quality: u8) -> Result<Vec<u8>, CodecError>;

    /// Re-encode as JPEG for embedding in a PDF page, keeping pixel dimensions.
    fn embed_image(&self, input: &[u8]) -> Result<EmbeddedImage, CodecError>;

    fn load_pdf(&self, input: &[u8]) -> Result<LoadedPdf, CodecError>;

    /// Build one PDF from image pages and copied document pages, in order.
    fn compose_pdf(&self, pages: Vec<PdfPage>) -> Result<ComposedPdf, CodecError>;

    /// Semantic HTML from a `.docx` package.
    fn extract_html(&self, input: &[u8]) -> Result<String, CodecError>;

    /// Plain text from a `.docx` package.
    fn extract_raw_text(&self, input: &[u8]) -> Result<String, CodecError>;

    /// Wrap plain text in a standalone HTML page.
    fn text_to_html(&self, text: &str) -> String;

    /// Read an `.xlsx` or `.xls` workbook.
    fn read_workbook(&self, input: &[u8]) -> Result<Workbook, CodecError>;

    fn sheet_to_csv(&self, sheet: &Sheet) -> Result<String, CodecError>;

    fn sheet_to_json(&self, sheet: &Sheet) -> Result<String, CodecError>;

    fn csv_to_workbook(&self, input: &str) -> Result<Workbook, CodecError>;

    /// Serialise a workbook as an `.xlsx` package.
    fn write_workbook(&self, workbook: &Workbook) -> Result<Vec<u8>, CodecError>;
}

/// The built-in codec set.
#[derive(Debug, Clone)]
pub struct NativeCodec {
    jpeg_quality: u8,
}

impl NativeCodec {
    /// `jpeg_quality` applies to JPEG re-encoding and PDF-embedded images.
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }
}

impl Default for NativeCodec {
    fn default() -> Self {
        Self::new(90)
    }
}

impl Codec for NativeCodec {
    fn reencode_image(&self, input: &[u8], format: RasterFormat) -> Result<Vec<u8>, CodecError> {
        let image = raster::decode(input)?;
        let bytes = match format {
            RasterFormat::Jpeg => raster::encode_jpeg(&image, self.jpeg_quality)?,
            RasterFormat::Png => raster::encode_png(&image)?,
            RasterFormat::Webp => raster::encode_webp(&image)?,
        };
        Ok(bytes)
    }

    fn compress_image(&self, input: &[u8], quality: u8) -> Result<Vec<u8>, CodecError> {
        let image = raster::decode(input)?;
        Ok(raster::encode_jpeg(&image, quality.clamp(1, 100))?)
    }

    fn embed_image(&self, input: &[u8]) -> Result<EmbeddedImage, CodecError> {
        let image = raster::decode(input)?;
        Ok(EmbeddedImage {
            width: image.width(),
            height: image.height(),
            jpeg: raster::encode_jpeg(&image, self.jpeg_quality)?,
        })
    }

    fn load_pdf(&self, input: &[u8]) -> Result<LoadedPdf, CodecError> {
        pdf::load(input)
    }

    fn compose_pdf(&self, pages: Vec<PdfPage>) -> Result<ComposedPdf, CodecError> {
        pdf::compose(pages)
    }

    fn extract_html(&self, input: &[u8]) -> Result<String, CodecError> {
        let blocks = document::parse_docx(input)?;
        Ok(document::render_html(&blocks))
    }

    fn extract_raw_text(&self, input: &[u8]) -> Result<String, CodecError> {
        let blocks = document::parse_docx(input)?;
        Ok(document::render_text(&blocks))
    }

    fn text_to_html(&self, text: &str) -> String {
        document::text_to_html(text)
    }

    fn read_workbook(&self, input: &[u8]) -> Result<Workbook, CodecError> {
        sheet::read_workbook(input)
    }

    fn sheet_to_csv(&self, sheet: &Sheet) -> Result<String, CodecError> {
        sheet::to_csv(sheet)
    }

    fn sheet_to_json(&self, sheet: &Sheet) -> Result<String, CodecError> {
        sheet::to_json(sheet)
    }

    fn csv_to_workbook(&self, input: &str) -> Result<Workbook, CodecError> {
        sheet::from_csv(input)
    }

    fn write_workbook(&self, workbook: &Workbook) -> Result<Vec<u8>, CodecError> {
        xlsx::write(workbook)
    }
}
