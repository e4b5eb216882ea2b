//! Format classification and the conversion compatibility table.
//!
//! A file's [`FormatFamily`] is derived from its lowercased extension and is
//! never stored. Whether a family can be turned into a given
//! [`TargetFormat`], and which [`CodecOp`] does it, is answered by exactly one
//! place: the [`COMPATIBILITY`] table. The router looks operations up here
//! and never branches on extension strings itself.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Coarse classification of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatFamily {
    /// `.jpg .jpeg .png .gif .webp`
    Image,
    /// `.docx`
    Document,
    /// `.txt`
    PlainText,
    /// `.xlsx .xls`
    Spreadsheet,
    /// `.csv`
    DelimitedText,
}

impl FormatFamily {
    pub const ALL: [FormatFamily; 5] = [
        FormatFamily::Image,
        FormatFamily::Document,
        FormatFamily::PlainText,
        FormatFamily::Spreadsheet,
        FormatFamily::DelimitedText,
    ];

    /// Family for a bare extension (with or without the leading dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "webp" => Some(FormatFamily::Image),
            "docx" => Some(FormatFamily::Document),
            "txt" => Some(FormatFamily::PlainText),
            "xlsx" | "xls" => Some(FormatFamily::Spreadsheet),
            "csv" => Some(FormatFamily::DelimitedText),
            _ => None,
        }
    }

    /// Targets this family can be converted to, in table order.
    pub fn targets(self) -> Vec<TargetFormat> {
        COMPATIBILITY
            .iter()
            .filter(|(family, _, _)| *family == self)
            .map(|(_, target, _)| *target)
            .collect()
    }
}

impl fmt::Display for FormatFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormatFamily::Image => "image",
            FormatFamily::Document => "document",
            FormatFamily::PlainText => "plain text",
            FormatFamily::Spreadsheet => "spreadsheet",
            FormatFamily::DelimitedText => "delimited text",
        };
        f.write_str(name)
    }
}

/// An output format a client may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Jpg,
    Jpeg,
    Png,
    Webp,
    Pdf,
    Html,
    Txt,
    Csv,
    Json,
    Xlsx,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 10] = [
        TargetFormat::Jpg,
        TargetFormat::Jpeg,
        TargetFormat::Png,
        TargetFormat::Webp,
        TargetFormat::Pdf,
        TargetFormat::Html,
        TargetFormat::Txt,
        TargetFormat::Csv,
        TargetFormat::Json,
        TargetFormat::Xlsx,
    ];

    /// File extension used for artifacts of this format.
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Jpg => "jpg",
            TargetFormat::Jpeg => "jpeg",
            TargetFormat::Png => "png",
            TargetFormat::Webp => "webp",
            TargetFormat::Pdf => "pdf",
            TargetFormat::Html => "html",
            TargetFormat::Txt => "txt",
            TargetFormat::Csv => "csv",
            TargetFormat::Json => "json",
            TargetFormat::Xlsx => "xlsx",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TargetFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches('.').to_ascii_lowercase();
        TargetFormat::ALL
            .into_iter()
            .find(|t| t.extension() == wanted)
            .ok_or_else(|| ConvertError::UnknownFormat(s.to_string()))
    }
}

/// Raster encodings the image codec can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RasterFormat {
    Jpeg,
    Png,
    Webp,
}

/// Typed codec operation selected for a (family, target) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecOp {
    ReencodeImage(RasterFormat),
    /// Single image embedded on a page sized to the image.
    ImageToPdf,
    DocxToHtml,
    DocxToText,
    TextToHtml,
    SheetToCsv,
    SheetToJson,
    CsvToXlsx,
}

/// The compatibility table: every supported (family, target) pair and the
/// operation that performs it.
pub const COMPATIBILITY: &[(FormatFamily, TargetFormat, CodecOp)] = &[
    (FormatFamily::Image, TargetFormat::Jpg, CodecOp::ReencodeImage(RasterFormat::Jpeg)),
    (FormatFamily::Image, TargetFormat::Jpeg, CodecOp::ReencodeImage(RasterFormat::Jpeg)),
    (FormatFamily::Image, TargetFormat::Png, CodecOp::ReencodeImage(RasterFormat::Png)),
    (FormatFamily::Image, TargetFormat::Webp, CodecOp::ReencodeImage(RasterFormat::Webp)),
    (FormatFamily::Image, TargetFormat::Pdf, CodecOp::ImageToPdf),
    (FormatFamily::Document, TargetFormat::Html, CodecOp::DocxToHtml),
    (FormatFamily::Document, TargetFormat::Txt, CodecOp::DocxToText),
    (FormatFamily::PlainText, TargetFormat::Html, CodecOp::TextToHtml),
    (FormatFamily::Spreadsheet, TargetFormat::Csv, CodecOp::SheetToCsv),
    (FormatFamily::Spreadsheet, TargetFormat::Json, CodecOp::SheetToJson),
    (FormatFamily::DelimitedText, TargetFormat::Xlsx, CodecOp::CsvToXlsx),
];

/// Lowercased extension of `filename` without the dot; empty if none.
pub fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Classify a file by the extension of its name.
pub fn classify(filename: &str) -> Option<FormatFamily> {
    FormatFamily::from_extension(&extension_of(filename))
}

/// Operation for a (family, target) pair, if the table has one.
pub fn codec_op(family: FormatFamily, target: TargetFormat) -> Option<CodecOp> {
    COMPATIBILITY
        .iter()
        .find(|(f, t, _)| *f == family && *t == target)
        .map(|(_, _, op)| *op)
}

pub fn is_supported_conversion(family: FormatFamily, target: TargetFormat) -> bool {
    codec_op(family, target).is_some()
}

/// Classify `filename` and select the operation that turns it into `target`.
///
/// # Errors
/// [`ConvertError::UnsupportedConversion`] for an unknown extension or a pair
/// missing from [`COMPATIBILITY`].
pub fn resolve(filename: &str, target: TargetFormat) -> Result<(FormatFamily, CodecOp), ConvertError> {
    let extension = extension_of(filename);
    FormatFamily::from_extension(&extension)
        .and_then(|family| codec_op(family, target).map(|op| (family, op)))
        .ok_or_else(|| ConvertError::UnsupportedConversion {
            extension,
            target: target.to_string(),
        })
}

/// MIME type for a stored artifact, chosen from its extension.
pub fn mime_type(filename: &str) -> &'static str {
    match extension_of(filename).as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        "html" => "text/html; charset=utf-8",
        "txt" => "text/plain; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "json" => "application/json",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected_targets(family: FormatFamily) -> &'static [TargetFormat] {
        use TargetFormat::*;
        match family {
            FormatFamily::Image => &[Jpg, Jpeg, Png, Webp, Pdf],
            FormatFamily::Document => &[Html, Txt],
            FormatFamily::PlainText => &[Html],
            FormatFamily::Spreadsheet => &[Csv, Json],
            FormatFamily::DelimitedText => &[Xlsx],
        }
    }

    #[test]
    fn support_matches_table_for_every_pair() {
        for family in FormatFamily::ALL {
            for target in TargetFormat::ALL {
                let expected = expected_targets(family).contains(&target);
                assert_eq!(
                    is_supported_conversion(family, target),
                    expected,
                    "{family} -> {target}"
                );
            }
        }
    }

    #[test]
    fn classify_is_case_insensitive() {
        assert_eq!(classify("Photo.JPG"), Some(FormatFamily::Image));
        assert_eq!(classify("report.Docx"), Some(FormatFamily::Document));
        assert_eq!(classify("notes.txt"), Some(FormatFamily::PlainText));
        assert_eq!(classify("legacy.XLS"), Some(FormatFamily::Spreadsheet));
        assert_eq!(classify("data.csv"), Some(FormatFamily::DelimitedText));
        assert_eq!(classify("anim.gif"), Some(FormatFamily::Image));
    }

    #[test]
    fn classify_rejects_unknown_and_missing_extensions() {
        assert_eq!(classify("paper.pdf"), None);
        assert_eq!(classify("Makefile"), None);
        assert_eq!(classify(".hidden"), None);
    }

    #[test]
    fn image_to_pdf_is_not_a_reencode() {
        assert_eq!(
            codec_op(FormatFamily::Image, TargetFormat::Pdf),
            Some(CodecOp::ImageToPdf)
        );
        assert_eq!(
            codec_op(FormatFamily::Image, TargetFormat::Jpg),
            Some(CodecOp::ReencodeImage(RasterFormat::Jpeg))
        );
    }

    #[test]
    fn resolve_carries_extension_and_target() {
        match resolve("b.png", TargetFormat::Html) {
            Err(ConvertError::UnsupportedConversion { extension, target }) => {
                assert_eq!(extension, "png");
                assert_eq!(target, "html");
            }
            other => panic!("expected UnsupportedConversion, got {other:?}"),
        }
        assert!(resolve("a.docx", TargetFormat::Html).is_ok());
    }

    #[test]
    fn target_format_parses_loosely() {
        assert_eq!("PDF".parse::<TargetFormat>().unwrap(), TargetFormat::Pdf);
        assert_eq!(".xlsx".parse::<TargetFormat>().unwrap(), TargetFormat::Xlsx);
        assert!(matches!(
            "mp4".parse::<TargetFormat>(),
            Err(ConvertError::UnknownFormat(_))
        ));
    }

    #[test]
    fn targets_lists_table_rows() {
        assert_eq!(
            FormatFamily::Spreadsheet.targets(),
            vec![TargetFormat::Csv, TargetFormat::Json]
        );
    }
}
