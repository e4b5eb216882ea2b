//! Batch conversion: per-file isolation, ordering and size reporting.

mod common;

use common::{docx, pdf, png, Workspace};
use file_converter::codec::{CodecError, ComposedPdf, EmbeddedImage, LoadedPdf, PdfPage, Sheet, Workbook};
use file_converter::format::RasterFormat;
use file_converter::{
    Codec, ConversionProgressCallback, ConvertError, Converter, ConverterConfig, FailureReason, FileError, NativeCodec,
    TargetFormat,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn mixed_batch_to_html_keeps_the_docx() {
    let ws = Workspace::new();
    let files = vec![
        ws.upload("a.docx", &docx(&["Hello from a"])),
        ws.upload("b.png", &png(8, 8)),
        ws.upload("c.pdf", &pdf(1, "c")),
    ];

    let result = ws.converter().convert_batch(&files, TargetFormat::Html).await.unwrap();

    assert_eq!(result.outcomes.len(), 3);
    assert_eq!(result.stats.converted_files, 1);
    assert_eq!(result.stats.failed_files, 2);

    let converted: Vec<_> = result.converted().collect();
    assert_eq!(converted[0].source.original_name, "a.docx");
    let html = std::fs::read_to_string(&converted[0].output_path).unwrap();
    assert!(html.contains("<p>Hello from a</p>"), "{html}");
    assert_eq!(converted[0].converted_size, html.len() as u64);

    let failures: Vec<_> = result.failures().collect();
    assert!(matches!(failures[0], FileError::UnsupportedConversion { file, .. } if file == "b.png"));
    assert!(matches!(failures[1], FileError::UnsupportedConversion { file, extension, .. }
        if file == "c.pdf" && extension == "pdf"));
}

#[tokio::test]
async fn outcomes_follow_input_order() {
    let ws = Workspace::new();
    let names = ["one.txt", "two.txt", "three.txt", "four.txt", "five.txt", "six.txt"];
    let files: Vec<_> = names
        .iter()
        .map(|n| ws.upload(n, format!("contents of {n}").as_bytes()))
        .collect();
    let converter = Converter::new(ws.config().concurrency(3).build().unwrap());

    let result = converter.convert_batch(&files, TargetFormat::Html).await.unwrap();

    let order: Vec<&str> = result.converted().map(|c| c.source.original_name.as_str()).collect();
    assert_eq!(order, names);
    for file in result.converted() {
        assert!(file.output_filename.starts_with("converted-"));
        assert!(file.output_filename.ends_with(".html"));
        assert!(file.output_path.starts_with(ws.output()));
    }
}

#[tokio::test]
async fn all_unsupported_is_fatal() {
    let ws = Workspace::new();
    let files = vec![ws.upload("a.png", &png(4, 4)), ws.upload("b.zip", b"PK")];

    let err = ws.converter().convert_batch(&files, TargetFormat::Csv).await.unwrap_err();

    match err {
        ConvertError::NoFilesConverted { total, first_error } => {
            assert_eq!(total, 2);
            assert!(first_error.contains("a.png"), "{first_error}");
        }
        other => panic!("expected NoFilesConverted, got {other:?}"),
    }
    assert!(ws.output_files().is_empty());
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let ws = Workspace::new();
    let err = ws.converter().convert_batch(&[], TargetFormat::Html).await.unwrap_err();
    assert!(matches!(err, ConvertError::EmptyBatch));
}

#[tokio::test]
async fn missing_upload_fails_alone() {
    let ws = Workspace::new();
    let files = vec![ws.missing("gone.txt"), ws.upload("here.txt", b"still here")];

    let result = ws.converter().convert_batch(&files, TargetFormat::Html).await.unwrap();

    assert!(matches!(
        &result.outcomes[0],
        Err(FileError::ConversionFailed { reason: FailureReason::InputMissing { .. }, .. })
    ));
    assert!(result.outcomes[1].is_ok());
}

#[tokio::test]
async fn corrupt_input_is_a_codec_failure() {
    let ws = Workspace::new();
    let files = vec![
        ws.upload("broken.docx", b"not a zip"),
        ws.upload("fine.png", &png(16, 16)),
    ];

    let result = ws.converter().convert_batch(&files, TargetFormat::Pdf).await.unwrap();

    // broken.docx has no pdf target at all; fine.png becomes a one-page PDF.
    assert!(result.outcomes[0].is_err());
    let pdf_path = &result.converted().next().unwrap().output_path;
    let doc = lopdf::Document::load(pdf_path).unwrap();
    assert_eq!(doc.get_pages().len(), 1);

    let files = vec![ws.upload("broken2.docx", b"not a zip")];
    let err = ws.converter().convert_batch(&files, TargetFormat::Txt).await.unwrap_err();
    assert!(matches!(err, ConvertError::NoFilesConverted { total: 1, .. }));
}

#[tokio::test]
async fn empty_output_is_never_success() {
    let ws = Workspace::new();
    let files = vec![ws.upload("blank.docx", &docx(&[])), ws.upload("full.docx", &docx(&["words"]))];

    let result = ws.converter().convert_batch(&files, TargetFormat::Txt).await.unwrap();

    assert!(matches!(
        &result.outcomes[0],
        Err(FileError::ConversionFailed { file, reason: FailureReason::MissingOutput { .. } }) if file == "blank.docx"
    ));
    assert_eq!(result.stats.converted_files, 1);
    for converted in result.converted() {
        assert!(std::fs::metadata(&converted.output_path).unwrap().len() > 0);
    }
    assert_eq!(ws.output_files().len(), 1, "empty artifact left behind");
}

#[tokio::test]
async fn zero_concurrency_in_a_struct_literal_still_runs() {
    let ws = Workspace::new();
    let config = ConverterConfig {
        output_dir: ws.output(),
        concurrency: 0,
        ..ConverterConfig::default()
    };
    let files = vec![ws.upload("a.txt", b"a"), ws.upload("b.txt", b"b")];

    let result = tokio::time::timeout(
        Duration::from_secs(30),
        Converter::new(config).convert_batch(&files, TargetFormat::Html),
    )
    .await
    .expect("batch stalled")
    .unwrap();

    assert_eq!(result.stats.converted_files, 2);
}

#[tokio::test]
async fn spreadsheet_round_trip_through_csv() {
    let ws = Workspace::new();
    let csv = "name,qty,price\nwidget,3,2.5\ngadget,10,0.75\n";
    let files = vec![ws.upload("stock.csv", csv.as_bytes())];
    let converter = ws.converter();

    let xlsx = converter.convert_batch(&files, TargetFormat::Xlsx).await.unwrap();
    let xlsx_file = xlsx.converted().next().unwrap();
    let xlsx_bytes = std::fs::read(&xlsx_file.output_path).unwrap();

    let files = vec![ws.upload("stock.xlsx", &xlsx_bytes)];
    let back = converter.convert_batch(&files, TargetFormat::Csv).await.unwrap();
    let csv_back = std::fs::read_to_string(&back.converted().next().unwrap().output_path).unwrap();
    assert_eq!(csv_back, csv.trim_end());

    let json = converter.convert_batch(&files, TargetFormat::Json).await.unwrap();
    let json_text = std::fs::read_to_string(&json.converted().next().unwrap().output_path).unwrap();
    let rows: serde_json::Value = serde_json::from_str(&json_text).unwrap();
    assert_eq!(rows[0]["name"], "widget");
    assert_eq!(rows[1]["qty"], 10);
}

#[tokio::test]
async fn image_reencode_changes_format() {
    let ws = Workspace::new();
    let files = vec![ws.upload("photo.png", &png(32, 24))];

    let result = ws.converter().convert_batch(&files, TargetFormat::Webp).await.unwrap();

    let out = std::fs::read(&result.converted().next().unwrap().output_path).unwrap();
    assert_eq!(image::guess_format(&out).unwrap(), image::ImageFormat::WebP);
}

#[derive(Default)]
struct Counting {
    started: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    batches: AtomicUsize,
}

impl ConversionProgressCallback for Counting {
    fn on_file_start(&self, _index: usize, _total: usize, _name: &str) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }
    fn on_file_complete(&self, _index: usize, _total: usize, _name: &str, _size: u64) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
    fn on_file_error(&self, _index: usize, _total: usize, _name: &str, _error: &str) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        assert_eq!((total, success_count), (3, 2));
        self.batches.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn progress_events_cover_every_file() {
    let ws = Workspace::new();
    let counter = Arc::new(Counting::default());
    let converter = Converter::new(ws.config().progress_callback(counter.clone()).build().unwrap());
    let files = vec![
        ws.upload("a.txt", b"a"),
        ws.upload("b.png", &png(2, 2)),
        ws.upload("c.txt", b"c"),
    ];

    converter.convert_batch(&files, TargetFormat::Html).await.unwrap();

    assert_eq!(counter.started.load(Ordering::SeqCst), 3);
    assert_eq!(counter.completed.load(Ordering::SeqCst), 2);
    assert_eq!(counter.failed.load(Ordering::SeqCst), 1);
    assert_eq!(counter.batches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn compress_reports_ratio_and_isolates_non_images() {
    let ws = Workspace::new();
    let files = vec![ws.upload("big.png", &png(200, 200)), ws.upload("notes.txt", b"text")];

    let result = ws.converter().compress_batch(&files, 40).await.unwrap();

    let compressed: Vec<_> = result.compressed().collect();
    assert_eq!(compressed.len(), 1);
    assert!(compressed[0].output_filename.starts_with("compressed-"));
    assert!(compressed[0].output_filename.ends_with("-big.jpg"));
    let out = std::fs::read(&compressed[0].output_path).unwrap();
    assert_eq!(image::guess_format(&out).unwrap(), image::ImageFormat::Jpeg);
    assert_eq!(result.failures().next().unwrap().file(), "notes.txt");

    let err = ws.converter().compress_batch(&files, 0).await.unwrap_err();
    assert!(matches!(err, ConvertError::InvalidQuality(_)));
}

/// Delegates to [`NativeCodec`] except for text wrapping, which stalls.
struct StallingCodec {
    inner: NativeCodec,
    stall: Duration,
}

impl Codec for StallingCodec {
    fn reencode_image(&self, input: &[u8], format: RasterFormat) -> Result<Vec<u8>, CodecError> {
        self.inner.reencode_image(input, format)
    }
    fn compress_image(&self, input: &[u8], quality: u8) -> Result<Vec<u8>, CodecError> {
        self.inner.compress_image(input, quality)
    }
    fn embed_image(&self, input: &[u8]) -> Result<EmbeddedImage, CodecError> {
        self.inner.embed_image(input)
    }
    fn load_pdf(&self, input: &[u8]) -> Result<LoadedPdf, CodecError> {
        self.inner.load_pdf(input)
    }
    fn compose_pdf(&self, pages: Vec<PdfPage>) -> Result<ComposedPdf, CodecError> {
        self.inner.compose_pdf(pages)
    }
    fn extract_html(&self, input: &[u8]) -> Result<String, CodecError> {
        self.inner.extract_html(input)
    }
    fn extract_raw_text(&self, input: &[u8]) -> Result<String, CodecError> {
        self.inner.extract_raw_text(input)
    }
    fn text_to_html(&self, text: &str) -> String {
        std::thread::sleep(self.stall);
        self.inner.text_to_html(text)
    }
    fn read_workbook(&self, input: &[u8]) -> Result<Workbook, CodecError> {
        self.inner.read_workbook(input)
    }
    fn sheet_to_csv(&self, sheet: &Sheet) -> Result<String, CodecError> {
        self.inner.sheet_to_csv(sheet)
    }
    fn sheet_to_json(&self, sheet: &Sheet) -> Result<String, CodecError> {
        self.inner.sheet_to_json(sheet)
    }
    fn csv_to_workbook(&self, text: &str) -> Result<Workbook, CodecError> {
        self.inner.csv_to_workbook(text)
    }
    fn write_workbook(&self, workbook: &Workbook) -> Result<Vec<u8>, CodecError> {
        self.inner.write_workbook(workbook)
    }
}

#[tokio::test]
async fn codec_timeout_fails_only_that_file() {
    let ws = Workspace::new();
    let codec = Arc::new(StallingCodec {
        inner: NativeCodec::default(),
        stall: Duration::from_secs(3),
    });
    let converter = Converter::with_codec(ws.config().codec_timeout_secs(1).build().unwrap(), codec);
    let files = vec![ws.upload("slow.txt", b"zzz"), ws.upload("fast.docx", &docx(&["quick"]))];

    let result = converter.convert_batch(&files, TargetFormat::Html).await.unwrap();

    assert!(matches!(
        &result.outcomes[0],
        Err(FileError::ConversionFailed { reason: FailureReason::TimedOut { secs: 1 }, .. })
    ));
    assert!(result.outcomes[1].is_ok());
}
