//! Conversion router: runs the codec calls behind one [`CodecOp`].
//!
//! The op was already selected from the compatibility table, so this is a
//! plain dispatch. Blocking; call it from `spawn_blocking`.

use crate::codec::{Codec, CodecError, PdfPage, Workbook};
use crate::format::CodecOp;
use crate::pipeline::layout::PageLayout;

/// Transform `input` with `op`, returning the artifact bytes.
pub fn run_op(codec: &dyn Codec, op: CodecOp, input: &[u8]) -> Result<Vec<u8>, CodecError> {
    match op {
        CodecOp::ReencodeImage(format) => codec.reencode_image(input, format),
        CodecOp::ImageToPdf => single_image_pdf(codec, input),
        CodecOp::DocxToHtml => codec.extract_html(input).map(String::into_bytes),
        CodecOp::DocxToText => codec.extract_raw_text(input).map(String::into_bytes),
        CodecOp::TextToHtml => {
            let text = String::from_utf8_lossy(input);
            Ok(codec.text_to_html(&text).into_bytes())
        }
        CodecOp::SheetToCsv => {
            let workbook = codec.read_workbook(input)?;
            codec.sheet_to_csv(first_sheet(&workbook)?).map(String::into_bytes)
        }
        CodecOp::SheetToJson => {
            let workbook = codec.read_workbook(input)?;
            codec.sheet_to_json(first_sheet(&workbook)?).map(String::into_bytes)
        }
        CodecOp::CsvToXlsx => {
            let text = String::from_utf8_lossy(input);
            let workbook = codec.csv_to_workbook(&text)?;
            codec.write_workbook(&workbook)
        }
    }
}

/// One page sized exactly to the image, drawn at the origin at scale 1.
pub fn single_image_pdf(codec: &dyn Codec, input: &[u8]) -> Result<Vec<u8>, CodecError> {
    let image = codec.embed_image(input)?;
    let layout = PageLayout::fitted(image.width, image.height);
    let composed = codec.compose_pdf(vec![PdfPage::Image { image, layout }])?;
    Ok(composed.bytes)
}

fn first_sheet(workbook: &Workbook) -> Result<&crate::codec::Sheet, CodecError> {
    workbook
        .first_sheet()
        .ok_or_else(|| CodecError::Malformed("workbook has no sheets".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::NativeCodec;
    use crate::format::RasterFormat;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([1, 2, 3])));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn image_to_pdf_page_matches_image_size() {
        let codec = NativeCodec::default();
        let bytes = run_op(&codec, CodecOp::ImageToPdf, &png(120, 80)).unwrap();
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);
        let media_box: Vec<f32> = doc
            .get_dictionary(pages[&1])
            .unwrap()
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o.as_float().unwrap())
            .collect();
        assert_eq!(media_box, vec![0.0, 0.0, 120.0, 80.0]);
    }

    #[test]
    fn reencode_changes_container() {
        let codec = NativeCodec::default();
        let out = run_op(&codec, CodecOp::ReencodeImage(RasterFormat::Jpeg), &png(10, 10)).unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn text_to_html_wraps_input() {
        let codec = NativeCodec::default();
        let out = run_op(&codec, CodecOp::TextToHtml, b"hello\nworld").unwrap();
        let html = String::from_utf8(out).unwrap();
        assert!(html.contains("<pre>hello\nworld</pre>"));
    }

    #[test]
    fn csv_to_xlsx_produces_zip() {
        let codec = NativeCodec::default();
        let out = run_op(&codec, CodecOp::CsvToXlsx, b"a,b\n1,2\n").unwrap();
        assert_eq!(&out[..2], b"PK");
    }
}
