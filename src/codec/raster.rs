//! Raster image decode and encode via the `image` crate.
//!
//! Decoding sniffs the format from the bytes, so a mislabelled upload still
//! decodes. GIF inputs contribute their first frame.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageFormat, ImageResult};
use std::io::Cursor;

pub fn decode(input: &[u8]) -> ImageResult<DynamicImage> {
    image::load_from_memory(input)
}

/// JPEG at `quality`. Alpha is dropped; JPEG has no alpha channel.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> ImageResult<Vec<u8>> {
    let rgb = image.to_rgb8();
    let mut out = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))?;
    Ok(out)
}

pub fn encode_png(image: &DynamicImage) -> ImageResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Lossless WebP; the pure-Rust encoder has no lossy mode.
pub fn encode_webp(image: &DynamicImage) -> ImageResult<Vec<u8>> {
    let rgba = image.to_rgba8();
    let mut out = Vec::new();
    rgba.write_with_encoder(WebPEncoder::new_lossless(&mut out))?;
    Ok(out)
}
