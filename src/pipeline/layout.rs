//! Page geometry for images placed on PDF pages.
//!
//! All values are PDF points with the origin at the bottom-left corner.

use serde::{Deserialize, Serialize};

/// A4 portrait width in points.
pub const A4_WIDTH_PT: f64 = 595.28;
/// A4 portrait height in points.
pub const A4_HEIGHT_PT: f64 = 841.89;
/// Scale applied to each image of an image stack before centring.
pub const STACK_SCALE: f64 = 0.8;

/// Page size plus the rectangle an image is drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_width: f64,
    pub page_height: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PageLayout {
    /// Image scaled by `scale` and centred on a fixed page.
    ///
    /// Offsets never go negative and the drawn size never exceeds the page,
    /// so an oversized image is pinned to the origin and cropped to the page
    /// box instead of spilling off it.
    pub fn centered(img_width: u32, img_height: u32, scale: f64, page_width: f64, page_height: f64) -> Self {
        let scaled_w = f64::from(img_width) * scale;
        let scaled_h = f64::from(img_height) * scale;
        Self {
            page_width,
            page_height,
            x: ((page_width - scaled_w) / 2.0).max(0.0),
            y: ((page_height - scaled_h) / 2.0).max(0.0),
            width: scaled_w.min(page_width),
            height: scaled_h.min(page_height),
        }
    }

    /// Layout for one image of an image-stack PDF: A4 page, [`STACK_SCALE`].
    pub fn stacked(img_width: u32, img_height: u32) -> Self {
        Self::centered(img_width, img_height, STACK_SCALE, A4_WIDTH_PT, A4_HEIGHT_PT)
    }

    /// Layout for a single-image PDF: the page is exactly the image.
    pub fn fitted(img_width: u32, img_height: u32) -> Self {
        let width = f64::from(img_width);
        let height = f64::from(img_height);
        Self {
            page_width: width,
            page_height: height,
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }

    /// True when the drawn rectangle lies within the page box.
    pub fn fits_page(&self) -> bool {
        const EPS: f64 = 1e-6;
        self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.width <= self.page_width + EPS
            && self.y + self.height <= self.page_height + EPS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_image_is_centred_at_stack_scale() {
        let l = PageLayout::stacked(100, 50);
        assert_eq!(l.width, 80.0);
        assert_eq!(l.height, 40.0);
        assert!((l.x - (A4_WIDTH_PT - 80.0) / 2.0).abs() < 1e-9);
        assert!((l.y - (A4_HEIGHT_PT - 40.0) / 2.0).abs() < 1e-9);
        assert!(l.fits_page());
    }

    #[test]
    fn oversized_image_is_clamped_to_a4() {
        let l = PageLayout::stacked(4000, 3000);
        assert_eq!(l.x, 0.0);
        assert_eq!(l.y, 0.0);
        assert_eq!(l.width, A4_WIDTH_PT);
        assert_eq!(l.height, A4_HEIGHT_PT);
        assert!(l.fits_page());
    }

    #[test]
    fn one_oversized_axis_only_clamps_that_axis() {
        let l = PageLayout::stacked(2000, 100);
        assert_eq!(l.x, 0.0);
        assert_eq!(l.width, A4_WIDTH_PT);
        assert_eq!(l.height, 80.0);
        assert!(l.y > 0.0);
        assert!(l.fits_page());
    }

    #[test]
    fn fitted_page_matches_image() {
        let l = PageLayout::fitted(640, 480);
        assert_eq!((l.page_width, l.page_height), (640.0, 480.0));
        assert_eq!((l.x, l.y, l.width, l.height), (0.0, 0.0, 640.0, 480.0));
        assert!(l.fits_page());
    }
}
