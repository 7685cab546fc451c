//! Page rasterization.
//!
//! Rasterization sits behind the [`Rasterizer`] trait so the renderer never
//! depends on a particular engine. The PDFium engine is available behind the
//! `pdfium` feature; it binds a shared library at runtime.

mod encode;
#[cfg(feature = "pdfium")]
mod pdfium;

use std::path::Path;

use image::DynamicImage;

use crate::error::Result;

pub use encode::{crop_scaled, encode_data_uri, is_data_uri};
#[cfg(feature = "pdfium")]
pub use pdfium::PdfiumRasterizer;

/// PDF user space units per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// Opens documents for rasterization.
pub trait Rasterizer {
    /// Open the document at `path`. Failing here means the document cannot
    /// be rendered at all.
    fn open(&self, path: &Path) -> Result<Box<dyn RasterPages>>;
}

/// Pages of an opened document.
pub trait RasterPages {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Render the 0-based page `index` at `dpi`.
    ///
    /// Implementations size the output with [`pixel_size`] so that images
    /// from different engines agree.
    fn render_page(&self, index: u32, dpi: u32) -> Result<DynamicImage>;
}

/// Pixel length of `points` at `dpi`, never zero.
pub fn pixel_size(points: f32, dpi: u32) -> u32 {
    ((points * dpi as f32 / POINTS_PER_INCH).round() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_size() {
        assert_eq!(pixel_size(612.0, 72), 612);
        assert_eq!(pixel_size(612.0, 150), 1275);
        assert_eq!(pixel_size(792.0, 150), 1650);
        assert_eq!(pixel_size(0.1, 72), 1);
    }
}
