//! OCR of annotated page regions.
//!
//! Regions drawn on page images are cut out of a fresh, higher resolution
//! render of the same page and passed to an [`OcrEngine`].

mod tesseract;

use std::path::PathBuf;

use image::DynamicImage;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::parser::BoundingBox;
use crate::raster::POINTS_PER_INCH;

pub use tesseract::TesseractCli;

/// Text recognition over an image.
pub trait OcrEngine {
    fn recognize(&self, image: &DynamicImage) -> Result<String>;
}

impl<F> OcrEngine for F
where
    F: Fn(&DynamicImage) -> Result<String>,
{
    fn recognize(&self, image: &DynamicImage) -> Result<String> {
        self(image)
    }
}

/// Join lines of OCR output into one string, gluing words hyphenated across
/// line breaks back together.
///
/// A line ending in `-` loses the dash and runs straight into the next
/// line; any other line is followed by a single space. Dashes inside a line
/// are kept, so `test-bed` survives.
pub fn fold_ocr_dashes(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for line in text.split('\n') {
        let line = line.trim();
        match line.strip_suffix('-') {
            Some(head) => folded.push_str(head),
            None => {
                folded.push_str(line);
                folded.push(' ');
            }
        }
    }
    folded.trim().to_string()
}

/// Where an annotated image example came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ExampleSource {
    pub path: PathBuf,
    /// 0-based page index
    pub page: u32,
    /// Resolution the annotated image was rendered at
    pub dpi: u32,
}

/// Resolution assumed for examples that do not record one.
pub const DEFAULT_SOURCE_DPI: u32 = 72;

/// Read `meta.path`, `meta.page` and `meta.dpi` from an annotated example.
pub fn example_source(example: &Value) -> Result<ExampleSource> {
    let hint = "was it annotated from page images of this crate?";
    let meta = example
        .get("meta")
        .ok_or_else(|| Error::InvalidExample(format!("`meta` is missing, {}", hint)))?;
    let path = meta
        .get("path")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidExample(format!("`meta.path` is missing, {}", hint)))?;
    let page = meta
        .get("page")
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::InvalidExample(format!("`meta.page` is missing, {}", hint)))?;
    let dpi = meta
        .get("dpi")
        .and_then(Value::as_u64)
        .unwrap_or(DEFAULT_SOURCE_DPI as u64);

    Ok(ExampleSource {
        path: PathBuf::from(path),
        page: u32::try_from(page)
            .map_err(|_| Error::InvalidExample(format!("page {} is out of range", page)))?,
        dpi: u32::try_from(dpi).unwrap_or(DEFAULT_SOURCE_DPI).max(1),
    })
}

/// Box of an image-annotation span (`x`, `y`, `width`, `height` in pixels).
pub fn span_region(span: &Value) -> Result<BoundingBox> {
    let field = |name: &str| {
        span.get(name)
            .and_then(Value::as_f64)
            .map(|v| v as f32)
            .ok_or_else(|| Error::InvalidExample(format!("span has no numeric `{}`", name)))
    };
    Ok(BoundingBox {
        x: field("x")?,
        y: field("y")?,
        width: field("width")?,
        height: field("height")?,
    })
}

/// Scale from pixels at `source_dpi` to pixels at `target_dpi`.
pub fn dpi_scale(source_dpi: u32, target_dpi: u32) -> f32 {
    target_dpi as f32 / source_dpi.max(1) as f32
}

/// Resolution giving `zoom` times the PDF's native size.
pub fn zoom_dpi(zoom: f32) -> u32 {
    (zoom * POINTS_PER_INCH).round().max(1.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fold_dashes_simple() {
        assert_eq!(fold_ocr_dashes("increas-\ningly popular"), "increasingly popular");
        assert_eq!(fold_ocr_dashes("one\ntwo\n"), "one two");
        assert_eq!(fold_ocr_dashes(""), "");
    }

    #[test]
    fn test_fold_keeps_inner_hyphens() {
        assert_eq!(fold_ocr_dashes("a test-bed\nfor us"), "a test-bed for us");
    }

    #[test]
    fn test_example_source() {
        let example = json!({"meta": {"path": "/docs/a.pdf", "page": 3, "dpi": 150}});
        let source = example_source(&example).unwrap();
        assert_eq!(source.path, PathBuf::from("/docs/a.pdf"));
        assert_eq!(source.page, 3);
        assert_eq!(source.dpi, 150);

        let legacy = json!({"meta": {"path": "/docs/a.pdf", "page": 0}});
        assert_eq!(example_source(&legacy).unwrap().dpi, DEFAULT_SOURCE_DPI);
    }

    #[test]
    fn test_example_source_missing_fields() {
        for example in [
            json!({"image": "x"}),
            json!({"meta": {"page": 0}}),
            json!({"meta": {"path": "/a.pdf"}}),
        ] {
            assert!(matches!(
                example_source(&example),
                Err(Error::InvalidExample(_))
            ));
        }
    }

    #[test]
    fn test_span_region() {
        let span = json!({"x": 10, "y": 20.5, "width": 30, "height": 40, "label": "A"});
        let region = span_region(&span).unwrap();
        assert_eq!(region.y, 20.5);
        assert!(span_region(&json!({"x": 1})).is_err());
    }

    #[test]
    fn test_scales() {
        assert_eq!(zoom_dpi(3.0), 216);
        assert!((dpi_scale(72, 216) - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_closure_engine() {
        let engine = |_: &DynamicImage| -> Result<String> { Ok("hello".to_string()) };
        let image = DynamicImage::new_rgb8(2, 2);
        assert_eq!(engine.recognize(&image).unwrap(), "hello");
    }
}
