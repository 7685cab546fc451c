//! # annopdf
//!
//! PDF documents as streams of annotation tasks.
//!
//! This library renders each page of a PDF either to an image or to
//! layout-labelled text with tokens, and turns the resulting page units into
//! task records for an annotation tool. Pages are produced lazily, in order,
//! and can be prefetched a bounded number of steps ahead.
//!
//! ## Quick Start
//!
//! ```no_run
//! use annopdf::{render_file, RenderConfig};
//!
//! fn main() -> annopdf::Result<()> {
//!     let config = RenderConfig::new().text_spans().with_labels(["PERSON", "ORG"]);
//!     for unit in render_file("paper.pdf", config)? {
//!         println!("page {}: failed = {}", unit.page, unit.is_failed());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Two render modes**: page images (PDFium) or text spans with layout labels
//! - **Lazy streams**: one page rendered per pull, failures become placeholders
//! - **Prefetch**: bounded lookahead in the same thread or on a worker
//! - **Recipes**: image, span, layout pre-processing and OCR correction sessions
//! - **Parallel pre-processing**: uses Rayon across documents

pub mod config;
pub mod detect;
pub mod error;
pub mod model;
pub mod ocr;
pub mod parser;
pub mod raster;
pub mod recipe;
pub mod render;
pub mod source;
pub mod task;

// Re-export commonly used types
pub use config::{split_labels, ImageFormat, RenderConfig, RenderMode};
pub use detect::{is_pdf_bytes, sniff_pdf_version};
pub use error::{Error, Result};
pub use model::{PageContent, PageFailure, PageImage, PageSpans, PageUnit, SpanBlock, Token};
pub use ocr::{fold_ocr_dashes, OcrEngine, TesseractCli};
pub use parser::{LayoutLabel, PageLayout};
pub use raster::{RasterPages, Rasterizer};
pub use recipe::{OcrOptions, RecipeComponents, SpansOptions};
pub use render::{stream, BackgroundPrefetch, CorpusStream, DocumentRenderer, PageStream, Prefetch};
pub use source::discover;

use std::path::Path;

/// Render a PDF file page by page.
///
/// Fails with [`Error::DocumentOpen`] if the file cannot be opened; pages
/// that fail later come out as placeholders.
///
/// # Example
///
/// ```no_run
/// use annopdf::{render_file, RenderConfig};
///
/// let pages = render_file("scan.pdf", RenderConfig::new().with_dpi(150)).unwrap();
/// println!("Pages: {}", pages.page_count());
/// ```
pub fn render_file<P: AsRef<Path>>(path: P, config: RenderConfig) -> Result<PageStream> {
    DocumentRenderer::new(config)?.render(path)
}

/// Render every PDF at `source` (a file or a directory), prefetching
/// `config.lookahead` pages ahead.
///
/// # Example
///
/// ```no_run
/// use annopdf::{render_source, RenderConfig};
///
/// let config = RenderConfig::new().text_spans().with_lookahead(4);
/// for unit in render_source("./papers", config)? {
///     let unit = unit?;
///     println!("{} page {}", unit.title(), unit.page);
/// }
/// # Ok::<(), annopdf::Error>(())
/// ```
pub fn render_source<P: AsRef<Path>>(source: P, config: RenderConfig) -> Result<Prefetch<CorpusStream>> {
    let lookahead = config.lookahead;
    let renderer = DocumentRenderer::new(config)?;
    Ok(stream(CorpusStream::discover(renderer, source)?, lookahead))
}

/// Render every PDF at `source` on a background thread.
///
/// The worker stays at most `config.lookahead` pages ahead of the consumer
/// and stops when the returned stream is dropped.
pub fn render_source_in_background<P: AsRef<Path>>(
    source: P,
    config: RenderConfig,
) -> Result<BackgroundPrefetch<Result<PageUnit>>> {
    config.validate()?;
    let paths = discover(source)?;
    let lookahead = config.lookahead;
    Ok(BackgroundPrefetch::render(paths, lookahead, move || {
        DocumentRenderer::new(config)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_missing_file() {
        let config = RenderConfig::new().text_spans().with_preview(false);
        let err = render_file("/nonexistent/file.pdf", config).unwrap_err();
        assert!(matches!(err, Error::DocumentOpen { .. }));
    }

    #[test]
    fn test_render_source_missing() {
        let config = RenderConfig::new().text_spans().with_preview(false);
        assert!(matches!(
            render_source("/nonexistent/dir", config),
            Err(Error::SourceNotFound(_))
        ));
    }
}
