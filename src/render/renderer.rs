//! Document renderer: a PDF in, a lazy sequence of page units out.

use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::DynamicImage;

use crate::config::{RenderConfig, RenderMode};
use crate::detect::sniff_pdf_version;
use crate::error::{Error, Result};
use crate::model::{PageContent, PageImage, PageSpans, PageUnit};
use crate::parser::{LayoutAnalyzer, LopdfBackend, PageId, PdfBackend};
use crate::raster::{encode_data_uri, RasterPages, Rasterizer};

/// Turns documents into [`PageStream`]s.
///
/// Cloning is cheap; clones share the rasterizer.
#[derive(Clone)]
pub struct DocumentRenderer {
    config: RenderConfig,
    rasterizer: Option<Rc<dyn Rasterizer>>,
}

impl fmt::Debug for DocumentRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentRenderer")
            .field("config", &self.config)
            .field("rasterizer", &self.rasterizer.is_some())
            .finish()
    }
}

impl DocumentRenderer {
    /// Create a renderer, binding PDFium when the configuration needs page
    /// images.
    ///
    /// Image mode without a usable rasterizer is [`Error::UnsupportedMode`].
    /// Text-spans mode only loses its previews.
    #[cfg(feature = "pdfium")]
    pub fn new(config: RenderConfig) -> Result<Self> {
        config.validate()?;
        let wants_images = config.mode == RenderMode::Image || !config.hide_preview;
        if !wants_images {
            return Self::text_only(config);
        }
        match crate::raster::PdfiumRasterizer::new() {
            Ok(rasterizer) => Self::with_rasterizer(config, rasterizer),
            Err(e) if config.mode == RenderMode::TextSpans => {
                log::debug!("Page previews disabled: {}", e);
                Self::text_only(config)
            }
            Err(e) => Err(e),
        }
    }

    /// Create a renderer. Without the `pdfium` feature only text-spans mode
    /// is available.
    #[cfg(not(feature = "pdfium"))]
    pub fn new(config: RenderConfig) -> Result<Self> {
        Self::text_only(config)
    }

    /// Create a renderer that never rasterizes.
    pub fn text_only(config: RenderConfig) -> Result<Self> {
        config.validate()?;
        if config.mode == RenderMode::Image {
            return Err(Error::UnsupportedMode(
                "image mode requires a rasterizer".to_string(),
            ));
        }
        if !config.hide_preview {
            log::debug!("No rasterizer available, page previews are omitted");
        }
        Ok(Self {
            config,
            rasterizer: None,
        })
    }

    /// Create a renderer using `rasterizer` for page images.
    pub fn with_rasterizer<R: Rasterizer + 'static>(config: RenderConfig, rasterizer: R) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rasterizer: Some(Rc::new(rasterizer)),
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn has_rasterizer(&self) -> bool {
        self.rasterizer.is_some()
    }

    /// Open `path` and return its pages as a lazy stream.
    ///
    /// Fails with [`Error::DocumentOpen`] before producing anything if the
    /// document cannot be opened. Rendering the same path again starts over
    /// from the first page.
    pub fn render<P: AsRef<Path>>(&self, path: P) -> Result<PageStream> {
        let path = path.as_ref();
        let version = sniff_pdf_version(path)?;
        log::debug!("Opening {} (PDF {})", path.display(), version);

        let source = match self.config.mode {
            RenderMode::Image => {
                let rasterizer = self.rasterizer.as_ref().ok_or_else(|| {
                    Error::UnsupportedMode("image mode requires a rasterizer".to_string())
                })?;
                PageSource::Raster(open_raster(rasterizer.as_ref(), path)?)
            }
            RenderMode::TextSpans => {
                let backend = LopdfBackend::load_file(path)?;
                let pages: Vec<PageId> = backend.pages().into_values().collect();
                let preview = match &self.rasterizer {
                    Some(rasterizer) if !self.config.hide_preview => {
                        Some(open_raster(rasterizer.as_ref(), path)?)
                    }
                    _ => None,
                };
                PageSource::Layout {
                    backend,
                    pages,
                    preview,
                }
            }
        };

        let count = source.page_count();
        log::info!("Rendering {} ({} pages, {})", path.display(), count, self.config.mode);
        Ok(PageStream {
            path: path.to_path_buf(),
            config: self.config.clone(),
            source,
            next: 0,
            count,
        })
    }

    /// Rasterize a single page at `dpi`, bypassing the configured mode.
    pub fn rasterize_page<P: AsRef<Path>>(&self, path: P, page: u32, dpi: u32) -> Result<DynamicImage> {
        let path = path.as_ref();
        let rasterizer = self.rasterizer.as_ref().ok_or_else(|| {
            Error::UnsupportedMode("page images require a rasterizer".to_string())
        })?;
        sniff_pdf_version(path)?;
        let pages = open_raster(rasterizer.as_ref(), path)?;
        if page >= pages.page_count() {
            return Err(Error::page(
                path,
                page,
                format!("document has {} pages", pages.page_count()),
            ));
        }
        pages
            .render_page(page, dpi)
            .map_err(|e| as_page_error(e, path, page))
    }
}

fn open_raster(rasterizer: &dyn Rasterizer, path: &Path) -> Result<Box<dyn RasterPages>> {
    rasterizer.open(path).map_err(|e| match e {
        Error::DocumentOpen { .. } => e,
        other => Error::open(path, other),
    })
}

fn as_page_error(err: Error, path: &Path, page: u32) -> Error {
    match err {
        Error::PageRender { .. } => err,
        other => Error::page(path, page, other),
    }
}

enum PageSource {
    Raster(Box<dyn RasterPages>),
    Layout {
        backend: LopdfBackend,
        pages: Vec<PageId>,
        preview: Option<Box<dyn RasterPages>>,
    },
}

impl PageSource {
    fn page_count(&self) -> u32 {
        match self {
            PageSource::Raster(pages) => pages.page_count(),
            PageSource::Layout { pages, .. } => pages.len() as u32,
        }
    }
}

/// Lazy, ordered page units of one document.
///
/// Each call to `next` renders exactly one page. A page that fails becomes
/// a [`PageContent::Failed`] unit in its slot and the stream goes on.
pub struct PageStream {
    path: PathBuf,
    config: RenderConfig,
    source: PageSource,
    next: u32,
    count: u32,
}

impl PageStream {
    /// Document being rendered.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> u32 {
        self.count
    }

    /// Index of the next page to be rendered.
    pub fn position(&self) -> u32 {
        self.next
    }

    pub fn is_done(&self) -> bool {
        self.next >= self.count
    }

    fn render_page(&self, index: u32) -> Result<PageContent> {
        match &self.source {
            PageSource::Raster(pages) => self.encode_page(pages.as_ref(), index).map(PageContent::Image),
            PageSource::Layout {
                backend,
                pages,
                preview,
            } => {
                let page_id = pages
                    .get(index as usize)
                    .copied()
                    .ok_or_else(|| Error::page(&self.path, index, "page is missing"))?;
                let layout = LayoutAnalyzer::new(backend).analyze_page(page_id, index)?;
                let mut spans = PageSpans::from_layout(layout);
                if let Some(preview) = preview {
                    spans = spans.with_preview(self.encode_page(preview.as_ref(), index)?);
                }
                Ok(PageContent::Spans(spans))
            }
        }
    }

    fn encode_page(&self, pages: &dyn RasterPages, index: u32) -> Result<PageImage> {
        let image = pages.render_page(index, self.config.dpi)?;
        let data_uri = encode_data_uri(&image, self.config.image_format, self.config.jpeg_quality)?;
        Ok(PageImage {
            width: image.width(),
            height: image.height(),
            dpi: self.config.dpi,
            format: self.config.image_format,
            data_uri,
        })
    }
}

impl Iterator for PageStream {
    type Item = PageUnit;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_done() {
            return None;
        }
        let index = self.next;
        self.next += 1;

        let unit = match self.render_page(index) {
            Ok(content) => PageUnit::new(&self.path, index, content),
            Err(e) => {
                let err = as_page_error(e, &self.path, index);
                log::warn!("{}", err);
                let reason = match err {
                    Error::PageRender { reason, .. } => reason,
                    other => other.to_string(),
                };
                PageUnit::failed(&self.path, index, reason)
            }
        };
        Some(unit)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count.saturating_sub(self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PageStream {}

impl fmt::Debug for PageStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageStream")
            .field("path", &self.path)
            .field("position", &self.next)
            .field("page_count", &self.count)
            .finish()
    }
}
