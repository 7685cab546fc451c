//! PDFium-backed rasterizer.
//!
//! `Pdfium` is neither `Send` nor `Sync`, and loaded documents borrow it.
//! The bindings are leaked to get a `'static` borrow, so an opened document
//! stays loaded for all of its page renders. The system library is bound at
//! most once per thread. Callers that need threads create one rasterizer per
//! thread.

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use pdfium_render::prelude::*;

use super::{pixel_size, RasterPages, Rasterizer};
use crate::error::{Error, Result};

thread_local! {
    static SYSTEM_PDFIUM: OnceCell<&'static Pdfium> = const { OnceCell::new() };
}

fn leak(bindings: Box<dyn PdfiumLibraryBindings>) -> &'static Pdfium {
    Box::leak(Box::new(Pdfium::new(bindings)))
}

/// [`Rasterizer`] bound to a PDFium shared library.
pub struct PdfiumRasterizer {
    pdfium: &'static Pdfium,
}

impl PdfiumRasterizer {
    /// Bind to the PDFium library installed on the system.
    pub fn new() -> Result<Self> {
        let pdfium = SYSTEM_PDFIUM.with(|cell| -> Result<&'static Pdfium> {
            if let Some(pdfium) = cell.get() {
                return Ok(*pdfium);
            }
            let bindings = Pdfium::bind_to_system_library().map_err(|e| {
                Error::UnsupportedMode(format!("image rendering needs the PDFium library: {}", e))
            })?;
            log::debug!("Bound system PDFium library");
            Ok(*cell.get_or_init(|| leak(bindings)))
        })?;
        Ok(Self { pdfium })
    }

    /// Bind to the PDFium library found in `dir`.
    pub fn from_directory<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let lib_path = Pdfium::pdfium_platform_library_name_at_path(dir.as_ref());
        let bindings = Pdfium::bind_to_library(&lib_path).map_err(|e| {
            Error::UnsupportedMode(format!(
                "cannot load PDFium from {}: {}",
                lib_path.display(),
                e
            ))
        })?;
        log::debug!("Bound PDFium library at {}", lib_path.display());
        Ok(Self {
            pdfium: leak(bindings),
        })
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn open(&self, path: &Path) -> Result<Box<dyn RasterPages>> {
        let document = self
            .pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| Error::open(path, e))?;
        let page_count = document.pages().len() as u32;
        Ok(Box::new(PdfiumPages {
            document,
            path: path.to_path_buf(),
            page_count,
        }))
    }
}

struct PdfiumPages {
    document: PdfDocument<'static>,
    path: PathBuf,
    page_count: u32,
}

impl RasterPages for PdfiumPages {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn render_page(&self, index: u32, dpi: u32) -> Result<DynamicImage> {
        let page = u16::try_from(index)
            .map_err(|_| Error::page(&self.path, index, "page index out of range"))
            .and_then(|index16| {
                self.document
                    .pages()
                    .get(index16)
                    .map_err(|e| Error::page(&self.path, index, e))
            })?;

        let width = pixel_size(page.width().value, dpi);
        let height = pixel_size(page.height().value, dpi);
        log::debug!(
            "Rendering page {} of {} at {} dpi ({}x{} px)",
            index,
            self.path.display(),
            dpi,
            width,
            height
        );

        let config = PdfRenderConfig::new()
            .set_target_width(width as i32)
            .set_target_height(height as i32)
            .render_form_data(true)
            .render_annotations(true);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| Error::page(&self.path, index, e))?;

        Ok(bitmap.as_image())
    }
}
