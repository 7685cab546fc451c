//! Shared fixtures: small PDFs built with lopdf and a rasterizer that does
//! not need PDFium.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use annopdf::parser::{LopdfBackend, PdfBackend};
use annopdf::raster::pixel_size;
use annopdf::{Error, RasterPages, Rasterizer, Result};
use image::{DynamicImage, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

pub const PAGE_WIDTH: f32 = 300.0;
pub const PAGE_HEIGHT: f32 = 400.0;

/// One page of a fixture document.
pub enum TestPage {
    /// Lines of text, top to bottom, with their font sizes
    Text(Vec<(String, f32)>),
    /// A page whose content stream is not a stream
    Corrupt,
}

pub fn text_page(lines: &[(&str, f32)]) -> TestPage {
    TestPage::Text(lines.iter().map(|(t, s)| (t.to_string(), *s)).collect())
}

/// `count` pages, each with a heading and a paragraph naming its number.
pub fn numbered_pages(count: usize) -> Vec<TestPage> {
    (1..=count)
        .map(|n| {
            let heading = format!("Chapter {}", n);
            let body = format!("This is the body text of page number {}.", n);
            text_page(&[(heading.as_str(), 18.0), (body.as_str(), 10.0)])
        })
        .collect()
}

fn page_content(lines: &[(String, f32)]) -> Vec<u8> {
    let mut operations = Vec::new();
    let mut y = PAGE_HEIGHT - 80.0;
    for (text, size) in lines {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![Object::Name(b"F1".to_vec()), Object::Real(*size)],
        ));
        operations.push(Operation::new(
            "Td",
            vec![Object::Integer(40), Object::Real(y)],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(text.as_str())],
        ));
        operations.push(Operation::new("ET", vec![]));
        y -= size * 2.0;
    }
    Content { operations }.encode().unwrap()
}

/// Serialize `pages` into a PDF.
pub fn pdf_bytes(pages: &[TestPage]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in pages {
        let contents = match page {
            TestPage::Text(lines) => Object::Reference(
                doc.add_object(Stream::new(dictionary! {}, page_content(lines))),
            ),
            TestPage::Corrupt => Object::Integer(42),
        };
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(PAGE_WIDTH),
                Object::Real(PAGE_HEIGHT),
            ],
            "Contents" => contents,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Write `pages` to `dir/name` and return the path.
pub fn write_pdf(dir: &Path, name: &str, pages: &[TestPage]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, pdf_bytes(pages)).unwrap();
    path
}

/// Rasterizer drawing blank pages at the size lopdf reports, failing on
/// chosen page indices. Counts every page it renders.
#[derive(Clone, Default)]
pub struct FakeRasterizer {
    pub failing: BTreeSet<u32>,
    pub rendered: Rc<Cell<usize>>,
}

impl FakeRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(pages: &[u32]) -> Self {
        Self {
            failing: pages.iter().copied().collect(),
            ..Self::default()
        }
    }
}

struct FakePages {
    sizes: Vec<(f32, f32)>,
    failing: BTreeSet<u32>,
    rendered: Rc<Cell<usize>>,
}

impl Rasterizer for FakeRasterizer {
    fn open(&self, path: &Path) -> Result<Box<dyn RasterPages>> {
        let backend = LopdfBackend::load_file(path)?;
        let sizes = backend
            .pages()
            .into_values()
            .map(|id| backend.page_size(id))
            .collect();
        Ok(Box::new(FakePages {
            sizes,
            failing: self.failing.clone(),
            rendered: Rc::clone(&self.rendered),
        }))
    }
}

impl RasterPages for FakePages {
    fn page_count(&self) -> u32 {
        self.sizes.len() as u32
    }

    fn render_page(&self, index: u32, dpi: u32) -> Result<DynamicImage> {
        if self.failing.contains(&index) {
            return Err(Error::Encode("fake rasterizer failure".to_string()));
        }
        let (width, height) = self.sizes[index as usize];
        self.rendered.set(self.rendered.get() + 1);
        let shade = (index * 40 % 200) as u8;
        Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            pixel_size(width, dpi),
            pixel_size(height, dpi),
            Rgb([255, 255 - shade, 255]),
        )))
    }
}
