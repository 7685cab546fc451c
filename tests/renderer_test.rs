//! Rendering documents into page units.

mod common;

use annopdf::{
    is_pdf_bytes, DocumentRenderer, Error, LayoutLabel, PageContent, PageUnit, RenderConfig,
    RenderMode,
};
use common::{numbered_pages, pdf_bytes, text_page, write_pdf, FakeRasterizer, TestPage, PAGE_HEIGHT, PAGE_WIDTH};
use tempfile::TempDir;

fn text_renderer() -> DocumentRenderer {
    let config = RenderConfig::new().text_spans().with_preview(false);
    DocumentRenderer::text_only(config).unwrap()
}

fn image_renderer(dpi: u32, rasterizer: FakeRasterizer) -> DocumentRenderer {
    DocumentRenderer::with_rasterizer(RenderConfig::new().with_dpi(dpi), rasterizer).unwrap()
}

#[test]
fn test_unit_count_matches_page_count() {
    let dir = TempDir::new().unwrap();
    for count in [1, 2, 5] {
        let path = write_pdf(dir.path(), &format!("doc{}.pdf", count), &numbered_pages(count));
        let stream = text_renderer().render(&path).unwrap();
        assert_eq!(stream.page_count(), count as u32);
        assert_eq!(stream.len(), count);
        assert_eq!(stream.count(), count);
    }
}

#[test]
fn test_units_in_page_order() {
    let dir = TempDir::new().unwrap();
    let path = write_pdf(dir.path(), "ordered.pdf", &numbered_pages(4));

    let units: Vec<PageUnit> = text_renderer().render(&path).unwrap().collect();
    let pages: Vec<u32> = units.iter().map(|u| u.page).collect();
    assert_eq!(pages, vec![0, 1, 2, 3]);

    for (i, unit) in units.iter().enumerate() {
        let spans = unit.spans().expect("text unit");
        assert!(spans.text.contains(&format!("page number {}", i + 1)));
        assert_eq!(unit.path, path);
    }
}

#[test]
fn test_layout_labels() {
    let dir = TempDir::new().unwrap();
    let path = write_pdf(dir.path(), "labels.pdf", &numbered_pages(2));

    let units: Vec<PageUnit> = text_renderer().render(&path).unwrap().collect();
    let first = units[0].spans().unwrap();
    assert_eq!(first.blocks[0].label, LayoutLabel::Title);
    assert_eq!(first.blocks[1].label, LayoutLabel::Text);
    let second = units[1].spans().unwrap();
    assert_eq!(second.blocks[0].label, LayoutLabel::SectionHeader);

    assert_eq!(first.width, PAGE_WIDTH);
    assert_eq!(first.height, PAGE_HEIGHT);
    let heading = &first.tokens[first.blocks[0].token_start];
    assert_eq!(heading.text, "Chapter");
    assert!(heading.style.is_some());
}

#[test]
fn test_corrupt_page_becomes_placeholder() {
    let dir = TempDir::new().unwrap();
    let pages = vec![
        text_page(&[("First page text here.", 10.0)]),
        TestPage::Corrupt,
        text_page(&[("Third page text here.", 10.0)]),
    ];
    let path = write_pdf(dir.path(), "corrupt.pdf", &pages);

    let units: Vec<PageUnit> = text_renderer().render(&path).unwrap().collect();
    assert_eq!(units.len(), 3);
    assert!(!units[0].is_failed());
    assert!(units[1].is_failed());
    assert!(!units[2].is_failed());
    assert_eq!(units[1].page, 1);
    assert!(units[1].failure().is_some_and(|r| !r.is_empty()));
}

#[test]
fn test_failed_raster_page_becomes_placeholder() {
    let dir = TempDir::new().unwrap();
    let path = write_pdf(dir.path(), "raster.pdf", &numbered_pages(3));

    let renderer = image_renderer(72, FakeRasterizer::failing_on(&[2]));
    let units: Vec<PageUnit> = renderer.render(&path).unwrap().collect();
    assert_eq!(units.len(), 3);
    assert!(units[0].image().is_some());
    assert!(units[1].image().is_some());
    assert!(matches!(units[2].content, PageContent::Failed(_)));
}

#[test]
fn test_rendering_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let path = write_pdf(dir.path(), "twice.pdf", &numbered_pages(3));

    let renderer = text_renderer();
    let first: Vec<PageUnit> = renderer.render(&path).unwrap().collect();
    let second: Vec<PageUnit> = renderer.render(&path).unwrap().collect();
    assert_eq!(first, second);

    let renderer = image_renderer(72, FakeRasterizer::new());
    let first: Vec<PageUnit> = renderer.render(&path).unwrap().collect();
    let second: Vec<PageUnit> = renderer.render(&path).unwrap().collect();
    assert_eq!(first, second);
}

#[test]
fn test_three_pages_at_150_dpi() {
    let dir = TempDir::new().unwrap();
    let path = write_pdf(dir.path(), "three.pdf", &numbered_pages(3));

    let renderer = image_renderer(150, FakeRasterizer::new());
    let units: Vec<PageUnit> = renderer.render(&path).unwrap().collect();
    assert_eq!(units.len(), 3);

    let expected_width = (PAGE_WIDTH * 150.0 / 72.0).round() as u32;
    let expected_height = (PAGE_HEIGHT * 150.0 / 72.0).round() as u32;
    for (i, unit) in units.iter().enumerate() {
        assert_eq!(unit.page, i as u32);
        let image = unit.image().expect("image unit");
        assert_eq!(image.dpi, 150);
        assert_eq!((image.width, image.height), (expected_width, expected_height));
        assert!(image.data_uri.starts_with("data:image/jpeg;base64,"));
    }
}

#[test]
fn test_stream_is_lazy() {
    let dir = TempDir::new().unwrap();
    let path = write_pdf(dir.path(), "lazy.pdf", &numbered_pages(5));

    let rasterizer = FakeRasterizer::new();
    let rendered = rasterizer.rendered.clone();
    let renderer = image_renderer(36, rasterizer);

    let mut stream = renderer.render(&path).unwrap();
    assert_eq!(rendered.get(), 0);
    stream.next().unwrap();
    stream.next().unwrap();
    assert_eq!(rendered.get(), 2);
    assert_eq!(stream.position(), 2);
    assert!(!stream.is_done());
}

#[test]
fn test_text_mode_preview() {
    let dir = TempDir::new().unwrap();
    let path = write_pdf(dir.path(), "preview.pdf", &numbered_pages(1));

    let config = RenderConfig::new().text_spans().with_dpi(72);
    let renderer = DocumentRenderer::with_rasterizer(config, FakeRasterizer::new()).unwrap();
    let unit = renderer.render(&path).unwrap().next().unwrap();
    let preview = unit.spans().unwrap().preview.as_ref().expect("preview");
    assert_eq!(preview.width, PAGE_WIDTH as u32);
}

#[test]
fn test_non_pdf_is_open_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.pdf");
    std::fs::write(&path, "just some text").unwrap();
    assert!(!is_pdf_bytes(b"just some text"));
    assert!(is_pdf_bytes(&pdf_bytes(&numbered_pages(1))));

    let err = text_renderer().render(&path).unwrap_err();
    assert!(matches!(err, Error::DocumentOpen { .. }));
    assert!(!err.is_recoverable());

    let missing = dir.path().join("missing.pdf");
    assert!(matches!(
        text_renderer().render(&missing),
        Err(Error::DocumentOpen { .. })
    ));
}

#[test]
fn test_image_mode_needs_rasterizer() {
    let err = DocumentRenderer::text_only(RenderConfig::new().with_mode(RenderMode::Image))
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedMode(_)));

    assert!(matches!(
        "video".parse::<RenderMode>(),
        Err(Error::UnsupportedMode(_))
    ));
}

#[test]
fn test_invalid_dpi_rejected() {
    let config = RenderConfig::new().with_dpi(0);
    assert!(matches!(
        DocumentRenderer::with_rasterizer(config, FakeRasterizer::new()),
        Err(Error::InvalidConfig(_))
    ));
}
