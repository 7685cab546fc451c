//! Task records built from rendered documents.

mod common;

use annopdf::task::{
    image_task, layout_document_task, layout_page_task, set_hashes, strip_data_uris, INPUT_HASH_ATTR,
    SPANS_VIEW, TASK_HASH_ATTR,
};
use annopdf::{DocumentRenderer, PageUnit, RenderConfig};
use common::{numbered_pages, text_page, write_pdf, FakeRasterizer, TestPage};
use serde_json::{json, Value};
use tempfile::TempDir;

fn labels() -> Vec<String> {
    vec!["PERSON".to_string()]
}

fn text_units(pages: &[TestPage]) -> (TempDir, Vec<PageUnit>) {
    let dir = TempDir::new().unwrap();
    let path = write_pdf(dir.path(), "doc.pdf", pages);
    let config = RenderConfig::new().text_spans().with_preview(false);
    let units = DocumentRenderer::text_only(config)
        .unwrap()
        .render(&path)
        .unwrap()
        .collect();
    (dir, units)
}

#[test]
fn test_hashes_stable_across_renders() {
    let (_dir, first) = text_units(&numbered_pages(2));
    let (_dir2, second) = text_units(&numbered_pages(2));

    let a = layout_page_task(&first[1], &labels(), SPANS_VIEW).unwrap();
    let b = layout_page_task(&second[1], &labels(), SPANS_VIEW).unwrap();
    // The temp paths differ but only meta does, which is not hashed.
    assert_ne!(a["meta"]["path"], b["meta"]["path"]);
    assert_eq!(a[INPUT_HASH_ATTR], b[INPUT_HASH_ATTR]);
    assert_eq!(a[TASK_HASH_ATTR], b[TASK_HASH_ATTR]);
}

#[test]
fn test_hashes_follow_input() {
    let (_dir, units) = text_units(&numbered_pages(2));
    let first = layout_page_task(&units[0], &labels(), SPANS_VIEW).unwrap();
    let second = layout_page_task(&units[1], &labels(), SPANS_VIEW).unwrap();
    assert_ne!(first[INPUT_HASH_ATTR], second[INPUT_HASH_ATTR]);

    let mut question = json!({"text": "same input", "label": "A"});
    let mut other = json!({"text": "same input", "label": "B"});
    set_hashes(&mut question);
    set_hashes(&mut other);
    assert_eq!(question[INPUT_HASH_ATTR], other[INPUT_HASH_ATTR]);
    assert_ne!(question[TASK_HASH_ATTR], other[TASK_HASH_ATTR]);
}

#[test]
fn test_document_task_skips_failed_pages() {
    let pages = vec![
        text_page(&[("A readable page.", 10.0)]),
        TestPage::Corrupt,
        text_page(&[("Another readable page.", 10.0)]),
    ];
    let (_dir, units) = text_units(&pages);
    assert_eq!(units.len(), 3);

    let task = layout_document_task(&units[0].path, &units, &labels(), SPANS_VIEW);
    let pages = task["pages"].as_array().unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[1]["text"], "Another readable page.");
    assert_eq!(task["labels"], json!(["PERSON"]));
    assert!(layout_page_task(&units[1], &labels(), SPANS_VIEW).is_none());
}

#[test]
fn test_strip_nested_previews() {
    let dir = TempDir::new().unwrap();
    let path = write_pdf(dir.path(), "doc.pdf", &numbered_pages(2));
    let config = RenderConfig::new().text_spans().with_dpi(36);
    let renderer = DocumentRenderer::with_rasterizer(config, FakeRasterizer::new()).unwrap();
    let units: Vec<PageUnit> = renderer.render(&path).unwrap().collect();

    let mut examples = vec![
        layout_document_task(&path, &units, &labels(), SPANS_VIEW),
        json!({"image": "https://example.org/page.png"}),
    ];
    assert!(examples[0]["pages"][0]["image"].is_string());
    strip_data_uris(&mut examples);
    assert!(examples[0]["pages"][0].get("image").is_none());
    assert!(examples[0]["pages"][1].get("image").is_none());
    assert_eq!(examples[1]["image"], "https://example.org/page.png");
}

#[test]
fn test_image_task_needs_image_unit() {
    let (_dir, units) = text_units(&numbered_pages(1));
    assert!(image_task(&units[0], &labels()).is_none());

    let failed = PageUnit::failed("/doc.pdf", 0, "broken");
    assert!(image_task(&failed, &labels()).is_none());
    let value: Value = serde_json::to_value(&failed).unwrap();
    assert_eq!(value["content"]["kind"], "failed");
}
