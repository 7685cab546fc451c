//! Task records in the shape the annotation tool expects.

use std::path::Path;

use serde_json::{json, Map, Value};

use super::hash::set_hashes;
use crate::model::{tokenize, PageImage, PageSpans, PageUnit, SpanBlock};
use crate::raster::{is_data_uri, POINTS_PER_INCH};
use crate::source::document_title;

/// View id of the token-level span annotation interface.
pub const SPANS_VIEW: &str = "spans_manual";

/// Color of the block outline drawn on the preview in focus mode.
pub const FOCUS_COLOR: &str = "magenta";

fn path_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Image task for a rendered page. Returns `None` for other units.
pub fn image_task(unit: &PageUnit, labels: &[String]) -> Option<Value> {
    let image = unit.image()?;
    let mut task = json!({
        "image": image.data_uri,
        "width": image.width,
        "height": image.height,
        "labels": labels,
        "meta": {
            "page": unit.page,
            "path": path_string(&unit.path),
            "dpi": image.dpi,
        },
    });
    set_hashes(&mut task);
    Some(task)
}

fn view_blocks(view_id: &str, image_spans: Option<Vec<Value>>) -> Value {
    let mut blocks = vec![json!({ "view_id": view_id })];
    if let Some(spans) = image_spans {
        blocks.push(json!({ "view_id": "image", "spans": spans }));
    }
    json!({ "blocks": blocks })
}

/// Page body shared by per-page and per-document tasks: text, tokens,
/// size, a blocks view and the preview image when there is one.
pub fn layout_page(spans: &PageSpans, view_id: &str) -> Map<String, Value> {
    let mut page = Map::new();
    page.insert("text".into(), Value::from(spans.text.as_str()));
    page.insert("tokens".into(), json!(spans.tokens));
    page.insert("width".into(), json!(spans.width));
    page.insert("height".into(), json!(spans.height));
    page.insert("view_id".into(), Value::from("blocks"));
    page.insert(
        "config".into(),
        view_blocks(view_id, spans.preview.as_ref().map(|_| Vec::new())),
    );
    if let Some(preview) = &spans.preview {
        page.insert("image".into(), Value::from(preview.data_uri.as_str()));
    }
    page
}

/// One task per page of text. Returns `None` for non-text units.
pub fn layout_page_task(unit: &PageUnit, labels: &[String], view_id: &str) -> Option<Value> {
    let spans = unit.spans()?;
    let mut page = layout_page(spans, view_id);
    page.insert("labels".into(), json!(labels));
    page.insert(
        "meta".into(),
        json!({
            "title": unit.title(),
            "page": unit.page,
            "path": path_string(&unit.path),
        }),
    );
    let mut task = Value::Object(page);
    set_hashes(&mut task);
    Some(task)
}

/// One task holding every text page of a document. Units that are not
/// text pages are left out.
pub fn layout_document_task(path: &Path, units: &[PageUnit], labels: &[String], view_id: &str) -> Value {
    let pages: Vec<Value> = units
        .iter()
        .filter_map(PageUnit::spans)
        .map(|spans| Value::Object(layout_page(spans, view_id)))
        .collect();
    let mut task = json!({
        "pages": pages,
        "labels": labels,
        "meta": {
            "title": document_title(path),
            "path": path_string(path),
        },
    });
    set_hashes(&mut task);
    task
}

/// Outline of `block` on the preview, in preview pixels.
fn focus_outline(block: &SpanBlock, preview: &PageImage, id: usize) -> Value {
    let bbox = block.bbox.scaled(preview.dpi as f32 / POINTS_PER_INCH);
    json!({
        "x": bbox.x,
        "y": bbox.y,
        "width": bbox.width,
        "height": bbox.height,
        "color": FOCUS_COLOR,
        "id": id,
    })
}

/// One task per block whose label is in `focus`.
///
/// Each task holds only the block's text, so `text_span` covers that text
/// from its first to its last token. The block's character range within the
/// page text is kept in `meta`.
pub fn focus_tasks(unit: &PageUnit, focus: &[String], labels: &[String], view_id: &str) -> Vec<Value> {
    let Some(spans) = unit.spans() else {
        return Vec::new();
    };

    spans
        .blocks
        .iter()
        .enumerate()
        .filter(|(_, block)| focus.iter().any(|f| f == block.label.as_str()))
        .map(|(i, block)| {
            let outline = spans.preview.as_ref().map(|p| vec![focus_outline(block, p, i)]);
            let tokens = tokenize(&block.text, block.label);
            let mut task = json!({
                "text": block.text,
                "tokens": tokens,
                "width": spans.width,
                "height": spans.height,
                "view_id": "blocks",
                "config": view_blocks(view_id, outline),
                "text_span": {
                    "token_start": 0,
                    "token_end": tokens.len().saturating_sub(1),
                    "start": 0,
                    "end": block.text.chars().count(),
                    "text": block.text,
                    "label": block.label,
                },
                "labels": labels,
                "meta": {
                    "title": unit.title(),
                    "page": unit.page,
                    "path": path_string(&unit.path),
                    "page_start": block.start,
                    "page_end": block.end,
                },
            });
            if let (Some(preview), Some(object)) = (&spans.preview, task.as_object_mut()) {
                object.insert("image".into(), Value::from(preview.data_uri.as_str()));
            }
            set_hashes(&mut task);
            task
        })
        .collect()
}

/// Drop inline `data:` images from examples before they are stored,
/// including the images of pages nested in document tasks.
pub fn strip_data_uris(examples: &mut [Value]) {
    for example in examples.iter_mut() {
        strip_image(example);
        if let Some(pages) = example.get_mut("pages").and_then(Value::as_array_mut) {
            pages.iter_mut().for_each(strip_image);
        }
    }
}

fn strip_image(example: &mut Value) {
    let Some(object) = example.as_object_mut() else {
        return;
    };
    let inline = object
        .get("image")
        .and_then(Value::as_str)
        .is_some_and(is_data_uri);
    if inline {
        object.remove("image");
    }
}

/// Mark a task as already accepted.
pub fn add_answer(task: &mut Value, answer: &str) {
    if let Some(object) = task.as_object_mut() {
        object.insert("answer".into(), Value::from(answer));
    }
}

/// Disable tokens whose layout label is in `disabled`.
pub fn disable_tokens(task: &mut Value, disabled: &[String]) {
    if disabled.is_empty() {
        return;
    }
    for_each_page(task, |page| {
        let Some(tokens) = page.get_mut("tokens").and_then(Value::as_array_mut) else {
            return;
        };
        for token in tokens {
            let hit = token
                .get("layout")
                .and_then(Value::as_str)
                .is_some_and(|l| disabled.iter().any(|d| d == l));
            if let (true, Some(object)) = (hit, token.as_object_mut()) {
                object.insert("disabled".into(), Value::Bool(true));
            }
        }
    });
}

/// Remove the preview image and reduce the blocks view to `view_id` alone.
pub fn remove_preview(task: &mut Value, view_id: &str) {
    for_each_page(task, |page| {
        let Some(object) = page.as_object_mut() else {
            return;
        };
        if let Some(config) = object.get_mut("config").and_then(Value::as_object_mut) {
            if config.contains_key("blocks") {
                config.insert("blocks".into(), json!([{ "view_id": view_id }]));
            }
        }
        object.remove("image");
    });
}

/// Apply `f` to the task itself and to each nested page.
fn for_each_page<F: FnMut(&mut Value)>(task: &mut Value, mut f: F) {
    f(task);
    if let Some(pages) = task.get_mut("pages").and_then(Value::as_array_mut) {
        pages.iter_mut().for_each(&mut f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageFormat;
    use crate::model::{PageContent, PageSpans};
    use crate::parser::{BoundingBox, LayoutBlock, LayoutLabel, PageLayout};
    use crate::task::hash::{INPUT_HASH_ATTR, TASK_HASH_ATTR};

    fn preview() -> PageImage {
        PageImage {
            width: 1275,
            height: 1650,
            dpi: 150,
            format: ImageFormat::Jpeg,
            data_uri: "data:image/jpeg;base64,AAAA".to_string(),
        }
    }

    fn spans_unit(with_preview: bool) -> PageUnit {
        let layout = PageLayout {
            width: 612.0,
            height: 792.0,
            blocks: vec![
                LayoutBlock {
                    text: "Methods".to_string(),
                    label: LayoutLabel::SectionHeader,
                    bbox: BoundingBox {
                        x: 72.0,
                        y: 72.0,
                        width: 60.0,
                        height: 14.0,
                    },
                    heading_level: 2,
                },
                LayoutBlock {
                    text: "We sampled widely.".to_string(),
                    label: LayoutLabel::Text,
                    bbox: BoundingBox {
                        x: 72.0,
                        y: 100.0,
                        width: 200.0,
                        height: 12.0,
                    },
                    heading_level: 0,
                },
            ],
        };
        let mut spans = PageSpans::from_layout(layout);
        if with_preview {
            spans = spans.with_preview(preview());
        }
        PageUnit::new("/docs/paper.pdf", 2, PageContent::Spans(spans))
    }

    fn labels() -> Vec<String> {
        vec!["PERSON".to_string()]
    }

    #[test]
    fn test_image_task_shape() {
        let unit = PageUnit::new("/docs/scan.pdf", 1, PageContent::Image(preview()));
        let task = image_task(&unit, &labels()).unwrap();

        assert_eq!(task["image"], "data:image/jpeg;base64,AAAA");
        assert_eq!(task["width"], 1275);
        assert_eq!(task["meta"]["page"], 1);
        assert_eq!(task["meta"]["path"], "/docs/scan.pdf");
        assert_eq!(task["meta"]["dpi"], 150);
        assert_eq!(task["labels"], json!(["PERSON"]));
        assert!(task.get(INPUT_HASH_ATTR).is_some());
        assert!(task.get(TASK_HASH_ATTR).is_some());

        assert!(image_task(&spans_unit(false), &labels()).is_none());
    }

    #[test]
    fn test_layout_page_task() {
        let task = layout_page_task(&spans_unit(true), &labels(), SPANS_VIEW).unwrap();
        assert_eq!(task["text"], "Methods\n\nWe sampled widely.");
        assert_eq!(task["view_id"], "blocks");
        assert_eq!(task["config"]["blocks"][0]["view_id"], SPANS_VIEW);
        assert_eq!(task["config"]["blocks"][1]["view_id"], "image");
        assert_eq!(task["meta"]["title"], "paper");
        assert_eq!(task["meta"]["page"], 2);
        assert!(task["image"].as_str().unwrap().starts_with("data:"));

        let task = layout_page_task(&spans_unit(false), &labels(), SPANS_VIEW).unwrap();
        assert_eq!(task["config"]["blocks"].as_array().unwrap().len(), 1);
        assert!(task.get("image").is_none());
    }

    #[test]
    fn test_layout_document_task() {
        let units = vec![
            spans_unit(false),
            PageUnit::failed("/docs/paper.pdf", 3, "broken"),
        ];
        let task = layout_document_task(Path::new("/docs/paper.pdf"), &units, &labels(), SPANS_VIEW);
        assert_eq!(task["pages"].as_array().unwrap().len(), 1);
        assert_eq!(task["meta"]["title"], "paper");
        assert!(task["meta"].get("page").is_none());
    }

    #[test]
    fn test_focus_tasks() {
        let focus = vec!["text".to_string()];
        let tasks = focus_tasks(&spans_unit(true), &focus, &labels(), SPANS_VIEW);
        assert_eq!(tasks.len(), 1);

        let task = &tasks[0];
        assert_eq!(task["text"], "We sampled widely.");
        assert_eq!(task["tokens"].as_array().unwrap().len(), 3);
        assert_eq!(task["text_span"]["label"], "text");
        assert_eq!(task["text_span"]["start"], 0);
        assert_eq!(task["text_span"]["end"], 18);
        assert_eq!(task["text_span"]["token_start"], 0);
        assert_eq!(task["text_span"]["token_end"], 2);
        assert_eq!(task["meta"]["page_start"], 9);
        assert_eq!(task["meta"]["page_end"], 27);

        let outline = &task["config"]["blocks"][1]["spans"][0];
        assert_eq!(outline["color"], FOCUS_COLOR);
        // 72pt at 150 dpi
        assert_eq!(outline["x"].as_f64().unwrap(), 150.0);
    }

    #[test]
    fn test_strip_data_uris() {
        let mut examples = vec![
            json!({"image": "data:image/png;base64,AAAA", "text": "a"}),
            json!({"image": "https://example.com/a.png"}),
            json!({"pages": [{"image": "data:image/jpeg;base64,AA"}]}),
        ];
        strip_data_uris(&mut examples);
        assert!(examples[0].get("image").is_none());
        assert_eq!(examples[1]["image"], "https://example.com/a.png");
        assert!(examples[2]["pages"][0].get("image").is_none());
    }

    #[test]
    fn test_disable_and_remove_preview() {
        let mut task = layout_page_task(&spans_unit(true), &labels(), SPANS_VIEW).unwrap();
        disable_tokens(&mut task, &["section_header".to_string()]);
        assert_eq!(task["tokens"][0]["disabled"], true);
        assert!(task["tokens"][2].get("disabled").is_none());

        remove_preview(&mut task, SPANS_VIEW);
        assert!(task.get("image").is_none());
        assert_eq!(task["config"]["blocks"], json!([{"view_id": SPANS_VIEW}]));

        add_answer(&mut task, "accept");
        assert_eq!(task["answer"], "accept");
    }
}
