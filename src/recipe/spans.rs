//! Span annotation over text extracted from PDF layouts.

use std::iter;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use super::{is_jsonl, read_jsonl, RecipeComponents, TaskStream};
use crate::config::{RenderConfig, RenderMode};
use crate::error::{Error, Result};
use crate::model::{PageUnit, FONT_SIZE_TEXT};
use crate::render::{stream, DocumentRenderer};
use crate::source::discover;
use crate::task::{
    disable_tokens, focus_tasks, layout_document_task, layout_page_task, remove_preview,
    SPANS_VIEW,
};

/// Base stylesheet for the span interface.
pub const SPANS_CSS: &str = ".prodigy-content { text-align: left }";

const CSS_CLS: &str = ".prodigy-annotator:not(:has(.prodigy-page-content)) .prodigy-container";
const CSS_CLS_PAGES: &str = ".prodigy-annotator:has(.prodigy-page-content) .prodigy-page-content";

/// Stylesheet placing the page preview next to the text.
pub fn preview_css() -> String {
    let (c, p) = (CSS_CLS, CSS_CLS_PAGES);
    format!(
        "\n{c}, {p} {{ display: grid }}\n\
         {c} {{ grid-template-columns: 0 1fr 50% }}\n\
         {p} {{ grid-template-columns: 1fr 50%; }}\n\
         {c} > div:nth-child(2), {p} > div:nth-child(1) {{ border-right: 1px solid #ddd }}\n\
         {c} > div:nth-child(3), {p} > div:nth-child(3) {{ position: relative }}\n\
         {c} > div:nth-child(3) > div:first-child, {p} > div:nth-child(2) > div:first-child {{ position: sticky; top: 0 }}\n\
         {c} .prodigy-meta {{ grid-column: 1 / span 3 }}\n"
    )
}

/// How layout text is split into tasks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpansOptions {
    /// Layout labels to walk through block by block (focus mode)
    pub focus: Vec<String>,
    /// Layout labels whose tokens cannot be annotated
    pub disable: Vec<String>,
    /// One task per page instead of one per document
    pub split_pages: bool,
}

impl SpansOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_focus<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.focus = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_disabled<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disable = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn split_pages(mut self, split: bool) -> Self {
        self.split_pages = split;
        self
    }

    /// Interface of the whole session: a paged view when each task is a
    /// document, otherwise the blocks view.
    pub fn view_id(&self) -> &'static str {
        if !self.split_pages && self.focus.is_empty() {
            "pages"
        } else {
            "blocks"
        }
    }
}

/// Tasks for one document, in page order.
pub(crate) fn document_tasks(
    renderer: &DocumentRenderer,
    path: &Path,
    options: &SpansOptions,
) -> Result<Box<dyn Iterator<Item = Value>>> {
    let pages = renderer.render(path)?;
    let labels = renderer.config().labels.clone();

    if !options.focus.is_empty() {
        let focus = options.focus.clone();
        return Ok(Box::new(pages.flat_map(move |unit| {
            focus_tasks(&unit, &focus, &labels, SPANS_VIEW)
        })));
    }
    if options.split_pages {
        return Ok(Box::new(
            pages.filter_map(move |unit| layout_page_task(&unit, &labels, SPANS_VIEW)),
        ));
    }
    let units: Vec<PageUnit> = pages.collect();
    Ok(Box::new(iter::once(layout_document_task(
        path, &units, &labels, SPANS_VIEW,
    ))))
}

/// Lazily produce tasks for each document in turn. A document that cannot
/// be opened yields its error and the stream continues.
pub(crate) fn layout_tasks(
    renderer: DocumentRenderer,
    paths: Vec<PathBuf>,
    options: SpansOptions,
) -> impl Iterator<Item = Result<Value>> {
    paths.into_iter().flat_map(move |path| -> Box<dyn Iterator<Item = Result<Value>>> {
        match document_tasks(&renderer, &path, &options) {
            Ok(tasks) => Box::new(tasks.map(Ok)),
            Err(e) => {
                log::warn!("Skipping {}: {}", path.display(), e);
                Box::new(iter::once(Err(e)))
            }
        }
    })
}

/// Layout tasks are built from text spans, so a renderer in any other mode
/// would produce no tasks at all.
pub(super) fn require_text_spans(config: &RenderConfig, recipe: &str) -> Result<()> {
    if config.mode != RenderMode::TextSpans {
        return Err(Error::UnsupportedMode(format!(
            "{} needs text-spans mode, got {}",
            recipe, config.mode
        )));
    }
    Ok(())
}

/// Annotate spans over the layout text of the PDFs at `source`.
///
/// `source` is a PDF, a directory of PDFs, or a `.jsonl` file written by
/// [`layout_fetch`](super::layout_fetch). Page previews follow the
/// renderer's `hide_preview` setting.
pub fn spans_manual<P: AsRef<Path>>(
    dataset: &str,
    source: P,
    renderer: DocumentRenderer,
    options: SpansOptions,
) -> Result<RecipeComponents> {
    let source = source.as_ref();
    let config = renderer.config().clone();
    log::info!("Starting span annotation for dataset {}", dataset);

    let tasks: Box<dyn Iterator<Item = Result<Value>>> = if is_jsonl(source) {
        log::info!("Loading pre-processed tasks from {}", source.display());
        Box::new(read_jsonl(source)?)
    } else {
        require_text_spans(&config, "span annotation")?;
        Box::new(layout_tasks(renderer, discover(source)?, options.clone()))
    };

    let disable = options.disable.clone();
    let hide_preview = config.hide_preview;
    let tasks = tasks.map(move |task: Result<Value>| -> Result<Value> {
        let mut task = task?;
        disable_tokens(&mut task, &disable);
        if hide_preview {
            remove_preview(&mut task, SPANS_VIEW);
        }
        Ok(task)
    });
    let task_stream: TaskStream = Box::new(stream(tasks, config.lookahead));

    let mut css = SPANS_CSS.to_string();
    if !hide_preview {
        css.push_str(&preview_css());
    }

    Ok(RecipeComponents {
        dataset: dataset.to_string(),
        view_id: options.view_id().to_string(),
        config: json!({
            "labels": config.labels,
            "global_css": css,
            "shade_bounding_boxes": true,
            "custom_theme": {
                "cardMaxWidth": "95%",
                "smallText": FONT_SIZE_TEXT,
                "tokenHeight": 25,
            },
        }),
        stream: task_stream,
        before_db: None,
    })
}
