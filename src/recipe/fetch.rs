//! Pre-processing layouts ahead of an annotation session.

use std::io::Write;
use std::path::Path;

use rayon::prelude::*;
use serde_json::Value;

use super::spans::{document_tasks, require_text_spans, SpansOptions};
use super::write_jsonl_line;
use crate::error::Result;
use crate::render::DocumentRenderer;
use crate::source::discover;
use crate::task::add_answer;

fn fetch_document(
    renderer: &DocumentRenderer,
    path: &Path,
    options: &SpansOptions,
) -> Option<Vec<Value>> {
    match document_tasks(renderer, path, options) {
        Ok(tasks) => Some(
            tasks
                .map(|mut task| {
                    add_answer(&mut task, "accept");
                    task
                })
                .collect(),
        ),
        Err(e) => {
            log::warn!("Skipping {}: {}", path.display(), e);
            None
        }
    }
}

/// Extract layout tasks for the PDFs at `source` and write them to `writer`
/// as JSONL, already accepted, so [`spans_manual`](super::spans_manual) can
/// load them without re-parsing.
///
/// When the renderer's configuration allows parallel processing, documents
/// are spread over rayon's pool and `make_renderer` builds a renderer for
/// each batch of work. Output keeps document order.
/// Returns the number of tasks written.
pub fn layout_fetch<W, F>(
    mut writer: W,
    source: &Path,
    options: &SpansOptions,
    make_renderer: F,
) -> Result<usize>
where
    W: Write,
    F: Fn() -> Result<DocumentRenderer> + Sync + Send,
{
    let renderer = make_renderer()?;
    require_text_spans(renderer.config(), "layout fetching")?;
    let paths = discover(source)?;
    log::info!("Creating pre-processed tasks for {} documents", paths.len());

    let documents: Vec<Option<Vec<Value>>> = if renderer.config().parallel && paths.len() > 1 {
        paths
            .par_iter()
            .map_init(&make_renderer, |worker, path| match worker {
                Ok(worker) => fetch_document(worker, path, options),
                Err(e) => {
                    log::warn!("Skipping {}: renderer unavailable: {}", path.display(), e);
                    None
                }
            })
            .collect()
    } else {
        paths
            .iter()
            .map(|path| fetch_document(&renderer, path, options))
            .collect()
    };

    let skipped = documents.iter().filter(|d| d.is_none()).count();
    let mut written = 0;
    for task in documents.into_iter().flatten().flatten() {
        write_jsonl_line(&mut writer, &task)?;
        written += 1;
    }
    writer.flush()?;

    if skipped > 0 {
        log::warn!("{} of {} documents could not be opened", skipped, paths.len());
    }
    log::info!("Saved {} pre-processed tasks", written);
    Ok(written)
}
