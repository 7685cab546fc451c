//! Bounding-box annotation on page images.

use std::path::Path;

use serde_json::{json, Map, Value};

use super::{RecipeComponents, TaskStream};
use crate::config::RenderMode;
use crate::error::{Error, Result};
use crate::render::{stream, CorpusStream, DocumentRenderer};
use crate::task::{image_task, strip_data_uris};

/// Label highlight colors, assigned in label order and reused cyclically.
pub const LABEL_COLORS: &[&str] = &[
    "#00ffff", "#ff00ff", "#00ff7f", "#ff6347", "#00bfff", "#ffa500", "#ff69b4", "#7fffd4",
    "#ffd700", "#ffdab9", "#adff2f", "#d2b48c", "#dcdcdc", "#ffff00",
];

/// Map each label to its highlight color.
pub fn label_colors(labels: &[String]) -> Map<String, Value> {
    labels
        .iter()
        .zip(LABEL_COLORS.iter().cycle())
        .map(|(label, color)| (label.clone(), Value::from(*color)))
        .collect()
}

/// Annotate regions on rendered pages of the PDFs at `source`.
///
/// Every page becomes one image task; pages that fail to render are logged
/// and skipped. With `remove_base64`, page images are dropped from answers
/// before they are stored, leaving `meta.path` and `meta.page` to find them.
pub fn image_manual<P: AsRef<Path>>(
    dataset: &str,
    source: P,
    renderer: DocumentRenderer,
    remove_base64: bool,
) -> Result<RecipeComponents> {
    let config = renderer.config().clone();
    if config.mode != RenderMode::Image {
        return Err(Error::UnsupportedMode(format!(
            "image annotation needs image mode, got {}",
            config.mode
        )));
    }
    log::info!("Starting image annotation for dataset {}", dataset);

    let labels = config.labels.clone();
    let units = CorpusStream::discover(renderer, source)?;
    let tasks = units.filter_map(move |unit| match unit {
        Ok(unit) => image_task(&unit, &labels).map(Ok),
        Err(e) => Some(Err(e)),
    });
    let task_stream: TaskStream = Box::new(stream(tasks, config.lookahead));

    Ok(RecipeComponents {
        dataset: dataset.to_string(),
        view_id: "image_manual".to_string(),
        config: json!({
            "labels": config.labels,
            "image_manual_stroke_width": 2,
            "custom_theme": {
                "labels": label_colors(&config.labels),
            },
        }),
        stream: task_stream,
        before_db: remove_base64.then_some(strip_data_uris as fn(&mut [Value])),
    })
}
