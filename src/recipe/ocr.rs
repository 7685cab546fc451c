//! Correcting OCR transcripts of regions drawn on page images.

use serde_json::{json, Map, Value};

use super::{RecipeComponents, TaskStream};
use crate::error::{Error, Result};
use crate::ocr::{dpi_scale, example_source, fold_ocr_dashes, span_region, zoom_dpi, OcrEngine};
use crate::raster::{crop_scaled, encode_data_uri};
use crate::render::{stream, DocumentRenderer};
use crate::task::{set_hashes, strip_data_uris};

/// Settings of an OCR correction session.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOptions {
    /// Span labels to transcribe. Empty means every span.
    pub labels: Vec<String>,
    /// Page zoom for recognition, relative to the PDF's native size
    pub zoom: f32,
    /// Glue words hyphenated across line breaks
    pub fold_dashes: bool,
    /// Drop region images before answers are stored
    pub remove_base64: bool,
    /// Focus the transcript field when a task is shown
    pub autofocus: bool,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            labels: Vec::new(),
            zoom: 3.0,
            fold_dashes: false,
            remove_base64: false,
            autofocus: false,
        }
    }
}

impl OcrOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_zoom(mut self, zoom: f32) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn fold_dashes(mut self, fold: bool) -> Self {
        self.fold_dashes = fold;
        self
    }

    pub fn remove_base64(mut self, remove: bool) -> Self {
        self.remove_base64 = remove;
        self
    }

    pub fn autofocus(mut self, autofocus: bool) -> Self {
        self.autofocus = autofocus;
        self
    }

    fn wants(&self, span: &Value) -> bool {
        if self.labels.is_empty() {
            return true;
        }
        span.get("label")
            .and_then(Value::as_str)
            .is_some_and(|label| self.labels.iter().any(|l| l == label))
    }
}

struct Transcriber<E> {
    renderer: DocumentRenderer,
    engine: E,
    options: OcrOptions,
}

impl<E: OcrEngine> Transcriber<E> {
    /// One task per selected span of `example`. The page is rendered once.
    fn transcribe(&self, example: &Value) -> Result<Vec<Value>> {
        let spans: Vec<&Value> = example
            .get("spans")
            .and_then(Value::as_array)
            .map(|spans| spans.iter().filter(|s| self.options.wants(s)).collect())
            .unwrap_or_default();
        if spans.is_empty() {
            return Ok(Vec::new());
        }

        let source = example_source(example)?;
        let ocr_dpi = zoom_dpi(self.options.zoom);
        let page = self
            .renderer
            .rasterize_page(&source.path, source.page, ocr_dpi)?;
        let scale = dpi_scale(source.dpi, ocr_dpi);
        let config = self.renderer.config();
        let meta = example.get("meta").cloned().unwrap_or_else(|| json!({}));

        let mut tasks = Vec::with_capacity(spans.len());
        for span in spans {
            let region = crop_scaled(&page, &span_region(span)?, scale);
            let raw = self.engine.recognize(&region)?;
            let text = if self.options.fold_dashes {
                fold_ocr_dashes(&raw)
            } else {
                raw.trim().to_string()
            };

            let mut task = span.as_object().cloned().unwrap_or_else(Map::new);
            task.remove("id");
            task.insert(
                "image".into(),
                encode_data_uri(&region, config.image_format, config.jpeg_quality)?.into(),
            );
            task.insert("text".into(), text.clone().into());
            task.insert("transcription".into(), text.into());
            task.insert("meta".into(), meta.clone());
            task.insert("field_rows".into(), 12.into());
            task.insert("field_label".into(), "Transcript".into());
            task.insert("field_id".into(), "transcription".into());
            task.insert("field_autofocus".into(), self.options.autofocus.into());

            let mut task = Value::Object(task);
            set_hashes(&mut task);
            tasks.push(task);
        }
        log::debug!(
            "Transcribed {} regions of {} page {}",
            tasks.len(),
            source.path.display(),
            source.page
        );
        Ok(tasks)
    }
}

/// Re-render annotated regions at a higher resolution, run OCR on them and
/// let the annotator correct the transcript.
///
/// `examples` are answers of an image annotation session: each carries
/// `spans` with pixel boxes plus `meta.path`, `meta.page` and `meta.dpi`.
/// Only spans whose label is in `options.labels` are transcribed; with no
/// labels set, every span is. An example that cannot be processed yields its
/// error and the stream continues with the next one.
pub fn ocr_correct<I, E>(
    dataset: &str,
    examples: I,
    renderer: DocumentRenderer,
    engine: E,
    options: OcrOptions,
) -> Result<RecipeComponents>
where
    I: IntoIterator<Item = Result<Value>>,
    I::IntoIter: 'static,
    E: OcrEngine + 'static,
{
    if !options.zoom.is_finite() || options.zoom <= 0.0 {
        return Err(Error::InvalidConfig(format!(
            "zoom must be positive, got {}",
            options.zoom
        )));
    }
    log::info!("Starting OCR correction for dataset {}", dataset);

    let lookahead = renderer.config().lookahead;
    let before_db = options.remove_base64.then_some(strip_data_uris as fn(&mut [Value]));
    let transcriber = Transcriber {
        renderer,
        engine,
        options,
    };
    let tasks = examples.into_iter().flat_map(move |example| {
        let result = example.and_then(|example| transcriber.transcribe(&example));
        match result {
            Ok(tasks) => tasks.into_iter().map(Ok).collect::<Vec<_>>(),
            Err(e) => {
                log::warn!("Skipping example: {}", e);
                vec![Err(e)]
            }
        }
    });
    let task_stream: TaskStream = Box::new(stream(tasks, lookahead));

    Ok(RecipeComponents {
        dataset: dataset.to_string(),
        view_id: "blocks".to_string(),
        config: json!({
            "blocks": [
                {"view_id": "classification"},
                {"view_id": "text_input"},
            ],
        }),
        stream: task_stream,
        before_db,
    })
}
