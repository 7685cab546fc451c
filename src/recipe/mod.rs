//! Recipes: ready-made annotation sessions.
//!
//! A recipe bundles the dataset name, the interface to show, its UI config
//! and the stream of tasks. The host tool pulls tasks from
//! [`RecipeComponents::stream`] one at a time; streams are lazy and prefetch
//! `lookahead` tasks ahead.

mod fetch;
mod image;
mod ocr;
mod spans;

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use serde_json::Value;

use crate::error::{Error, Result};

pub use fetch::layout_fetch;
pub use image::{image_manual, label_colors, LABEL_COLORS};
pub use ocr::{ocr_correct, OcrOptions};
pub use spans::{preview_css, spans_manual, SpansOptions, SPANS_CSS};

/// Lazy sequence of task records.
pub type TaskStream = Box<dyn Iterator<Item = Result<Value>>>;

/// Hook run on answered examples before they are stored.
pub type BeforeDb = fn(&mut [Value]);

/// Everything the host needs to run an annotation session.
pub struct RecipeComponents {
    pub dataset: String,
    pub view_id: String,
    /// UI configuration
    pub config: Value,
    pub stream: TaskStream,
    pub before_db: Option<BeforeDb>,
}

impl fmt::Debug for RecipeComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecipeComponents")
            .field("dataset", &self.dataset)
            .field("view_id", &self.view_id)
            .field("config", &self.config)
            .field("before_db", &self.before_db.is_some())
            .finish()
    }
}

/// Read tasks from a JSONL file, one object per non-blank line.
pub fn read_jsonl(path: &Path) -> Result<impl Iterator<Item = Result<Value>>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(reader.lines().filter_map(|line| match line {
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(serde_json::from_str::<Value>(&line).map_err(Error::from)),
        Err(e) => Some(Err(Error::from(e))),
    }))
}

/// Write `task` as one JSONL line.
pub fn write_jsonl_line<W: Write>(writer: &mut W, task: &Value) -> Result<()> {
    serde_json::to_writer(&mut *writer, task)?;
    writer.write_all(b"\n")?;
    Ok(())
}

fn is_jsonl(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jsonl"))
}
