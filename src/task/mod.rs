//! Conversion of page units into annotation task records.

mod hash;
mod records;

pub use hash::{
    input_hash, set_hashes, task_hash, INPUT_HASH_ATTR, INPUT_KEYS, TASK_HASH_ATTR, TASK_KEYS,
};
pub use records::{
    add_answer, disable_tokens, focus_tasks, image_task, layout_document_task, layout_page,
    layout_page_task, remove_preview, strip_data_uris, FOCUS_COLOR, SPANS_VIEW,
};
