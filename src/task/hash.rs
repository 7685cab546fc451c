//! Stable task hashes.
//!
//! The annotation tool deduplicates tasks by `_input_hash` (what is being
//! annotated) and `_task_hash` (the question asked about it). Both are the
//! first four bytes of an MD5 digest over canonical JSON, read as a
//! big-endian `i32`.

use md5::{Digest, Md5};
use serde_json::{Map, Value};

/// Keys that identify the input of a task.
pub const INPUT_KEYS: &[&str] = &["text", "image", "html", "input", "pages"];

/// Keys that, together with the input, identify the question.
pub const TASK_KEYS: &[&str] = &["spans", "label", "options", "text_span"];

pub const INPUT_HASH_ATTR: &str = "_input_hash";
pub const TASK_HASH_ATTR: &str = "_task_hash";

/// Set `_input_hash` and `_task_hash` on a task object. Existing hashes are
/// replaced. Non-object values are left alone.
pub fn set_hashes(task: &mut Value) {
    let Some(object) = task.as_object() else {
        return;
    };
    let input = input_hash(object);
    let task_hash = task_hash(object, input);
    if let Some(object) = task.as_object_mut() {
        object.insert(INPUT_HASH_ATTR.to_string(), Value::from(input));
        object.insert(TASK_HASH_ATTR.to_string(), Value::from(task_hash));
    }
}

/// Hash of the input keys present in `task`, or of the whole task when it
/// has none of them.
pub fn input_hash(task: &Map<String, Value>) -> i32 {
    let selected = select(task, INPUT_KEYS);
    if selected.is_empty() {
        let mut all = task.clone();
        all.remove(INPUT_HASH_ATTR);
        all.remove(TASK_HASH_ATTR);
        return digest(&canonical(&Value::Object(all)).to_string());
    }
    digest(&canonical(&Value::Object(selected)).to_string())
}

/// Hash of the task keys present in `task`, salted with its input hash.
pub fn task_hash(task: &Map<String, Value>, input_hash: i32) -> i32 {
    let selected = select(task, TASK_KEYS);
    digest(&format!(
        "{}{}",
        input_hash,
        canonical(&Value::Object(selected))
    ))
}

fn select(task: &Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    keys.iter()
        .filter_map(|k| task.get(*k).map(|v| (k.to_string(), v.clone())))
        .collect()
}

/// Rebuild `value` with object keys inserted in sorted order so that the
/// serialized form does not depend on how the task was assembled.
fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            Value::Object(
                keys.into_iter()
                    .map(|k| (k.clone(), canonical(&map[k])))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}

fn digest(data: &str) -> i32 {
    let hash = Md5::digest(data.as_bytes());
    i32::from_be_bytes([hash[0], hash[1], hash[2], hash[3]])
}
