use serde_json::Value;
use tracing::trace;

use crate::path::escape_pointer_token;
use crate::path::unescape_pointer_token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchMergeType {
    Json,
    JsonMerge,
    StrategicMerge,
}

impl PatchMergeType {
    /// Dialect from body shape: an array of operations or a partial object.
    pub fn detect(patch: &Value) -> Option<Self> {
        match patch {
            Value::Array(_) => Some(PatchMergeType::Json),
            Value::Object(_) => Some(PatchMergeType::JsonMerge),
            _ => None,
        }
    }

    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let media_type = content_type.split(';').next().unwrap_or_default().trim();
        match media_type {
            "application/json-patch+json" => Some(PatchMergeType::Json),
            "application/merge-patch+json" => Some(PatchMergeType::JsonMerge),
            "application/strategic-merge-patch+json" => Some(PatchMergeType::StrategicMerge),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            PatchMergeType::Json => "application/json-patch+json",
            PatchMergeType::JsonMerge => "application/merge-patch+json",
            PatchMergeType::StrategicMerge => "application/strategic-merge-patch+json",
        }
    }

    pub fn is_json_patch(&self) -> bool {
        matches!(self, PatchMergeType::Json)
    }
}

fn op_name(op: &Value) -> &str {
    op.get("op").and_then(Value::as_str).unwrap_or_default()
}

fn op_path(op: &Value) -> &str {
    op.get("path").and_then(Value::as_str).unwrap_or_default()
}

fn carries_value(op: &Value) -> bool {
    matches!(op_name(op), "add" | "replace" | "test")
}

/// Call `f` with the value of every add, replace or test operation whose
/// path is exactly `path`. Other operations pass through untouched.
pub fn rewrite_op_values<F, E>(patch: &mut Value, path: &str, mut f: F) -> Result<bool, E>
where
    F: FnMut(&mut Value) -> Result<(), E>,
{
    let ops = match patch.as_array_mut() {
        Some(ops) => ops,
        None => return Ok(false),
    };

    let mut touched = false;
    for op in ops.iter_mut() {
        if op_path(op) != path || !carries_value(op) {
            continue;
        }
        if let Some(value) = op.get_mut("value") {
            trace!(path, "rewrite patch operation value");
            f(value)?;
            touched = true;
        }
    }
    Ok(touched)
}

/// Rename the last path token of operations addressing a single key
/// below `parent`, e.g. `/metadata/labels/app.io~1name`.
pub fn rewrite_op_keys<F>(patch: &mut Value, parent: &str, mut f: F) -> bool
where
    F: FnMut(&str) -> String,
{
    let ops = match patch.as_array_mut() {
        Some(ops) => ops,
        None => return false,
    };

    let prefix = format!("{parent}/");
    let mut touched = false;
    for op in ops.iter_mut() {
        let token = match op_path(op).strip_prefix(&prefix) {
            Some(token) if !token.is_empty() && !token.contains('/') => token.to_owned(),
            _ => continue,
        };
        let key = unescape_pointer_token(&token);
        let new_key = f(&key);
        if new_key != key {
            op["path"] = Value::String(format!("{prefix}{}", escape_pointer_token(&new_key)));
            touched = true;
        }
    }
    touched
}
