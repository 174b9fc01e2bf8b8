use serde_json::Map;
use serde_json::Value;
use tracing::trace;

use crate::path::get_path_mut;
use crate::path::kind_of;
use crate::Rewritten;

/// Apply `f` to every item when `obj` is of `list_kind`, otherwise to `obj` itself.
///
/// A list is never dropped as a whole, its result is always [`Rewritten::Keep`].
pub fn rewrite_resource_or_list<F, E>(obj: &mut Value, list_kind: &str, mut f: F) -> Result<Rewritten, E>
where
    F: FnMut(&mut Value) -> Result<Rewritten, E>,
{
    let kind = kind_of(obj);
    if !kind.is_empty() && kind == list_kind {
        trace!(kind, "rewrite list items");
        rewrite_array(obj, "items", f)?;
        return Ok(Rewritten::Keep);
    }
    f(obj)
}

/// Apply `f` to each element of the array at `path`.
///
/// Elements are replaced or dropped according to the result of `f`, order is kept.
/// A missing path or a non array value is left alone.
pub fn rewrite_array<F, E>(obj: &mut Value, path: &str, mut f: F) -> Result<(), E>
where
    F: FnMut(&mut Value) -> Result<Rewritten, E>,
{
    let items = match get_path_mut(obj, path) {
        Some(Value::Array(items)) => items,
        _ => return Ok(()),
    };

    let mut keep = Vec::with_capacity(items.len());
    for item in items.iter_mut() {
        match f(item)? {
            Rewritten::Keep => keep.push(true),
            Rewritten::Replace(value) => {
                *item = value;
                keep.push(true);
            }
            Rewritten::Drop => keep.push(false),
        }
    }

    if keep.contains(&false) {
        let mut flags = keep.into_iter();
        items.retain(|_| flags.next().unwrap_or(true));
    }
    Ok(())
}

/// Rekey the map at `path`. `f` receives each key and its string value
/// (empty for non string values) and returns the new pair.
pub fn rewrite_map_of_strings<F>(obj: &mut Value, path: &str, mut f: F) -> bool
where
    F: FnMut(&str, &str) -> (String, String),
{
    let map = match get_path_mut(obj, path).and_then(Value::as_object_mut) {
        Some(map) => map,
        None => return false,
    };

    let mut result = Map::with_capacity(map.len());
    for (key, value) in std::mem::take(map) {
        match value.as_str() {
            Some(text) => {
                let (new_key, new_value) = f(&key, text);
                result.insert(new_key, Value::String(new_value));
            }
            None => {
                let (new_key, _) = f(&key, "");
                result.insert(new_key, value);
            }
        }
    }
    *map = result;
    true
}

/// Replace the string at `path`. Returns false when it is missing or not a string.
pub fn transform_string<F>(obj: &mut Value, path: &str, f: F) -> bool
where
    F: FnOnce(&str) -> String,
{
    let value = match get_path_mut(obj, path) {
        Some(value) => value,
        None => return false,
    };
    let new_value = match value.as_str() {
        Some(text) => f(text),
        None => return false,
    };
    *value = Value::String(new_value);
    true
}

/// Replace the array of strings at `path`.
/// Arrays holding anything but strings are left alone.
pub fn transform_array_of_strings<F>(obj: &mut Value, path: &str, f: F) -> bool
where
    F: FnOnce(&[String]) -> Vec<String>,
{
    let value = match get_path_mut(obj, path) {
        Some(value) => value,
        None => return false,
    };
    let strings: Option<Vec<String>> = match value.as_array() {
        Some(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_owned))
            .collect(),
        None => None,
    };
    match strings {
        Some(strings) => {
            *value = Value::Array(f(&strings).into_iter().map(Value::String).collect());
            true
        }
        None => false,
    }
}

/// Apply `f` to the object at `path` when present.
pub fn transform_object<F, E>(obj: &mut Value, path: &str, f: F) -> Result<bool, E>
where
    F: FnOnce(&mut Value) -> Result<(), E>,
{
    match get_path_mut(obj, path) {
        Some(value) if value.is_object() => {
            f(value)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Strings of the array at `path`, skipping non string items.
pub fn strings_at(obj: &Value, path: &str) -> Vec<String> {
    crate::path::get_path(obj, path)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}
