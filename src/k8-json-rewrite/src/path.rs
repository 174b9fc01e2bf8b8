use serde_json::Value;

/// value at a dotted path such as `spec.template.metadata`
pub fn get_path<'a>(obj: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(obj);
    }
    path.split('.').try_fold(obj, |current, key| current.get(key))
}

pub fn get_path_mut<'a>(obj: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    if path.is_empty() {
        return Some(obj);
    }
    path.split('.')
        .try_fold(obj, |current, key| current.get_mut(key))
}

pub fn get_str<'a>(obj: &'a Value, path: &str) -> Option<&'a str> {
    get_path(obj, path).and_then(Value::as_str)
}

/// string at path, empty when missing or not a string
pub fn get_string(obj: &Value, path: &str) -> String {
    get_str(obj, path).unwrap_or_default().to_owned()
}

/// Set a value when the parent object exists. Returns false otherwise.
pub fn set_path(obj: &mut Value, path: &str, value: Value) -> bool {
    let (parent, key) = match path.rsplit_once('.') {
        Some((parent, key)) => (get_path_mut(obj, parent), key),
        None => (Some(obj), path),
    };
    match parent.and_then(Value::as_object_mut) {
        Some(map) => {
            map.insert(key.to_owned(), value);
            true
        }
        None => false,
    }
}

/// `kind` of an object, empty when missing
pub fn kind_of(obj: &Value) -> &str {
    get_str(obj, "kind").unwrap_or_default()
}

pub fn unescape_pointer_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

pub fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}
