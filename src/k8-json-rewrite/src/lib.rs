mod error;
mod patch;
mod path;
mod transform;

pub use error::JsonRewriteError;
pub use patch::*;
pub use path::*;
pub use transform::*;

use serde_json::Value;

/// Outcome of rewriting one element.
///
/// Callbacks usually edit the element in place and answer `Keep`.
#[derive(Debug, Clone, PartialEq)]
pub enum Rewritten {
    Keep,
    Replace(Value),
    Drop,
}

impl Rewritten {
    pub fn is_keep(&self) -> bool {
        matches!(self, Rewritten::Keep)
    }

    pub fn is_replace(&self) -> bool {
        matches!(self, Rewritten::Replace(_))
    }

    pub fn is_drop(&self) -> bool {
        matches!(self, Rewritten::Drop)
    }
}

/// Parse a payload that must be a JSON object or array.
pub fn parse_payload(body: &[u8]) -> Result<Value, JsonRewriteError> {
    let value: Value = serde_json::from_slice(body)?;
    match value {
        Value::Object(_) | Value::Array(_) => Ok(value),
        other => Err(JsonRewriteError::NotAnObject(other.to_string())),
    }
}

pub fn to_payload(value: &Value) -> Result<Vec<u8>, JsonRewriteError> {
    Ok(serde_json::to_vec(value)?)
}
