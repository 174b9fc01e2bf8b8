use serde_json::Error as SerdeJsonError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JsonRewriteError {
    #[error("JSON error: {0}")]
    Json(#[from] SerdeJsonError),
    #[error("expected JSON object, got {0}")]
    NotAnObject(String),
}
