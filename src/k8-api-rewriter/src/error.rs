use base64::DecodeError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

use k8_json_rewrite::JsonRewriteError;
use k8_rewrite_rules::ConfigError;

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("malformed CRD name: should be resourcetype.group, got {0}")]
    MalformedCrdName(String),
    #[error("JSON rewrite error: {0}")]
    Json(#[from] JsonRewriteError),
    #[error("JSON error: {0}")]
    Serde(#[from] SerdeJsonError),
    #[error("base64 error: {0}")]
    Base64(#[from] DecodeError),
    #[error("patch error: {0}")]
    Patch(String),
    #[error("rules error: {0}")]
    Config(#[from] ConfigError),
}
