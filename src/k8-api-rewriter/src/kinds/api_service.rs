//! APIService objects registering an aggregated `<version>.<group>`.
//!
//! `spec.group` and the group part of the name follow the group rules.
//! `spec.service` points at a core Service and is left as is.

use serde_json::Value;

use k8_json_rewrite::transform_string;
use k8_json_rewrite::Rewritten;
use k8_rewrite_rules::Action;
use k8_rewrite_rules::RewriteRules;

use crate::RewriteError;

pub fn rewrite_api_service(rules: &RewriteRules, obj: &mut Value, action: Action) -> Result<Rewritten, RewriteError> {
    transform_string(obj, "spec.group", |group| rewrite_group(rules, group, action));
    transform_string(obj, "metadata.name", |name| match name.split_once('.') {
        Some((version, group)) => format!("{}.{}", version, rewrite_group(rules, group, action)),
        None => name.to_owned(),
    });
    Ok(Rewritten::Keep)
}

fn rewrite_group(rules: &RewriteRules, group: &str, action: Action) -> String {
    match action {
        Action::Rename => rules.rename_group(group),
        Action::Restore => rules.restore_group(group),
    }
}
