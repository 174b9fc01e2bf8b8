use std::convert::Infallible;

use serde_json::Value;

use k8_json_rewrite::get_string;
use k8_json_rewrite::rewrite_array;
use k8_json_rewrite::set_path;
use k8_json_rewrite::transform_string;
use k8_json_rewrite::Rewritten;
use k8_rewrite_rules::Action;
use k8_rewrite_rules::RewriteRules;

use crate::RewriteError;

/// `apiVersion` and `kind` of an object, or of a list envelope, of a tracked kind.
/// Returns false when the pair does not resolve to a rule.
pub fn rewrite_api_version_and_kind(rules: &RewriteRules, obj: &mut Value, action: Action) -> bool {
    let api_version = get_string(obj, "apiVersion");
    let kind = get_string(obj, "kind");
    if kind.is_empty() {
        return false;
    }

    let (new_api_version, new_kind) = match action {
        Action::Rename => {
            if rules.kind_rules(&api_version, &kind).is_none() {
                return false;
            }
            (rules.rename_api_version(&api_version), rules.rename_kind(&kind))
        }
        Action::Restore => {
            if !rules.is_renamed_group(&api_version) {
                return false;
            }
            let orig_api_version = rules.restore_api_version(&api_version);
            let orig_kind = rules.restore_kind(&kind);
            if rules.kind_rules(&orig_api_version, &orig_kind).is_none() {
                return false;
            }
            (orig_api_version, orig_kind)
        }
    };

    set_path(obj, "apiVersion", Value::String(new_api_version));
    set_path(obj, "kind", Value::String(new_kind));
    true
}

/// `apiVersion` of each managed fields entry
pub fn rewrite_managed_fields(rules: &RewriteRules, obj: &mut Value, action: Action) {
    rewrite_array(obj, "metadata.managedFields", |entry| {
        transform_string(entry, "apiVersion", |api_version| match action {
            Action::Rename if rules.has_group(api_version) => rules.rename_api_version(api_version),
            Action::Restore if rules.is_renamed_group(api_version) => {
                rules.restore_api_version(api_version)
            }
            _ => api_version.to_owned(),
        });
        Ok::<_, Infallible>(Rewritten::Keep)
    })
    .unwrap_or_default();
}

/// Object of a kind declared in the rules.
pub fn rewrite_custom_resource(
    rules: &RewriteRules,
    obj: &mut Value,
    action: Action,
) -> Result<Rewritten, RewriteError> {
    rewrite_api_version_and_kind(rules, obj, action);
    rewrite_managed_fields(rules, obj, action);
    Ok(Rewritten::Keep)
}
