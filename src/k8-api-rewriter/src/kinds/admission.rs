//! AdmissionReview envelopes exchanged with admission webhooks.
//!
//! The request comes from the API server and carries renamed objects, so it
//! is restored whatever the direction. The response comes from the webhook
//! and its JSON patch is renamed.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use tracing::debug;
use tracing::trace;

use k8_json_rewrite::get_string;
use k8_json_rewrite::set_path;
use k8_json_rewrite::transform_object;
use k8_json_rewrite::Rewritten;
use k8_rewrite_rules::Action;
use k8_rewrite_rules::RewriteRules;

use crate::kinds::rewrite_embedded;
use crate::patch::rename_metadata_patch;
use crate::RewriteError;

pub const ADMISSION_REVIEW_KIND: &str = "AdmissionReview";

const JSON_PATCH_TYPE: &str = "JSONPatch";

pub fn rewrite_admission_review(
    rules: &RewriteRules,
    obj: &mut Value,
    _action: Action,
) -> Result<Rewritten, RewriteError> {
    if let Some(response) = obj.get_mut("response").filter(|response| response.is_object()) {
        rename_review_response(rules, response)?;
        return Ok(Rewritten::Keep);
    }
    if let Some(request) = obj.get_mut("request").filter(|request| request.is_object()) {
        restore_review_request(rules, request)?;
    }
    Ok(Rewritten::Keep)
}

/// Rename metadata operations of the base64 encoded JSON patch.
fn rename_review_response(rules: &RewriteRules, response: &mut Value) -> Result<(), RewriteError> {
    if get_string(response, "patchType") != JSON_PATCH_TYPE {
        return Ok(());
    }
    let encoded = get_string(response, "patch");
    if encoded.is_empty() {
        return Ok(());
    }

    let decoded = STANDARD.decode(encoded.as_bytes())?;
    let mut patch: Value = serde_json::from_slice(&decoded)?;
    if !patch.is_array() {
        return Err(RewriteError::Patch(format!(
            "admission response JSONPatch is not a list of operations: {patch}"
        )));
    }
    if !rename_metadata_patch(rules, &mut patch) {
        return Ok(());
    }
    debug!("rename admission response patch");
    let encoded = STANDARD.encode(serde_json::to_vec(&patch)?);
    set_path(response, "patch", Value::String(encoded));
    Ok(())
}

/// Restore resource identities and embedded objects of a review request.
///
/// Reviews for groups that were not renamed are left alone.
fn restore_review_request(rules: &RewriteRules, request: &mut Value) -> Result<(), RewriteError> {
    if !rules.is_renamed_group(&get_string(request, "resource.group")) {
        return Ok(());
    }
    for field in ["resource", "requestResource"] {
        if let Some(resource) = request.get_mut(field) {
            restore_group_field(rules, resource, "resource", |group, resource| {
                let orig = rules.restore_resource(resource);
                rules.resource_rules(group, &orig).map(|_| orig)
            });
        }
    }

    // objects of subresource requests are partial
    if !get_string(request, "subResource").is_empty() || !get_string(request, "subresource").is_empty() {
        debug!("admission review for subresource");
        return Ok(());
    }

    for field in ["kind", "requestKind"] {
        if let Some(kind) = request.get_mut(field) {
            restore_group_field(rules, kind, "kind", |group, kind| {
                let orig = rules.restore_kind(kind);
                rules.kind_rules(group, &orig).map(|_| orig)
            });
        }
    }
    for field in ["object", "oldObject"] {
        transform_object(request, field, |object| {
            rewrite_embedded(rules, object, Action::Restore).map(|_| ())
        })?;
    }
    Ok(())
}

/// Restore `group` and one name field of a `{group, version, <field>}` identity.
///
/// `restore` gets the original group and the renamed name, and returns the
/// original name only if the rules track it. Otherwise the identity is kept.
fn restore_group_field<F>(rules: &RewriteRules, identity: &mut Value, field: &str, restore: F)
where
    F: FnOnce(&str, &str) -> Option<String>,
{
    let group = get_string(identity, "group");
    if !rules.is_renamed_group(&group) {
        return;
    }
    let orig_group = rules.restore_group(&group);
    let name = get_string(identity, field);
    let orig_name = match restore(&orig_group, &name) {
        Some(orig_name) => orig_name,
        None => {
            trace!(%group, %name, "no rule for review identity");
            return;
        }
    };
    set_path(identity, "group", Value::String(orig_group));
    set_path(identity, field, Value::String(orig_name));
}
