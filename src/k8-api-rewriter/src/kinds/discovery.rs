//! Discovery responses.
//!
//! Discovery is only ever served by the API server, so these rewrites run
//! on Restore and leave payloads alone on Rename.

use std::convert::Infallible;

use serde_json::json;
use serde_json::Value;
use tracing::debug;
use tracing::trace;

use k8_json_rewrite::get_path;
use k8_json_rewrite::get_string;
use k8_json_rewrite::rewrite_array;
use k8_json_rewrite::set_path;
use k8_json_rewrite::transform_array_of_strings;
use k8_json_rewrite::transform_string;
use k8_json_rewrite::Rewritten;
use k8_rewrite_rules::Action;
use k8_rewrite_rules::RewriteRules;

use crate::RewriteError;

/// `/apis`: renamed groups become their original group, original groups
/// with rules are dropped as duplicates.
pub fn rewrite_api_group_list(
    rules: &RewriteRules,
    obj: &mut Value,
    action: Action,
) -> Result<Rewritten, RewriteError> {
    if action.is_rename() {
        return Ok(Rewritten::Keep);
    }
    rewrite_array(obj, "groups", |group| {
        let name = get_string(group, "name");
        if rules.has_group(&name) {
            trace!(%name, "drop original group");
            return Ok::<_, RewriteError>(Rewritten::Drop);
        }
        if !rules.is_renamed_group(&name) {
            return Ok(Rewritten::Keep);
        }
        match rules.group_rule(&rules.restore_group(&name)) {
            Some(group_rule) => Ok(Rewritten::Replace(group_rule.to_api_group())),
            None => Ok(Rewritten::Keep),
        }
    })?;
    Ok(Rewritten::Keep)
}

/// `/apis/<group>`: name and versions of the original group.
pub fn rewrite_api_group(rules: &RewriteRules, obj: &mut Value, action: Action) -> Result<Rewritten, RewriteError> {
    if action.is_rename() {
        return Ok(Rewritten::Keep);
    }
    let name = get_string(obj, "name");
    if !rules.is_renamed_group(&name) {
        return Ok(Rewritten::Keep);
    }
    let group_rule = match rules.group_rule(&rules.restore_group(&name)) {
        Some(group_rule) => group_rule,
        None => return Ok(Rewritten::Keep),
    };

    let api_group = group_rule.to_api_group();
    for field in ["name", "versions", "preferredVersion"] {
        if let Some(value) = api_group.get(field) {
            set_path(obj, field, value.clone());
        }
    }
    Ok(Rewritten::Keep)
}

/// `/apis/<group>/<version>`: resources of a renamed group version.
/// Resources without a rule are dropped.
pub fn rewrite_api_resource_list(
    rules: &RewriteRules,
    obj: &mut Value,
    action: Action,
) -> Result<Rewritten, RewriteError> {
    if action.is_rename() {
        return Ok(Rewritten::Keep);
    }
    let group_version = get_string(obj, "groupVersion");
    if !rules.is_renamed_group(&group_version) {
        return Ok(Rewritten::Keep);
    }
    let orig_group_version = rules.restore_api_version(&group_version);
    set_path(obj, "groupVersion", Value::String(orig_group_version.clone()));

    rewrite_array(obj, "resources", |resource| {
        let name = get_string(resource, "name");
        let orig_name = rules.restore_resource(&name);
        let rule = match rules.resource_rules(&orig_group_version, &orig_name) {
            Some((_, rule)) => rule,
            None => {
                trace!(%name, "drop resource without rule");
                return Ok::<_, Infallible>(Rewritten::Drop);
            }
        };

        set_path(resource, "name", Value::String(orig_name));
        transform_string(resource, "kind", |kind| rules.restore_kind(kind));
        transform_string(resource, "singularName", |singular| rules.restore_resource(singular));
        transform_array_of_strings(resource, "shortNames", |short_names| {
            rules.restore_short_names(short_names)
        });
        transform_array_of_strings(resource, "categories", |_| rules.restore_categories(rule));
        Ok(Rewritten::Keep)
    })
    .unwrap_or_default();
    Ok(Rewritten::Keep)
}

/// Aggregated discovery (`apidiscovery.k8s.io`).
///
/// Items of renamed groups are restored to their original group, items of
/// original groups with rules are dropped as duplicates.
pub fn rewrite_api_group_discovery_list(
    rules: &RewriteRules,
    obj: &mut Value,
    action: Action,
) -> Result<Rewritten, RewriteError> {
    if action.is_rename() {
        return Ok(Rewritten::Keep);
    }
    rewrite_array(obj, "items", |item| {
        let name = get_string(item, "metadata.name");
        if rules.has_group(&name) {
            trace!(%name, "drop original group");
            return Ok::<_, Infallible>(Rewritten::Drop);
        }
        if !rules.is_renamed_group(&name) {
            return Ok(Rewritten::Keep);
        }
        let orig_group = rules.restore_group(&name);
        debug!(%name, %orig_group, "restore aggregated discovery");
        match restore_group_discovery(rules, &orig_group, item) {
            Some(restored) => Ok(Rewritten::Replace(restored)),
            None => Ok(Rewritten::Drop),
        }
    })
    .unwrap_or_default();
    Ok(Rewritten::Keep)
}

/// None when no resource of the item has a rule
fn restore_group_discovery(rules: &RewriteRules, orig_group: &str, item: &Value) -> Option<Value> {
    let versions: Vec<Value> = get_path(item, "versions")
        .and_then(Value::as_array)
        .map(|versions| versions.as_slice())
        .unwrap_or_default()
        .iter()
        .filter_map(|version| {
            let version_name = get_string(version, "version");
            if version_name.is_empty() {
                return None;
            }
            let resources: Vec<Value> = version
                .get("resources")
                .and_then(Value::as_array)
                .map(|resources| resources.as_slice())
                .unwrap_or_default()
                .iter()
                .filter_map(|resource| {
                    let mut resource = resource.clone();
                    restore_discovery_resource(rules, orig_group, &mut resource).then_some(resource)
                })
                .collect();
            if resources.is_empty() {
                return None;
            }
            let mut entry = json!({
                "version": version_name,
                "resources": resources,
            });
            if let Some(freshness) = version.get("freshness") {
                set_path(&mut entry, "freshness", freshness.clone());
            }
            Some(entry)
        })
        .collect();
    if versions.is_empty() {
        return None;
    }

    Some(json!({
        "metadata": {"name": orig_group, "creationTimestamp": null},
        "versions": versions,
    }))
}

/// Restore one `APIResourceDiscovery` of `orig_group`. False if the
/// resource has no rule in that group.
fn restore_discovery_resource(rules: &RewriteRules, orig_group: &str, resource: &mut Value) -> bool {
    let name = get_string(resource, "resource");
    let orig_name = rules.restore_resource(&name);
    let rule = match rules.resource_rules(orig_group, &orig_name) {
        Some((_, rule)) => rule,
        None => {
            trace!(%name, orig_group, "drop resource without rule");
            return false;
        }
    };

    set_path(resource, "resource", Value::String(orig_name));
    restore_response_kind(rules, resource, orig_group, &rule.kind);
    transform_string(resource, "singularResource", |singular| {
        rules.restore_resource(singular)
    });
    transform_array_of_strings(resource, "shortNames", |short_names| {
        rules.restore_short_names(short_names)
    });
    transform_array_of_strings(resource, "categories", |_| rules.restore_categories(rule));

    rewrite_array(resource, "subresources", |subresource| {
        restore_response_kind(rules, subresource, orig_group, &rule.kind);
        Ok::<_, Infallible>(Rewritten::Keep)
    })
    .unwrap_or_default();
    true
}

/// `responseKind` of the renamed group, a `Scale` of autoscaling stays as is
fn restore_response_kind(rules: &RewriteRules, obj: &mut Value, group: &str, kind: &str) {
    let response_kind = match obj.get_mut("responseKind") {
        Some(response_kind) if response_kind.is_object() => response_kind,
        _ => return,
    };
    if !rules.is_renamed_group(&get_string(response_kind, "group")) {
        return;
    }
    set_path(response_kind, "group", Value::String(group.to_owned()));
    set_path(response_kind, "kind", Value::String(kind.to_owned()));
}
