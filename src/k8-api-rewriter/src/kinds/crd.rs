//! CustomResourceDefinition rewrites.
//!
//! A CRD is named `<plural>.<group>`. Rename moves a tracked CRD into its
//! renamed group with prefixed names, Restore does the reverse. CRDs of
//! original tracked groups met during Restore are duplicates served by the
//! real server and are dropped.

use serde_json::Value;
use tracing::trace;

use k8_json_rewrite::get_string;
use k8_json_rewrite::set_path;
use k8_json_rewrite::transform_array_of_strings;
use k8_json_rewrite::transform_string;
use k8_json_rewrite::Rewritten;
use k8_rewrite_rules::Action;
use k8_rewrite_rules::ResourceRule;
use k8_rewrite_rules::RewriteRules;

use crate::RewriteError;

pub const CRD_KIND: &str = "CustomResourceDefinition";
pub const CRD_LIST_KIND: &str = "CustomResourceDefinitionList";

/// Split a CRD name into resource type and group.
pub fn split_crd_name(name: &str) -> Result<(&str, &str), RewriteError> {
    name.split_once('.')
        .ok_or_else(|| RewriteError::MalformedCrdName(name.to_owned()))
}

pub fn rewrite_crd(rules: &RewriteRules, obj: &mut Value, action: Action) -> Result<Rewritten, RewriteError> {
    match action {
        Action::Rename => rename_crd(rules, obj),
        Action::Restore => restore_crd(rules, obj),
    }
}

fn rename_crd(rules: &RewriteRules, obj: &mut Value) -> Result<Rewritten, RewriteError> {
    let name = get_string(obj, "metadata.name");
    if name.is_empty() {
        return Ok(Rewritten::Keep);
    }
    let (resource, group) = split_crd_name(&name)?;
    let (group_rule, rule) = match rules.resource_rules(group, resource) {
        Some(found) => found,
        None => {
            trace!(%name, "crd without rule");
            return Ok(Rewritten::Keep);
        }
    };

    let new_name = format!("{}.{}", rules.rename_resource(resource), group_rule.renamed);
    set_path(obj, "metadata.name", Value::String(new_name));
    if let Some(spec) = obj.get_mut("spec") {
        rewrite_crd_spec(rules, rule, spec, Action::Rename);
    }
    Ok(Rewritten::Keep)
}

fn restore_crd(rules: &RewriteRules, obj: &mut Value) -> Result<Rewritten, RewriteError> {
    let name = get_string(obj, "metadata.name");
    if name.is_empty() {
        return Ok(Rewritten::Keep);
    }
    let (resource, group) = split_crd_name(&name)?;

    if rules.has_group(group) {
        if rules.resource_rules(group, resource).is_some() {
            trace!(%name, "drop crd of original group");
            return Ok(Rewritten::Drop);
        }
        return Ok(Rewritten::Keep);
    }
    if !rules.is_renamed_group(group) {
        return Ok(Rewritten::Keep);
    }

    let orig_group = rules.restore_group(group);
    let orig_resource = rules.restore_resource(resource);
    let rule = match rules.resource_rules(&orig_group, &orig_resource) {
        Some((_, rule)) => rule,
        None => return Ok(Rewritten::Keep),
    };

    set_path(
        obj,
        "metadata.name",
        Value::String(format!("{orig_resource}.{orig_group}")),
    );
    if let Some(spec) = obj.get_mut("spec") {
        rewrite_crd_spec(rules, rule, spec, Action::Restore);
    }
    Ok(Rewritten::Keep)
}

/// `group` and the present `names` fields of a CRD spec.
pub fn rewrite_crd_spec(rules: &RewriteRules, rule: &ResourceRule, spec: &mut Value, action: Action) {
    transform_string(spec, "group", |group| match action {
        Action::Rename => rules.rename_group(group),
        Action::Restore => rules.restore_group(group),
    });

    let names = match spec.get_mut("names") {
        Some(names) if names.is_object() => names,
        _ => return,
    };

    for field in ["kind", "listKind"] {
        transform_string(names, field, |kind| match action {
            Action::Rename => rules.rename_kind(kind),
            Action::Restore => rules.restore_kind(kind),
        });
    }
    for field in ["plural", "singular"] {
        transform_string(names, field, |resource| match action {
            Action::Rename => rules.rename_resource(resource),
            Action::Restore => rules.restore_resource(resource),
        });
    }
    transform_array_of_strings(names, "shortNames", |short_names| match action {
        Action::Rename => rules.rename_short_names(short_names),
        Action::Restore => rules.restore_short_names(short_names),
    });
    transform_array_of_strings(names, "categories", |categories| match action {
        Action::Rename => rules.rename_categories(categories),
        Action::Restore => rules.restore_categories(rule),
    });
}
