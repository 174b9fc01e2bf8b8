use std::convert::Infallible;

use serde_json::Value;

use k8_json_rewrite::rewrite_array;
use k8_json_rewrite::set_path;
use k8_json_rewrite::strings_at;
use k8_json_rewrite::transform_array_of_strings;
use k8_json_rewrite::Rewritten;
use k8_rewrite_rules::Action;
use k8_rewrite_rules::RewriteRules;

use crate::kinds::metadata::rewrite_type_ref;
use crate::RewriteError;

const WILDCARD: &str = "*";

/// Rewrite `apiGroups` and `resources` of a policy rule.
///
/// Resources are only considered when at least one group is tracked or a wildcard.
pub fn rewrite_policy_rule(rules: &RewriteRules, rule: &mut Value, action: Action) {
    let groups = strings_at(rule, "apiGroups");
    if groups.is_empty() {
        return;
    }

    let mut wildcard = false;
    let mut matched: Vec<String> = vec![];
    let new_groups: Vec<Value> = groups
        .iter()
        .map(|group| {
            if group == WILDCARD {
                wildcard = true;
                return group.clone();
            }
            match action {
                Action::Rename if rules.has_group(group) => {
                    matched.push(group.clone());
                    rules.rename_group(group)
                }
                Action::Restore if rules.is_renamed_group(group) => {
                    let orig = rules.restore_group(group);
                    matched.push(orig.clone());
                    orig
                }
                _ => group.clone(),
            }
        })
        .map(Value::String)
        .collect();

    if matched.is_empty() && !wildcard {
        return;
    }
    if !matched.is_empty() {
        set_path(rule, "apiGroups", Value::Array(new_groups));
    }

    transform_array_of_strings(rule, "resources", |resources| {
        resources
            .iter()
            .map(|resource| rewrite_policy_resource(rules, resource, &matched, wildcard, action))
            .collect()
    });
}

fn rewrite_policy_resource(
    rules: &RewriteRules,
    resource: &str,
    groups: &[String],
    wildcard: bool,
    action: Action,
) -> String {
    if resource == WILDCARD || resource.starts_with("*/") {
        return resource.to_owned();
    }

    let is_tracked = |plural: &str| {
        groups
            .iter()
            .any(|group| rules.resource_rules(group, plural).is_some())
            || (wildcard && rules.group_resource_rules(plural).is_some())
    };

    match action {
        Action::Rename => {
            if is_tracked(resource) {
                rules.rename_resource(resource)
            } else {
                resource.to_owned()
            }
        }
        Action::Restore => {
            if !resource.starts_with(rules.resource_type_prefix()) {
                return resource.to_owned();
            }
            let orig = rules.restore_resource(resource);
            if is_tracked(&orig) {
                orig
            } else {
                resource.to_owned()
            }
        }
    }
}

fn rewrite_rules_at(rules: &RewriteRules, obj: &mut Value, path: &str, action: Action) {
    rewrite_array(obj, path, |rule| {
        rewrite_policy_rule(rules, rule, action);
        Ok::<_, Infallible>(Rewritten::Keep)
    })
    .unwrap_or_default();
}

/// Role and ClusterRole
pub fn rewrite_role(rules: &RewriteRules, obj: &mut Value, action: Action) -> Result<Rewritten, RewriteError> {
    rewrite_rules_at(rules, obj, "rules", action);
    Ok(Rewritten::Keep)
}

pub fn rewrite_validating_admission_policy(
    rules: &RewriteRules,
    obj: &mut Value,
    action: Action,
) -> Result<Rewritten, RewriteError> {
    rewrite_rules_at(rules, obj, "spec.matchConstraints.resourceRules", action);
    rewrite_rules_at(rules, obj, "spec.matchConstraints.excludeResourceRules", action);
    if let Some(param_kind) = obj.pointer_mut("/spec/paramKind") {
        rewrite_type_ref(rules, param_kind, "apiVersion", action);
    }
    Ok(Rewritten::Keep)
}

pub fn rewrite_validating_admission_policy_binding(
    rules: &RewriteRules,
    obj: &mut Value,
    action: Action,
) -> Result<Rewritten, RewriteError> {
    rewrite_rules_at(rules, obj, "spec.matchResources.resourceRules", action);
    rewrite_rules_at(rules, obj, "spec.matchResources.excludeResourceRules", action);
    Ok(Rewritten::Keep)
}
