//! Rewrites shared by every kind: object metadata, owner references,
//! typed references, label selectors and pod specs.

use std::convert::Infallible;

use serde_json::Value;

use k8_json_rewrite::get_path_mut;
use k8_json_rewrite::get_string;
use k8_json_rewrite::rewrite_array;
use k8_json_rewrite::rewrite_map_of_strings;
use k8_json_rewrite::set_path;
use k8_json_rewrite::strings_at;
use k8_json_rewrite::transform_array_of_strings;
use k8_json_rewrite::Rewritten;
use k8_rewrite_rules::Action;
use k8_rewrite_rules::PrefixedNameRewriter;
use k8_rewrite_rules::RewriteRules;

/// labels, annotations and finalizers under `path` (usually `metadata`)
pub fn rewrite_object_meta(rules: &RewriteRules, obj: &mut Value, path: &str, action: Action) {
    let meta = match get_path_mut(obj, path) {
        Some(meta) if meta.is_object() => meta,
        _ => return,
    };
    rewrite_names_map(rules.labels(), meta, "labels", action);
    rewrite_names_map(rules.annotations(), meta, "annotations", action);
    transform_array_of_strings(meta, "finalizers", |finalizers| {
        rules.finalizers().rewrite_slice(finalizers, action)
    });
}

pub fn rewrite_names_map(
    rewriter: &PrefixedNameRewriter,
    obj: &mut Value,
    path: &str,
    action: Action,
) -> bool {
    rewrite_map_of_strings(obj, path, |name, value| {
        rewriter.rewrite_name_value(name, value, action)
    })
}

/// Rewrite `{apiVersion|apiGroup, kind}` of a reference to another object.
/// Only references resolving to a tracked kind are touched.
pub fn rewrite_type_ref(rules: &RewriteRules, reference: &mut Value, group_field: &str, action: Action) -> bool {
    let group = get_string(reference, group_field);
    let kind = get_string(reference, "kind");
    if kind.is_empty() {
        return false;
    }

    let (new_group, new_kind) = match action {
        Action::Rename => {
            if rules.kind_rules(&group, &kind).is_none() {
                return false;
            }
            (rules.rename_api_version(&group), rules.rename_kind(&kind))
        }
        Action::Restore => {
            if !rules.is_renamed_group(&group) {
                return false;
            }
            let orig_group = rules.restore_api_version(&group);
            let orig_kind = rules.restore_kind(&kind);
            if rules.kind_rules(&orig_group, &orig_kind).is_none() {
                return false;
            }
            (orig_group, orig_kind)
        }
    };

    set_path(reference, group_field, Value::String(new_group));
    set_path(reference, "kind", Value::String(new_kind));
    true
}

pub fn rewrite_owner_references(rules: &RewriteRules, obj: &mut Value, action: Action) {
    rewrite_array(obj, "metadata.ownerReferences", |reference| {
        rewrite_type_ref(rules, reference, "apiVersion", action);
        Ok::<_, Infallible>(Rewritten::Keep)
    })
    .unwrap_or_default();
}

/// `matchLabels` and `matchExpressions` of a label selector at `path`
pub fn rewrite_label_selector(rules: &RewriteRules, obj: &mut Value, path: &str, action: Action) {
    let selector = match get_path_mut(obj, path) {
        Some(selector) if selector.is_object() => selector,
        _ => return,
    };
    rewrite_names_map(rules.labels(), selector, "matchLabels", action);
    rewrite_match_expressions(rules.labels(), selector, "matchExpressions", action);
}

/// `[{key, operator, values}]` expressions at `path`
pub fn rewrite_match_expressions(
    rewriter: &PrefixedNameRewriter,
    obj: &mut Value,
    path: &str,
    action: Action,
) {
    rewrite_array(obj, path, |expression| {
        let key = get_string(expression, "key");
        if key.is_empty() {
            return Ok::<_, Infallible>(Rewritten::Keep);
        }
        let values = strings_at(expression, "values");
        let (new_key, new_values) = rewriter.rewrite_name_values(&key, &values, action);
        set_path(expression, "key", Value::String(new_key));
        if expression.get("values").map(Value::is_array).unwrap_or(false) {
            set_path(
                expression,
                "values",
                Value::Array(new_values.into_iter().map(Value::String).collect()),
            );
        }
        Ok(Rewritten::Keep)
    })
    .unwrap_or_default();
}

/// node selector, affinity terms and topology spread selectors of a pod spec
pub fn rewrite_pod_spec(rules: &RewriteRules, obj: &mut Value, path: &str, action: Action) {
    let spec = match get_path_mut(obj, path) {
        Some(spec) if spec.is_object() => spec,
        _ => return,
    };
    rewrite_names_map(rules.labels(), spec, "nodeSelector", action);
    rewrite_affinity(rules, spec, "affinity", action);
    rewrite_array(spec, "topologySpreadConstraints", |constraint| {
        rewrite_label_selector(rules, constraint, "labelSelector", action);
        Ok::<_, Infallible>(Rewritten::Keep)
    })
    .unwrap_or_default();
}

/// pod template at `path`: its metadata and its pod spec
pub fn rewrite_pod_template(rules: &RewriteRules, obj: &mut Value, path: &str, action: Action) {
    let template = match get_path_mut(obj, path) {
        Some(template) if template.is_object() => template,
        _ => return,
    };
    rewrite_object_meta(rules, template, "metadata", action);
    rewrite_pod_spec(rules, template, "spec", action);
}

pub fn rewrite_affinity(rules: &RewriteRules, obj: &mut Value, path: &str, action: Action) {
    let affinity = match get_path_mut(obj, path) {
        Some(affinity) if affinity.is_object() => affinity,
        _ => return,
    };

    let labels = rules.labels();
    rewrite_array(
        affinity,
        "nodeAffinity.requiredDuringSchedulingIgnoredDuringExecution.nodeSelectorTerms",
        |term| {
            rewrite_match_expressions(labels, term, "matchExpressions", action);
            Ok::<_, Infallible>(Rewritten::Keep)
        },
    )
    .unwrap_or_default();
    rewrite_array(
        affinity,
        "nodeAffinity.preferredDuringSchedulingIgnoredDuringExecution",
        |preferred| {
            rewrite_match_expressions(labels, preferred, "preference.matchExpressions", action);
            Ok::<_, Infallible>(Rewritten::Keep)
        },
    )
    .unwrap_or_default();

    for kind in ["podAffinity", "podAntiAffinity"] {
        rewrite_array(
            affinity,
            &format!("{kind}.requiredDuringSchedulingIgnoredDuringExecution"),
            |term| {
                rewrite_pod_affinity_term(rules, term, action);
                Ok::<_, Infallible>(Rewritten::Keep)
            },
        )
        .unwrap_or_default();
        rewrite_array(
            affinity,
            &format!("{kind}.preferredDuringSchedulingIgnoredDuringExecution"),
            |weighted| {
                if let Some(term) = weighted.get_mut("podAffinityTerm") {
                    rewrite_pod_affinity_term(rules, term, action);
                }
                Ok::<_, Infallible>(Rewritten::Keep)
            },
        )
        .unwrap_or_default();
    }
}

fn rewrite_pod_affinity_term(rules: &RewriteRules, term: &mut Value, action: Action) {
    rewrite_label_selector(rules, term, "labelSelector", action);
    rewrite_label_selector(rules, term, "namespaceSelector", action);
}
