//! PATCH bodies.
//!
//! A patch is not a complete object. JSON Patch operations are rewritten one
//! by one and only at known paths, merge patches go through the per-kind
//! rewrites which only touch the fields present. Patches are client input so
//! they are only ever renamed.

use std::convert::Infallible;

use serde_json::Value;
use tracing::debug;

use k8_json_rewrite::rewrite_op_keys;
use k8_json_rewrite::rewrite_op_values;
use k8_json_rewrite::PatchMergeType;
use k8_rewrite_rules::Action;
use k8_rewrite_rules::PrefixedNameRewriter;
use k8_rewrite_rules::ResourceRule;
use k8_rewrite_rules::RewriteRules;

use crate::kinds::crd::rewrite_crd_spec;
use crate::kinds::custom_resource::rewrite_custom_resource;
use crate::kinds::metadata::rewrite_label_selector;
use crate::kinds::metadata::rewrite_names_map;
use crate::kinds::metadata::rewrite_object_meta;
use crate::kinds::metadata::rewrite_owner_references;
use crate::kinds::metadata::rewrite_pod_template;
use crate::kinds::webhook::rewrite_webhook_configuration;
use crate::kinds::webhook::rewrite_webhooks;
use crate::kinds::workload::rewrite_service;
use crate::kinds::workload::rewrite_workload;
use crate::kinds::ObjectRewrite;
use crate::target::TargetRequest;
use crate::RewriteError;

/// Patch rewriter picked from the resource a request addresses
#[derive(Debug, Clone, Copy)]
enum PatchTarget<'a> {
    Crd(&'a ResourceRule),
    Resource,
    Service,
    Workload,
    WebhookConfiguration,
    Metadata,
}

impl<'a> PatchTarget<'a> {
    fn resolve(rules: &'a RewriteRules, target: &TargetRequest) -> Self {
        if let Some((_, rule)) = rules.resource_rules(target.orig_group(), target.orig_resource_type()) {
            if target.is_crd() {
                return PatchTarget::Crd(rule);
            }
            return PatchTarget::Resource;
        }
        match target.orig_resource_type() {
            "services" => PatchTarget::Service,
            "deployments" | "daemonsets" | "statefulsets" => PatchTarget::Workload,
            "validatingwebhookconfigurations" | "mutatingwebhookconfigurations" => {
                PatchTarget::WebhookConfiguration
            }
            _ => PatchTarget::Metadata,
        }
    }

    fn object_rewrite(&self) -> Option<ObjectRewrite> {
        match self {
            PatchTarget::Resource => Some(rewrite_custom_resource),
            PatchTarget::Service => Some(rewrite_service),
            PatchTarget::Workload => Some(rewrite_workload),
            PatchTarget::WebhookConfiguration => Some(rewrite_webhook_configuration),
            PatchTarget::Crd(_) | PatchTarget::Metadata => None,
        }
    }
}

/// Rename a PATCH body in place for the resource addressed by `target`.
pub fn rename_patch(rules: &RewriteRules, target: &TargetRequest, patch: &mut Value) -> Result<(), RewriteError> {
    let patch_target = PatchTarget::resolve(rules, target);
    let merge_type = match PatchMergeType::detect(patch) {
        Some(merge_type) => merge_type,
        None => return Ok(()),
    };
    debug!(
        resource = %target.resource_for_log(),
        ?merge_type,
        ?patch_target,
        "rename patch"
    );

    if merge_type.is_json_patch() {
        rename_json_patch(rules, patch_target, patch)
    } else {
        rename_merge_patch(rules, patch_target, patch)
    }
}

fn rename_json_patch(rules: &RewriteRules, patch_target: PatchTarget, patch: &mut Value) -> Result<(), RewriteError> {
    let action = Action::Rename;
    match patch_target {
        PatchTarget::Crd(rule) => {
            rewrite_op_values(patch, "/spec", |spec| {
                rewrite_crd_spec(rules, rule, spec, action);
                Ok::<_, RewriteError>(())
            })?;
        }
        PatchTarget::Service => {
            rewrite_op_values(patch, "/spec", |spec| {
                rewrite_names_map(rules.labels(), spec, "selector", action);
                Ok::<_, RewriteError>(())
            })?;
            rewrite_op_values(patch, "/spec/selector", |selector| {
                rewrite_names_map(rules.labels(), selector, "", action);
                Ok::<_, RewriteError>(())
            })?;
        }
        PatchTarget::Workload => {
            rewrite_op_values(patch, "/spec", |spec| {
                rewrite_label_selector(rules, spec, "selector", action);
                rewrite_pod_template(rules, spec, "template", action);
                Ok::<_, RewriteError>(())
            })?;
            rewrite_op_values(patch, "/spec/template", |template| {
                rewrite_pod_template(rules, template, "", action);
                Ok::<_, RewriteError>(())
            })?;
        }
        PatchTarget::WebhookConfiguration => {
            rewrite_op_values(patch, "/webhooks", |webhooks| {
                rewrite_webhooks(rules, webhooks, "", action)
            })?;
        }
        PatchTarget::Resource | PatchTarget::Metadata => {}
    }
    rename_metadata_patch(rules, patch);
    Ok(())
}

fn rename_merge_patch(rules: &RewriteRules, patch_target: PatchTarget, patch: &mut Value) -> Result<(), RewriteError> {
    let action = Action::Rename;
    if let PatchTarget::Crd(rule) = patch_target {
        if let Some(spec) = patch.get_mut("spec") {
            rewrite_crd_spec(rules, rule, spec, action);
        }
    }
    if let Some(rewrite) = patch_target.object_rewrite() {
        rewrite(rules, patch, action)?;
    }
    rewrite_object_meta(rules, patch, "metadata", action);
    rewrite_owner_references(rules, patch, action);
    Ok(())
}

/// Rename labels, annotations and finalizers set by a JSON Patch.
/// Returns true if an operation changed.
pub fn rename_metadata_patch(rules: &RewriteRules, patch: &mut Value) -> bool {
    let action = Action::Rename;
    let mut touched = false;

    for (path, rewriter) in [
        ("/metadata/labels", rules.labels()),
        ("/metadata/annotations", rules.annotations()),
    ] {
        touched |= rewrite_op_values(patch, path, |value| {
            if let Some(map) = value.as_object() {
                *value = Value::Object(rewriter.rewrite_map(map, action));
            }
            Ok::<_, Infallible>(())
        })
        .unwrap_or(false);
        touched |= rewrite_op_keys(patch, path, |key| rewriter.rewrite(key, action));
    }

    let finalizers = rules.finalizers();
    touched |= rewrite_op_values(patch, "/metadata/finalizers", |value| {
        rewrite_finalizer_values(finalizers, value, action);
        Ok::<_, Infallible>(())
    })
    .unwrap_or(false);
    touched |= rewrite_op_values(patch, "/metadata/finalizers/-", |value| {
        rewrite_finalizer_values(finalizers, value, action);
        Ok::<_, Infallible>(())
    })
    .unwrap_or(false);
    touched
}

fn rewrite_finalizer_values(
    finalizers: &PrefixedNameRewriter,
    value: &mut Value,
    action: Action,
) {
    match value {
        Value::String(name) => *name = finalizers.rewrite(name, action),
        Value::Array(items) => {
            for item in items.iter_mut() {
                if let Value::String(name) = item {
                    *name = finalizers.rewrite(name, action);
                }
            }
        }
        _ => {}
    }
}
