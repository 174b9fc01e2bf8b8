use serde_json::Value;

use k8_json_rewrite::Rewritten;
use k8_rewrite_rules::Action;
use k8_rewrite_rules::RewriteRules;

use crate::kinds::metadata::rewrite_label_selector;
use crate::kinds::metadata::rewrite_names_map;
use crate::kinds::metadata::rewrite_pod_spec;
use crate::kinds::metadata::rewrite_pod_template;
use crate::kinds::metadata::rewrite_type_ref;
use crate::RewriteError;

/// Deployment, StatefulSet, DaemonSet and Job
pub fn rewrite_workload(rules: &RewriteRules, obj: &mut Value, action: Action) -> Result<Rewritten, RewriteError> {
    rewrite_label_selector(rules, obj, "spec.selector", action);
    rewrite_pod_template(rules, obj, "spec.template", action);
    Ok(Rewritten::Keep)
}

pub fn rewrite_pod(rules: &RewriteRules, obj: &mut Value, action: Action) -> Result<Rewritten, RewriteError> {
    rewrite_pod_spec(rules, obj, "spec", action);
    Ok(Rewritten::Keep)
}

pub fn rewrite_pod_disruption_budget(
    rules: &RewriteRules,
    obj: &mut Value,
    action: Action,
) -> Result<Rewritten, RewriteError> {
    rewrite_label_selector(rules, obj, "spec.selector", action);
    Ok(Rewritten::Keep)
}

/// monitoring.coreos.com ServiceMonitor selecting Services by label
pub fn rewrite_service_monitor(
    rules: &RewriteRules,
    obj: &mut Value,
    action: Action,
) -> Result<Rewritten, RewriteError> {
    rewrite_label_selector(rules, obj, "spec.selector", action);
    Ok(Rewritten::Keep)
}

pub fn rewrite_service(rules: &RewriteRules, obj: &mut Value, action: Action) -> Result<Rewritten, RewriteError> {
    rewrite_names_map(rules.labels(), obj, "spec.selector", action);
    Ok(Rewritten::Keep)
}

/// `dataSource` and `dataSourceRef` pointing at tracked kinds
pub fn rewrite_persistent_volume_claim(
    rules: &RewriteRules,
    obj: &mut Value,
    action: Action,
) -> Result<Rewritten, RewriteError> {
    for path in ["/spec/dataSource", "/spec/dataSourceRef"] {
        if let Some(reference) = obj.pointer_mut(path) {
            rewrite_type_ref(rules, reference, "apiGroup", action);
        }
    }
    Ok(Rewritten::Keep)
}

pub fn rewrite_event(rules: &RewriteRules, obj: &mut Value, action: Action) -> Result<Rewritten, RewriteError> {
    if let Some(involved) = obj.get_mut("involvedObject") {
        rewrite_type_ref(rules, involved, "apiVersion", action);
    }
    Ok(Rewritten::Keep)
}
