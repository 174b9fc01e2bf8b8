//! Per-kind rewrites and the registry dispatching payloads to them.

pub mod admission;
pub mod api_service;
pub mod crd;
pub mod custom_resource;
pub mod discovery;
pub mod metadata;
pub mod rbac;
pub mod webhook;
pub mod workload;

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::debug;
use tracing::trace;

use k8_json_rewrite::kind_of;
use k8_json_rewrite::rewrite_resource_or_list;
use k8_json_rewrite::Rewritten;
use k8_rewrite_rules::Action;
use k8_rewrite_rules::RewriteRules;

use crate::RewriteError;

use self::custom_resource::rewrite_api_version_and_kind;
use self::custom_resource::rewrite_custom_resource;
use self::metadata::rewrite_object_meta;
use self::metadata::rewrite_owner_references;

/// Kind specific rewrite of one object.
pub type ObjectRewrite = fn(&RewriteRules, &mut Value, Action) -> Result<Rewritten, RewriteError>;

#[derive(Clone, Copy)]
pub enum KindHandler {
    /// Whole payload such as discovery documents. No list wrapping, no metadata pass.
    Payload(ObjectRewrite),
    /// Resource kind and its list kind. Kinds without a rewrite only get the metadata pass.
    Resource {
        list_kind: &'static str,
        rewrite: Option<ObjectRewrite>,
    },
}

/// Built-in kinds, keyed by both kind and list kind.
#[derive(Default)]
pub struct KindRegistry {
    handlers: HashMap<&'static str, KindHandler>,
}

impl KindRegistry {
    fn builtin() -> Self {
        let mut registry = Self::default();

        registry.register_payload("APIGroupList", discovery::rewrite_api_group_list);
        registry.register_payload("APIGroup", discovery::rewrite_api_group);
        registry.register_payload("APIResourceList", discovery::rewrite_api_resource_list);
        registry.register_payload("APIGroupDiscoveryList", discovery::rewrite_api_group_discovery_list);
        registry.register_payload(admission::ADMISSION_REVIEW_KIND, admission::rewrite_admission_review);

        registry.register(crd::CRD_KIND, crd::CRD_LIST_KIND, Some(crd::rewrite_crd));
        for (kind, list_kind) in [
            ("MutatingWebhookConfiguration", "MutatingWebhookConfigurationList"),
            ("ValidatingWebhookConfiguration", "ValidatingWebhookConfigurationList"),
        ] {
            registry.register(kind, list_kind, Some(webhook::rewrite_webhook_configuration));
        }
        registry.register("ClusterRole", "ClusterRoleList", Some(rbac::rewrite_role));
        registry.register("Role", "RoleList", Some(rbac::rewrite_role));
        registry.register(
            "ValidatingAdmissionPolicy",
            "ValidatingAdmissionPolicyList",
            Some(rbac::rewrite_validating_admission_policy),
        );
        registry.register(
            "ValidatingAdmissionPolicyBinding",
            "ValidatingAdmissionPolicyBindingList",
            Some(rbac::rewrite_validating_admission_policy_binding),
        );
        registry.register("RoleBinding", "RoleBindingList", None);
        registry.register("ClusterRoleBinding", "ClusterRoleBindingList", None);
        registry.register("ControllerRevision", "ControllerRevisionList", None);
        registry.register("Node", "NodeList", None);
        registry.register("PrometheusRule", "PrometheusRuleList", None);
        registry.register("APIService", "APIServiceList", Some(api_service::rewrite_api_service));

        for (kind, list_kind) in [
            ("Deployment", "DeploymentList"),
            ("StatefulSet", "StatefulSetList"),
            ("DaemonSet", "DaemonSetList"),
            ("Job", "JobList"),
        ] {
            registry.register(kind, list_kind, Some(workload::rewrite_workload));
        }
        registry.register("Pod", "PodList", Some(workload::rewrite_pod));
        registry.register(
            "PodDisruptionBudget",
            "PodDisruptionBudgetList",
            Some(workload::rewrite_pod_disruption_budget),
        );
        registry.register("Service", "ServiceList", Some(workload::rewrite_service));
        registry.register(
            "PersistentVolumeClaim",
            "PersistentVolumeClaimList",
            Some(workload::rewrite_persistent_volume_claim),
        );
        registry.register("Event", "EventList", Some(workload::rewrite_event));
        registry.register(
            "ServiceMonitor",
            "ServiceMonitorList",
            Some(workload::rewrite_service_monitor),
        );

        registry
    }

    pub fn register_payload(&mut self, kind: &'static str, rewrite: ObjectRewrite) {
        self.handlers.insert(kind, KindHandler::Payload(rewrite));
    }

    pub fn register(&mut self, kind: &'static str, list_kind: &'static str, rewrite: Option<ObjectRewrite>) {
        let handler = KindHandler::Resource { list_kind, rewrite };
        self.handlers.insert(kind, handler);
        self.handlers.insert(list_kind, handler);
    }

    pub fn get(&self, kind: &str) -> Option<&KindHandler> {
        self.handlers.get(kind)
    }
}

pub static REGISTRY: Lazy<KindRegistry> = Lazy::new(KindRegistry::builtin);

/// How a payload of some kind is rewritten.
enum Dispatch {
    Payload(ObjectRewrite),
    Resource {
        list_kind: String,
        rewrite: Option<ObjectRewrite>,
        /// kind declared in the rules, the list envelope is renamed too
        custom: bool,
    },
}

fn resolve(rules: &RewriteRules, kind: &str, action: Action) -> Dispatch {
    match REGISTRY.get(kind) {
        Some(KindHandler::Payload(rewrite)) => return Dispatch::Payload(*rewrite),
        Some(KindHandler::Resource { list_kind, rewrite }) => {
            return Dispatch::Resource {
                list_kind: (*list_kind).to_owned(),
                rewrite: *rewrite,
                custom: false,
            }
        }
        None => {}
    }

    let rule_kind = match action {
        Action::Rename => kind.to_owned(),
        Action::Restore => rules.restore_kind(kind),
    };
    if let Some(kind_ref) = rules.resource_by_kind(&rule_kind) {
        let list_kind = if kind_ref.is_list {
            kind.to_owned()
        } else {
            format!("{kind}List")
        };
        return Dispatch::Resource {
            list_kind,
            rewrite: Some(rewrite_custom_resource),
            custom: true,
        };
    }

    // untracked kind: lists are still walked for the metadata pass and excludes
    let list_kind = if kind.ends_with("List") {
        kind.to_owned()
    } else {
        format!("{kind}List")
    };
    Dispatch::Resource {
        list_kind,
        rewrite: None,
        custom: false,
    }
}

/// Rewrite a complete payload. During Restore, objects matching an exclude
/// rule are dropped from lists, an excluded single object yields `Drop`.
pub fn rewrite_payload(rules: &RewriteRules, obj: &mut Value, action: Action) -> Result<Rewritten, RewriteError> {
    dispatch(rules, obj, action, action.is_restore())
}

/// Rewrite an object embedded in another payload. Excludes are not applied.
pub fn rewrite_embedded(rules: &RewriteRules, obj: &mut Value, action: Action) -> Result<Rewritten, RewriteError> {
    dispatch(rules, obj, action, false)
}

fn dispatch(
    rules: &RewriteRules,
    obj: &mut Value,
    action: Action,
    filter_excludes: bool,
) -> Result<Rewritten, RewriteError> {
    let kind = kind_of(obj).to_owned();

    let (list_kind, rewrite, custom) = match resolve(rules, &kind, action) {
        Dispatch::Payload(rewrite) => {
            debug!(%kind, %action, "rewrite payload");
            return rewrite(rules, obj, action);
        }
        Dispatch::Resource {
            list_kind,
            rewrite,
            custom,
        } => (list_kind, rewrite, custom),
    };

    let is_list = !kind.is_empty() && kind == list_kind;
    debug!(%kind, %list_kind, is_list, custom, %action, "rewrite resource");

    // kind of list items without their own
    let item_kind = if is_list {
        kind.strip_suffix("List").unwrap_or(&kind).to_owned()
    } else {
        kind.clone()
    };

    let result = rewrite_resource_or_list(obj, &list_kind, |item| {
        // generic lists hold items of any kind
        let own_kind = kind_of(item);
        if is_list && !own_kind.is_empty() && own_kind != item_kind {
            return dispatch(rules, item, action, filter_excludes);
        }
        rewrite_item(rules, item, &item_kind, rewrite, action, filter_excludes)
    })?;

    if is_list && custom {
        rewrite_api_version_and_kind(rules, obj, action);
    }
    Ok(result)
}

fn rewrite_item(
    rules: &RewriteRules,
    item: &mut Value,
    default_kind: &str,
    rewrite: Option<ObjectRewrite>,
    action: Action,
    filter_excludes: bool,
) -> Result<Rewritten, RewriteError> {
    if filter_excludes {
        let kind = match kind_of(item) {
            "" => default_kind,
            kind => kind,
        };
        if rules.should_exclude(item, kind) {
            trace!(kind, "excluded");
            return Ok(Rewritten::Drop);
        }
    }

    if let Some(rewrite) = rewrite {
        match rewrite(rules, item, action)? {
            Rewritten::Keep => {}
            Rewritten::Replace(value) => *item = value,
            Rewritten::Drop => return Ok(Rewritten::Drop),
        }
    }

    rewrite_object_meta(rules, item, "metadata", action);
    rewrite_owner_references(rules, item, action);
    Ok(Rewritten::Keep)
}
