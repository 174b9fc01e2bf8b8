use http::Request;
use http::Uri;
use tracing::debug;

use k8_rewrite_rules::Action;
use k8_rewrite_rules::RewriteRules;
use k8_rewrite_rules::WebhookRule;

use crate::endpoint::ApiEndpoint;
use crate::query::rewrite_crd_field_selector;
use crate::query::rewrite_label_selector_query;

/// core resources that carry references to tracked resources in their requests
const CORE_REQUEST_RESOURCES: &[&str] = &[
    "nodes",
    "pods",
    "configmaps",
    "secrets",
    "services",
    "serviceaccounts",
    "persistentvolumeclaims",
    "events",
];

/// resources outside tracked groups rewritten in both directions
const SPECIAL_RESOURCES: &[&str] = &[
    "mutatingwebhookconfigurations",
    "validatingwebhookconfigurations",
    "clusterroles",
    "roles",
    "rolebindings",
    "clusterrolebindings",
    "deployments",
    "statefulsets",
    "daemonsets",
    "jobs",
    "poddisruptionbudgets",
    "controllerrevisions",
    "apiservices",
    "prometheusrules",
    "servicemonitors",
    "validatingadmissionpolicies",
    "validatingadmissionpolicybindings",
];

/// Compute the renamed endpoint. `None` means the path is sent as is.
pub fn rewrite_api_endpoint(rules: &RewriteRules, endpoint: &ApiEndpoint) -> Option<ApiEndpoint> {
    if endpoint.is_root || endpoint.is_core || endpoint.is_unknown {
        return None;
    }

    if endpoint.is_crd {
        // list and watch only get their field selector rewritten
        if endpoint.crd_group.is_empty() {
            return None;
        }
        let (group_rule, _) =
            rules.resource_rules(&endpoint.crd_group, &endpoint.crd_resource_type)?;
        let mut target = endpoint.clone();
        target.name = format!(
            "{}.{}",
            rules.rename_resource(&endpoint.crd_resource_type),
            group_rule.renamed
        );
        return Some(target);
    }

    if endpoint.group.is_empty() {
        return None;
    }
    let group_rule = rules.group_rule(&endpoint.group)?;
    if !endpoint.resource_type.is_empty() {
        rules.resource_rules(&endpoint.group, &endpoint.resource_type)?;
    }

    let mut target = endpoint.clone();
    target.group = group_rule.renamed.clone();
    if !endpoint.resource_type.is_empty() {
        target.resource_type = rules.rename_resource(&endpoint.resource_type);
    }
    Some(target)
}

/// Rewritten query, if any selector in it changed.
pub fn rewrite_query(rules: &RewriteRules, endpoint: &ApiEndpoint) -> Option<String> {
    if endpoint.is_root || endpoint.is_unknown || endpoint.raw_query.is_empty() {
        return None;
    }

    let field_query = if endpoint.is_crd_list() {
        rewrite_crd_field_selector(rules, &endpoint.raw_query)
    } else {
        None
    };
    let query = field_query.as_deref().unwrap_or(&endpoint.raw_query);
    rewrite_label_selector_query(rules.labels(), query, Action::Rename).or(field_query)
}

/// A proxied request with its original and renamed endpoint.
#[derive(Debug, Clone)]
pub struct TargetRequest {
    orig: ApiEndpoint,
    target: Option<ApiEndpoint>,
    query: Option<String>,
    webhook: Option<WebhookRule>,
}

impl TargetRequest {
    pub fn new(rules: &RewriteRules, uri: &Uri) -> Self {
        let orig = ApiEndpoint::from_uri(uri);

        if let Some(webhook) = rules.webhook_rule(uri.path()) {
            debug!(path = uri.path(), original = %webhook.path, "webhook request");
            return Self {
                orig,
                target: None,
                query: None,
                webhook: Some(webhook.clone()),
            };
        }

        let target = rewrite_api_endpoint(rules, &orig);
        let query = rewrite_query(rules, &orig);
        Self {
            orig,
            target,
            query,
            webhook: None,
        }
    }

    pub fn from_request<B>(rules: &RewriteRules, request: &Request<B>) -> Self {
        Self::new(rules, request.uri())
    }

    pub fn endpoint(&self) -> &ApiEndpoint {
        &self.orig
    }

    pub fn target_endpoint(&self) -> Option<&ApiEndpoint> {
        self.target.as_ref()
    }

    pub fn webhook_rule(&self) -> Option<&WebhookRule> {
        self.webhook.as_ref()
    }

    /// path to send upstream
    pub fn path(&self) -> String {
        if let Some(webhook) = &self.webhook {
            return webhook.path.clone();
        }
        match &self.target {
            Some(target) => target.path(),
            None => self.orig.path(),
        }
    }

    pub fn raw_query(&self) -> &str {
        self.query.as_deref().unwrap_or(&self.orig.raw_query)
    }

    pub fn request_uri(&self) -> String {
        let path = self.path();
        let query = self.raw_query();
        if query.is_empty() {
            path
        } else {
            format!("{path}?{query}")
        }
    }

    pub fn is_core(&self) -> bool {
        self.webhook.is_none() && self.orig.is_core
    }

    pub fn is_crd(&self) -> bool {
        self.webhook.is_none() && self.orig.is_crd
    }

    pub fn is_watch(&self) -> bool {
        self.webhook.is_none() && self.orig.is_watch
    }

    pub fn is_webhook(&self) -> bool {
        self.webhook.is_some()
    }

    /// original group the request addresses
    pub fn orig_group(&self) -> &str {
        if let Some(webhook) = &self.webhook {
            return &webhook.group;
        }
        if self.orig.is_crd {
            return &self.orig.crd_group;
        }
        &self.orig.group
    }

    pub fn orig_resource_type(&self) -> &str {
        if let Some(webhook) = &self.webhook {
            return &webhook.resource;
        }
        if self.orig.is_crd {
            return &self.orig.crd_resource_type;
        }
        &self.orig.resource_type
    }

    pub fn should_rewrite_request(&self) -> bool {
        if self.webhook.is_some() {
            return true;
        }
        let ep = &self.orig;
        if ep.is_root || ep.is_unknown {
            return false;
        }
        if self.target.is_some() {
            return true;
        }
        if ep.is_core {
            return CORE_REQUEST_RESOURCES.contains(&ep.resource_type.as_str());
        }
        if SPECIAL_RESOURCES.contains(&ep.resource_type.as_str()) {
            return true;
        }
        // CRD creation
        ep.is_crd && ep.name.is_empty()
    }

    pub fn should_rewrite_response(&self) -> bool {
        if self.webhook.is_some() {
            return true;
        }
        let ep = &self.orig;
        if ep.is_root || ep.is_unknown {
            return false;
        }
        // labels renamed on the way in come back in every core object
        if ep.is_core {
            return true;
        }
        if ep.is_crd {
            return ep.name.is_empty() || self.target.is_some();
        }
        if self.target.is_some() {
            return true;
        }
        // group discovery at /apis
        if ep.group.is_empty() {
            return true;
        }
        SPECIAL_RESOURCES.contains(&ep.resource_type.as_str())
    }

    pub fn resource_for_log(&self) -> String {
        if let Some(webhook) = &self.webhook {
            return format!("webhook={}", webhook.path);
        }
        let ep = &self.orig;
        if ep.is_root {
            return "root".to_owned();
        }
        if ep.is_unknown {
            return "unknown".to_owned();
        }

        let base = if ep.is_crd {
            if ep.name.is_empty() {
                "crd".to_owned()
            } else {
                format!("crd/{}", ep.name)
            }
        } else if ep.is_core {
            format!("core/{}", ep.resource_type)
        } else if ep.resource_type.is_empty() {
            if ep.group.is_empty() {
                "apis".to_owned()
            } else {
                ep.group.clone()
            }
        } else {
            format!("{}/{}", ep.group, ep.resource_type)
        };

        if ep.subresource.is_empty() {
            base
        } else {
            format!("{}/{}", base, ep.subresource)
        }
    }
}

#[cfg(test)]
mod test {

    use http::Request;
    use http::Uri;

    use crate::test_util::test_rules;

    use super::TargetRequest;

    fn target(uri: &str) -> TargetRequest {
        TargetRequest::new(&test_rules(), &uri.parse::<Uri>().expect("uri"))
    }

    #[test]
    fn test_tracked_resource() {
        let target = target("/apis/original.group.io/v1/namespaces/ns/someresources/a/status");
        assert_eq!(
            target.path(),
            "/apis/prefixed.resources.group.io/v1/namespaces/ns/prefixedsomeresources/a/status"
        );
        assert!(target.should_rewrite_request());
        assert!(target.should_rewrite_response());
        assert_eq!(target.orig_group(), "original.group.io");
        assert_eq!(target.orig_resource_type(), "someresources");
        assert_eq!(target.resource_for_log(), "original.group.io/someresources/status");
    }

    #[test]
    fn test_untracked_resource() {
        let target = target("/apis/original.group.io/v1/namespaces/ns/unknownresources");
        assert!(target.target_endpoint().is_none());
        assert_eq!(target.path(), "/apis/original.group.io/v1/namespaces/ns/unknownresources");
        assert!(!target.should_rewrite_request());

        let target = self::target("/apis/batch/v1/namespaces/ns/cronjobs");
        assert!(!target.should_rewrite_request());
        assert!(!target.should_rewrite_response());
    }

    #[test]
    fn test_crd() {
        let target = target("/apis/apiextensions.k8s.io/v1/customresourcedefinitions/someresources.original.group.io");
        assert!(target.is_crd());
        assert_eq!(
            target.path(),
            "/apis/apiextensions.k8s.io/v1/customresourcedefinitions/prefixedsomeresources.prefixed.resources.group.io"
        );
        assert_eq!(target.orig_group(), "original.group.io");
        assert_eq!(target.orig_resource_type(), "someresources");
        assert_eq!(target.resource_for_log(), "crd/someresources.original.group.io");

        let list = self::target("/apis/apiextensions.k8s.io/v1/customresourcedefinitions");
        assert!(list.should_rewrite_request());
        assert!(list.should_rewrite_response());
    }

    #[test]
    fn test_crd_watch_field_selector() {
        let target = target(
            "/apis/apiextensions.k8s.io/v1/customresourcedefinitions?fieldSelector=metadata.name%3Dsomeresources.original.group.io&watch=true",
        );
        assert!(target.is_watch());
        assert_eq!(
            target.request_uri(),
            "/apis/apiextensions.k8s.io/v1/customresourcedefinitions?fieldSelector=metadata.name%3Dprefixedsomeresources.prefixed.resources.group.io&watch=true"
        );
    }

    #[test]
    fn test_core_label_selector() {
        let target = target("/api/v1/namespaces/ns/pods?labelSelector=labelgroup.io%3Dvm");
        assert!(target.is_core());
        assert_eq!(target.path(), "/api/v1/namespaces/ns/pods");
        assert_eq!(target.raw_query(), "labelSelector=replacedlabelgroup.io%3Dvm");
        assert!(target.should_rewrite_request());
        assert!(target.should_rewrite_response());
        assert_eq!(target.resource_for_log(), "core/pods");

        let configmaps = self::target("/api/v1/namespaces/ns/configmaps");
        assert!(configmaps.should_rewrite_request());
        assert!(configmaps.should_rewrite_response());
    }

    #[test]
    fn test_rewrite_gates() {
        // (uri, request, response)
        let cases = [
            // core
            ("/api/v1/namespaces/ns/pods/a", true, true),
            ("/api/v1/namespaces/ns/configmaps", true, true),
            ("/api/v1/namespaces/ns/secrets/s", true, true),
            ("/api/v1/namespaces/ns/services/svc", true, true),
            ("/api/v1/namespaces/ns/serviceaccounts", true, true),
            ("/api/v1/nodes/n1", true, true),
            ("/api/v1/namespaces/ns/endpoints", false, true),
            ("/api/v1", false, true),
            // special resources outside tracked groups
            ("/apis/apps/v1/namespaces/ns/deployments/d", true, true),
            ("/apis/batch/v1/namespaces/ns/jobs", true, true),
            ("/apis/rbac.authorization.k8s.io/v1/clusterroles", true, true),
            ("/apis/admissionregistration.k8s.io/v1/validatingwebhookconfigurations/w", true, true),
            ("/apis/apiregistration.k8s.io/v1/apiservices/v1.original.group.io", true, true),
            ("/apis/monitoring.coreos.com/v1/namespaces/ns/servicemonitors", true, true),
            ("/apis/monitoring.coreos.com/v1/namespaces/ns/prometheusrules/r", true, true),
            ("/apis/batch/v1/namespaces/ns/cronjobs", false, false),
            // tracked and untracked custom resources
            ("/apis/original.group.io/v1/namespaces/ns/someresources/a", true, true),
            ("/apis/original.group.io/v1/namespaces/ns/unknownresources", false, false),
            // crd list, tracked crd by name, untracked crd by name
            ("/apis/apiextensions.k8s.io/v1/customresourcedefinitions", true, true),
            (
                "/apis/apiextensions.k8s.io/v1/customresourcedefinitions/someresources.original.group.io",
                true,
                true,
            ),
            (
                "/apis/apiextensions.k8s.io/v1/customresourcedefinitions/foos.example.com",
                false,
                false,
            ),
            // discovery
            ("/apis", false, true),
            ("/apis/original.group.io", true, true),
            ("/apis/original.group.io/v1", true, true),
            ("/apis/batch/v1", false, false),
            // webhook
            ("/validate-prefixed-resources-group-io-v1-prefixedsomeresource", true, true),
            // root and unknown
            ("/", false, false),
            ("/healthz", false, false),
        ];

        let rules = test_rules();
        for (uri, request, response) in cases {
            let target = TargetRequest::new(&rules, &uri.parse::<Uri>().expect("uri"));
            assert_eq!(target.should_rewrite_request(), request, "request gate of {uri}");
            assert_eq!(target.should_rewrite_response(), response, "response gate of {uri}");
        }
    }

    #[test]
    fn test_untracked_crd_field_selector() {
        let query = "fieldSelector=metadata.name%3Dfoos.example.com&watch=true";
        let target = target(&format!("/apis/apiextensions.k8s.io/v1/customresourcedefinitions?{query}"));
        assert!(target.is_watch());
        assert_eq!(target.raw_query(), query);
        assert_eq!(
            target.request_uri(),
            format!("/apis/apiextensions.k8s.io/v1/customresourcedefinitions?{query}")
        );
    }

    #[test]
    fn test_webhook() {
        let request = Request::post("/validate-prefixed-resources-group-io-v1-prefixedsomeresource")
            .body(())
            .expect("request");
        let target = TargetRequest::from_request(&test_rules(), &request);
        assert!(target.is_webhook());
        assert!(!target.is_crd());
        assert_eq!(target.path(), "/validate-original-group-io-v1-someresource");
        assert_eq!(target.orig_group(), "original.group.io");
        assert_eq!(target.orig_resource_type(), "someresources");
        assert!(target.should_rewrite_request());
        assert!(target.should_rewrite_response());
        assert_eq!(
            target.resource_for_log(),
            "webhook=/validate-original-group-io-v1-someresource"
        );
    }

    #[test]
    fn test_root_and_discovery() {
        let root = target("/");
        assert!(!root.should_rewrite_request());
        assert!(!root.should_rewrite_response());
        assert_eq!(root.resource_for_log(), "root");

        let apis = target("/apis");
        assert!(apis.should_rewrite_response());

        let group = target("/apis/original.group.io/v1");
        assert_eq!(group.path(), "/apis/prefixed.resources.group.io/v1");
        assert!(group.should_rewrite_response());

        assert_eq!(target("/healthz").resource_for_log(), "unknown");
    }
}
