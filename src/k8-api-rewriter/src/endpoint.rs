use std::collections::VecDeque;

use http::Uri;

pub const CORE_PREFIX: &str = "api";
pub const APIS_PREFIX: &str = "apis";
pub const NAMESPACES: &str = "namespaces";
pub const CRD_GROUP: &str = "apiextensions.k8s.io";
pub const CRD_RESOURCE_TYPE: &str = "customresourcedefinitions";

const WATCH_CLAUSE: &str = "watch=true";

/// Parsed Kubernetes API path.
///
/// Shapes understood:
///
/// - `/api/VERSION/[namespaces/NAMESPACE/]RESOURCETYPE[/NAME[/SUBRESOURCE]]`
/// - `/apis/GROUP/VERSION/[namespaces/NAMESPACE/]RESOURCETYPE[/NAME[/SUBRESOURCE]]`
/// - `/apis/apiextensions.k8s.io/VERSION/customresourcedefinitions[/PLURAL.GROUP]`
///
/// Anything outside `/api` and `/apis` is unknown and passed through as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiEndpoint {
    pub is_unknown: bool,
    pub is_root: bool,
    pub is_core: bool,
    pub is_crd: bool,
    pub is_watch: bool,
    pub raw_path: String,
    pub raw_query: String,
    pub prefix: String,
    pub group: String,
    pub version: String,
    pub namespace: String,
    pub resource_type: String,
    pub name: String,
    pub subresource: String,
    pub remainder: Vec<String>,
    pub crd_resource_type: String,
    pub crd_group: String,
}

/// path segments consumed from the front
struct Segments<'a>(VecDeque<&'a str>);

impl<'a> Segments<'a> {
    /// next segment and whether it was the last one
    fn shift(&mut self) -> (String, bool) {
        let first = self.0.pop_front().unwrap_or_default().to_owned();
        (first, self.0.is_empty())
    }

    fn rest(self) -> Vec<String> {
        self.0.into_iter().map(str::to_owned).collect()
    }
}

impl ApiEndpoint {
    pub fn from_uri(uri: &Uri) -> Self {
        Self::parse(uri.path(), uri.query().unwrap_or_default())
    }

    pub fn parse(raw_path: &str, raw_query: &str) -> Self {
        let is_watch = raw_query.contains(WATCH_CLAUSE);
        let cleaned = raw_path.trim_matches('/');

        let mut endpoint = if cleaned.is_empty() {
            Self {
                is_root: true,
                ..Default::default()
            }
        } else {
            let segments = Segments(cleaned.split('/').collect());
            match cleaned.split('/').next() {
                Some(CORE_PREFIX) => parse_core(segments),
                Some(APIS_PREFIX) => parse_apis(segments),
                _ => Self {
                    is_unknown: true,
                    ..Default::default()
                },
            }
        };

        endpoint.is_watch = is_watch && !endpoint.is_unknown;
        endpoint.raw_path = raw_path.to_owned();
        endpoint.raw_query = raw_query.to_owned();
        endpoint
    }

    /// Path built back from parts. Root, core and unknown endpoints keep their raw path.
    pub fn path(&self) -> String {
        if self.is_root || self.is_core || self.is_unknown {
            return self.raw_path.clone();
        }

        let ns = if self.namespace.is_empty() {
            String::new()
        } else {
            format!("{}/{}", NAMESPACES, self.namespace)
        };

        let parts = [
            self.prefix.as_str(),
            self.group.as_str(),
            self.version.as_str(),
            ns.as_str(),
            self.resource_type.as_str(),
            self.name.as_str(),
            self.subresource.as_str(),
        ];
        let parts: Vec<&str> = parts
            .into_iter()
            .chain(self.remainder.iter().map(String::as_str))
            .filter(|part| !part.is_empty())
            .collect();

        format!("/{}", parts.join("/"))
    }

    /// `/apis/apiextensions.k8s.io/VERSION/customresourcedefinitions` without a name
    pub fn is_crd_list(&self) -> bool {
        self.is_crd && self.name.is_empty()
    }

    /// Discovery path of a group (`/apis/GROUP` or `/apis/GROUP/VERSION`).
    pub fn is_group_discovery(&self) -> bool {
        !self.is_core && !self.group.is_empty() && self.resource_type.is_empty()
    }
}

fn parse_core(mut segments: Segments<'_>) -> ApiEndpoint {
    let mut ae = ApiEndpoint {
        is_core: true,
        ..Default::default()
    };
    let mut is_last;

    (ae.prefix, is_last) = segments.shift();
    if is_last {
        return ae;
    }
    (ae.version, is_last) = segments.shift();
    if is_last {
        return ae;
    }
    (ae.resource_type, is_last) = segments.shift();
    if is_last {
        return ae;
    }
    (ae.name, is_last) = segments.shift();
    if is_last {
        return ae;
    }

    // /api/VERSION/namespaces/NAMESPACE/status addresses the namespace itself
    (ae.subresource, is_last) = segments.shift();
    if ae.resource_type == NAMESPACES && ae.subresource != "status" {
        ae.namespace = std::mem::take(&mut ae.name);
        ae.resource_type = std::mem::take(&mut ae.subresource);
    }
    if is_last {
        return ae;
    }

    parse_rest(ae, segments)
}

fn parse_apis(mut segments: Segments<'_>) -> ApiEndpoint {
    let mut ae = ApiEndpoint::default();
    let mut is_last;

    (ae.prefix, is_last) = segments.shift();
    if is_last {
        return ae;
    }
    (ae.group, is_last) = segments.shift();
    if is_last {
        return ae;
    }
    (ae.version, is_last) = segments.shift();
    if is_last {
        return ae;
    }
    (ae.resource_type, is_last) = segments.shift();
    ae.is_crd = ae.group == CRD_GROUP && ae.resource_type == CRD_RESOURCE_TYPE;
    if is_last {
        return ae;
    }

    (ae.name, is_last) = segments.shift();
    if ae.is_crd {
        match ae.name.split_once('.') {
            Some((resource_type, group)) => {
                ae.crd_resource_type = resource_type.to_owned();
                ae.crd_group = group.to_owned();
            }
            None => ae.crd_resource_type = ae.name.clone(),
        }
    }
    if is_last {
        return ae;
    }

    (ae.subresource, is_last) = segments.shift();
    if ae.resource_type == NAMESPACES {
        ae.namespace = std::mem::take(&mut ae.name);
        ae.resource_type = std::mem::take(&mut ae.subresource);
    }
    if is_last {
        return ae;
    }

    parse_rest(ae, segments)
}

/// `NAME/SUBRESOURCE` after `namespaces/NAMESPACE/RESOURCETYPE`, extra segments are kept aside
fn parse_rest(mut ae: ApiEndpoint, mut segments: Segments<'_>) -> ApiEndpoint {
    if ae.namespace.is_empty() {
        ae.remainder = segments.rest();
        return ae;
    }

    let mut is_last;
    (ae.name, is_last) = segments.shift();
    if is_last {
        return ae;
    }
    (ae.subresource, is_last) = segments.shift();
    if is_last {
        return ae;
    }
    ae.remainder = segments.rest();
    ae
}
