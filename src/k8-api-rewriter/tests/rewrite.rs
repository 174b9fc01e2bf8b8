use http::Uri;
use serde_json::json;
use serde_json::Value;

use k8_api_rewriter::new_shared;
use k8_api_rewriter::rules::RulesConfig;
use k8_api_rewriter::Action;
use k8_api_rewriter::Outcome;
use k8_api_rewriter::SharedRewriter;
use k8_api_rewriter::TargetRequest;

const RULES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/rules.yaml");

fn rewriter() -> SharedRewriter {
    fluvio_future::subscriber::init_tracer(None);
    let config = RulesConfig::from_file(RULES_PATH).expect("rules file");
    new_shared(config).expect("compile rules")
}

fn target(rewriter: &SharedRewriter, uri: &str) -> TargetRequest {
    rewriter.target_request(&uri.parse::<Uri>().expect("uri"))
}

/// rewrite and parse the result, an unchanged payload is returned as is
fn rewrite(rewriter: &SharedRewriter, uri: &str, payload: &Value, action: Action) -> Option<Value> {
    let target = target(rewriter, uri);
    let body = serde_json::to_vec(payload).expect("serialize");
    let outcome = rewriter
        .rewrite_json_payload(&target, &body, action)
        .expect("rewrite");
    outcome
        .body(&body)
        .map(|bytes| serde_json::from_slice(bytes).expect("json"))
}

fn some_resource() -> Value {
    json!({
        "apiVersion": "original.group.io/v1",
        "kind": "SomeResource",
        "metadata": {
            "name": "a",
            "namespace": "ns",
            "labels": {"labelgroup.io/app": "vm", "app": "x"},
            "annotations": {"annogroup.io/note": "n"},
            "finalizers": ["finalizergroup.io/cleanup"],
            "ownerReferences": [{
                "apiVersion": "other.group.io/v2alpha3",
                "kind": "OtherResource",
                "name": "o",
                "uid": "1"
            }]
        },
        "spec": {"size": 1}
    })
}

#[test]
fn test_custom_resource_round_trip() {
    let rewriter = rewriter();
    let uri = "/apis/original.group.io/v1/namespaces/ns/someresources";
    let original = some_resource();

    let renamed = rewrite(&rewriter, uri, &original, Action::Rename).expect("renamed");
    assert_eq!(renamed["apiVersion"], json!("prefixed.resources.group.io/v1"));
    assert_eq!(renamed["kind"], json!("PrefixedSomeResource"));
    assert_eq!(
        renamed["metadata"]["labels"],
        json!({"replacedlabelgroup.io/app": "vm", "app": "x"})
    );
    assert_eq!(
        renamed["metadata"]["annotations"],
        json!({"replacedannogroup.io/note": "n"})
    );
    assert_eq!(
        renamed["metadata"]["finalizers"],
        json!(["replacedfinalizergroup.io/cleanup"])
    );
    assert_eq!(
        renamed["metadata"]["ownerReferences"][0],
        json!({
            "apiVersion": "other.prefixed.resources.group.io/v2alpha3",
            "kind": "PrefixedOtherResource",
            "name": "o",
            "uid": "1"
        })
    );
    assert_eq!(renamed["spec"], original["spec"]);

    let restored = rewrite(&rewriter, uri, &renamed, Action::Restore).expect("restored");
    assert_eq!(restored, original);
}

#[test]
fn test_list_restore() {
    let rewriter = rewriter();
    let mut renamed_item = rewrite(
        &rewriter,
        "/apis/original.group.io/v1/namespaces/ns/someresources",
        &some_resource(),
        Action::Rename,
    )
    .expect("renamed");
    renamed_item.as_object_mut().expect("object").remove("apiVersion");
    renamed_item.as_object_mut().expect("object").remove("kind");

    let list = json!({
        "apiVersion": "prefixed.resources.group.io/v1",
        "kind": "PrefixedSomeResourceList",
        "metadata": {"resourceVersion": "100"},
        "items": [renamed_item]
    });
    let restored = rewrite(
        &rewriter,
        "/apis/original.group.io/v1/namespaces/ns/someresources",
        &list,
        Action::Restore,
    )
    .expect("restored");

    assert_eq!(restored["apiVersion"], json!("original.group.io/v1"));
    assert_eq!(restored["kind"], json!("SomeResourceList"));
    let items = restored["items"].as_array().expect("items");
    assert_eq!(items.len(), 1);
    assert_eq!(
        items[0]["metadata"]["labels"],
        json!({"labelgroup.io/app": "vm", "app": "x"})
    );
}

#[test]
fn test_untracked_payload_unchanged() {
    let rewriter = rewriter();
    let target = target(&rewriter, "/api/v1/namespaces/ns/pods/p");
    let body = serde_json::to_vec(&json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {"name": "p", "labels": {"app": "x"}},
        "spec": {"containers": [{"name": "c", "image": "busybox"}]}
    }))
    .expect("serialize");

    for action in [Action::Rename, Action::Restore] {
        let outcome = rewriter
            .rewrite_json_payload(&target, &body, action)
            .expect("rewrite");
        assert_eq!(outcome, Outcome::Unchanged);
    }
}

#[test]
fn test_excludes() {
    let rewriter = rewriter();
    let uri = "/api/v1/namespaces/ns/configmaps";
    let excluded = json!({
        "metadata": {"name": "hidden", "labels": {"excluded": "true"}},
        "data": {}
    });
    let visible = json!({
        "metadata": {"name": "shown", "labels": {"replacedlabelgroup.io/owner": "a"}},
        "data": {}
    });
    let list = json!({
        "apiVersion": "v1",
        "kind": "ConfigMapList",
        "items": [excluded, visible]
    });

    let restored = rewrite(&rewriter, uri, &list, Action::Restore).expect("restored");
    assert_eq!(
        restored["items"],
        json!([{"metadata": {"name": "shown", "labels": {"labelgroup.io/owner": "a"}}, "data": {}}])
    );

    // a single excluded object is not served at all
    let mut single = excluded.clone();
    single["kind"] = json!("ConfigMap");
    let target = target(&rewriter, "/api/v1/namespaces/ns/configmaps/hidden");
    let outcome = rewriter
        .rewrite_json_payload(
            &target,
            &serde_json::to_vec(&single).expect("serialize"),
            Action::Restore,
        )
        .expect("restore");
    assert!(outcome.is_excluded());

    // excludes never filter client requests
    assert!(rewrite(&rewriter, uri, &list, Action::Rename).is_some());
}

#[test]
fn test_crd_round_trip() {
    let rewriter = rewriter();
    let uri = "/apis/apiextensions.k8s.io/v1/customresourcedefinitions";
    let original = json!({
        "apiVersion": "apiextensions.k8s.io/v1",
        "kind": "CustomResourceDefinition",
        "metadata": {"name": "someresources.original.group.io"},
        "spec": {
            "group": "original.group.io",
            "names": {
                "kind": "SomeResource",
                "listKind": "SomeResourceList",
                "plural": "someresources",
                "singular": "someresource",
                "shortNames": ["sr", "srs"],
                "categories": ["all"]
            },
            "scope": "Namespaced"
        }
    });

    let renamed = rewrite(&rewriter, uri, &original, Action::Rename).expect("renamed");
    assert_eq!(
        renamed["metadata"]["name"],
        json!("prefixedsomeresources.prefixed.resources.group.io")
    );
    assert_eq!(
        renamed["spec"]["names"],
        json!({
            "kind": "PrefixedSomeResource",
            "listKind": "PrefixedSomeResourceList",
            "plural": "prefixedsomeresources",
            "singular": "prefixedsomeresource",
            "shortNames": ["psr", "psrs"],
            "categories": ["prefixed"]
        })
    );

    let restored = rewrite(&rewriter, uri, &renamed, Action::Restore).expect("restored");
    assert_eq!(restored, original);

    // the original CRD seen by the real server is a duplicate
    let list = json!({
        "apiVersion": "apiextensions.k8s.io/v1",
        "kind": "CustomResourceDefinitionList",
        "items": [original.clone(), renamed]
    });
    let restored = rewrite(&rewriter, uri, &list, Action::Restore).expect("restored");
    assert_eq!(restored["items"], json!([original]));
}

#[test]
fn test_cluster_role_wildcard_group() {
    let rewriter = rewriter();
    let uri = "/apis/rbac.authorization.k8s.io/v1/clusterroles";
    let original = json!({
        "apiVersion": "rbac.authorization.k8s.io/v1",
        "kind": "ClusterRole",
        "metadata": {"name": "reader"},
        "rules": [
            {"apiGroups": ["*"], "resources": ["someresources", "pods"], "verbs": ["get"]},
            {"apiGroups": ["original.group.io"], "resources": ["someresources/status"], "verbs": ["update"]},
            {"apiGroups": ["apps"], "resources": ["deployments"], "verbs": ["list"]}
        ]
    });

    let renamed = rewrite(&rewriter, uri, &original, Action::Rename).expect("renamed");
    assert_eq!(
        renamed["rules"],
        json!([
            {"apiGroups": ["*"], "resources": ["prefixedsomeresources", "pods"], "verbs": ["get"]},
            {"apiGroups": ["prefixed.resources.group.io"], "resources": ["prefixedsomeresources/status"], "verbs": ["update"]},
            {"apiGroups": ["apps"], "resources": ["deployments"], "verbs": ["list"]}
        ])
    );

    let restored = rewrite(&rewriter, uri, &renamed, Action::Restore).expect("restored");
    assert_eq!(restored, original);
}

#[test]
fn test_persistent_volume_claim() {
    let rewriter = rewriter();
    let uri = "/api/v1/namespaces/ns/persistentvolumeclaims";
    let original = json!({
        "apiVersion": "v1",
        "kind": "PersistentVolumeClaim",
        "metadata": {"name": "data"},
        "spec": {
            "dataSourceRef": {"apiGroup": "original.group.io", "kind": "SomeResource", "name": "snap"}
        }
    });

    let renamed = rewrite(&rewriter, uri, &original, Action::Rename).expect("renamed");
    assert_eq!(
        renamed["spec"]["dataSourceRef"],
        json!({"apiGroup": "prefixed.resources.group.io", "kind": "PrefixedSomeResource", "name": "snap"})
    );
    let restored = rewrite(&rewriter, uri, &renamed, Action::Restore).expect("restored");
    assert_eq!(restored, original);
}

#[test]
fn test_admission_review_request() {
    let rewriter = rewriter();
    let review = json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview",
        "request": {
            "uid": "1",
            "kind": {"group": "prefixed.resources.group.io", "version": "v1", "kind": "PrefixedSomeResource"},
            "resource": {"group": "prefixed.resources.group.io", "version": "v1", "resource": "prefixedsomeresources"},
            "operation": "CREATE",
            "object": {
                "apiVersion": "prefixed.resources.group.io/v1",
                "kind": "PrefixedSomeResource",
                "metadata": {"name": "a", "labels": {"replacedlabelgroup.io/app": "vm"}}
            }
        }
    });

    let restored = rewrite(
        &rewriter,
        "/validate-prefixed-resources-group-io-v1-prefixedsomeresource",
        &review,
        Action::Restore,
    )
    .expect("restored");
    let request = &restored["request"];
    assert_eq!(
        request["kind"],
        json!({"group": "original.group.io", "version": "v1", "kind": "SomeResource"})
    );
    assert_eq!(
        request["resource"],
        json!({"group": "original.group.io", "version": "v1", "resource": "someresources"})
    );
    assert_eq!(
        request["object"],
        json!({
            "apiVersion": "original.group.io/v1",
            "kind": "SomeResource",
            "metadata": {"name": "a", "labels": {"labelgroup.io/app": "vm"}}
        })
    );
}

#[test]
fn test_api_resource_list() {
    let rewriter = rewriter();
    let discovery = json!({
        "kind": "APIResourceList",
        "apiVersion": "v1",
        "groupVersion": "prefixed.resources.group.io/v1",
        "resources": [
            {
                "name": "prefixedsomeresources",
                "singularName": "prefixedsomeresource",
                "namespaced": true,
                "kind": "PrefixedSomeResource",
                "verbs": ["get", "list"],
                "shortNames": ["psr"],
                "categories": ["prefixed"]
            },
            {
                "name": "prefixedsomeresources/status",
                "singularName": "",
                "namespaced": true,
                "kind": "PrefixedSomeResource",
                "verbs": ["get", "patch"]
            },
            {
                "name": "prefixedforeigns",
                "singularName": "prefixedforeign",
                "namespaced": true,
                "kind": "PrefixedForeign",
                "verbs": ["get"]
            }
        ]
    });

    let restored = rewrite(
        &rewriter,
        "/apis/original.group.io/v1",
        &discovery,
        Action::Restore,
    )
    .expect("restored");
    assert_eq!(restored["groupVersion"], json!("original.group.io/v1"));
    let resources = restored["resources"].as_array().expect("resources");
    assert_eq!(resources.len(), 2);
    assert_eq!(resources[0]["name"], json!("someresources"));
    assert_eq!(resources[0]["kind"], json!("SomeResource"));
    assert_eq!(resources[0]["shortNames"], json!(["sr"]));
    assert_eq!(resources[1]["name"], json!("someresources/status"));
}

#[test]
fn test_patch() {
    let rewriter = rewriter();
    let target = target(&rewriter, "/apis/apps/v1/namespaces/ns/deployments/d");
    let patch = json!([
        {"op": "add", "path": "/metadata/labels/labelgroup.io~1app", "value": "vm"},
        {"op": "replace", "path": "/spec/replicas", "value": 2}
    ]);
    let outcome = rewriter
        .rewrite_patch(&target, &serde_json::to_vec(&patch).expect("serialize"))
        .expect("patch");
    let body = match outcome {
        Outcome::Rewritten(body) => body,
        other => panic!("unexpected outcome {other:?}"),
    };
    let renamed: Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(
        renamed,
        json!([
            {"op": "add", "path": "/metadata/labels/replacedlabelgroup.io~1app", "value": "vm"},
            {"op": "replace", "path": "/spec/replicas", "value": 2}
        ])
    );
}

#[test]
fn test_passthrough() {
    let rewriter = rewriter();
    let target = target(&rewriter, "/apis/apiextensions.k8s.io/v1/customresourcedefinitions");
    let body = br#"{"kind":"CustomResourceDefinition","metadata":{"name":"nodots"}}"#;
    let outcome = rewriter.rewrite_json_payload_or_original(&target, body, Action::Rename);
    assert_eq!(outcome.body(body), Some(&body[..]));
}

#[test]
fn test_config_map_round_trip() {
    let rewriter = rewriter();
    let uri = "/api/v1/namespaces/ns/configmaps";
    let gate = target(&rewriter, uri);
    assert!(gate.should_rewrite_request());
    assert!(gate.should_rewrite_response());

    let original = json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {
            "name": "settings",
            "labels": {"labelgroup.io/app": "x"},
            "annotations": {"component.annogroup.io/hash": "abc"}
        },
        "data": {"labelgroup.io/app": "kept"}
    });

    let renamed = rewrite(&rewriter, uri, &original, Action::Rename).expect("renamed");
    assert_eq!(
        renamed["metadata"],
        json!({
            "name": "settings",
            "labels": {"replacedlabelgroup.io/app": "x"},
            "annotations": {"component.replacedannogroup.io/hash": "abc"}
        })
    );
    assert_eq!(renamed["data"], original["data"]);

    let restored = rewrite(&rewriter, &format!("{uri}/settings"), &renamed, Action::Restore).expect("restored");
    assert_eq!(restored, original);
}

#[test]
fn test_service_round_trip() {
    let rewriter = rewriter();
    let uri = "/api/v1/namespaces/ns/services/api";
    let gate = target(&rewriter, uri);
    assert!(gate.should_rewrite_request());
    assert!(gate.should_rewrite_response());

    let original = json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": {"name": "api", "labels": {"component.labelgroup.io/name": "api"}},
        "spec": {
            "selector": {"labelgroup.io/app": "vm"},
            "ports": [{"port": 443}]
        }
    });

    let renamed = rewrite(&rewriter, uri, &original, Action::Rename).expect("renamed");
    assert_eq!(renamed["spec"]["selector"], json!({"replacedlabelgroup.io/app": "vm"}));
    assert_eq!(
        renamed["metadata"]["labels"],
        json!({"component.replacedlabelgroup.io/name": "api"})
    );

    let restored = rewrite(&rewriter, uri, &renamed, Action::Restore).expect("restored");
    assert_eq!(restored, original);
}

#[test]
fn test_job_restore() {
    let rewriter = rewriter();
    let uri = "/apis/batch/v1/namespaces/ns/jobs/import";
    let renamed = json!({
        "apiVersion": "batch/v1",
        "kind": "Job",
        "metadata": {
            "name": "import",
            "labels": {"replacedlabelgroup.io": "renamedLabelValue"},
            "ownerReferences": [{
                "apiVersion": "prefixed.resources.group.io/v1",
                "kind": "PrefixedSomeResource",
                "name": "a",
                "uid": "2"
            }]
        },
        "spec": {
            "selector": {"matchLabels": {"replacedlabelgroup.io/job": "import"}},
            "template": {
                "metadata": {"labels": {"replacedlabelgroup.io/job": "import"}},
                "spec": {"restartPolicy": "Never", "containers": []}
            }
        }
    });

    let restored = rewrite(&rewriter, uri, &renamed, Action::Restore).expect("restored");
    assert_eq!(
        restored,
        json!({
            "apiVersion": "batch/v1",
            "kind": "Job",
            "metadata": {
                "name": "import",
                "labels": {"labelgroup.io": "labelValueToRename"},
                "ownerReferences": [{
                    "apiVersion": "original.group.io/v1",
                    "kind": "SomeResource",
                    "name": "a",
                    "uid": "2"
                }]
            },
            "spec": {
                "selector": {"matchLabels": {"labelgroup.io/job": "import"}},
                "template": {
                    "metadata": {"labels": {"labelgroup.io/job": "import"}},
                    "spec": {"restartPolicy": "Never", "containers": []}
                }
            }
        })
    );
}

#[test]
fn test_generic_list_restore() {
    let rewriter = rewriter();
    let list = json!({
        "apiVersion": "v1",
        "kind": "List",
        "metadata": {"resourceVersion": ""},
        "items": [
            {
                "apiVersion": "prefixed.resources.group.io/v1",
                "kind": "PrefixedSomeResource",
                "metadata": {"name": "a", "labels": {"replacedlabelgroup.io/app": "vm"}}
            },
            {
                "apiVersion": "v1",
                "kind": "ConfigMap",
                "metadata": {"name": "c", "annotations": {"replacedannogroup.io": "x"}}
            },
            {
                "apiVersion": "v1",
                "kind": "ConfigMap",
                "metadata": {"name": "hidden", "labels": {"excluded": "true"}}
            }
        ]
    });

    let restored = rewrite(&rewriter, "/api/v1/namespaces/ns/configmaps", &list, Action::Restore).expect("restored");
    assert_eq!(
        restored,
        json!({
            "apiVersion": "v1",
            "kind": "List",
            "metadata": {"resourceVersion": ""},
            "items": [
                {
                    "apiVersion": "original.group.io/v1",
                    "kind": "SomeResource",
                    "metadata": {"name": "a", "labels": {"labelgroup.io/app": "vm"}}
                },
                {
                    "apiVersion": "v1",
                    "kind": "ConfigMap",
                    "metadata": {"name": "c", "annotations": {"annogroup.io": "x"}}
                }
            ]
        })
    );
}

#[test]
fn test_untracked_crd_field_selector() {
    let rewriter = rewriter();
    let uri = "/apis/apiextensions.k8s.io/v1/customresourcedefinitions?fieldSelector=metadata.name%3Dvolumesnapshots.snapshot.storage.k8s.io&watch=true";
    let target = target(&rewriter, uri);
    assert!(target.is_watch());
    assert_eq!(target.request_uri(), uri);

    let tracked = self::target(
        &rewriter,
        "/apis/apiextensions.k8s.io/v1/customresourcedefinitions?fieldSelector=metadata.name%3Dotherresources.other.group.io",
    );
    assert_eq!(
        tracked.raw_query(),
        "fieldSelector=metadata.name%3Dprefixedotherresources.other.prefixed.resources.group.io"
    );
}
