use std::collections::BTreeMap;
use std::collections::HashMap;

use serde_json::json;
use serde_json::Value;
use tracing::debug;

use crate::config::ApiGroupRule;
use crate::config::ExcludeRule;
use crate::config::GroupRule;
use crate::config::ResourceRule;
use crate::config::RulesConfig;
use crate::config::WebhookRule;
use crate::group_index::group_of;
use crate::group_index::GroupIndex;
use crate::prefixed_name::PrefixedNameRewriter;
use crate::ConfigError;

/// Resource that a kind or list kind belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindRef<'a> {
    pub group: &'a str,
    pub resource: &'a str,
    pub is_list: bool,
}

#[derive(Debug, Clone)]
struct KindEntry {
    group: String,
    resource: String,
    is_list: bool,
}

/// Compiled rule set.
///
/// Built once by [`RewriteRules::compile`] and read only afterwards, so a single
/// instance can be shared by all request handlers.
#[derive(Debug, Clone)]
pub struct RewriteRules {
    pub(crate) kind_prefix: String,
    pub(crate) resource_type_prefix: String,
    pub(crate) short_name_prefix: String,
    pub(crate) categories: Vec<String>,
    rules: BTreeMap<String, ApiGroupRule>,
    webhooks: BTreeMap<String, WebhookRule>,
    webhook_paths: HashMap<String, String>,
    excludes: Vec<ExcludeRule>,
    pub(crate) groups: GroupIndex,
    kinds: HashMap<String, KindEntry>,
    plurals: HashMap<String, (String, String)>,
    labels: PrefixedNameRewriter,
    annotations: PrefixedNameRewriter,
    finalizers: PrefixedNameRewriter,
}

impl RewriteRules {
    pub fn compile(config: RulesConfig) -> Result<Self, ConfigError> {
        let groups = GroupIndex::build(config.rules.values())?;

        let mut kinds = HashMap::new();
        let mut plurals = HashMap::new();
        let mut tracked_kinds = vec![];
        for (group, group_rule) in &config.rules {
            for (resource, rule) in &group_rule.resource_rules {
                for (kind, is_list) in [(&rule.kind, false), (&rule.list_kind, true)] {
                    kinds.entry(kind.clone()).or_insert_with(|| KindEntry {
                        group: group.clone(),
                        resource: resource.clone(),
                        is_list,
                    });
                    tracked_kinds.push(kind.clone());
                }
                plurals
                    .entry(rule.plural.clone())
                    .or_insert_with(|| (group.clone(), resource.clone()));
            }
        }

        let mut excludes = config.excludes;
        // original kinds are never served back to clients
        if !tracked_kinds.is_empty() {
            excludes.push(ExcludeRule {
                kinds: tracked_kinds,
                ..Default::default()
            });
        }

        let webhook_paths = config
            .webhooks
            .iter()
            .map(|(renamed, rule)| (rule.path.clone(), renamed.clone()))
            .collect();

        debug!(
            groups = config.rules.len(),
            kinds = kinds.len(),
            webhooks = config.webhooks.len(),
            "compiled rewrite rules"
        );

        Ok(Self {
            labels: PrefixedNameRewriter::new(&config.labels),
            annotations: PrefixedNameRewriter::new(&config.annotations),
            finalizers: PrefixedNameRewriter::new(&config.finalizers),
            kind_prefix: config.kind_prefix,
            resource_type_prefix: config.resource_type_prefix,
            short_name_prefix: config.short_name_prefix,
            categories: config.categories,
            rules: config.rules,
            webhooks: config.webhooks,
            webhook_paths,
            excludes,
            groups,
            kinds,
            plurals,
        })
    }

    pub fn kind_prefix(&self) -> &str {
        &self.kind_prefix
    }

    pub fn resource_type_prefix(&self) -> &str {
        &self.resource_type_prefix
    }

    pub fn short_name_prefix(&self) -> &str {
        &self.short_name_prefix
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn labels(&self) -> &PrefixedNameRewriter {
        &self.labels
    }

    pub fn annotations(&self) -> &PrefixedNameRewriter {
        &self.annotations
    }

    pub fn finalizers(&self) -> &PrefixedNameRewriter {
        &self.finalizers
    }

    pub fn excludes(&self) -> &[ExcludeRule] {
        &self.excludes
    }

    pub fn groups(&self) -> &GroupIndex {
        &self.groups
    }

    /// group rules keyed by original group
    pub fn group_rules(&self) -> impl Iterator<Item = (&String, &ApiGroupRule)> {
        self.rules.iter()
    }

    /// true if group, optionally followed by `/version`, is a tracked original group
    pub fn has_group(&self, group: &str) -> bool {
        self.groups.is_original(group_of(group))
    }

    pub fn is_renamed_group(&self, group: &str) -> bool {
        self.groups.is_renamed(group_of(group))
    }

    pub fn group_rule(&self, group: &str) -> Option<&GroupRule> {
        self.rules.get(group_of(group)).map(|rule| &rule.group_rule)
    }

    pub fn resource_rules(&self, group: &str, resource: &str) -> Option<(&GroupRule, &ResourceRule)> {
        let group_rule = self.rules.get(group_of(group))?;
        let resource = resource.split('/').next().unwrap_or(resource);
        group_rule
            .resource_rules
            .get(resource)
            .map(|rule| (&group_rule.group_rule, rule))
    }

    /// rules for a kind or list kind within an api group or `group/version`
    pub fn kind_rules(&self, api_group_or_version: &str, kind: &str) -> Option<(&GroupRule, &ResourceRule)> {
        let group_rule = self.rules.get(group_of(api_group_or_version))?;
        group_rule
            .resource_rules
            .values()
            .find(|rule| rule.kind == kind || rule.list_kind == kind)
            .map(|rule| (&group_rule.group_rule, rule))
    }

    /// rules for a resource type in any group, subresource suffix is ignored
    pub fn group_resource_rules(&self, resource_type: &str) -> Option<(&GroupRule, &ResourceRule)> {
        let plural = resource_type.split('/').next().unwrap_or(resource_type);
        let (group, resource) = self.plurals.get(plural)?;
        self.resource_rules(group, resource)
    }

    pub fn group_resource_rules_by_kind(&self, kind: &str) -> Option<(&GroupRule, &ResourceRule)> {
        let entry = self.kinds.get(kind)?;
        self.resource_rules(&entry.group, &entry.resource)
    }

    pub fn resource_by_kind(&self, kind: &str) -> Option<KindRef<'_>> {
        self.kinds.get(kind).map(|entry| KindRef {
            group: &entry.group,
            resource: &entry.resource,
            is_list: entry.is_list,
        })
    }

    /// rule for a renamed webhook path
    pub fn webhook_rule(&self, path: &str) -> Option<&WebhookRule> {
        self.webhooks.get(path)
    }

    /// renamed path for an original webhook path
    pub fn renamed_webhook_path(&self, original_path: &str) -> Option<&str> {
        self.webhook_paths.get(original_path).map(String::as_str)
    }

    pub fn should_exclude(&self, obj: &Value, kind: &str) -> bool {
        self.excludes.iter().any(|rule| rule.matches(obj, kind))
    }

    /// synthetic `APIGroup` entries for every tracked group
    pub fn api_group_list(&self) -> Vec<Value> {
        self.rules
            .values()
            .map(|rule| rule.group_rule.to_api_group())
            .collect()
    }
}

impl GroupRule {
    /// discovery `APIGroup` entry declaring the original versions
    pub fn to_api_group(&self) -> Value {
        let versions: Vec<Value> = self
            .versions
            .iter()
            .map(|version| group_version(&self.group, version))
            .collect();
        json!({
            "name": self.group,
            "versions": versions,
            "preferredVersion": group_version(&self.group, &self.preferred_version),
        })
    }
}

fn group_version(group: &str, version: &str) -> Value {
    json!({
        "groupVersion": format!("{group}/{version}"),
        "version": version,
    })
}
