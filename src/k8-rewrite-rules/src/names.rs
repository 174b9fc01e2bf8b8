//! Rename and restore of API versions, kinds, resource types and short names.
//!
//! Restore only trims a prefix, so callers must first check that the value
//! belongs to a tracked resource.

use crate::config::ResourceRule;
use crate::RewriteRules;

fn trim_prefix(value: &str, prefix: &str) -> String {
    value.strip_prefix(prefix).unwrap_or(value).to_owned()
}

impl RewriteRules {
    pub fn rename_resource(&self, resource: &str) -> String {
        format!("{}{}", self.resource_type_prefix, resource)
    }

    pub fn restore_resource(&self, resource: &str) -> String {
        trim_prefix(resource, &self.resource_type_prefix)
    }

    pub fn rename_kind(&self, kind: &str) -> String {
        format!("{}{}", self.kind_prefix, kind)
    }

    pub fn restore_kind(&self, kind: &str) -> String {
        trim_prefix(kind, &self.kind_prefix)
    }

    pub fn rename_short_name(&self, short_name: &str) -> String {
        format!("{}{}", self.short_name_prefix, short_name)
    }

    pub fn restore_short_name(&self, short_name: &str) -> String {
        trim_prefix(short_name, &self.short_name_prefix)
    }

    pub fn rename_short_names(&self, short_names: &[String]) -> Vec<String> {
        short_names
            .iter()
            .map(|name| self.rename_short_name(name))
            .collect()
    }

    pub fn restore_short_names(&self, short_names: &[String]) -> Vec<String> {
        short_names
            .iter()
            .map(|name| self.restore_short_name(name))
            .collect()
    }

    pub fn rename_group(&self, group: &str) -> String {
        self.groups.rename(group).to_owned()
    }

    pub fn restore_group(&self, group: &str) -> String {
        self.groups.restore(group).to_owned()
    }

    /// Replace the group of `group[/version]`, the version is kept as is.
    pub fn rename_api_version(&self, api_version: &str) -> String {
        match api_version.split_once('/') {
            Some((group, version)) => format!("{}/{}", self.groups.rename(group), version),
            None => self.groups.rename(api_version).to_owned(),
        }
    }

    pub fn restore_api_version(&self, api_version: &str) -> String {
        match api_version.split_once('/') {
            Some((group, version)) => format!("{}/{}", self.groups.restore(group), version),
            None => self.groups.restore(api_version).to_owned(),
        }
    }

    /// Renamed resources all share the rule set's categories.
    pub fn rename_categories(&self, categories: &[String]) -> Vec<String> {
        if categories.is_empty() {
            return Vec::new();
        }
        self.categories.clone()
    }

    /// Categories are restored from the rule, not from the renamed value.
    pub fn restore_categories(&self, rule: &ResourceRule) -> Vec<String> {
        rule.categories.clone()
    }
}
