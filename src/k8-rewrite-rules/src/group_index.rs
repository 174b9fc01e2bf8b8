use std::collections::HashMap;

use crate::config::ApiGroupRule;
use crate::ConfigError;

/// Two way map between original and renamed API groups.
#[derive(Debug, Default, Clone)]
pub struct GroupIndex {
    renames: HashMap<String, String>,
    restores: HashMap<String, String>,
}

impl GroupIndex {
    pub(crate) fn build<'a, I>(rules: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = &'a ApiGroupRule>,
    {
        let mut index = Self::default();
        for rule in rules {
            let group = &rule.group_rule;
            if index.restores.contains_key(&group.renamed) {
                return Err(ConfigError::DuplicateRenamedGroup(group.renamed.clone()));
            }
            index
                .renames
                .insert(group.group.clone(), group.renamed.clone());
            index
                .restores
                .insert(group.renamed.clone(), group.group.clone());
        }
        Ok(index)
    }

    pub fn is_original(&self, group: &str) -> bool {
        self.renames.contains_key(group)
    }

    pub fn is_renamed(&self, group: &str) -> bool {
        self.restores.contains_key(group)
    }

    /// renamed identity of group, or the group itself when not tracked
    pub fn rename<'a>(&'a self, group: &'a str) -> &'a str {
        self.renames.get(group).map(String::as_str).unwrap_or(group)
    }

    pub fn restore<'a>(&'a self, group: &'a str) -> &'a str {
        self.restores.get(group).map(String::as_str).unwrap_or(group)
    }
}

/// group part of `group/version`, or the whole string
pub fn group_of(api_version: &str) -> &str {
    api_version
        .split_once('/')
        .map(|(group, _)| group)
        .unwrap_or(api_version)
}
