use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::ConfigError;

/// Raw rule set as written in a rules file.
/// Compile it with [`crate::RewriteRules::compile`] before use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesConfig {
    #[serde(default)]
    pub kind_prefix: String,
    #[serde(default)]
    pub resource_type_prefix: String,
    #[serde(default)]
    pub short_name_prefix: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub rules: BTreeMap<String, ApiGroupRule>,
    #[serde(default)]
    pub webhooks: BTreeMap<String, WebhookRule>,
    #[serde(default)]
    pub labels: MetadataReplace,
    #[serde(default)]
    pub annotations: MetadataReplace,
    #[serde(default)]
    pub finalizers: MetadataReplace,
    #[serde(default)]
    pub excludes: Vec<ExcludeRule>,
}

impl RulesConfig {
    pub fn from_file<T: AsRef<Path>>(path: T) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading rewrite rules");
        let file = File::open(path)?;
        let config = serde_yaml::from_reader(BufReader::new(file))?;
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGroupRule {
    pub group_rule: GroupRule,
    #[serde(default)]
    pub resource_rules: BTreeMap<String, ResourceRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRule {
    pub group: String,
    #[serde(default)]
    pub versions: Vec<String>,
    #[serde(default)]
    pub preferred_version: String,
    /// identity the group is served under by the real API server
    pub renamed: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRule {
    pub kind: String,
    pub list_kind: String,
    pub plural: String,
    pub singular: String,
    #[serde(default)]
    pub short_names: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub versions: Vec<String>,
    #[serde(default)]
    pub preferred_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRule {
    pub path: String,
    pub group: String,
    pub resource: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataReplace {
    #[serde(default)]
    pub prefixes: Vec<MetadataReplaceRule>,
    #[serde(default)]
    pub names: Vec<MetadataReplaceRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataReplaceRule {
    pub original: String,
    pub renamed: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renamed_value: Option<String>,
}

impl MetadataReplaceRule {
    pub fn new(original: impl Into<String>, renamed: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            renamed: renamed.into(),
            ..Default::default()
        }
    }

    pub fn with_values(mut self, original: impl Into<String>, renamed: impl Into<String>) -> Self {
        self.original_value = Some(original.into());
        self.renamed_value = Some(renamed.into());
        self
    }

    /// value pair, only when both sides are set
    pub fn values(&self) -> Option<(&str, &str)> {
        match (self.original_value.as_deref(), self.renamed_value.as_deref()) {
            (Some(orig), Some(renamed)) if !orig.is_empty() && !renamed.is_empty() => {
                Some((orig, renamed))
            }
            _ => None,
        }
    }
}

/// Objects matching every non-empty condition are hidden from restored responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludeRule {
    #[serde(default)]
    pub kinds: Vec<String>,
    #[serde(default)]
    pub match_names: Vec<String>,
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
}
