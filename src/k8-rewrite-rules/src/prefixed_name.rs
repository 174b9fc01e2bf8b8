use std::collections::HashMap;

use serde_json::Map;
use serde_json::Value;

use crate::config::MetadataReplace;
use crate::Action;

/// Marker for an original name met during Restore. It hides the name from
/// clients but keeps it in place for a later update.
pub const PRESERVED_PREFIX: &str = "preserved-original-";

#[derive(Debug, Default, Clone)]
struct NameIndex {
    names: HashMap<String, String>,
    values: HashMap<String, HashMap<String, (String, String)>>,
    prefixes: HashMap<String, String>,
}

impl NameIndex {
    fn translate(&self, name: &str, value: &str) -> Option<(String, String)> {
        if !value.is_empty() {
            if let Some((n, v)) = self.values.get(name).and_then(|values| values.get(value)) {
                return Some((n.clone(), v.clone()));
            }
        }

        if let Some(n) = self.names.get(name) {
            return Some((n.clone(), value.to_owned()));
        }

        // bare names never match a prefix
        let (prefix, remainder) = name.split_once('/')?;
        self.prefixes
            .get(prefix)
            .map(|p| (format!("{p}/{remainder}"), value.to_owned()))
    }
}

/// Renames label, annotation and finalizer names.
///
/// Lookup order is name with value, exact name, then the prefix before the first `/`.
#[derive(Debug, Default, Clone)]
pub struct PrefixedNameRewriter {
    renames: NameIndex,
    restores: NameIndex,
}

impl PrefixedNameRewriter {
    pub fn new(replace: &MetadataReplace) -> Self {
        let mut renames = NameIndex::default();
        let mut restores = NameIndex::default();

        for rule in &replace.names {
            match rule.values() {
                Some((orig_value, renamed_value)) => {
                    renames.values.entry(rule.original.clone()).or_default().insert(
                        orig_value.to_owned(),
                        (rule.renamed.clone(), renamed_value.to_owned()),
                    );
                    restores.values.entry(rule.renamed.clone()).or_default().insert(
                        renamed_value.to_owned(),
                        (rule.original.clone(), orig_value.to_owned()),
                    );
                }
                None => {
                    renames
                        .names
                        .insert(rule.original.clone(), rule.renamed.clone());
                    restores
                        .names
                        .insert(rule.renamed.clone(), rule.original.clone());
                }
            }
        }

        for rule in &replace.prefixes {
            renames
                .prefixes
                .insert(rule.original.clone(), rule.renamed.clone());
            restores
                .prefixes
                .insert(rule.renamed.clone(), rule.original.clone());
        }

        Self { renames, restores }
    }

    pub fn rewrite(&self, name: &str, action: Action) -> String {
        self.rewrite_name_value(name, "", action).0
    }

    pub fn rewrite_name_value(&self, name: &str, value: &str, action: Action) -> (String, String) {
        match action {
            Action::Rename => self.rename(name, value),
            Action::Restore => self.restore(name, value),
        }
    }

    /// Rewrite a selector expression. The key changes according to the first
    /// value that matched a rule, values are rewritten one by one.
    pub fn rewrite_name_values(
        &self,
        name: &str,
        values: &[String],
        action: Action,
    ) -> (String, Vec<String>) {
        if values.is_empty() {
            return (self.rewrite(name, action), Vec::new());
        }

        let mut new_name = name.to_owned();
        let mut new_values = Vec::with_capacity(values.len());
        for value in values {
            let (n, v) = self.rewrite_name_value(name, value, action);
            if n != name && new_name == name {
                new_name = n;
            }
            new_values.push(v);
        }
        (new_name, new_values)
    }

    /// Rekey a map such as `metadata.labels`. Non string values stay as they are.
    pub fn rewrite_map(&self, map: &Map<String, Value>, action: Action) -> Map<String, Value> {
        let mut result = Map::new();
        for (name, value) in map {
            match value.as_str() {
                Some(text) => {
                    let (n, v) = self.rewrite_name_value(name, text, action);
                    result.insert(n, Value::String(v));
                }
                None => {
                    result.insert(self.rewrite(name, action), value.clone());
                }
            }
        }
        result
    }

    pub fn rewrite_slice(&self, names: &[String], action: Action) -> Vec<String> {
        names.iter().map(|name| self.rewrite(name, action)).collect()
    }

    /// true if the name is tracked in its original form
    pub fn is_original(&self, name: &str, value: &str) -> bool {
        self.renames.translate(name, value).is_some()
    }

    fn rename(&self, name: &str, value: &str) -> (String, String) {
        if let Some(original) = name.strip_prefix(PRESERVED_PREFIX) {
            return (original.to_owned(), value.to_owned());
        }
        self.renames
            .translate(name, value)
            .unwrap_or_else(|| (name.to_owned(), value.to_owned()))
    }

    fn restore(&self, name: &str, value: &str) -> (String, String) {
        if self.is_original(name, value) {
            return (format!("{PRESERVED_PREFIX}{name}"), value.to_owned());
        }
        self.restores
            .translate(name, value)
            .unwrap_or_else(|| (name.to_owned(), value.to_owned()))
    }
}
