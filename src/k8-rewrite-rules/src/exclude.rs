use serde_json::Value;

use crate::config::ExcludeRule;

impl ExcludeRule {
    /// True if `obj` of `kind` meets every non-empty condition of the rule.
    pub fn matches(&self, obj: &Value, kind: &str) -> bool {
        if !self.kinds.is_empty() && !self.kinds.iter().any(|k| k == kind) {
            return false;
        }

        if !self.match_names.is_empty() {
            let name = obj
                .pointer("/metadata/name")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if !self.match_names.iter().any(|n| n == name) {
                return false;
            }
        }

        if !self.match_labels.is_empty() {
            let labels = match obj.pointer("/metadata/labels").and_then(Value::as_object) {
                Some(labels) => labels,
                None => return false,
            };
            let all_present = self.match_labels.iter().all(|(key, expected)| {
                labels.get(key).and_then(Value::as_str) == Some(expected.as_str())
            });
            if !all_present {
                return false;
            }
        }

        true
    }
}
