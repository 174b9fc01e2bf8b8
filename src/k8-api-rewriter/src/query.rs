use once_cell::sync::Lazy;
use regex::NoExpand;
use regex::Regex;
use tracing::debug;
use tracing::warn;

use k8_rewrite_rules::Action;
use k8_rewrite_rules::PrefixedNameRewriter;
use k8_rewrite_rules::RewriteRules;

const LABEL_SELECTOR: &str = "labelSelector";

static CRD_NAME_SELECTOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"metadata\.name%3D([a-z0-9-]+)((?:\.[a-z0-9-]+)*)").expect("valid selector pattern")
});

/// Rewrite `fieldSelector=metadata.name%3DPLURAL.GROUP` of a CRD list or watch
/// request to the renamed CRD name. Untracked names are left alone.
pub fn rewrite_crd_field_selector(rules: &RewriteRules, raw_query: &str) -> Option<String> {
    let captures = CRD_NAME_SELECTOR.captures(raw_query)?;
    let resource = captures.get(1)?.as_str();
    let group = captures.get(2)?.as_str().trim_start_matches('.');

    let (group_rule, rule) = rules.resource_rules(group, resource)?;
    let renamed = format!(
        "metadata.name%3D{}.{}",
        rules.rename_resource(&rule.plural),
        group_rule.renamed
    );
    debug!(resource, group, %renamed, "rewrite crd field selector");
    Some(
        CRD_NAME_SELECTOR
            .replace(raw_query, NoExpand(&renamed))
            .into_owned(),
    )
}

/// Rewrite label names in the `labelSelector` query parameter.
///
/// The query is only re-encoded, with sorted keys, when the selector changed.
pub fn rewrite_label_selector_query(
    labels: &PrefixedNameRewriter,
    raw_query: &str,
    action: Action,
) -> Option<String> {
    if !raw_query.contains(LABEL_SELECTOR) {
        return None;
    }

    let mut pairs: Vec<(String, String)> = match serde_urlencoded::from_str(raw_query) {
        Ok(pairs) => pairs,
        Err(err) => {
            warn!(%err, "unable to decode query");
            return None;
        }
    };

    let mut changed = false;
    for (key, value) in pairs.iter_mut() {
        if key != LABEL_SELECTOR {
            continue;
        }
        let selector = LabelSelector::parse(value);
        let rewritten = selector.rewrite(labels, action);
        if rewritten != selector {
            *value = rewritten.to_string();
            changed = true;
        }
    }
    if !changed {
        return None;
    }

    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    match serde_urlencoded::to_string(&pairs) {
        Ok(query) => Some(query),
        Err(err) => {
            warn!(%err, "unable to encode query");
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operator {
    Exists,
    DoesNotExist,
    Equals,
    DoubleEquals,
    NotEquals,
    In,
    NotIn,
    GreaterThan,
    LessThan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Requirement {
    key: String,
    operator: Operator,
    values: Vec<String>,
}

/// Label selector in its string form, e.g. `app=web,tier in (a,b),!legacy`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LabelSelector(Vec<Requirement>);

impl LabelSelector {
    fn parse(selector: &str) -> Self {
        let requirements = split_requirements(selector)
            .into_iter()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(Requirement::parse)
            .collect();
        Self(requirements)
    }

    fn rewrite(&self, labels: &PrefixedNameRewriter, action: Action) -> Self {
        let mut requirements: Vec<Requirement> = self
            .0
            .iter()
            .map(|requirement| requirement.rewrite(labels, action))
            .collect();
        if requirements == self.0 {
            return self.clone();
        }
        requirements.sort_by(|a, b| a.key.cmp(&b.key));
        Self(requirements)
    }
}

impl std::fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(Requirement::to_string).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// split on commas outside of value sets
fn split_requirements(selector: &str) -> Vec<&str> {
    let mut parts = vec![];
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, ch) in selector.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&selector[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&selector[start..]);
    parts
}

impl Requirement {
    fn parse(text: &str) -> Self {
        for (keyword, operator) in [(" notin ", Operator::NotIn), (" in ", Operator::In)] {
            if let Some((key, set)) = text.split_once(keyword) {
                let values = set
                    .trim()
                    .trim_start_matches('(')
                    .trim_end_matches(')')
                    .split(',')
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(str::to_owned)
                    .collect();
                return Self::new(key, operator, values);
            }
        }

        if let Some(key) = text.strip_prefix('!') {
            if !key.contains('=') {
                return Self::new(key, Operator::DoesNotExist, vec![]);
            }
        }

        for (symbol, operator) in [
            ("!=", Operator::NotEquals),
            ("==", Operator::DoubleEquals),
            ("=", Operator::Equals),
            (">", Operator::GreaterThan),
            ("<", Operator::LessThan),
        ] {
            if let Some((key, value)) = text.split_once(symbol) {
                return Self::new(key, operator, vec![value.trim().to_owned()]);
            }
        }

        Self::new(text, Operator::Exists, vec![])
    }

    fn new(key: &str, operator: Operator, values: Vec<String>) -> Self {
        Self {
            key: key.trim().to_owned(),
            operator,
            values,
        }
    }

    fn rewrite(&self, labels: &PrefixedNameRewriter, action: Action) -> Self {
        let (key, mut values) = match self.operator {
            Operator::Equals
            | Operator::DoubleEquals
            | Operator::NotEquals
            | Operator::In
            | Operator::NotIn => labels.rewrite_name_values(&self.key, &self.values, action),
            _ => (labels.rewrite(&self.key, action), self.values.clone()),
        };
        if matches!(self.operator, Operator::In | Operator::NotIn) {
            values.sort();
        }
        Self {
            key,
            operator: self.operator.clone(),
            values,
        }
    }
}

impl std::fmt::Display for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = self.values.first().map(String::as_str).unwrap_or_default();
        match self.operator {
            Operator::Exists => write!(f, "{}", self.key),
            Operator::DoesNotExist => write!(f, "!{}", self.key),
            Operator::Equals => write!(f, "{}={}", self.key, value),
            Operator::DoubleEquals => write!(f, "{}=={}", self.key, value),
            Operator::NotEquals => write!(f, "{}!={}", self.key, value),
            Operator::GreaterThan => write!(f, "{}>{}", self.key, value),
            Operator::LessThan => write!(f, "{}<{}", self.key, value),
            Operator::In => write!(f, "{} in ({})", self.key, self.values.join(",")),
            Operator::NotIn => write!(f, "{} notin ({})", self.key, self.values.join(",")),
        }
    }
}
