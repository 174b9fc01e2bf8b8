use serde_json::Value;

use k8_json_rewrite::rewrite_array;
use k8_json_rewrite::transform_string;
use k8_json_rewrite::Rewritten;
use k8_rewrite_rules::Action;
use k8_rewrite_rules::RewriteRules;

use crate::kinds::metadata::rewrite_label_selector;
use crate::kinds::rbac::rewrite_policy_rule;
use crate::RewriteError;

/// MutatingWebhookConfiguration and ValidatingWebhookConfiguration
pub fn rewrite_webhook_configuration(
    rules: &RewriteRules,
    obj: &mut Value,
    action: Action,
) -> Result<Rewritten, RewriteError> {
    rewrite_webhooks(rules, obj, "webhooks", action)?;
    Ok(Rewritten::Keep)
}

/// webhook entries of the array at `path`
pub fn rewrite_webhooks(
    rules: &RewriteRules,
    obj: &mut Value,
    path: &str,
    action: Action,
) -> Result<(), RewriteError> {
    rewrite_array(obj, path, |webhook| {
        rewrite_array(webhook, "rules", |rule| {
            rewrite_policy_rule(rules, rule, action);
            Ok::<_, RewriteError>(Rewritten::Keep)
        })?;
        rewrite_label_selector(rules, webhook, "objectSelector", action);
        rewrite_service_path(rules, webhook, action);
        Ok(Rewritten::Keep)
    })
}

fn rewrite_service_path(rules: &RewriteRules, webhook: &mut Value, action: Action) {
    transform_string(webhook, "clientConfig.service.path", |path| match action {
        Action::Rename => rules
            .renamed_webhook_path(path)
            .unwrap_or(path)
            .to_owned(),
        Action::Restore => rules
            .webhook_rule(path)
            .map(|rule| rule.path.as_str())
            .unwrap_or(path)
            .to_owned(),
    });
}
