use std::sync::Arc;

use http::Uri;
use serde_json::Value;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use k8_json_rewrite::parse_payload;
use k8_json_rewrite::to_payload;
use k8_json_rewrite::Rewritten;
use k8_rewrite_rules::Action;
use k8_rewrite_rules::RewriteRules;

use crate::endpoint::ApiEndpoint;
use crate::kinds::custom_resource::rewrite_api_version_and_kind;
use crate::kinds::rewrite_payload;
use crate::patch::rename_patch;
use crate::target::rewrite_api_endpoint;
use crate::target::TargetRequest;
use crate::RewriteError;

/// Result of rewriting a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// nothing to change, the original body can be sent as is
    Unchanged,
    Rewritten(Vec<u8>),
    /// the whole object matched an exclude rule and must not be served
    Excluded,
}

impl Outcome {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Outcome::Unchanged)
    }

    pub fn is_rewritten(&self) -> bool {
        matches!(self, Outcome::Rewritten(_))
    }

    pub fn is_excluded(&self) -> bool {
        matches!(self, Outcome::Excluded)
    }

    /// Body to send: the rewritten bytes, `original` when unchanged, none when excluded.
    pub fn body<'a>(&'a self, original: &'a [u8]) -> Option<&'a [u8]> {
        match self {
            Outcome::Unchanged => Some(original),
            Outcome::Rewritten(body) => Some(body),
            Outcome::Excluded => None,
        }
    }
}

/// Rewrites requests and responses with a compiled rule set.
///
/// Cloning is cheap, the rules are shared.
#[derive(Debug, Clone)]
pub struct RuleBasedRewriter {
    rules: Arc<RewriteRules>,
}

impl RuleBasedRewriter {
    pub fn new(rules: RewriteRules) -> Self {
        Self::from_shared(Arc::new(rules))
    }

    pub fn from_shared(rules: Arc<RewriteRules>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RewriteRules {
        &self.rules
    }

    pub fn target_request(&self, uri: &Uri) -> TargetRequest {
        TargetRequest::new(&self.rules, uri)
    }

    pub fn rewrite_api_endpoint(&self, endpoint: &ApiEndpoint) -> Option<ApiEndpoint> {
        rewrite_api_endpoint(&self.rules, endpoint)
    }

    /// Rewrite a JSON body according to its `kind`.
    pub fn rewrite_json_payload(
        &self,
        target: &TargetRequest,
        body: &[u8],
        action: Action,
    ) -> Result<Outcome, RewriteError> {
        let mut obj = parse_payload(body)?;
        let original = obj.clone();

        match rewrite_payload(&self.rules, &mut obj, action)? {
            Rewritten::Keep => {}
            Rewritten::Replace(value) => obj = value,
            Rewritten::Drop => {
                debug!(resource = %target.resource_for_log(), %action, "payload excluded");
                return Ok(Outcome::Excluded);
            }
        }
        self.outcome(target, &original, &obj)
    }

    /// Like [`Self::rewrite_json_payload`] but falls back to the original
    /// body when the payload can not be rewritten.
    pub fn rewrite_json_payload_or_original(&self, target: &TargetRequest, body: &[u8], action: Action) -> Outcome {
        match self.rewrite_json_payload(target, body, action) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(
                    resource = %target.resource_for_log(),
                    %action,
                    %err,
                    "rewrite failed, passing original payload"
                );
                Outcome::Unchanged
            }
        }
    }

    /// Rename a PATCH body sent to the resource addressed by `target`.
    pub fn rewrite_patch(&self, target: &TargetRequest, body: &[u8]) -> Result<Outcome, RewriteError> {
        let mut patch = parse_payload(body)?;
        let original = patch.clone();
        rename_patch(&self.rules, target, &mut patch)?;
        self.outcome(target, &original, &patch)
    }

    /// Restore `apiVersion` and `kind` of a watch bookmark object.
    pub fn restore_bookmark(&self, body: &[u8]) -> Result<Outcome, RewriteError> {
        let mut obj = parse_payload(body)?;
        if !rewrite_api_version_and_kind(&self.rules, &mut obj, Action::Restore) {
            return Ok(Outcome::Unchanged);
        }
        Ok(Outcome::Rewritten(to_payload(&obj)?))
    }

    /// Rewrite an already parsed payload in place.
    pub fn rewrite_value(&self, obj: &mut Value, action: Action) -> Result<Rewritten, RewriteError> {
        rewrite_payload(&self.rules, obj, action)
    }

    fn outcome(&self, target: &TargetRequest, original: &Value, obj: &Value) -> Result<Outcome, RewriteError> {
        if obj == original {
            trace!(resource = %target.resource_for_log(), "payload unchanged");
            return Ok(Outcome::Unchanged);
        }
        Ok(Outcome::Rewritten(to_payload(obj)?))
    }
}
