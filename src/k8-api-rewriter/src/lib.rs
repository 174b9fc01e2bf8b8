mod endpoint;
mod error;
pub mod kinds;
mod patch;
mod query;
mod rewriter;
mod target;

pub use self::endpoint::ApiEndpoint;
pub use self::error::RewriteError;
pub use self::patch::rename_metadata_patch;
pub use self::patch::rename_patch;
pub use self::query::rewrite_crd_field_selector;
pub use self::query::rewrite_label_selector_query;
pub use self::rewriter::Outcome;
pub use self::rewriter::RuleBasedRewriter;
pub use self::target::rewrite_api_endpoint;
pub use self::target::rewrite_query;
pub use self::target::TargetRequest;
pub use shared::new_shared;
pub use shared::SharedRewriter;

pub use k8_json_rewrite::Rewritten;
pub use k8_rewrite_rules::Action;

pub mod rules {
    pub use k8_rewrite_rules::*;
}

mod shared {

    use std::sync::Arc;

    use k8_rewrite_rules::RewriteRules;
    use k8_rewrite_rules::RulesConfig;

    use crate::RewriteError;
    use crate::RuleBasedRewriter;

    pub type SharedRewriter = Arc<RuleBasedRewriter>;

    /// compile a rule configuration into a rewriter shared across connections
    pub fn new_shared(config: RulesConfig) -> Result<SharedRewriter, RewriteError> {
        let rules = RewriteRules::compile(config)?;
        Ok(Arc::new(RuleBasedRewriter::new(rules)))
    }
}
