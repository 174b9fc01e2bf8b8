mod config;
mod error;
mod exclude;
mod group_index;
mod names;
mod prefixed_name;
mod rules;

use std::fmt;

pub use config::*;
pub use error::ConfigError;
pub use group_index::group_of;
pub use group_index::GroupIndex;
pub use prefixed_name::PrefixedNameRewriter;
pub use prefixed_name::PRESERVED_PREFIX;
pub use rules::KindRef;
pub use rules::RewriteRules;

/// Direction of a rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// original names to renamed, applied to client requests
    Rename,
    /// renamed names back to original, applied to server responses
    Restore,
}

impl Action {
    pub fn is_rename(&self) -> bool {
        matches!(self, Action::Rename)
    }

    pub fn is_restore(&self) -> bool {
        matches!(self, Action::Restore)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Rename => write!(f, "rename"),
            Action::Restore => write!(f, "restore"),
        }
    }
}
