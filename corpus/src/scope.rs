//! Tenant/agent scoping filters.
//!
//! The retrieval core never interprets these fields; it forwards them to the
//! store, which applies them however its schema demands. The only semantic
//! the pipeline relies on is the `'default'` agent fallback: rows tagged
//! with the default agent are visible to every agent.

use serde::{Deserialize, Serialize};

/// Agent id that every scope can see.
pub const DEFAULT_AGENT: &str = "default";

/// Opaque scoping filter forwarded with every store query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeFilter {
    /// Agent the query runs on behalf of, if any.
    pub agent_id: Option<String>,

    /// Corpus namespace, if the deployment partitions by one.
    pub namespace: Option<String>,
}

impl ScopeFilter {
    /// Unscoped filter: the whole corpus is visible.
    pub fn all() -> Self {
        Self::default()
    }

    /// Scope to one agent.
    pub fn for_agent(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: Some(agent_id.into()),
            namespace: None,
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Whether a row with the given tags is visible under this scope.
    ///
    /// Stores backed by SQL express the same rule in their WHERE clause;
    /// the in-memory store calls this directly.
    pub fn admits(&self, agent_id: Option<&str>, namespace: Option<&str>) -> bool {
        if let Some(want) = &self.agent_id {
            match agent_id {
                Some(have) if have == want || have == DEFAULT_AGENT => {}
                None => {}
                Some(_) => return false,
            }
        }
        if let Some(want) = &self.namespace {
            match namespace {
                Some(have) if have == want => {}
                None => {}
                Some(_) => return false,
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unscoped_admits_everything() {
        let scope = ScopeFilter::all();
        assert!(scope.admits(Some("a"), Some("ns")));
        assert!(scope.admits(None, None));
    }

    #[test]
    fn agent_scope_admits_own_and_default_rows() {
        let scope = ScopeFilter::for_agent("support");
        assert!(scope.admits(Some("support"), None));
        assert!(scope.admits(Some(DEFAULT_AGENT), None));
        assert!(scope.admits(None, None));
        assert!(!scope.admits(Some("sales"), None));
    }

    #[test]
    fn namespace_must_match_when_both_present() {
        let scope = ScopeFilter::for_agent("support").with_namespace("global");
        assert!(scope.admits(Some("support"), Some("global")));
        assert!(!scope.admits(Some("support"), Some("private")));
    }
}
