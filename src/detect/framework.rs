// SPDX-License-Identifier: PMPL-1.0-or-later

//! Framework matching against the knowledge base

use super::stats::DetectionStats;
use crate::knowledge::KnowledgeBase;
use crate::types::canonical_module;
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct FrameworkMatcher {
    knowledge: Arc<KnowledgeBase>,
    stats: Option<Arc<DetectionStats>>,
}

impl FrameworkMatcher {
    pub fn new(knowledge: Arc<KnowledgeBase>) -> Self {
        Self {
            knowledge,
            stats: None,
        }
    }

    /// Count every framework match in `stats`.
    pub fn with_stats(mut self, stats: Arc<DetectionStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Modules implied by the frameworks present in `discovered`.
    ///
    /// Output depends only on `discovered` and the knowledge base, so
    /// expanding the same set twice gives the same answer. Only the match
    /// counters move.
    pub fn expand(&self, discovered: &BTreeSet<String>) -> BTreeSet<String> {
        let mut implied = BTreeSet::new();

        for (name, config) in self.knowledge.matching(discovered) {
            if let Some(stats) = &self.stats {
                stats.record_framework_match(name);
            }
            implied.extend(
                config
                    .hidden_imports
                    .iter()
                    .filter_map(|module| canonical_module(module)),
            );
            tracing::debug!(framework = %name, "framework indicator present");
        }

        implied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_expand_is_idempotent() {
        let matcher = FrameworkMatcher::new(Arc::new(KnowledgeBase::builtin()));
        let discovered = set(&["flask", "os"]);
        let first = matcher.expand(&discovered);
        let second = matcher.expand(&discovered);
        assert_eq!(first, second);
        assert!(first.contains("werkzeug"));
        assert!(first.contains("jinja2"));
    }

    #[test]
    fn test_no_indicator_no_expansion() {
        let matcher = FrameworkMatcher::new(Arc::new(KnowledgeBase::builtin()));
        assert!(matcher.expand(&set(&["os", "sys"])).is_empty());
    }

    #[test]
    fn test_matches_are_counted() {
        let stats = Arc::new(DetectionStats::new());
        let matcher =
            FrameworkMatcher::new(Arc::new(KnowledgeBase::builtin())).with_stats(stats.clone());
        matcher.expand(&set(&["numpy"]));
        matcher.expand(&set(&["numpy", "requests"]));
        let counts = stats.snapshot().framework_matches;
        assert_eq!(counts["numpy"], 2);
        assert_eq!(counts["requests"], 1);
    }
}
