// SPDX-License-Identifier: PMPL-1.0-or-later

//! Static knowledge consumed by the detector
//!
//! Two read-only data sets live here: the framework knowledge base
//! (framework name -> packaging configuration) and the dependency tables
//! (conflicts, known dependencies, version policy). Both ship with
//! built-in contents and can be swapped for a JSON/YAML document.

mod frameworks;
mod tables;

pub use tables::{DependencyTables, KnownConflict};

use crate::config::load_document;
use crate::types::{canonical_module, extend_unique, FrameworkConfig};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub frameworks: BTreeMap<String, FrameworkConfig>,
}

impl KnowledgeBase {
    pub fn builtin() -> Self {
        Self {
            frameworks: frameworks::builtin_frameworks(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut kb: Self = load_document(path, "framework knowledge base")?;
        kb.canonicalize_indicators();
        Ok(kb)
    }

    /// Detected sets only hold top-level names, so dotted indicators are
    /// reduced to their first segment and non-identifiers are dropped.
    fn canonicalize_indicators(&mut self) {
        for config in self.frameworks.values_mut() {
            let mut indicators = Vec::with_capacity(config.indicators.len());
            extend_unique(
                &mut indicators,
                config
                    .indicators
                    .iter()
                    .filter_map(|ind| canonical_module(ind)),
            );
            config.indicators = indicators;
        }
    }

    /// Load from `path` when given, otherwise use the built-in contents.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn get(&self, framework: &str) -> Option<&FrameworkConfig> {
        self.frameworks.get(framework)
    }

    /// Frameworks with at least one indicator present in `modules`, in name order.
    pub fn matching<'a>(
        &'a self,
        modules: &'a BTreeSet<String>,
    ) -> impl Iterator<Item = (&'a String, &'a FrameworkConfig)> + 'a {
        self.frameworks
            .iter()
            .filter(move |(_, config)| config.is_indicated_by(modules))
    }

    pub fn len(&self) -> usize {
        self.frameworks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frameworks.is_empty()
    }
}

pub(crate) fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
