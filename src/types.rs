// SPDX-License-Identifier: PMPL-1.0-or-later

//! Core type definitions for import-hunter
//!
//! Module names are always stored in their canonical top-level form:
//! `matplotlib.pyplot` is recorded as `matplotlib`. Packaging directives
//! (hidden imports, collect-all entries) keep their full dotted path
//! because the packager needs it verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

/// Reduce a dotted module path to its first segment.
pub fn top_level(module: &str) -> &str {
    module.split('.').next().unwrap_or("").trim()
}

/// True when `name` is a valid Python identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_alphabetic() => {
            chars.all(|c| c == '_' || c.is_alphanumeric())
        }
        _ => false,
    }
}

/// Canonicalize a dotted path into a module name, rejecting anything that
/// is not an identifier once reduced.
pub fn canonical_module(module: &str) -> Option<String> {
    let head = top_level(module);
    if is_identifier(head) {
        Some(head.to_string())
    } else {
        None
    }
}

/// Append `items` to `target`, skipping entries already present.
/// First occurrence wins, so the result keeps a stable order.
pub fn extend_unique<I, S>(target: &mut Vec<String>, items: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for item in items {
        let item = item.as_ref();
        if !target.iter().any(|existing| existing == item) {
            target.push(item.to_string());
        }
    }
}

/// Packaging configuration for one framework, supplied by the knowledge base.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub indicators: Vec<String>,
    #[serde(default)]
    pub hidden_imports: Vec<String>,
    #[serde(default)]
    pub collect_all: Vec<String>,
    #[serde(default)]
    pub collect_data: Vec<String>,
    #[serde(default)]
    pub collect_binaries: Vec<String>,
    #[serde(default)]
    pub data_files: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl FrameworkConfig {
    /// Does any indicator of this framework appear in `modules`?
    pub fn is_indicated_by(&self, modules: &BTreeSet<String>) -> bool {
        self.indicators.iter().any(|ind| modules.contains(ind))
    }
}

/// Outcome of a single detection run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub source_path: PathBuf,
    pub detected_modules: BTreeSet<String>,
    pub missing_modules: BTreeSet<String>,
    pub conflicted_modules: BTreeSet<String>,
    pub hidden_imports: Vec<String>,
    pub collect_all: Vec<String>,
    pub collect_data: Vec<String>,
    pub collect_binaries: Vec<String>,
    pub data_files: Vec<String>,
    pub framework_configs: BTreeMap<String, FrameworkConfig>,
    pub recommendations: Vec<String>,
    /// Local failures that were absorbed (parse errors, timeouts, probe errors)
    #[serde(default)]
    pub degradations: Vec<String>,
    /// Caller mistakes such as a missing source file
    #[serde(default)]
    pub errors: Vec<String>,
    pub detection_time: Duration,
    pub cache_hit: bool,
}

impl DetectionResult {
    pub fn with_error(source_path: PathBuf, error: String) -> Self {
        Self {
            source_path,
            errors: vec![error],
            ..Self::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Modules that the environment can resolve.
    pub fn available_modules(&self) -> BTreeSet<String> {
        self.detected_modules
            .difference(&self.missing_modules)
            .cloned()
            .collect()
    }
}

/// Per-module dependency information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyInfo {
    pub name: String,
    pub version: String,
    pub location: String,
    pub dependencies: Vec<String>,
    pub is_available: bool,
    pub conflicts: Vec<String>,
}

pub const UNKNOWN_VERSION: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    MutualExclusive,
    Redundant,
    Replacement,
    VersionConflict,
}

impl std::fmt::Display for ConflictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConflictType::MutualExclusive => "mutual_exclusive",
            ConflictType::Redundant => "redundant",
            ConflictType::Replacement => "replacement",
            ConflictType::VersionConflict => "version_conflict",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictInfo {
    pub module1: String,
    pub module2: String,
    pub conflict_type: ConflictType,
    pub description: String,
    pub resolution: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionIssueKind {
    VersionTooOld,
    KnownIssue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionIssue {
    pub module: String,
    pub kind: VersionIssueKind,
    pub current_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub recommendation: String,
}

/// Pairwise compatibility verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compatibility {
    #[serde(rename = "self")]
    SelfPair,
    Conflict,
    Compatible,
    Unknown,
}

pub type CompatibilityMatrix = BTreeMap<String, BTreeMap<String, Compatibility>>;

/// Output of the dependency analyzer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyReport {
    pub dependencies: BTreeMap<String, DependencyInfo>,
    pub conflicts: Vec<ConflictInfo>,
    pub missing: Vec<String>,
    pub recommendations: Vec<String>,
    pub version_issues: Vec<VersionIssue>,
    pub compatibility_matrix: CompatibilityMatrix,
}

/// Persisted cache record, one per content digest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub timestamp: DateTime<Utc>,
    pub source_path: PathBuf,
    pub content_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    pub result: DetectionResult,
}

/// Snapshot returned by `cache_stats`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub memory_count: usize,
    pub disk_count: usize,
    pub total_detections: u64,
    pub cache_hits: u64,
    pub hit_rate: f64,
    pub avg_detection_time: Duration,
    pub framework_matches: BTreeMap<String, u64>,
}
