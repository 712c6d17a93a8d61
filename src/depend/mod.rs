// SPDX-License-Identifier: PMPL-1.0-or-later

//! Dependency analysis over a module set
//!
//! A batch function over its input: versions and requirements come from
//! the probe, conflicts and version policy from `DependencyTables`.
//! Nothing is remembered between calls.

pub mod version;

use crate::knowledge::DependencyTables;
use crate::probe::{EnvironmentProbe, ModuleMetadata};
use crate::types::{
    extend_unique, Compatibility, CompatibilityMatrix, ConflictInfo, DependencyInfo,
    DependencyReport, VersionIssue, VersionIssueKind, UNKNOWN_VERSION,
};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub struct DependencyAnalyzer {
    probe: Arc<dyn EnvironmentProbe>,
    tables: Arc<DependencyTables>,
}

impl DependencyAnalyzer {
    pub fn new(probe: Arc<dyn EnvironmentProbe>, tables: Arc<DependencyTables>) -> Self {
        Self { probe, tables }
    }

    pub fn analyze(&self, modules: &BTreeSet<String>) -> DependencyReport {
        let dependencies: BTreeMap<String, DependencyInfo> = modules
            .par_iter()
            .map(|module| (module.clone(), self.describe(module)))
            .collect();

        let missing: Vec<String> = dependencies
            .values()
            .filter(|info| !info.is_available)
            .map(|info| info.name.clone())
            .collect();

        let conflicts: Vec<ConflictInfo> = self
            .tables
            .active_conflicts(modules)
            .map(|known| ConflictInfo {
                module1: known.pair.0.clone(),
                module2: known.pair.1.clone(),
                conflict_type: known.conflict_type,
                description: known.description.clone(),
                resolution: known.resolution.clone(),
            })
            .collect();

        let version_issues: Vec<VersionIssue> = dependencies
            .values()
            .filter(|info| info.is_available)
            .flat_map(|info| self.version_issues(info))
            .collect();

        let compatibility_matrix = self.compatibility_matrix(modules);

        let mut recommendations = Vec::new();
        if !missing.is_empty() {
            recommendations.push(format!(
                "Install missing modules: pip install {}",
                missing.join(" ")
            ));
        }
        for conflict in &conflicts {
            recommendations.push(format!(
                "{} / {}: {}",
                conflict.module1, conflict.module2, conflict.resolution
            ));
        }
        for issue in &version_issues {
            if issue.kind == VersionIssueKind::VersionTooOld {
                recommendations.push(issue.recommendation.clone());
            }
        }
        recommendations.extend(class_notes(&self.tables, modules));

        tracing::debug!(
            modules = modules.len(),
            missing = missing.len(),
            conflicts = conflicts.len(),
            issues = version_issues.len(),
            "dependency analysis finished"
        );

        DependencyReport {
            dependencies,
            conflicts,
            missing,
            recommendations,
            version_issues,
            compatibility_matrix,
        }
    }

    fn describe(&self, module: &str) -> DependencyInfo {
        let is_available = self.probe.is_available(module).unwrap_or_else(|err| {
            tracing::warn!(module, error = %err, "availability probe failed");
            false
        });

        let metadata = if is_available {
            self.probe.inspect(module).unwrap_or_else(|err| {
                tracing::warn!(module, error = %err, "metadata probe failed");
                ModuleMetadata::default()
            })
        } else {
            ModuleMetadata::default()
        };

        let version = if is_available {
            self.resolve_version(module, &metadata)
        } else {
            UNKNOWN_VERSION.to_string()
        };

        let mut dependencies = metadata.requires.clone();
        extend_unique(&mut dependencies, self.tables.known_dependencies_of(module));

        let conflicts = self
            .tables
            .known_conflicts
            .iter()
            .filter(|c| c.involves(module))
            .filter_map(|c| {
                c.partner_of(module)
                    .map(|partner| format!("conflicts with {}: {}", partner, c.description))
            })
            .collect();

        DependencyInfo {
            name: module.to_string(),
            version,
            location: metadata.location.unwrap_or_default(),
            dependencies,
            is_available,
            conflicts,
        }
    }

    /// Distribution metadata, then the module's version attribute, then a
    /// separate probe run.
    fn resolve_version(&self, module: &str, metadata: &ModuleMetadata) -> String {
        if let Some(version) = metadata
            .distribution_version
            .as_ref()
            .or(metadata.attribute_version.as_ref())
        {
            return version.clone();
        }
        match self.probe.query_version(module) {
            Ok(Some(version)) => version,
            Ok(None) => UNKNOWN_VERSION.to_string(),
            Err(err) => {
                tracing::warn!(module, error = %err, "version probe failed");
                UNKNOWN_VERSION.to_string()
            }
        }
    }

    fn version_issues(&self, info: &DependencyInfo) -> Vec<VersionIssue> {
        let mut issues = Vec::new();
        if info.version == UNKNOWN_VERSION {
            return issues;
        }

        if let Some(minimum) = self.tables.minimum_versions.get(&info.name) {
            if version::is_older(&info.version, minimum) == Some(true) {
                issues.push(VersionIssue {
                    module: info.name.clone(),
                    kind: VersionIssueKind::VersionTooOld,
                    current_version: info.version.clone(),
                    minimum_version: Some(minimum.clone()),
                    description: None,
                    recommendation: format!(
                        "Upgrade {} to {} or newer: pip install --upgrade \"{}>={}\"",
                        info.name, minimum, info.name, minimum
                    ),
                });
            }
        }

        if let Some(description) = self
            .tables
            .known_bad_versions
            .get(&info.name)
            .and_then(|bad| bad.get(&info.version))
        {
            issues.push(VersionIssue {
                module: info.name.clone(),
                kind: VersionIssueKind::KnownIssue,
                current_version: info.version.clone(),
                minimum_version: None,
                description: Some(description.clone()),
                recommendation: format!(
                    "Avoid {} {}: {}",
                    info.name, info.version, description
                ),
            });
        }

        issues
    }

    /// Each unordered pair is judged once and written to both cells.
    fn compatibility_matrix(&self, modules: &BTreeSet<String>) -> CompatibilityMatrix {
        let names: Vec<&String> = modules.iter().collect();
        let mut matrix = CompatibilityMatrix::new();

        for (i, a) in names.iter().enumerate() {
            matrix
                .entry((*a).clone())
                .or_default()
                .insert((*a).clone(), Compatibility::SelfPair);

            for b in &names[i + 1..] {
                let verdict = if self.tables.conflict_between(a, b).is_some() {
                    Compatibility::Conflict
                } else if self.tables.is_compatible_pair(a, b) {
                    Compatibility::Compatible
                } else {
                    Compatibility::Unknown
                };
                matrix
                    .entry((*a).clone())
                    .or_default()
                    .insert((*b).clone(), verdict);
                matrix
                    .entry((*b).clone())
                    .or_default()
                    .insert((*a).clone(), verdict);
            }
        }

        matrix
    }
}

/// Aggregate notes for scientific and machine-learning module classes.
pub(crate) fn class_notes(tables: &DependencyTables, modules: &BTreeSet<String>) -> Vec<String> {
    let mut notes = Vec::new();
    if tables.has_scientific(modules) {
        notes.push(
            "Scientific computing modules present: collect their native extensions with --collect-all"
                .to_string(),
        );
    }
    if tables.has_machine_learning(modules) {
        notes.push(
            "Machine learning modules present: expect a large bundle and check GPU runtime libraries"
                .to_string(),
        );
    }
    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::StaticProbe;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn analyzer(probe: StaticProbe) -> DependencyAnalyzer {
        DependencyAnalyzer::new(Arc::new(probe), Arc::new(DependencyTables::builtin()))
    }

    #[test]
    fn test_version_resolution_order() {
        let probe = StaticProbe::new()
            .with_attribute_version("flask", "2.3.1")
            .with_probed_version("requests", "2.31.0")
            .with_module("django", "4.2.0")
            .with_attribute_version("django", "0.0.1")
            .with_requires("yaml", &[]);
        let report = analyzer(probe).analyze(&set(&["flask", "requests", "django", "yaml"]));
        assert_eq!(report.dependencies["django"].version, "4.2.0");
        assert_eq!(report.dependencies["flask"].version, "2.3.1");
        assert_eq!(report.dependencies["requests"].version, "2.31.0");
        assert_eq!(report.dependencies["yaml"].version, UNKNOWN_VERSION);
    }

    #[test]
    fn test_dependencies_merge_metadata_and_table() {
        let probe = StaticProbe::new().with_requires("pandas", &["numpy", "tzdata"]);
        let report = analyzer(probe).analyze(&set(&["pandas"]));
        assert_eq!(
            report.dependencies["pandas"].dependencies,
            vec!["numpy", "tzdata", "python-dateutil", "pytz"]
        );
    }

    #[test]
    fn test_missing_modules_recommended_together() {
        let report = analyzer(StaticProbe::new()).analyze(&set(&["scipy", "yaml"]));
        assert_eq!(report.missing, vec!["scipy", "yaml"]);
        assert!(report
            .recommendations
            .contains(&"Install missing modules: pip install scipy yaml".to_string()));
        assert!(!report.dependencies["scipy"].is_available);
    }

    #[test]
    fn test_known_bad_version_flagged() {
        let probe = StaticProbe::new().with_module("torch", "1.8.0");
        let report = analyzer(probe).analyze(&set(&["torch"]));
        let kinds: Vec<VersionIssueKind> = report.version_issues.iter().map(|i| i.kind).collect();
        assert_eq!(kinds, vec![VersionIssueKind::VersionTooOld, VersionIssueKind::KnownIssue]);
    }

    #[test]
    fn test_unparsable_version_skipped() {
        let probe = StaticProbe::new().with_module("numpy", "dev-build");
        let report = analyzer(probe).analyze(&set(&["numpy"]));
        assert!(report.version_issues.is_empty());
    }

    #[test]
    fn test_matrix_cells() {
        let report = analyzer(StaticProbe::new()).analyze(&set(&["numpy", "pandas", "PyQt5", "PyQt6"]));
        let m = &report.compatibility_matrix;
        assert_eq!(m["numpy"]["numpy"], Compatibility::SelfPair);
        assert_eq!(m["numpy"]["pandas"], Compatibility::Compatible);
        assert_eq!(m["PyQt5"]["PyQt6"], Compatibility::Conflict);
        assert_eq!(m["PyQt6"]["numpy"], Compatibility::Unknown);
    }

    #[test]
    fn test_per_module_conflict_notes() {
        let report = analyzer(StaticProbe::new()).analyze(&set(&["PIL"]));
        assert_eq!(
            report.dependencies["PIL"].conflicts,
            vec!["conflicts with pillow: Pillow is the maintained replacement for PIL"]
        );
    }
}
