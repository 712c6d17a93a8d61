// SPDX-License-Identifier: PMPL-1.0-or-later

//! Dependency analysis tests

use import_hunter::depend::DependencyAnalyzer;
use import_hunter::knowledge::{DependencyTables, KnowledgeBase};
use import_hunter::probe::StaticProbe;
use import_hunter::types::*;
use import_hunter::{DetectorConfig, ModuleDetector};
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::TempDir;

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn analyzer(probe: StaticProbe) -> DependencyAnalyzer {
    DependencyAnalyzer::new(Arc::new(probe), Arc::new(DependencyTables::builtin()))
}

#[test]
fn test_pyqt_pair_is_one_version_conflict() {
    let probe = StaticProbe::new()
        .with_module("PyQt5", "5.15.9")
        .with_module("PyQt6", "6.5.0");
    let report = analyzer(probe).analyze(&set(&["PyQt5", "PyQt6"]));

    assert_eq!(report.conflicts.len(), 1);
    let conflict = &report.conflicts[0];
    assert_eq!(conflict.conflict_type, ConflictType::VersionConflict);
    let pair = set(&[conflict.module1.as_str(), conflict.module2.as_str()]);
    assert_eq!(pair, set(&["PyQt5", "PyQt6"]));
    assert!(report.version_issues.is_empty());
}

#[test]
fn test_old_numpy_is_one_version_issue() {
    let probe = StaticProbe::new().with_module("numpy", "1.18.5");
    let report = analyzer(probe).analyze(&set(&["numpy"]));

    assert_eq!(report.version_issues.len(), 1);
    let issue = &report.version_issues[0];
    assert_eq!(issue.kind, VersionIssueKind::VersionTooOld);
    assert_eq!(issue.current_version, "1.18.5");
    assert_eq!(issue.minimum_version.as_deref(), Some("1.19.0"));
    assert!(issue.recommendation.contains("1.19.0"));
    assert!(report.recommendations.contains(&issue.recommendation));
}

#[test]
fn test_matrix_is_symmetric() {
    let modules = set(&["numpy", "pandas", "PyQt5", "PyQt6", "flask", "jinja2", "yaml"]);
    let report = analyzer(StaticProbe::with_available(["numpy", "flask"])).analyze(&modules);
    let matrix = &report.compatibility_matrix;

    assert_eq!(matrix.len(), modules.len());
    for a in &modules {
        assert_eq!(matrix[a].len(), modules.len());
        assert_eq!(matrix[a][a], Compatibility::SelfPair);
        for b in &modules {
            assert_eq!(matrix[a][b], matrix[b][a], "{} / {}", a, b);
        }
    }
    assert_eq!(matrix["flask"]["jinja2"], Compatibility::Compatible);
    assert_eq!(matrix["PyQt6"]["PyQt5"], Compatibility::Conflict);
}

#[test]
fn test_class_notes() {
    let report = analyzer(StaticProbe::with_available(["torch", "scipy"])).analyze(&set(&["torch", "scipy"]));
    assert!(report
        .recommendations
        .iter()
        .any(|r| r.starts_with("Scientific computing modules")));
    assert!(report
        .recommendations
        .iter()
        .any(|r| r.starts_with("Machine learning modules")));
}

#[test]
fn test_detector_runs_analysis_on_its_pool() {
    let dir = TempDir::new().unwrap();
    let config = DetectorConfig {
        cache_dir: dir.path().join("cache"),
        workers: 2,
        ..DetectorConfig::default()
    };
    let probe = StaticProbe::new().with_module("pandas", "1.1.0");
    let detector = ModuleDetector::with_parts(
        config,
        KnowledgeBase::builtin(),
        DependencyTables::builtin(),
        Arc::new(probe),
    )
    .unwrap();

    let report = detector.analyze_dependencies(&set(&["pandas", "absent"]));

    assert_eq!(report.missing, vec!["absent"]);
    assert_eq!(report.dependencies["pandas"].version, "1.1.0");
    assert_eq!(report.version_issues.len(), 1);
    assert_eq!(
        report.dependencies["pandas"].dependencies,
        vec!["numpy", "python-dateutil", "pytz"]
    );
}

#[test]
fn test_tables_loaded_from_yaml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tables.yaml");
    std::fs::write(
        &path,
        "known_conflicts:\n  - pair: [alpha, beta]\n    type: redundant\n    description: same thing\n    resolution: keep alpha\nminimum_versions:\n  alpha: \"2.0\"\n",
    )
    .unwrap();

    let tables = DependencyTables::load(&path).unwrap();
    let probe = StaticProbe::new().with_module("alpha", "1.9").with_module("beta", "1.0");
    let report = DependencyAnalyzer::new(Arc::new(probe), Arc::new(tables)).analyze(&set(&["alpha", "beta"]));

    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].conflict_type, ConflictType::Redundant);
    assert_eq!(report.version_issues.len(), 1);
    assert!(report.dependencies["alpha"].dependencies.is_empty());
}
