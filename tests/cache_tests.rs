// SPDX-License-Identifier: PMPL-1.0-or-later

//! Cache behavior seen through the detector

use filetime::FileTime;
use import_hunter::knowledge::{DependencyTables, KnowledgeBase};
use import_hunter::probe::StaticProbe;
use import_hunter::storage::digest_file;
use import_hunter::{DetectorConfig, ModuleDetector};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn detector_in(cache_dir: &Path, probe: StaticProbe, fingerprint_environment: bool) -> ModuleDetector {
    let config = DetectorConfig {
        cache_dir: cache_dir.to_path_buf(),
        fingerprint_environment,
        ..DetectorConfig::default()
    };
    ModuleDetector::with_parts(
        config,
        KnowledgeBase::builtin(),
        DependencyTables::builtin(),
        Arc::new(probe),
    )
    .unwrap()
}

#[test]
fn test_second_detection_hits_cache() {
    let dir = TempDir::new().unwrap();
    let script = create_test_file(&dir, "app.py", "import numpy\n");
    let detector = detector_in(&dir.path().join("cache"), StaticProbe::with_available(["numpy"]), true);

    let first = detector.detect_modules(&script);
    let second = detector.detect_modules(&script);

    assert!(!first.cache_hit);
    assert!(second.cache_hit);
    assert!(second.detection_time < first.detection_time);
    assert_eq!(first.detected_modules, second.detected_modules);
    assert_eq!(first.hidden_imports, second.hidden_imports);

    let stats = detector.cache_stats();
    assert_eq!(stats.total_detections, 2);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.hit_rate, 0.5);
    assert_eq!(stats.memory_count, 1);
    assert_eq!(stats.disk_count, 1);
    assert_eq!(stats.framework_matches.get("numpy"), Some(&1));
}

#[test]
fn test_content_change_forces_redetection() {
    let dir = TempDir::new().unwrap();
    let script = create_test_file(&dir, "app.py", "import numpy\n");
    let detector = detector_in(&dir.path().join("cache"), StaticProbe::with_available(["numpy", "yaml"]), true);

    detector.detect_modules(&script);
    fs::write(&script, "import yaml\n").unwrap();
    let result = detector.detect_modules(&script);

    assert!(!result.cache_hit);
    assert!(result.detected_modules.contains("yaml"));
    assert!(!result.detected_modules.contains("numpy"));
}

#[test]
fn test_disk_tier_survives_new_detector() {
    let dir = TempDir::new().unwrap();
    let cache_dir = dir.path().join("cache");
    let script = create_test_file(&dir, "app.py", "import requests\n");

    let first = detector_in(&cache_dir, StaticProbe::with_available(["requests"]), true);
    first.detect_modules(&script);

    let second = detector_in(&cache_dir, StaticProbe::with_available(["requests"]), true);
    assert_eq!(second.cache_stats().memory_count, 0);
    let result = second.detect_modules(&script);
    assert!(result.cache_hit);
    assert_eq!(second.cache_stats().memory_count, 1);
}

#[test]
fn test_future_mtime_invalidates_entry() {
    let dir = TempDir::new().unwrap();
    let script = create_test_file(&dir, "app.py", "import numpy\n");
    let detector = detector_in(&dir.path().join("cache"), StaticProbe::with_available(["numpy"]), true);
    detector.detect_modules(&script);

    let future = chrono::Utc::now().timestamp() + 3600;
    filetime::set_file_mtime(&script, FileTime::from_unix_time(future, 0)).unwrap();

    let result = detector.detect_modules(&script);
    assert!(!result.cache_hit);
}

#[test]
fn test_environment_change_invalidates_entry() {
    let dir = TempDir::new().unwrap();
    let cache_dir = dir.path().join("cache");
    let script = create_test_file(&dir, "app.py", "import numpy\n");
    let env = |name: &str| StaticProbe::with_available(["numpy"]).with_fingerprint(name);

    detector_in(&cache_dir, env("python 3.11"), true).detect_modules(&script);

    let upgraded = detector_in(&cache_dir, env("python 3.12"), true).detect_modules(&script);
    assert!(!upgraded.cache_hit);

    let unchecked = detector_in(&cache_dir, env("python 3.11"), false).detect_modules(&script);
    assert!(unchecked.cache_hit);
}

#[test]
fn test_corrupt_disk_entry_is_a_miss() {
    let dir = TempDir::new().unwrap();
    let cache_dir = dir.path().join("cache");
    fs::create_dir_all(&cache_dir).unwrap();
    let script = create_test_file(&dir, "app.py", "import numpy\n");
    let digest = digest_file(&script).unwrap();
    fs::write(cache_dir.join(format!("modules_{}.json", digest)), "not json at all").unwrap();

    let detector = detector_in(&cache_dir, StaticProbe::with_available(["numpy"]), true);
    let result = detector.detect_modules(&script);

    assert!(result.is_ok());
    assert!(!result.cache_hit);
    assert!(result.detected_modules.contains("numpy"));
}

#[test]
fn test_clear_cache_empties_both_tiers() {
    let dir = TempDir::new().unwrap();
    let script = create_test_file(&dir, "app.py", "import numpy\n");
    let detector = detector_in(&dir.path().join("cache"), StaticProbe::with_available(["numpy"]), true);

    let held = detector.detect_modules(&script);
    detector.clear_cache().unwrap();

    let stats = detector.cache_stats();
    assert_eq!(stats.memory_count, 0);
    assert_eq!(stats.disk_count, 0);
    assert!(held.detected_modules.contains("numpy"));
    assert!(!detector.detect_modules(&script).cache_hit);
}

#[test]
fn test_reset_stats() {
    let dir = TempDir::new().unwrap();
    let script = create_test_file(&dir, "app.py", "import numpy\n");
    let detector = detector_in(&dir.path().join("cache"), StaticProbe::with_available(["numpy"]), true);
    detector.detect_modules(&script);

    detector.reset_stats();

    let stats = detector.cache_stats();
    assert_eq!(stats.total_detections, 0);
    assert!(stats.framework_matches.is_empty());
    assert_eq!(stats.memory_count, 1);
}

#[test]
fn test_concurrent_detections_share_one_cache() {
    let dir = TempDir::new().unwrap();
    let modules = ["numpy", "yaml", "requests", "flask", "csv", "json"];
    let scripts: Vec<PathBuf> = modules
        .iter()
        .map(|module| {
            create_test_file(
                &dir,
                &format!("{}_job.py", module),
                &format!("import {}\n", module),
            )
        })
        .collect();
    let probe = StaticProbe::with_available(modules);
    let detector = detector_in(&dir.path().join("cache"), probe, true);

    std::thread::scope(|scope| {
        for (module, script) in modules.iter().zip(&scripts) {
            let detector = &detector;
            scope.spawn(move || {
                let result = detector.detect_modules(script);
                assert!(result.is_ok(), "{:?}", result.errors);
                assert!(!result.cache_hit);
                assert!(
                    result.detected_modules.contains(*module),
                    "{} in {:?}",
                    module,
                    result.detected_modules
                );
                assert_eq!(result.source_path, *script);
            });
        }
    });

    let stats = detector.cache_stats();
    assert_eq!(stats.memory_count, modules.len());
    assert_eq!(stats.disk_count, modules.len());
    assert_eq!(stats.total_detections, modules.len() as u64);
    assert_eq!(stats.cache_hits, 0);
}
