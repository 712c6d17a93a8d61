// SPDX-License-Identifier: PMPL-1.0-or-later

//! Detection orchestration
//!
//! `ModuleDetector` owns everything one detection needs: the knowledge
//! base, dependency tables, environment probe, cache, statistics and a
//! bounded worker pool. The three analyzers run concurrently on that pool.
//! Each one's budget starts when its task starts running, so analyzers
//! queued behind a busy pool keep their full allowance; whatever has not
//! answered in time is dropped and noted as a degradation.

use super::framework::FrameworkMatcher;
use super::patterns::DynamicScanner;
use super::stats::DetectionStats;
use super::syntax::SyntaxAnalyzer;
use crate::config::DetectorConfig;
use crate::depend::{class_notes, DependencyAnalyzer};
use crate::error::DetectError;
use crate::knowledge::{DependencyTables, KnowledgeBase};
use crate::probe::{EnvironmentProbe, PythonProbe};
use crate::storage::{digest_file, modified_at, ContentCache};
use crate::types::{extend_unique, CacheEntry, CacheStats, DependencyReport, DetectionResult};
use anyhow::{Context, Result};
use chrono::Utc;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::BTreeSet;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Receives one human-readable line per notable event.
pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Sibling files bundled with `--add-data` when present.
const CONFIG_CANDIDATES: &[&str] = &["config.json", "config.yaml", "config.ini", "settings.json"];

#[cfg(windows)]
const ADD_DATA_SEPARATOR: char = ';';
#[cfg(not(windows))]
const ADD_DATA_SEPARATOR: char = ':';

/// How many analyzers one detection launches.
const ANALYZER_COUNT: u32 = 3;

type AnalyzerOutcome = Result<BTreeSet<String>, DetectError>;

enum AnalyzerEvent {
    Started(Instant),
    Finished(AnalyzerOutcome),
}

pub struct ModuleDetector {
    config: DetectorConfig,
    knowledge: Arc<KnowledgeBase>,
    tables: Arc<DependencyTables>,
    probe: Arc<dyn EnvironmentProbe>,
    cache: ContentCache,
    stats: Arc<DetectionStats>,
    syntax: Arc<SyntaxAnalyzer>,
    scanner: Arc<DynamicScanner>,
    matcher: Arc<FrameworkMatcher>,
    pool: ThreadPool,
    progress: Option<ProgressCallback>,
}

impl ModuleDetector {
    /// Build a detector that probes the interpreter named in `config`.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        let config = config.validate()?;
        let knowledge = KnowledgeBase::load_or_builtin(config.knowledge_base.as_deref())?;
        let tables = DependencyTables::load_or_builtin(config.dependency_tables.as_deref())?;
        let probe = PythonProbe::new(config.python.clone(), config.probe_timeout());
        Self::with_parts(config, knowledge, tables, Arc::new(probe))
    }

    /// Build a detector from explicit parts; tests inject a static probe here.
    pub fn with_parts(
        config: DetectorConfig,
        knowledge: KnowledgeBase,
        tables: DependencyTables,
        probe: Arc<dyn EnvironmentProbe>,
    ) -> Result<Self> {
        let config = config.validate()?;
        let knowledge = Arc::new(knowledge);
        let stats = Arc::new(DetectionStats::new());
        let matcher = FrameworkMatcher::new(Arc::clone(&knowledge)).with_stats(Arc::clone(&stats));

        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|index| format!("import-hunter-{}", index))
            .build()
            .context("building analyzer worker pool")?;

        Ok(Self {
            cache: ContentCache::new(config.cache_dir.clone(), config.cache_ttl()),
            knowledge,
            tables: Arc::new(tables),
            probe,
            stats,
            syntax: Arc::new(SyntaxAnalyzer::new()?),
            scanner: Arc::new(DynamicScanner::new()?),
            matcher: Arc::new(matcher),
            pool,
            progress: None,
            config,
        })
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    fn report(&self, message: &str) {
        tracing::info!("{}", message);
        if let Some(progress) = &self.progress {
            progress(message);
        }
    }

    fn degrade(&self, result: &mut DetectionResult, err: DetectError) {
        let note = err.to_string();
        tracing::warn!(degradation = %note);
        if let Some(progress) = &self.progress {
            progress(&note);
        }
        result.degradations.push(note);
    }

    fn environment(&self) -> Option<String> {
        if self.config.fingerprint_environment {
            self.probe.fingerprint()
        } else {
            None
        }
    }

    /// Detect the runtime modules of `path`, consulting the cache first.
    ///
    /// Always returns a result. Local failures become degradation notes;
    /// a missing or unreadable file becomes an entry in `errors`.
    pub fn detect_modules(&self, path: &Path) -> DetectionResult {
        let started = Instant::now();

        if !path.is_file() {
            let err = DetectError::SourceNotFound {
                path: path.to_path_buf(),
            };
            tracing::warn!(error = %err);
            return DetectionResult::with_error(path.to_path_buf(), err.to_string());
        }

        let (digest, source_mtime) = match digest_file(path).and_then(|d| Ok((d, modified_at(path)?))) {
            Ok(pair) => pair,
            Err(err) => return invalid_source(path, err.to_string()),
        };
        let environment = self.environment();

        if let Some(entry) = self.cache.get(&digest, source_mtime, environment.as_deref()) {
            let mut result = entry.result.clone();
            result.source_path = path.to_path_buf();
            result.cache_hit = true;
            result.detection_time = started.elapsed();
            self.stats.record_hit(result.detection_time);
            self.report(&format!("cache hit for {}", path.display()));
            return result;
        }

        let text = match read_source(path) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err);
                return DetectionResult::with_error(path.to_path_buf(), err.to_string());
            }
        };

        let mut result = self.run_detection(path, text);
        result.detection_time = started.elapsed();

        let entry = CacheEntry {
            timestamp: Utc::now(),
            source_path: path.to_path_buf(),
            content_hash: digest.clone(),
            environment,
            result: result.clone(),
        };
        if let Err(err) = self.cache.put(&digest, entry) {
            tracing::warn!(error = %err, "cache write failed");
        }

        self.stats.record_detection(result.detection_time);
        self.report(&format!(
            "detected {} modules in {} ({} missing, {} conflicted)",
            result.detected_modules.len(),
            path.display(),
            result.missing_modules.len(),
            result.conflicted_modules.len()
        ));
        result
    }

    fn run_detection(&self, path: &Path, text: Arc<str>) -> DetectionResult {
        let mut result = DetectionResult {
            source_path: path.to_path_buf(),
            ..DetectionResult::default()
        };

        let timeout = self.config.analyzer_timeout();
        let syntax_rx = {
            let (syntax, text, path) = (Arc::clone(&self.syntax), Arc::clone(&text), path.to_path_buf());
            self.spawn_analyzer(move || syntax.analyze(&text, &path))
        };
        let dynamic_rx = {
            let (scanner, text) = (Arc::clone(&self.scanner), Arc::clone(&text));
            self.spawn_analyzer(move || Ok(scanner.scan(&text)))
        };
        let framework_rx = {
            let (syntax, matcher) = (Arc::clone(&self.syntax), Arc::clone(&self.matcher));
            let (text, path) = (Arc::clone(&text), path.to_path_buf());
            self.spawn_analyzer(move || Ok(matcher.expand(&syntax.analyze_or_empty(&text, &path))))
        };

        // a task still queued after every analyzer could have used its full
        // budget in turn is treated as timed out
        let queue_deadline = Instant::now() + timeout * ANALYZER_COUNT;
        for (name, rx) in [
            ("syntax", syntax_rx),
            ("dynamic", dynamic_rx),
            ("framework", framework_rx),
        ] {
            let modules = self.collect_analyzer(name, rx, queue_deadline, timeout, &mut result);
            tracing::debug!(analyzer = name, count = modules.len(), "analyzer finished");
            result.detected_modules.extend(modules);
        }

        let available = match self.probe.available_modules(&result.detected_modules) {
            Ok(available) => available,
            Err(err) => {
                self.degrade(&mut result, err);
                BTreeSet::new()
            }
        };
        result.missing_modules = result
            .detected_modules
            .difference(&available)
            .cloned()
            .collect();

        let active_conflicts: Vec<_> = self.tables.active_conflicts(&available).collect();
        for conflict in &active_conflicts {
            result.conflicted_modules.insert(conflict.pair.0.clone());
            result.conflicted_modules.insert(conflict.pair.1.clone());
        }

        let mut recommendations = Vec::new();
        for module in &result.missing_modules {
            recommendations.push(format!(
                "Module '{}' was not found in the environment: pip install {}",
                module, module
            ));
        }

        for (name, config) in self.knowledge.matching(&available) {
            extend_unique(&mut result.hidden_imports, &config.hidden_imports);
            extend_unique(&mut result.collect_all, &config.collect_all);
            extend_unique(&mut result.collect_data, &config.collect_data);
            extend_unique(&mut result.collect_binaries, &config.collect_binaries);
            extend_unique(&mut result.data_files, &config.data_files);
            extend_unique(&mut recommendations, &config.recommendations);
            result.framework_configs.insert(name.clone(), config.clone());
            self.report(&format!(
                "{} framework present, adding {} hidden imports",
                name,
                config.hidden_imports.len()
            ));
        }

        for conflict in &active_conflicts {
            recommendations.push(format!(
                "{} and {} conflict ({}): {}",
                conflict.pair.0, conflict.pair.1, conflict.description, conflict.resolution
            ));
        }
        recommendations.extend(class_notes(&self.tables, &result.detected_modules));
        extend_unique(&mut result.recommendations, recommendations);

        result
    }

    fn spawn_analyzer<F>(&self, analyzer: F) -> Receiver<AnalyzerEvent>
    where
        F: FnOnce() -> AnalyzerOutcome + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.pool.spawn(move || {
            let _ = tx.send(AnalyzerEvent::Started(Instant::now()));
            // a panic drops `tx`, which the receiver sees as a disconnect
            if let Ok(outcome) = panic::catch_unwind(AssertUnwindSafe(analyzer)) {
                let _ = tx.send(AnalyzerEvent::Finished(outcome));
            }
        });
        rx
    }

    /// Wait for one analyzer. Until it starts, `queue_deadline` bounds the
    /// wait; once it starts, it gets `timeout` from its own start.
    fn collect_analyzer(
        &self,
        name: &'static str,
        rx: Receiver<AnalyzerEvent>,
        queue_deadline: Instant,
        timeout: Duration,
        result: &mut DetectionResult,
    ) -> BTreeSet<String> {
        let mut deadline = queue_deadline;
        let err = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(AnalyzerEvent::Started(at)) => deadline = at + timeout,
                Ok(AnalyzerEvent::Finished(Ok(modules))) => return modules,
                Ok(AnalyzerEvent::Finished(Err(err))) => break err,
                Err(RecvTimeoutError::Timeout) => {
                    break DetectError::AnalyzerTimeout {
                        analyzer: name,
                        timeout,
                    };
                }
                Err(RecvTimeoutError::Disconnected) => {
                    break DetectError::AnalyzerCrashed { analyzer: name };
                }
            }
        };
        self.degrade(result, err);
        BTreeSet::new()
    }

    /// Packager command-line arguments for `path`, in a stable order.
    pub fn generate_packaging_arguments(&self, path: &Path) -> Vec<String> {
        let result = self.detect_modules(path);
        let mut args = Vec::new();
        if !result.is_ok() {
            return args;
        }

        args.extend(result.hidden_imports.iter().map(|m| format!("--hidden-import={}", m)));
        args.extend(result.collect_all.iter().map(|m| format!("--collect-all={}", m)));
        args.extend(result.collect_data.iter().map(|m| format!("--collect-data={}", m)));
        args.extend(result.collect_binaries.iter().map(|m| format!("--collect-binaries={}", m)));

        let dir = path.parent().unwrap_or(Path::new("."));
        for candidate in CONFIG_CANDIDATES {
            let config_path = dir.join(candidate);
            if config_path.is_file() {
                let absolute = std::path::absolute(&config_path).unwrap_or(config_path);
                args.push(format!(
                    "--add-data={}{}.",
                    absolute.display(),
                    ADD_DATA_SEPARATOR
                ));
            }
        }

        args
    }

    /// Dependency analysis over `modules`, run on the detector's pool.
    pub fn analyze_dependencies(&self, modules: &BTreeSet<String>) -> DependencyReport {
        let analyzer = DependencyAnalyzer::new(Arc::clone(&self.probe), Arc::clone(&self.tables));
        self.pool.install(|| analyzer.analyze(modules))
    }

    pub fn cache_stats(&self) -> CacheStats {
        let snapshot = self.stats.snapshot();
        CacheStats {
            memory_count: self.cache.memory_count(),
            disk_count: self.cache.disk_count(),
            total_detections: snapshot.total_detections,
            cache_hits: snapshot.cache_hits,
            hit_rate: snapshot.hit_rate,
            avg_detection_time: snapshot.avg_detection_time,
            framework_matches: snapshot.framework_matches,
        }
    }

    pub fn clear_cache(&self) -> Result<()> {
        self.cache.clear()?;
        self.report("cache cleared");
        Ok(())
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }
}

fn invalid_source(path: &Path, reason: String) -> DetectionResult {
    let err = DetectError::InvalidSource {
        path: path.to_path_buf(),
        reason,
    };
    tracing::warn!(error = %err);
    DetectionResult::with_error(path.to_path_buf(), err.to_string())
}

/// Read source text, falling back to Windows-1252 for non-UTF-8 files.
fn read_source(path: &Path) -> Result<Arc<str>, DetectError> {
    let raw_bytes = fs::read(path).map_err(|err| DetectError::InvalidSource {
        path: PathBuf::from(path),
        reason: err.to_string(),
    })?;

    match String::from_utf8(raw_bytes) {
        Ok(text) => Ok(Arc::from(text)),
        Err(err) => {
            let (cow, _, had_errors) = encoding_rs::WINDOWS_1252.decode(err.as_bytes());
            if had_errors {
                return Err(DetectError::InvalidSource {
                    path: PathBuf::from(path),
                    reason: "neither UTF-8 nor Windows-1252".to_string(),
                });
            }
            Ok(Arc::from(cow.into_owned()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::StaticProbe;
    use std::thread;
    use tempfile::TempDir;

    fn detector(dir: &TempDir) -> ModuleDetector {
        detector_with_workers(dir, DetectorConfig::default().workers)
    }

    fn detector_with_workers(dir: &TempDir, workers: usize) -> ModuleDetector {
        let config = DetectorConfig {
            cache_dir: dir.path().join("cache"),
            workers,
            ..DetectorConfig::default()
        };
        ModuleDetector::with_parts(
            config,
            KnowledgeBase::builtin(),
            DependencyTables::builtin(),
            Arc::new(StaticProbe::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_slow_analyzer_times_out() {
        let dir = TempDir::new().unwrap();
        let detector = detector(&dir);
        let rx = detector.spawn_analyzer(|| {
            thread::sleep(Duration::from_millis(500));
            Ok(BTreeSet::new())
        });
        let mut result = DetectionResult::default();
        let timeout = Duration::from_millis(20);
        let modules =
            detector.collect_analyzer("syntax", rx, Instant::now() + timeout, timeout, &mut result);
        assert!(modules.is_empty());
        assert_eq!(result.degradations.len(), 1);
        assert!(result.degradations[0].contains("timed out"));
    }

    #[test]
    fn test_queued_analyzer_keeps_its_own_budget() {
        let dir = TempDir::new().unwrap();
        let detector = detector_with_workers(&dir, 1);
        let slow = detector.spawn_analyzer(|| {
            thread::sleep(Duration::from_millis(700));
            Ok(BTreeSet::from(["slow".to_string()]))
        });
        let fast = detector.spawn_analyzer(|| {
            thread::sleep(Duration::from_millis(400));
            Ok(BTreeSet::from(["fast".to_string()]))
        });

        let mut result = DetectionResult::default();
        let timeout = Duration::from_secs(1);
        let queue_deadline = Instant::now() + timeout * ANALYZER_COUNT;
        let first =
            detector.collect_analyzer("syntax", slow, queue_deadline, timeout, &mut result);
        let second =
            detector.collect_analyzer("dynamic", fast, queue_deadline, timeout, &mut result);

        assert!(first.contains("slow"));
        assert!(second.contains("fast"));
        assert!(result.degradations.is_empty(), "{:?}", result.degradations);
    }

    #[test]
    fn test_panicking_analyzer_is_a_degradation() {
        let dir = TempDir::new().unwrap();
        let detector = detector(&dir);
        let rx = detector.spawn_analyzer(|| panic!("analyzer bug"));
        let mut result = DetectionResult::default();
        let timeout = Duration::from_secs(5);
        detector.collect_analyzer("dynamic", rx, Instant::now() + timeout, timeout, &mut result);
        assert_eq!(
            result.degradations,
            vec!["dynamic analysis stopped without a result"]
        );
    }

    #[test]
    fn test_latin1_source_is_decoded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("legacy.py");
        let mut bytes = b"# caf".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b"\nimport csv\n");
        fs::write(&path, bytes).unwrap();

        let text = read_source(&path).unwrap();
        assert!(text.starts_with("# café"));
    }

    #[test]
    fn test_progress_callback_sees_degradations() {
        use std::sync::Mutex;

        let dir = TempDir::new().unwrap();
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&seen);
        let detector = detector(&dir).with_progress(move |line| {
            sink.lock().unwrap().push(line.to_string());
        });

        let path = dir.path().join("broken.py");
        fs::write(&path, "def broken(:\n    __import__('sqlite3')\n").unwrap();
        let result = detector.detect_modules(&path);

        assert!(result.detected_modules.contains("sqlite3"));
        let lines = seen.lock().unwrap();
        assert!(lines.iter().any(|l| l.contains("parse failure")));
    }
}
