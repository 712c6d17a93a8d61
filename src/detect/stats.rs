// SPDX-License-Identifier: PMPL-1.0-or-later

//! Running detection statistics
//!
//! Owned by one `ModuleDetector` and shared with its framework matcher.
//! Nothing here is process-global; `reset` is the only way to zero it.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsSnapshot {
    pub total_detections: u64,
    pub cache_hits: u64,
    pub hit_rate: f64,
    pub avg_detection_time: Duration,
    pub framework_matches: BTreeMap<String, u64>,
}

#[derive(Debug, Default)]
struct Counters {
    total_detections: u64,
    cache_hits: u64,
    total_time: Duration,
    framework_matches: BTreeMap<String, u64>,
}

#[derive(Debug, Default)]
pub struct DetectionStats {
    inner: Mutex<Counters>,
}

impl DetectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        // counters stay consistent even if a holder panicked
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record_hit(&self, elapsed: Duration) {
        let mut counters = self.lock();
        counters.total_detections += 1;
        counters.cache_hits += 1;
        counters.total_time += elapsed;
    }

    pub fn record_detection(&self, elapsed: Duration) {
        let mut counters = self.lock();
        counters.total_detections += 1;
        counters.total_time += elapsed;
    }

    pub fn record_framework_match(&self, framework: &str) {
        *self
            .lock()
            .framework_matches
            .entry(framework.to_string())
            .or_insert(0) += 1;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let counters = self.lock();
        let (hit_rate, avg_detection_time) = if counters.total_detections == 0 {
            (0.0, Duration::ZERO)
        } else {
            let total = counters.total_detections;
            (
                counters.cache_hits as f64 / total as f64,
                Duration::from_nanos((counters.total_time.as_nanos() / u128::from(total)) as u64),
            )
        };
        StatsSnapshot {
            total_detections: counters.total_detections,
            cache_hits: counters.cache_hits,
            hit_rate,
            avg_detection_time,
            framework_matches: counters.framework_matches.clone(),
        }
    }

    pub fn reset(&self) {
        *self.lock() = Counters::default();
    }
}
