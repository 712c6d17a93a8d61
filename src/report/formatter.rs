// SPDX-License-Identifier: PMPL-1.0-or-later

//! Terminal formatting for detection and dependency reports

use crate::types::*;
use colored::*;

pub struct ReportFormatter;

impl ReportFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn print_detection(&self, result: &DetectionResult) {
        println!("\n{}", "=== IMPORT-HUNTER DETECTION ===".bold().cyan());
        println!("  Source: {}", result.source_path.display());
        let origin = if result.cache_hit {
            "cache".green()
        } else {
            "fresh".normal()
        };
        println!(
            "  Time: {:.3}s ({})",
            result.detection_time.as_secs_f64(),
            origin
        );
        println!();

        if !result.errors.is_empty() {
            println!("{}", "ERRORS".bold().red());
            for error in &result.errors {
                println!("  - {}", error.red());
            }
            return;
        }

        println!(
            "{} ({})",
            "MODULES".bold().yellow(),
            result.detected_modules.len()
        );
        for module in &result.detected_modules {
            let marker = if result.missing_modules.contains(module) {
                "missing".red()
            } else if result.conflicted_modules.contains(module) {
                "conflict".yellow()
            } else {
                "ok".green()
            };
            println!("  {:<28} {}", module, marker);
        }

        if !result.framework_configs.is_empty() {
            println!();
            println!("{}", "FRAMEWORKS".bold().yellow());
            for (name, config) in &result.framework_configs {
                match &config.description {
                    Some(description) => println!("  {} - {}", name.bold(), description),
                    None => println!("  {}", name.bold()),
                }
            }
        }

        self.print_list("HIDDEN IMPORTS", &result.hidden_imports);
        self.print_list("COLLECT ALL", &result.collect_all);
        self.print_list("DATA FILES", &result.data_files);
        self.print_list("RECOMMENDATIONS", &result.recommendations);

        if !result.degradations.is_empty() {
            println!();
            println!("{}", "DEGRADATIONS".bold().red());
            for note in &result.degradations {
                println!("  - {}", note);
            }
        }
        println!();
    }

    fn print_list(&self, title: &str, items: &[String]) {
        if items.is_empty() {
            return;
        }
        println!();
        println!("{}", title.bold().yellow());
        for item in items {
            println!("  - {}", item);
        }
    }

    pub fn print_dependencies(&self, report: &DependencyReport) {
        println!("\n{}", "=== IMPORT-HUNTER DEPENDENCIES ===".bold().cyan());
        for (name, info) in &report.dependencies {
            let status = if info.is_available {
                info.version.normal()
            } else {
                "not installed".red()
            };
            println!("  {:<28} {}", name.bold(), status);
            if !info.dependencies.is_empty() {
                println!("      requires: {}", info.dependencies.join(", "));
            }
        }

        if !report.conflicts.is_empty() {
            println!();
            println!("{}", "CONFLICTS".bold().red());
            for conflict in &report.conflicts {
                println!(
                    "  {} <-> {} [{}] {}",
                    conflict.module1, conflict.module2, conflict.conflict_type, conflict.description
                );
            }
        }

        if !report.version_issues.is_empty() {
            println!();
            println!("{}", "VERSION ISSUES".bold().yellow());
            for issue in &report.version_issues {
                let label = match issue.kind {
                    VersionIssueKind::VersionTooOld => "too old".yellow(),
                    VersionIssueKind::KnownIssue => "known issue".red(),
                };
                println!("  {} {} ({})", issue.module, issue.current_version, label);
            }
        }

        self.print_list("RECOMMENDATIONS", &report.recommendations);
        println!();
    }

    pub fn print_cache_stats(&self, stats: &CacheStats) {
        println!("\n{}", "=== IMPORT-HUNTER CACHE ===".bold().cyan());
        println!("  Memory entries: {}", stats.memory_count);
        println!("  Disk entries: {}", stats.disk_count);
        println!("  Detections: {}", stats.total_detections);
        println!("  Cache hits: {}", stats.cache_hits);
        println!("  Hit rate: {:.1}%", stats.hit_rate * 100.0);
        println!(
            "  Average detection time: {:.3}s",
            stats.avg_detection_time.as_secs_f64()
        );
        if !stats.framework_matches.is_empty() {
            println!("  Framework matches:");
            for (name, count) in &stats.framework_matches {
                println!("    {}: {}", name, count);
            }
        }
        println!();
    }
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new()
    }
}
