// SPDX-License-Identifier: PMPL-1.0-or-later

//! Detector configuration loading.

use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub cache_dir: PathBuf,
    pub analyzer_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub workers: usize,
    pub python: PathBuf,
    pub cache_ttl_secs: u64,
    pub knowledge_base: Option<PathBuf>,
    pub dependency_tables: Option<PathBuf>,
    pub fingerprint_environment: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".cache"),
            analyzer_timeout_secs: 30,
            probe_timeout_secs: 10,
            workers: 4,
            python: PathBuf::from("python3"),
            cache_ttl_secs: 24 * 60 * 60,
            knowledge_base: None,
            dependency_tables: None,
            fingerprint_environment: true,
        }
    }
}

impl DetectorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = load_document(path, "detector config")?;
        config.validate()
    }

    /// Reject unusable values and keep the probe budget inside the
    /// analyzer budget.
    pub fn validate(mut self) -> Result<Self> {
        if self.workers == 0 {
            bail!("workers must be at least 1");
        }
        if self.analyzer_timeout_secs == 0 || self.probe_timeout_secs == 0 {
            bail!("timeouts must be non-zero");
        }
        if self.probe_timeout_secs > self.analyzer_timeout_secs {
            tracing::warn!(
                probe = self.probe_timeout_secs,
                analyzer = self.analyzer_timeout_secs,
                "probe timeout exceeds analyzer timeout, clamping"
            );
            self.probe_timeout_secs = self.analyzer_timeout_secs;
        }
        Ok(self)
    }

    pub fn analyzer_timeout(&self) -> Duration {
        Duration::from_secs(self.analyzer_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Read a JSON or YAML document, choosing the parser by file extension.
pub fn load_document<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {} {}", what, path.display()))?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("parsing json {} {}", what, path.display())),
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
            .with_context(|| format!("parsing yaml {} {}", what, path.display())),
        _ => Err(anyhow!(
            "unsupported {} extension for {}",
            what,
            path.display()
        )),
    }
}
