// SPDX-License-Identifier: PMPL-1.0-or-later

//! Environment probes
//!
//! The detector never asks the interpreter directly. It goes through an
//! `EnvironmentProbe`, so tests can swap the real subprocess-backed probe
//! for the table-driven `StaticProbe`.

mod python;

pub use python::PythonProbe;

use crate::error::DetectError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// What the environment reports about one importable module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleMetadata {
    pub location: Option<String>,
    /// Version from installed distribution metadata
    pub distribution_version: Option<String>,
    /// `__version__` / `version` / `VERSION` on the imported module
    pub attribute_version: Option<String>,
    /// Requirement names declared by the distribution
    pub requires: Vec<String>,
}

pub trait EnvironmentProbe: Send + Sync {
    /// Can `module` be resolved in this environment?
    fn is_available(&self, module: &str) -> Result<bool, DetectError>;

    /// The subset of `modules` that resolves.
    fn available_modules(
        &self,
        modules: &BTreeSet<String>,
    ) -> Result<BTreeSet<String>, DetectError> {
        let mut available = BTreeSet::new();
        for module in modules {
            if self.is_available(module)? {
                available.insert(module.clone());
            }
        }
        Ok(available)
    }

    fn inspect(&self, module: &str) -> Result<ModuleMetadata, DetectError>;

    /// Last-resort version lookup, tried after metadata and attributes.
    fn query_version(&self, _module: &str) -> Result<Option<String>, DetectError> {
        Ok(None)
    }

    /// Identifies the environment for cache validation. `None` disables
    /// the environment check.
    fn fingerprint(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Default)]
struct StaticModule {
    metadata: ModuleMetadata,
    probed_version: Option<String>,
}

/// In-process probe answering from a fixed table. Any module not in the
/// table is unavailable.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    modules: BTreeMap<String, StaticModule>,
    fingerprint: Option<String>,
}

impl StaticProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe reporting every name in `modules` as installed, without versions.
    pub fn with_available<I, S>(modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut probe = Self::new();
        for module in modules {
            probe.modules.insert(module.into(), StaticModule::default());
        }
        probe
    }

    fn entry(&mut self, module: &str) -> &mut StaticModule {
        self.modules.entry(module.to_string()).or_default()
    }

    pub fn with_module(mut self, module: &str, version: &str) -> Self {
        self.entry(module).metadata.distribution_version = Some(version.to_string());
        self
    }

    pub fn with_attribute_version(mut self, module: &str, version: &str) -> Self {
        self.entry(module).metadata.attribute_version = Some(version.to_string());
        self
    }

    pub fn with_probed_version(mut self, module: &str, version: &str) -> Self {
        self.entry(module).probed_version = Some(version.to_string());
        self
    }

    pub fn with_requires(mut self, module: &str, requires: &[&str]) -> Self {
        self.entry(module).metadata.requires = requires.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: &str) -> Self {
        self.fingerprint = Some(fingerprint.to_string());
        self
    }
}

impl EnvironmentProbe for StaticProbe {
    fn is_available(&self, module: &str) -> Result<bool, DetectError> {
        Ok(self.modules.contains_key(module))
    }

    fn inspect(&self, module: &str) -> Result<ModuleMetadata, DetectError> {
        self.modules
            .get(module)
            .map(|m| m.metadata.clone())
            .ok_or_else(|| DetectError::ProbeFailure {
                module: module.to_string(),
                reason: "not installed".to_string(),
            })
    }

    fn query_version(&self, module: &str) -> Result<Option<String>, DetectError> {
        Ok(self.modules.get(module).and_then(|m| m.probed_version.clone()))
    }

    fn fingerprint(&self) -> Option<String> {
        self.fingerprint.clone()
    }
}
