// SPDX-License-Identifier: PMPL-1.0-or-later

//! Dependency policy tables: known conflicts, known dependencies,
//! minimum versions, known-bad versions, and known-good pairs.

use super::strings;
use crate::config::load_document;
use crate::types::ConflictType;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

const KNOWN_DEPENDENCIES: &[(&str, &[&str])] = &[
    ("cv2", &["numpy"]),
    ("matplotlib", &["numpy", "pyparsing", "python-dateutil", "cycler", "kiwisolver"]),
    ("pandas", &["numpy", "python-dateutil", "pytz"]),
    ("sklearn", &["numpy", "scipy", "joblib", "threadpoolctl"]),
    ("tensorflow", &["numpy", "protobuf", "absl-py", "astunparse", "gast"]),
    ("torch", &["numpy", "typing-extensions"]),
    ("flask", &["werkzeug", "jinja2", "click", "itsdangerous"]),
    ("django", &["sqlparse", "pytz", "asgiref"]),
    ("requests", &["urllib3", "certifi", "chardet", "idna"]),
    ("selenium", &["urllib3"]),
    ("PyQt5", &["sip"]),
    ("PyQt6", &["sip"]),
    ("openpyxl", &["et-xmlfile", "jdcal"]),
    ("bs4", &["soupsieve"]),
    ("sqlalchemy", &["greenlet"]),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownConflict {
    pub pair: (String, String),
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
    pub description: String,
    pub resolution: String,
}

impl KnownConflict {
    fn new(a: &str, b: &str, conflict_type: ConflictType, description: &str, resolution: &str) -> Self {
        Self {
            pair: (a.to_string(), b.to_string()),
            conflict_type,
            description: description.to_string(),
            resolution: resolution.to_string(),
        }
    }

    pub fn involves(&self, module: &str) -> bool {
        self.pair.0 == module || self.pair.1 == module
    }

    /// The other half of the pair, if `module` is one half.
    pub fn partner_of(&self, module: &str) -> Option<&str> {
        if self.pair.0 == module {
            Some(&self.pair.1)
        } else if self.pair.1 == module {
            Some(&self.pair.0)
        } else {
            None
        }
    }

    pub fn is_pair(&self, a: &str, b: &str) -> bool {
        (self.pair.0 == a && self.pair.1 == b) || (self.pair.0 == b && self.pair.1 == a)
    }

    pub fn is_active_in(&self, modules: &BTreeSet<String>) -> bool {
        modules.contains(&self.pair.0) && modules.contains(&self.pair.1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencyTables {
    pub known_conflicts: Vec<KnownConflict>,
    pub known_dependencies: BTreeMap<String, Vec<String>>,
    pub minimum_versions: BTreeMap<String, String>,
    /// module -> (version -> description)
    pub known_bad_versions: BTreeMap<String, BTreeMap<String, String>>,
    pub compatible_pairs: Vec<(String, String)>,
    pub scientific_modules: Vec<String>,
    pub ml_modules: Vec<String>,
}

impl DependencyTables {
    pub fn builtin() -> Self {
        let known_conflicts = vec![
            KnownConflict::new(
                "tensorflow",
                "tensorflow-gpu",
                ConflictType::MutualExclusive,
                "tensorflow and tensorflow-gpu cannot be installed together",
                "Install only one of the two distributions",
            ),
            KnownConflict::new(
                "opencv-python",
                "opencv-contrib-python",
                ConflictType::Redundant,
                "opencv-contrib-python already contains everything in opencv-python",
                "Keep only opencv-contrib-python",
            ),
            KnownConflict::new(
                "pillow",
                "PIL",
                ConflictType::Replacement,
                "Pillow is the maintained replacement for PIL",
                "Use Pillow instead of PIL",
            ),
            KnownConflict::new(
                "PyQt5",
                "PyQt6",
                ConflictType::VersionConflict,
                "PyQt5 and PyQt6 bindings clash when bundled together",
                "Pick one PyQt major version",
            ),
            KnownConflict::new(
                "PySide2",
                "PySide6",
                ConflictType::VersionConflict,
                "PySide2 and PySide6 bindings clash when bundled together",
                "Pick one PySide major version",
            ),
        ];

        let known_dependencies = KNOWN_DEPENDENCIES
            .iter()
            .map(|(module, deps)| (module.to_string(), strings(deps)))
            .collect();

        let minimum_versions = [
            ("numpy", "1.19.0"),
            ("pandas", "1.3.0"),
            ("matplotlib", "3.3.0"),
            ("scipy", "1.7.0"),
            ("sklearn", "1.0.0"),
            ("tensorflow", "2.6.0"),
            ("torch", "1.9.0"),
            ("PyQt5", "5.15.0"),
            ("PyQt6", "6.2.0"),
            ("requests", "2.25.0"),
            ("flask", "2.0.0"),
            ("django", "3.2.0"),
            ("PIL", "8.0.0"),
            ("cv2", "4.5.0"),
        ]
        .iter()
        .map(|(m, v)| (m.to_string(), v.to_string()))
        .collect();

        let mut known_bad_versions: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for (module, version, description) in [
            ("tensorflow", "2.5.0", "memory leak in long-running sessions"),
            ("tensorflow", "2.4.0", "unstable GPU support"),
            ("torch", "1.8.0", "CUDA compatibility problems"),
            ("numpy", "1.19.5", "performance regression in some operations"),
        ] {
            known_bad_versions
                .entry(module.to_string())
                .or_default()
                .insert(version.to_string(), description.to_string());
        }

        let compatible_pairs = [
            ("numpy", "pandas"),
            ("numpy", "matplotlib"),
            ("numpy", "cv2"),
            ("numpy", "scipy"),
            ("numpy", "sklearn"),
            ("numpy", "tensorflow"),
            ("numpy", "torch"),
            ("scipy", "sklearn"),
            ("flask", "jinja2"),
            ("django", "psycopg2"),
            ("requests", "urllib3"),
        ]
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();

        Self {
            known_conflicts,
            known_dependencies,
            minimum_versions,
            known_bad_versions,
            compatible_pairs,
            scientific_modules: strings(&["numpy", "scipy", "pandas", "matplotlib", "cv2"]),
            ml_modules: strings(&["tensorflow", "torch", "sklearn", "keras", "jax"]),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        load_document(path, "dependency tables")
    }

    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn conflict_between(&self, a: &str, b: &str) -> Option<&KnownConflict> {
        self.known_conflicts.iter().find(|c| c.is_pair(a, b))
    }

    /// Known conflicts whose both halves appear in `modules`.
    pub fn active_conflicts<'a>(
        &'a self,
        modules: &'a BTreeSet<String>,
    ) -> impl Iterator<Item = &'a KnownConflict> + 'a {
        self.known_conflicts
            .iter()
            .filter(move |c| c.is_active_in(modules))
    }

    pub fn is_compatible_pair(&self, a: &str, b: &str) -> bool {
        self.compatible_pairs
            .iter()
            .any(|(x, y)| (x == a && y == b) || (x == b && y == a))
    }

    pub fn known_dependencies_of(&self, module: &str) -> &[String] {
        self.known_dependencies
            .get(module)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_scientific(&self, modules: &BTreeSet<String>) -> bool {
        self.scientific_modules.iter().any(|m| modules.contains(m))
    }

    pub fn has_machine_learning(&self, modules: &BTreeSet<String>) -> bool {
        self.ml_modules.iter().any(|m| modules.contains(m))
    }
}
