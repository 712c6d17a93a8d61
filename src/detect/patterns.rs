// SPDX-License-Identifier: PMPL-1.0-or-later

//! Pattern detection for dynamic loading idioms
//!
//! A heuristic superset: anything that looks like a module handed to a
//! loader at run time is reported. Extra names are harmless hints for the
//! packager; missed names are what this pass exists to catch.

use crate::types::canonical_module;
use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;

/// How a pattern's first capture group turns into module names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Single,
    /// `import a, b as c` inside an evaluated string
    List,
}

struct DynamicPattern {
    name: &'static str,
    regex: Regex,
    capture: Capture,
}

const PATTERNS: &[(&str, &str, Capture)] = &[
    (
        "importlib",
        r#"importlib\.import_module\(\s*['"]([^'"]+)['"]"#,
        Capture::Single,
    ),
    ("dunder_import", r#"__import__\(\s*['"]([^'"]+)['"]"#, Capture::Single),
    (
        "string_from_import",
        r#"from\s+['"]([^'"]+)['"]\s+import"#,
        Capture::Single,
    ),
    (
        "eval_import",
        r#"(?:exec|eval)\(\s*['"]import\s+([^'"]+)['"]"#,
        Capture::List,
    ),
    (
        "eval_from_import",
        r#"(?:exec|eval)\(\s*['"]from\s+([\w.]+)\s+import"#,
        Capture::Single,
    ),
];

pub struct DynamicScanner {
    patterns: Vec<DynamicPattern>,
}

impl DynamicScanner {
    pub fn new() -> Result<Self> {
        let patterns = PATTERNS
            .iter()
            .map(|(name, source, capture)| {
                let regex = RegexBuilder::new(source)
                    .case_insensitive(true)
                    .build()
                    .with_context(|| format!("compiling dynamic pattern {}", name))?;
                Ok(DynamicPattern {
                    name: *name,
                    regex,
                    capture: *capture,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// Candidate module names found anywhere in `text`.
    pub fn scan(&self, text: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();

        for pattern in &self.patterns {
            for caps in pattern.regex.captures_iter(text) {
                let operand = &caps[1];
                let before = found.len();
                match pattern.capture {
                    Capture::Single => found.extend(canonical_module(operand)),
                    Capture::List => found.extend(split_import_list(operand)),
                }
                if found.len() > before {
                    tracing::trace!(pattern = pattern.name, operand, "dynamic import candidate");
                }
            }
        }

        found
    }
}

/// `a.b, c as d` -> [a, c]
fn split_import_list(operand: &str) -> Vec<String> {
    operand
        .split(',')
        .filter_map(|item| item.split_whitespace().next())
        .filter_map(canonical_module)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str) -> Vec<String> {
        DynamicScanner::new().unwrap().scan(text).into_iter().collect()
    }

    #[test]
    fn test_importlib_literal() {
        let source = "def load():\n    mod = importlib.import_module('yaml.loader')\n";
        assert_eq!(scan(source), vec!["yaml"]);
    }

    #[test]
    fn test_dunder_import() {
        assert_eq!(scan(r#"m = __import__( "sqlite3" )"#), vec!["sqlite3"]);
    }

    #[test]
    fn test_eval_import_list_split() {
        let found = scan(r#"exec("import json, csv as c")"#);
        assert_eq!(found, vec!["csv", "json"]);
    }

    #[test]
    fn test_eval_from_import() {
        assert_eq!(scan(r#"eval("from xml.dom import minidom")"#), vec!["xml"]);
    }

    #[test]
    fn test_string_from_import() {
        assert_eq!(scan(r#"from "plugins" import thing"#), vec!["plugins"]);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(scan("IMPORTLIB.IMPORT_MODULE('toml')"), vec!["toml"]);
    }

    #[test]
    fn test_variable_argument_ignored() {
        assert!(scan("importlib.import_module(name)").is_empty());
    }

    #[test]
    fn test_invalid_operand_rejected() {
        assert!(scan("__import__('9lives')").is_empty());
    }
}
