// SPDX-License-Identifier: PMPL-1.0-or-later

//! Static syntax analysis
//!
//! Parses the source with tree-sitter and walks every node, so imports
//! buried in functions, classes, `try` blocks or conditionals are found
//! alongside top-level ones. String literals are mined for module-like
//! references as a secondary signal.

use crate::error::DetectError;
use crate::types::{canonical_module, is_identifier, top_level};
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use tree_sitter::{Node, Parser};

pub struct SyntaxAnalyzer {
    string_patterns: Vec<Regex>,
}

impl SyntaxAnalyzer {
    pub fn new() -> Result<Self> {
        let string_patterns = [
            // file references: "helpers.py", "_speedups.pyd", "ext.so"
            r"\b([A-Za-z_][A-Za-z0-9_]*)\.(?:py|pyd|so)\b",
            // "import X" phrase inside text
            r"import\s+([A-Za-z_][A-Za-z0-9_.]*)",
            // "from X import" phrase inside text
            r"from\s+([A-Za-z_][A-Za-z0-9_.]*)\s+import",
        ]
        .iter()
        .map(|p| Regex::new(p).with_context(|| format!("compiling string pattern {}", p)))
        .collect::<Result<Vec<_>>>()?;

        Ok(Self { string_patterns })
    }

    /// Extract module names, reporting a parse failure as an error.
    pub fn analyze(&self, source: &str, path: &Path) -> Result<BTreeSet<String>, DetectError> {
        let mut parser = Parser::new();
        parser
            .set_language(tree_sitter_python::language())
            .map_err(|e| DetectError::ParserUnavailable(e.to_string()))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| DetectError::ParserUnavailable("parser returned no tree".to_string()))?;
        let root = tree.root_node();

        if root.has_error() {
            let (line, column) = first_error_position(root);
            return Err(DetectError::ParseFailure {
                path: path.to_path_buf(),
                line,
                column,
            });
        }

        let bytes = source.as_bytes();
        let mut modules = BTreeSet::new();
        let mut cursor = root.walk();

        loop {
            let node = cursor.node();
            match node.kind() {
                "import_statement" => self.collect_import(node, bytes, &mut modules),
                "import_from_statement" => self.collect_from_import(node, bytes, &mut modules),
                "future_import_statement" => {
                    modules.insert("__future__".to_string());
                }
                "string" => {
                    if let Ok(text) = node.utf8_text(bytes) {
                        modules.extend(self.modules_in_string(string_body(text)));
                    }
                }
                _ => {}
            }

            if cursor.goto_first_child() {
                continue;
            }
            loop {
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    return Ok(modules);
                }
            }
        }
    }

    /// Same as `analyze`, degrading a failure to an empty set.
    pub fn analyze_or_empty(&self, source: &str, path: &Path) -> BTreeSet<String> {
        match self.analyze(source, path) {
            Ok(modules) => modules,
            Err(err) => {
                tracing::warn!(error = %err, "syntax analysis degraded to empty set");
                BTreeSet::new()
            }
        }
    }

    fn collect_import(&self, node: Node, bytes: &[u8], modules: &mut BTreeSet<String>) {
        let mut cursor = node.walk();
        for name in node.children_by_field_name("name", &mut cursor) {
            let dotted = match name.kind() {
                "aliased_import" => name.child_by_field_name("name"),
                _ => Some(name),
            };
            if let Some(text) = dotted.and_then(|n| n.utf8_text(bytes).ok()) {
                if let Some(module) = canonical_module(text) {
                    modules.insert(module);
                }
            }
        }
    }

    fn collect_from_import(&self, node: Node, bytes: &[u8], modules: &mut BTreeSet<String>) {
        let Some(module_name) = node.child_by_field_name("module_name") else {
            return;
        };
        // package-local code, never a runtime dependency
        if module_name.kind() == "relative_import" {
            return;
        }
        if let Some(module) = module_name
            .utf8_text(bytes)
            .ok()
            .and_then(canonical_module)
        {
            modules.insert(module);
        }
    }

    /// Candidate module names embedded in a string literal body.
    pub fn modules_in_string(&self, text: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        for pattern in &self.string_patterns {
            for caps in pattern.captures_iter(text) {
                let head = top_level(&caps[1]);
                if head.chars().count() > 1 && is_identifier(head) {
                    found.insert(head.to_string());
                }
            }
        }
        found
    }
}

/// Strip string prefix letters and quotes: `rb'''x'''` -> `x`.
fn string_body(literal: &str) -> &str {
    let unprefixed = literal.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if let Some(inner) = unprefixed.strip_prefix(quote) {
            return inner.strip_suffix(quote).unwrap_or(inner);
        }
    }
    unprefixed
}

/// One-based line/column of the first error or missing node.
fn first_error_position(root: Node) -> (usize, usize) {
    let mut cursor = root.walk();
    let mut pending = vec![root];
    while let Some(node) = pending.pop() {
        if node.is_error() || node.is_missing() {
            let pos = node.start_position();
            return (pos.row + 1, pos.column + 1);
        }
        if node.has_error() {
            let children: Vec<Node> = node.children(&mut cursor).collect();
            pending.extend(children.into_iter().rev());
        }
    }
    let pos = root.start_position();
    (pos.row + 1, pos.column + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(source: &str) -> Result<BTreeSet<String>, DetectError> {
        SyntaxAnalyzer::new()
            .unwrap()
            .analyze(source, Path::new("test.py"))
    }

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_top_level_imports() {
        let modules = analyze("import os\nimport numpy as np\nfrom pandas import DataFrame\n").unwrap();
        assert_eq!(names(&modules), vec!["numpy", "os", "pandas"]);
    }

    #[test]
    fn test_dotted_imports_reduced() {
        let modules = analyze("import matplotlib.pyplot as plt\nfrom xml.etree import ElementTree\n").unwrap();
        assert_eq!(names(&modules), vec!["matplotlib", "xml"]);
    }

    #[test]
    fn test_nested_imports_found() {
        let source = r#"
class Loader:
    def load(self):
        try:
            import yaml
        except ImportError:
            import json as yaml
        return yaml

def lazy():
    if True:
        from requests.adapters import HTTPAdapter
"#;
        let modules = analyze(source).unwrap();
        assert_eq!(names(&modules), vec!["json", "requests", "yaml"]);
    }

    #[test]
    fn test_relative_imports_ignored() {
        let modules = analyze("from . import sibling\nfrom .pkg import thing\nimport sys\n").unwrap();
        assert_eq!(names(&modules), vec!["sys"]);
    }

    #[test]
    fn test_string_literal_references() {
        let source = r#"
PLUGIN = "plugins_core.py"
SNIPPET = "import sqlite3"
OTHER = 'from decimal import Decimal'
SHORT = "import x"
"#;
        let modules = analyze(source).unwrap();
        assert!(modules.contains("plugins_core"));
        assert!(modules.contains("sqlite3"));
        assert!(modules.contains("decimal"));
        assert!(!modules.contains("x"), "single-character names are rejected");
    }

    #[test]
    fn test_parse_failure_reports_position() {
        let err = analyze("import os\ndef broken(:\n    pass\n").unwrap_err();
        match err {
            DetectError::ParseFailure { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_analyze_or_empty_degrades() {
        let analyzer = SyntaxAnalyzer::new().unwrap();
        let modules = analyzer.analyze_or_empty("def (:", Path::new("bad.py"));
        assert!(modules.is_empty());
    }

    #[test]
    fn test_string_body_strips_prefix_and_quotes() {
        assert_eq!(string_body("rb'''abc'''"), "abc");
        assert_eq!(string_body("f\"x\""), "x");
        assert_eq!(string_body("'y'"), "y");
    }
}
