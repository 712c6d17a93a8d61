// SPDX-License-Identifier: PMPL-1.0-or-later

//! Report output: terminal rendering and JSON files

pub mod formatter;

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

pub use formatter::ReportFormatter;

/// Write any report as pretty JSON.
pub fn save_json<T: Serialize, P: AsRef<Path>>(report: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).with_context(|| format!("writing report {}", path.display()))?;
    Ok(())
}
