// SPDX-License-Identifier: PMPL-1.0-or-later

//! Local failure taxonomy
//!
//! None of these escalate past the orchestrator. Each one is turned into a
//! degradation note (or, for caller mistakes, an error entry) on the
//! returned `DetectionResult`.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("parse failure in {path} at line {line}, column {column}")]
    ParseFailure {
        path: PathBuf,
        line: usize,
        column: usize,
    },

    #[error("parser unavailable: {0}")]
    ParserUnavailable(String),

    #[error("probe failed for {module}: {reason}")]
    ProbeFailure { module: String, reason: String },

    #[error("probe exceeded {timeout:?}")]
    ProbeTimeout { timeout: Duration },

    #[error("unreadable cache entry {path}: {reason}")]
    CacheCorruption { path: PathBuf, reason: String },

    #[error("{analyzer} analysis timed out after {timeout:?}")]
    AnalyzerTimeout {
        analyzer: &'static str,
        timeout: Duration,
    },

    #[error("{analyzer} analysis stopped without a result")]
    AnalyzerCrashed { analyzer: &'static str },

    #[error("source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("cannot read source {path}: {reason}")]
    InvalidSource { path: PathBuf, reason: String },
}

impl DetectError {
    /// Caller mistakes go to the result's error list; everything else is a
    /// degradation.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            DetectError::SourceNotFound { .. } | DetectError::InvalidSource { .. }
        )
    }
}
