// SPDX-License-Identifier: PMPL-1.0-or-later

//! Import-Hunter: runtime module detection for packaging Python programs.
//!
//! Packagers such as PyInstaller only see imports they can follow
//! statically. This crate finds the rest, then tells the packager what
//! to bundle.
//!
//! ENGINE PILLARS:
//! 1. **Detect**: a tree-sitter syntax pass, a regex scan for dynamic
//!    loading idioms, and a framework knowledge-base expansion, run
//!    concurrently under timeouts and merged by union.
//! 2. **Storage**: a two-tier cache keyed by the source file's content
//!    digest.
//! 3. **Depend**: version, requirement, conflict and compatibility
//!    analysis over a module set.

pub mod config;
pub mod depend;
pub mod detect;
pub mod error;
pub mod knowledge;
pub mod probe;
pub mod report;
pub mod storage;
pub mod types;

pub use config::DetectorConfig;
pub use detect::ModuleDetector;
pub use error::DetectError;
