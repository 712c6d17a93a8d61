// SPDX-License-Identifier: PMPL-1.0-or-later

//! Runtime module detection
//!
//! Three independent analyzers feed one orchestrator:
//! - `syntax`: tree-sitter walk over every import and string literal
//! - `patterns`: regex scan for dynamic loading idioms
//! - `framework`: knowledge-base expansion of what the syntax pass found

pub mod framework;
pub mod orchestrator;
pub mod patterns;
pub mod stats;
pub mod syntax;

pub use framework::FrameworkMatcher;
pub use orchestrator::{ModuleDetector, ProgressCallback};
pub use patterns::DynamicScanner;
pub use stats::{DetectionStats, StatsSnapshot};
pub use syntax::SyntaxAnalyzer;
