// SPDX-License-Identifier: PMPL-1.0-or-later

//! import-hunter: runtime module detection for packaging Python programs
//!
//! Detects the modules a script needs at run time, including ones loaded
//! dynamically or implied by frameworks, and turns them into packager
//! arguments.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::*;
use import_hunter::report::{self, ReportFormatter};
use import_hunter::{DetectorConfig, ModuleDetector};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "import-hunter")]
#[command(version)]
#[command(about = "Runtime module detection for packaging Python programs")]
#[command(long_about = None)]
struct Cli {
    /// Detector configuration file (JSON or YAML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Cache directory (overrides the config file)
    #[arg(long, global = true, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Python interpreter used to probe the environment
    #[arg(long, global = true, value_name = "PATH")]
    python: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect runtime modules of a script
    Detect {
        /// Script to analyze
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Save the result as JSON to a file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print packager arguments for a script, one per line
    Args {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,
    },

    /// Analyze versions, requirements and conflicts
    Deps {
        /// Script whose detected modules are analyzed
        #[arg(value_name = "SCRIPT", required_unless_present = "modules")]
        script: Option<PathBuf>,

        /// Analyze these modules instead of a script
        #[arg(long, value_delimiter = ',', conflicts_with = "script")]
        modules: Option<Vec<String>>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show cache statistics
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Delete every cached detection
    ClearCache,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_detector(cli: &Cli) -> Result<ModuleDetector> {
    let mut config = match &cli.config {
        Some(path) => DetectorConfig::load(path)?,
        None => DetectorConfig::default(),
    };
    if let Some(dir) = &cli.cache_dir {
        config.cache_dir = dir.clone();
    }
    if let Some(python) = &cli.python {
        config.python = python.clone();
    }

    let detector = ModuleDetector::new(config)?;
    Ok(if cli.verbose {
        detector.with_progress(|line| eprintln!("{} {}", "::".dimmed(), line))
    } else {
        detector
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let detector = build_detector(&cli)?;
    let formatter = ReportFormatter::new();

    match &cli.command {
        Commands::Detect {
            script,
            json,
            output,
        } => {
            let result = detector.detect_modules(script);

            if *json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                formatter.print_detection(&result);
            }
            if let Some(output_path) = output {
                report::save_json(&result, output_path)?;
                println!("Report saved to: {}", output_path.display());
            }
            if let Some(error) = result.errors.first() {
                bail!("{}", error);
            }
        }

        Commands::Args { script } => {
            if !script.is_file() {
                bail!("source file not found: {}", script.display());
            }
            for arg in detector.generate_packaging_arguments(script) {
                println!("{}", arg);
            }
        }

        Commands::Deps {
            script,
            modules,
            json,
        } => {
            let module_set: BTreeSet<String> = match (script, modules) {
                (_, Some(modules)) => modules
                    .iter()
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect(),
                (Some(script), None) => {
                    let result = detector.detect_modules(script);
                    if let Some(error) = result.errors.first() {
                        bail!("{}", error);
                    }
                    result.detected_modules
                }
                (None, None) => bail!("either a script or --modules is required"),
            };

            let dependency_report = detector.analyze_dependencies(&module_set);
            if *json {
                println!("{}", serde_json::to_string_pretty(&dependency_report)?);
            } else {
                formatter.print_dependencies(&dependency_report);
            }
        }

        Commands::Stats { json } => {
            let stats = detector.cache_stats();
            if *json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                formatter.print_cache_stats(&stats);
            }
        }

        Commands::ClearCache => {
            detector.clear_cache()?;
            println!(
                "{} {}",
                "Cache cleared:".green(),
                detector.config().cache_dir.display()
            );
        }
    }

    Ok(())
}
