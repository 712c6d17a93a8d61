// SPDX-License-Identifier: PMPL-1.0-or-later

//! Subprocess-backed probe for a real Python interpreter
//!
//! Every query runs the interpreter with a fixed script and passes module
//! names as argv, never spliced into code. Each run is killed once its
//! wall-clock budget is spent.

use super::{EnvironmentProbe, ModuleMetadata};
use crate::error::DetectError;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::OnceLock;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const AVAILABILITY_SCRIPT: &str = r#"
import importlib.util, json, sys
found = {}
for name in sys.argv[1:]:
    try:
        found[name] = importlib.util.find_spec(name) is not None
    except Exception:
        found[name] = False
print(json.dumps(found))
"#;

const INSPECT_SCRIPT: &str = r#"
import importlib, json, sys
name = sys.argv[1]
info = {"location": None, "distribution_version": None, "attribute_version": None, "requires": []}
try:
    module = importlib.import_module(name)
    info["location"] = getattr(module, "__file__", None)
    for attr in ("__version__", "version", "VERSION"):
        value = getattr(module, attr, None)
        if isinstance(value, str):
            info["attribute_version"] = value
            break
except Exception:
    pass
try:
    import importlib.metadata as md
    try:
        candidates = md.packages_distributions().get(name, []) + [name]
    except AttributeError:
        candidates = [name]
    for dist in candidates:
        try:
            info["distribution_version"] = md.version(dist)
            info["requires"] = md.requires(dist) or []
            break
        except md.PackageNotFoundError:
            continue
except ImportError:
    pass
print(json.dumps(info))
"#;

const VERSION_SCRIPT: &str = r#"
import importlib, sys
module = importlib.import_module(sys.argv[1])
print(getattr(module, "__version__", ""))
"#;

const FINGERPRINT_SCRIPT: &str = "import sys; print(sys.executable); print(sys.version)";

pub struct PythonProbe {
    interpreter: PathBuf,
    timeout: Duration,
    fingerprint: OnceLock<Option<String>>,
}

impl PythonProbe {
    pub fn new(interpreter: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
            fingerprint: OnceLock::new(),
        }
    }

    /// Run `script` with `args`, returning stdout of a successful run.
    fn run_script(&self, module: &str, script: &str, args: &[&str]) -> Result<String, DetectError> {
        let mut argv = vec!["-c", script];
        argv.extend_from_slice(args);

        let output = run_with_deadline(&self.interpreter, &argv, self.timeout)
            .map_err(|err| DetectError::ProbeFailure {
                module: module.to_string(),
                reason: err.to_string(),
            })?
            .ok_or(DetectError::ProbeTimeout {
                timeout: self.timeout,
            })?;

        if !output.status.success() {
            return Err(DetectError::ProbeFailure {
                module: module.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl EnvironmentProbe for PythonProbe {
    fn is_available(&self, module: &str) -> Result<bool, DetectError> {
        let query: BTreeSet<String> = std::iter::once(module.to_string()).collect();
        Ok(self.available_modules(&query)?.contains(module))
    }

    /// One interpreter run for the whole set.
    fn available_modules(
        &self,
        modules: &BTreeSet<String>,
    ) -> Result<BTreeSet<String>, DetectError> {
        if modules.is_empty() {
            return Ok(BTreeSet::new());
        }
        let names: Vec<&str> = modules.iter().map(String::as_str).collect();
        let stdout = self.run_script("<availability>", AVAILABILITY_SCRIPT, &names)?;
        let found: BTreeMap<String, bool> =
            serde_json::from_str(&stdout).map_err(|err| DetectError::ProbeFailure {
                module: "<availability>".to_string(),
                reason: err.to_string(),
            })?;
        Ok(found
            .into_iter()
            .filter_map(|(name, present)| present.then_some(name))
            .collect())
    }

    fn inspect(&self, module: &str) -> Result<ModuleMetadata, DetectError> {
        let stdout = self.run_script(module, INSPECT_SCRIPT, &[module])?;
        let mut metadata: ModuleMetadata =
            serde_json::from_str(&stdout).map_err(|err| DetectError::ProbeFailure {
                module: module.to_string(),
                reason: err.to_string(),
            })?;
        metadata.requires = metadata
            .requires
            .iter()
            .filter_map(|req| requirement_name(req))
            .collect();
        Ok(metadata)
    }

    fn query_version(&self, module: &str) -> Result<Option<String>, DetectError> {
        let stdout = self.run_script(module, VERSION_SCRIPT, &[module])?;
        Ok(if stdout.is_empty() { None } else { Some(stdout) })
    }

    fn fingerprint(&self) -> Option<String> {
        self.fingerprint
            .get_or_init(|| match self.run_script("<fingerprint>", FINGERPRINT_SCRIPT, &[]) {
                Ok(stdout) => Some(stdout.replace('\n', " ")),
                Err(err) => {
                    tracing::warn!(error = %err, "could not fingerprint interpreter");
                    None
                }
            })
            .clone()
    }
}

/// Distribution name from a requirement line, skipping optional extras:
/// `urllib3 (<3,>=1.21.1)` -> `urllib3`, `pytest ; extra == "test"` -> None.
fn requirement_name(requirement: &str) -> Option<String> {
    if requirement.contains("extra ==") || requirement.contains("extra==") {
        return None;
    }
    let name: String = requirement
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Spawn `program` and wait at most `duration`. `Ok(None)` means the
/// process was killed at the deadline.
///
/// Both pipes are drained on reader threads while waiting, so a chatty
/// child cannot stall on a full pipe buffer.
fn run_with_deadline(program: &Path, args: &[&str], duration: Duration) -> io::Result<Option<Output>> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(Output {
                status,
                stdout: collect(stdout),
                stderr: collect(stderr),
            }));
        }
        if start.elapsed() >= duration {
            let _ = child.kill();
            let _ = child.wait();
            // readers are detached; a surviving grandchild may still hold the pipes
            return Ok(None);
        }
        thread::sleep(Duration::from_millis(20));
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = pipe.read_to_end(&mut buffer);
            buffer
        })
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}
