//! Test engine abstraction and the external-command adapter.
//!
//! The engine receives every discovered test definition in a single call,
//! each wrapped with the same shared data, and returns one aggregate
//! structured result.
//!
//! # Command protocol
//!
//! [`CommandEngine`] spawns an external program, writes an
//! [`EngineRequest`] as JSON to its stdin and reads the result JSON from its
//! stdout. A non-zero exit status is accepted as long as stdout carries a
//! result, since test runners commonly exit non-zero when tests fail.
//! The request is written from a separate thread while stdout is drained,
//! so an engine may emit output before it has consumed its input.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::EngineParameters;
use crate::error::{TaskError, TaskResult};

/// Runtime version reported when the engine cannot be probed.
pub const UNKNOWN_RUNTIME_VERSION: &str = "unknown";

/// Data shared by every test definition of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerData {
    pub project_path: PathBuf,
    pub source_path: PathBuf,
    pub main_git_branch: Option<String>,
    pub exclude_source_file: Vec<String>,
    pub exclude_module_file: Vec<String>,
}

/// A test definition paired with the shared data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestContainer {
    pub path: PathBuf,
    pub data: ContainerData,
}

/// The JSON document sent to a command engine.
#[derive(Debug, Serialize)]
pub struct EngineRequest<'a> {
    pub containers: &'a [TestContainer],
    pub parameters: &'a EngineParameters,
}

/// The engine's aggregate result, kept as an opaque JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestResult(Value);

/// Pass/fail counts, when the result exposes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestSummary {
    pub passed: u64,
    pub failed: u64,
}

impl TestResult {
    pub fn new(value: Value) -> Self {
        TestResult(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Read `passed_count`/`failed_count` (or `PassedCount`/`FailedCount`)
    /// from the top level of the result.
    pub fn summary(&self) -> Option<TestSummary> {
        let count = |snake: &str, pascal: &str| {
            self.0
                .get(snake)
                .or_else(|| self.0.get(pascal))
                .and_then(Value::as_u64)
        };
        Some(TestSummary {
            passed: count("passed_count", "PassedCount")?,
            failed: count("failed_count", "FailedCount")?,
        })
    }
}

/// A delegated test-execution engine.
pub trait TestEngine {
    /// Run all `containers` in one call and return the aggregate result.
    ///
    /// Failing tests are reported inside the result, never as `Err`.
    fn invoke(
        &self,
        containers: &[TestContainer],
        parameters: &EngineParameters,
    ) -> TaskResult<TestResult>;

    /// Version of the runtime hosting the engine, embedded in result file names.
    fn runtime_version(&self) -> String;
}

/// Runs an external test-runner program.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<String>,
    runtime_version: Option<String>,
}

impl CommandEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandEngine {
            program: program.into(),
            args: Vec::new(),
            runtime_version: None,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Use a fixed runtime version instead of probing `<program> --version`.
    pub fn with_runtime_version(mut self, version: Option<String>) -> Self {
        self.runtime_version = version.filter(|v| !v.is_empty());
        self
    }

    fn probe_runtime_version(&self) -> Option<String> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        parse_version_line(&String::from_utf8_lossy(&output.stdout))
    }
}

/// First version-looking token of the first non-empty line.
///
/// A token qualifies when it starts with a digit once a leading `v` is
/// dropped; it is cut at the first character that cannot appear in a file
/// name segment (`5.2.15(1)-release` yields `5.2.15`).
fn parse_version_line(text: &str) -> Option<String> {
    let line = text.lines().find(|line| !line.trim().is_empty())?;
    line.split_whitespace()
        .map(|token| token.trim_start_matches('v'))
        .filter(|token| token.starts_with(|c: char| c.is_ascii_digit()))
        .map(|token| {
            token
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+' | '_'))
                .collect::<String>()
        })
        .map(|token| token.trim_end_matches(['.', '-', '+', '_']).to_string())
        .find(|token| !token.is_empty())
}

impl TestEngine for CommandEngine {
    fn invoke(
        &self,
        containers: &[TestContainer],
        parameters: &EngineParameters,
    ) -> TaskResult<TestResult> {
        let request = serde_json::to_vec(&EngineRequest {
            containers,
            parameters,
        })
        .map_err(|e| TaskError::Engine(format!("could not encode request: {}", e)))?;

        tracing::info!(
            program = %self.program.display(),
            containers = containers.len(),
            "invoking test engine"
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                TaskError::Engine(format!(
                    "could not start '{}': {}",
                    self.program.display(),
                    e
                ))
            })?;

        let stdin = child.stdin.take();
        let (sent, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                // Dropping stdin at the end of the closure signals EOF.
                Some(mut stdin) => stdin.write_all(&request),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            (writer.join(), output)
        });

        let output =
            output.map_err(|e| TaskError::Engine(format!("could not wait for engine: {}", e)))?;
        match sent {
            Ok(Ok(())) => {}
            // The engine may legitimately ignore its input.
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => {
                return Err(TaskError::Engine(format!("could not send request: {}", e)));
            }
            Err(_) => {
                return Err(TaskError::Engine("request writer thread panicked".to_string()));
            }
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match serde_json::from_str::<Value>(stdout.trim()) {
            Ok(value) => {
                if !output.status.success() {
                    tracing::info!(status = %output.status, "test engine exited non-zero with a result");
                }
                Ok(TestResult::new(value))
            }
            Err(e) if output.status.success() => Err(TaskError::Engine(format!(
                "engine produced no structured result: {}",
                e
            ))),
            Err(_) => Err(TaskError::Engine(format!(
                "engine exited with {} and produced no structured result",
                output.status
            ))),
        }
    }

    fn runtime_version(&self) -> String {
        if let Some(version) = &self.runtime_version {
            return version.clone();
        }
        match self.probe_runtime_version() {
            Some(version) => version,
            None => {
                tracing::warn!(program = %self.program.display(), "could not probe engine runtime version");
                UNKNOWN_RUNTIME_VERSION.to_string()
            }
        }
    }
}
