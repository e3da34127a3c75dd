//! Result file naming and serialization.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::engine::TestResult;
use crate::error::{TaskError, TaskResult};

/// Leading component of every result file name.
pub const RESULT_FILE_PREFIX: &str = "QA";

/// Host operating system class embedded in result file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsClass {
    Windows,
    MacOS,
    Linux,
}

impl OsClass {
    /// Classify an OS identifier as reported by `std::env::consts::OS`.
    /// Anything that is neither Windows nor macOS counts as Linux.
    pub fn from_os(os: &str) -> OsClass {
        match os {
            "windows" => OsClass::Windows,
            "macos" => OsClass::MacOS,
            _ => OsClass::Linux,
        }
    }

    pub fn host() -> OsClass {
        OsClass::from_os(std::env::consts::OS)
    }
}

impl fmt::Display for OsClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsClass::Windows => write!(f, "Windows"),
            OsClass::MacOS => write!(f, "MacOS"),
            OsClass::Linux => write!(f, "Linux"),
        }
    }
}

/// `QA_<ProjectName>_v<ModuleVersion>.<OS>.<RuntimeVersion>.json`
pub fn result_file_name(
    project_name: &str,
    module_version: &str,
    os: OsClass,
    runtime_version: &str,
) -> String {
    format!(
        "{}_{}_v{}.{}.{}.json",
        RESULT_FILE_PREFIX, project_name, module_version, os, runtime_version
    )
}

/// Write `result` as pretty JSON to `path`, replacing any existing file.
pub fn write_result(path: &Path, result: &TestResult) -> TaskResult<PathBuf> {
    let pretty = serde_json::to_string_pretty(result).map_err(|e| TaskError::Persist {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    std::fs::write(path, pretty).map_err(|e| TaskError::Persist {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    tracing::info!(path = %path.display(), "wrote test result");
    Ok(path.to_path_buf())
}
