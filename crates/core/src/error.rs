use std::path::PathBuf;

use serde_json::{json, Value};

/// All fatal errors a QA task run can produce.
///
/// Failing tests are never represented here: they are part of the
/// engine's result data and are persisted like any other result.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The build configuration file could not be read or parsed, or a
    /// recognized key carried a value of the wrong type.
    #[error("build config error in '{path}': {message}")]
    Config { path: PathBuf, message: String },

    /// No project name was supplied and none could be derived from the
    /// project path (e.g. the filesystem root).
    #[error("cannot derive a project name from '{project_path}'; pass one explicitly")]
    ProjectName { project_path: PathBuf },

    /// The test-output folder was missing and could not be created.
    #[error("could not create test output folder '{path}': {source}")]
    OutputFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The built module's version could not be determined.
    #[error("could not determine module version for '{project_name}' under '{search_path}': {message}")]
    ModuleVersion {
        project_name: String,
        search_path: PathBuf,
        message: String,
    },

    /// The test engine call failed to run at all.
    #[error("test engine error: {0}")]
    Engine(String),

    /// The result file could not be written.
    #[error("could not write test result to '{path}': {message}")]
    Persist { path: PathBuf, message: String },

    /// Any other filesystem failure.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TaskError {
    /// Short machine-readable kind, used in JSON error output.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskError::Config { .. } | TaskError::ProjectName { .. } => "config",
            TaskError::OutputFolder { .. } => "output_folder",
            TaskError::ModuleVersion { .. } => "module_version",
            TaskError::Engine(_) => "engine",
            TaskError::Persist { .. } => "persist",
            TaskError::Io { .. } => "io",
        }
    }

    pub fn to_json_value(&self) -> Value {
        json!({
            "error": self.kind(),
            "message": self.to_string(),
        })
    }
}

pub type TaskResult<T> = Result<T, TaskError>;
