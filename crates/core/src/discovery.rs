//! Test-definition discovery.

use std::path::{Path, PathBuf};

use crate::error::{TaskError, TaskResult};

/// Location of the QA test definitions relative to the task directory.
pub fn definitions_dir(task_dir: &Path) -> PathBuf {
    task_dir.join("..").join("Tests").join("QA")
}

/// List every immediate entry of `dir`, sorted by path.
///
/// No recursion and no filtering by type: deciding what is a runnable
/// definition is the engine's job. A missing directory yields an empty list.
pub fn discover_test_definitions(dir: &Path) -> TaskResult<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(dir = %dir.display(), "test definition directory not found");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(TaskError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut definitions = entries
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TaskError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    definitions.sort();
    tracing::debug!(dir = %dir.display(), count = definitions.len(), "discovered test definitions");
    Ok(definitions)
}
