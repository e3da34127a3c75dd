//! Project path resolution and discovery helpers.

use std::path::{Component, Path, PathBuf};

/// Output directory used when none is supplied.
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "output";
/// Test-output folder used when none is supplied, relative to the output directory.
pub const DEFAULT_TEST_OUTPUT_FOLDER: &str = "testResults";
/// Candidate source directory names, checked in order.
const SOURCE_DIR_CANDIDATES: [&str; 2] = ["source", "src"];

/// Join `path` onto `base` unless it is already absolute, then collapse
/// `.` and `..` lexically.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Remove `.` components and fold `..` into its parent without touching
/// the filesystem. `..` at the root stays at the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    out
}

/// Resolve the project root. Falls back to `cwd`; relative values are
/// taken relative to `cwd`.
pub fn resolve_project_path(explicit: Option<&Path>, cwd: &Path) -> PathBuf {
    match supplied(explicit) {
        Some(path) => absolutize(cwd, path),
        None => normalize(cwd),
    }
}

/// Resolve the build output directory relative to the project root.
pub fn resolve_output_directory(explicit: Option<&Path>, project_path: &Path) -> PathBuf {
    let dir = supplied(explicit).unwrap_or(Path::new(DEFAULT_OUTPUT_DIRECTORY));
    absolutize(project_path, dir)
}

/// Resolve the test-output folder relative to the already-resolved
/// output directory.
pub fn resolve_test_output_folder(explicit: Option<&Path>, output_directory: &Path) -> PathBuf {
    let dir = supplied(explicit).unwrap_or(Path::new(DEFAULT_TEST_OUTPUT_FOLDER));
    absolutize(output_directory, dir)
}

/// Resolve the project name, falling back to [`discover_project_name`].
pub fn resolve_project_name(explicit: Option<&str>, project_path: &Path) -> String {
    match explicit.filter(|name| !name.is_empty()) {
        Some(name) => name.to_string(),
        None => discover_project_name(project_path),
    }
}

/// Resolve the module source path, falling back to [`discover_source_path`].
pub fn resolve_source_path(
    explicit: Option<&Path>,
    project_path: &Path,
    project_name: &str,
) -> PathBuf {
    match supplied(explicit) {
        Some(path) => absolutize(project_path, path),
        None => discover_source_path(project_path, project_name),
    }
}

/// The project name is the name of the project root directory.
pub fn discover_project_name(project_path: &Path) -> String {
    project_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// First existing of `source/`, `src/`, `<project_name>/` under the
/// project root; `source/` when none exists.
pub fn discover_source_path(project_path: &Path, project_name: &str) -> PathBuf {
    let mut candidates: Vec<PathBuf> = SOURCE_DIR_CANDIDATES
        .iter()
        .map(|name| project_path.join(name))
        .collect();
    if !project_name.is_empty() {
        candidates.push(project_path.join(project_name));
    }
    candidates
        .into_iter()
        .find(|candidate| candidate.is_dir())
        .unwrap_or_else(|| project_path.join(SOURCE_DIR_CANDIDATES[0]))
}

fn supplied(path: Option<&Path>) -> Option<&Path> {
    path.filter(|p| !p.as_os_str().is_empty())
}
