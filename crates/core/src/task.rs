//! QA task orchestration: resolve, discover, invoke, persist.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{
    resolve_parameters, BuildInfo, ExplicitOptions, ResolvedParameters, ScriptDefaults,
};
use crate::discovery::{definitions_dir, discover_test_definitions};
use crate::engine::{ContainerData, TestContainer, TestEngine, TestResult, TestSummary};
use crate::error::{TaskError, TaskResult};
use crate::paths;
use crate::persist::{result_file_name, write_result, OsClass};
use crate::version::VersionSource;

/// Build configuration file looked up at the project root when none is given.
pub const DEFAULT_BUILD_CONFIG: &str = "build.toml";

/// Everything that can be resolved without touching the disk for writing.
#[derive(Debug, Clone, Serialize)]
pub struct TaskContext {
    pub project_path: PathBuf,
    pub project_name: String,
    pub source_path: PathBuf,
    pub output_directory: PathBuf,
    pub test_output_folder: PathBuf,
    pub build_config: Option<PathBuf>,
    pub definitions_dir: PathBuf,
    pub parameters: ResolvedParameters,
}

impl TaskContext {
    /// Resolve paths and merge the configuration layers.
    ///
    /// `cwd` stands in for the orchestrator's build root when no project
    /// path is supplied.
    pub fn resolve(explicit: &ExplicitOptions, cwd: &Path) -> TaskResult<TaskContext> {
        let project_path = paths::resolve_project_path(explicit.project_path.as_deref(), cwd);
        let output_directory =
            paths::resolve_output_directory(explicit.output_directory.as_deref(), &project_path);
        let project_name =
            paths::resolve_project_name(explicit.project_name.as_deref(), &project_path);
        if project_name.is_empty() {
            return Err(TaskError::ProjectName { project_path });
        }
        let source_path = paths::resolve_source_path(
            explicit.source_path.as_deref(),
            &project_path,
            &project_name,
        );
        let test_output_folder = paths::resolve_test_output_folder(
            explicit.test_output_folder.as_deref(),
            &output_directory,
        );

        let build_config = locate_build_config(explicit.build_config.as_deref(), &project_path);
        let build_info = build_config
            .as_deref()
            .map(BuildInfo::load)
            .transpose()?;
        let parameters =
            resolve_parameters(explicit, build_info.as_ref(), &ScriptDefaults::default());

        let task_dir = explicit
            .task_dir
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| paths::absolutize(cwd, p))
            .unwrap_or_else(|| default_task_dir(cwd));

        tracing::debug!(
            project_path = %project_path.display(),
            project_name = %project_name,
            source_path = %source_path.display(),
            output_directory = %output_directory.display(),
            test_output_folder = %test_output_folder.display(),
            "resolved project layout"
        );

        Ok(TaskContext {
            project_path,
            project_name,
            source_path,
            output_directory,
            test_output_folder,
            build_config,
            definitions_dir: definitions_dir(&task_dir),
            parameters,
        })
    }

    /// Shared data handed to every test definition.
    pub fn container_data(&self) -> ContainerData {
        let script = &self.parameters.script;
        ContainerData {
            project_path: self.project_path.clone(),
            source_path: self.source_path.clone(),
            main_git_branch: script.main_git_branch.clone(),
            exclude_source_file: script.exclude_source_file.clone(),
            exclude_module_file: script.exclude_module_file.clone(),
        }
    }
}

/// Explicit path (relative to the project root), else `build.toml` at the
/// project root when it exists.
fn locate_build_config(explicit: Option<&Path>, project_path: &Path) -> Option<PathBuf> {
    match explicit.filter(|p| !p.as_os_str().is_empty()) {
        Some(path) => Some(paths::absolutize(project_path, path)),
        None => {
            let candidate = project_path.join(DEFAULT_BUILD_CONFIG);
            candidate.is_file().then_some(candidate)
        }
    }
}

/// Directory of the running executable, or `cwd` if it cannot be found.
fn default_task_dir(cwd: &Path) -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| cwd.to_path_buf())
}

/// The fixed facts of one test run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestRunDescriptor {
    project_path: PathBuf,
    project_name: String,
    source_path: PathBuf,
    module_version: String,
    output_directory: PathBuf,
    output_file: PathBuf,
}

impl TestRunDescriptor {
    pub fn new(
        context: &TaskContext,
        module_version: String,
        os: OsClass,
        runtime_version: &str,
    ) -> Self {
        let file_name =
            result_file_name(&context.project_name, &module_version, os, runtime_version);
        TestRunDescriptor {
            project_path: context.project_path.clone(),
            project_name: context.project_name.clone(),
            source_path: context.source_path.clone(),
            module_version,
            output_directory: context.output_directory.clone(),
            output_file: context.test_output_folder.join(file_name),
        }
    }

    pub fn project_path(&self) -> &Path {
        &self.project_path
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn module_version(&self) -> &str {
        &self.module_version
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn output_file(&self) -> &Path {
        &self.output_file
    }
}

/// What a completed task run produced.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub descriptor: TestRunDescriptor,
    pub result: TestResult,
    pub definitions: usize,
}

impl TaskOutcome {
    pub fn summary(&self) -> Option<TestSummary> {
        self.result.summary()
    }
}

/// Run the QA task once.
///
/// Fatal: build config errors, test-output folder creation, module version
/// lookup, engine invocation, result write. Failing tests are not errors.
pub fn run_task(
    explicit: &ExplicitOptions,
    cwd: &Path,
    engine: &dyn TestEngine,
    versions: &dyn VersionSource,
) -> TaskResult<TaskOutcome> {
    let context = TaskContext::resolve(explicit, cwd)?;

    if !context.test_output_folder.is_dir() {
        tracing::info!(path = %context.test_output_folder.display(), "creating test output folder");
        std::fs::create_dir_all(&context.test_output_folder).map_err(|source| {
            TaskError::OutputFolder {
                path: context.test_output_folder.clone(),
                source,
            }
        })?;
    }

    let module_version =
        versions.module_version(&context.output_directory, &context.project_name)?;
    let runtime_version = engine.runtime_version();
    let descriptor =
        TestRunDescriptor::new(&context, module_version, OsClass::host(), &runtime_version);

    let data = context.container_data();
    let containers: Vec<TestContainer> = discover_test_definitions(&context.definitions_dir)?
        .into_iter()
        .map(|path| TestContainer {
            path,
            data: data.clone(),
        })
        .collect();

    let result = engine.invoke(&containers, &context.parameters.engine)?;
    if let Some(summary) = result.summary() {
        tracing::info!(passed = summary.passed, failed = summary.failed, "test run complete");
    }

    write_result(descriptor.output_file(), &result)?;

    Ok(TaskOutcome {
        descriptor,
        result,
        definitions: containers.len(),
    })
}
