//! modqa-core: module quality-assurance test task.
//!
//! Resolves a project's layout and layered configuration, hands every QA
//! test definition to a delegated test engine in one call, and persists
//! the structured result under a versioned file name.
//!
//! # Public API
//!
//! - [`run_task()`] -- run the whole task once
//! - [`TaskContext`] -- resolved paths and parameters, without side effects
//! - [`resolve()`] -- the three-layer option rule
//! - [`TestEngine`] / [`CommandEngine`] -- the engine seam and its
//!   external-program adapter
//! - [`VersionSource`] / [`BuiltModuleVersion`] -- module version lookup
//! - [`TaskError`] -- fatal task errors

pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod layer;
pub mod paths;
pub mod persist;
pub mod task;
pub mod version;

// ── Convenience re-exports ───────────────────────────────────────────

pub use config::{
    resolve_parameters, BuildInfo, EngineParameters, ExplicitOptions, ResolvedParameters,
    ScriptDefaults, ScriptParameters,
};
pub use engine::{CommandEngine, ContainerData, TestContainer, TestEngine, TestResult, TestSummary};
pub use error::{TaskError, TaskResult};
pub use layer::{resolve, Layer, Resolved};
pub use persist::{result_file_name, OsClass};
pub use task::{run_task, TaskContext, TaskOutcome, TestRunDescriptor};
pub use version::{BuiltModuleVersion, VersionSource};
