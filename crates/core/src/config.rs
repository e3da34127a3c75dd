//! Build configuration file and parameter resolution.
//!
//! The build configuration is a TOML file (by default `build.toml` at the
//! project root) shared with other pipeline steps. Only the `[qa]` table is
//! read here; everything else in the file is ignored.
//!
//! # Example
//!
//! ```toml
//! [qa.script]
//! main_git_branch = "main"
//! exclude_source_file = ["output"]
//! exclude_module_file = ["Modules/Internal"]
//!
//! [qa.engine]
//! pass_thru = true
//! exclude_tag = ["Common Tests - Validate Markdown Files"]
//! output_verbosity = "Detailed"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{TaskError, TaskResult};
use crate::layer::resolve_key;

// ── Build configuration file ──────────────────────────────────────────────────

/// The parsed build configuration object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildInfo {
    #[serde(default)]
    pub qa: Option<QaSection>,
}

/// `[qa]` — the two sub-sections this task consumes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QaSection {
    pub script: Option<ScriptSection>,
    pub engine: Option<EngineSection>,
}

/// `[qa.script]` — options consumed by the task itself.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScriptSection {
    pub main_git_branch: Option<String>,
    pub exclude_source_file: Option<Vec<String>>,
    pub exclude_module_file: Option<Vec<String>>,
    #[serde(flatten)]
    pub unknown: BTreeMap<String, toml::Value>,
}

/// `[qa.engine]` — options forwarded to the test engine.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineSection {
    pub pass_thru: Option<bool>,
    pub tag: Option<Vec<String>>,
    pub exclude_tag: Option<Vec<String>>,
    pub output_verbosity: Option<String>,
    #[serde(flatten)]
    pub unknown: BTreeMap<String, toml::Value>,
}

impl BuildInfo {
    /// Read and parse a build configuration file.
    pub fn load(path: &Path) -> TaskResult<BuildInfo> {
        let content = std::fs::read_to_string(path).map_err(|e| TaskError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        BuildInfo::parse(&content, path)
    }

    /// Parse build configuration text; `origin` is only used in errors.
    pub fn parse(content: &str, origin: &Path) -> TaskResult<BuildInfo> {
        toml::from_str(content).map_err(|e| TaskError::Config {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn script(&self) -> Option<&ScriptSection> {
        self.qa.as_ref().and_then(|qa| qa.script.as_ref())
    }

    fn engine(&self) -> Option<&EngineSection> {
        self.qa.as_ref().and_then(|qa| qa.engine.as_ref())
    }
}

// ── Layer inputs ──────────────────────────────────────────────────────────────

/// Values supplied directly by the invoking orchestrator.
///
/// `None`, empty strings and empty lists all mean "not supplied".
#[derive(Debug, Clone, Default)]
pub struct ExplicitOptions {
    pub project_path: Option<PathBuf>,
    pub output_directory: Option<PathBuf>,
    pub project_name: Option<String>,
    pub source_path: Option<PathBuf>,
    pub test_output_folder: Option<PathBuf>,
    /// Path of the build configuration file.
    pub build_config: Option<PathBuf>,
    /// Directory the task considers its own location; test definitions
    /// are discovered relative to it.
    pub task_dir: Option<PathBuf>,

    pub main_git_branch: Option<String>,
    pub exclude_source_file: Option<Vec<String>>,
    pub exclude_module_file: Option<Vec<String>>,

    pub pass_thru: Option<bool>,
    pub tag: Option<Vec<String>>,
    pub exclude_tag: Option<Vec<String>>,
    pub output_verbosity: Option<String>,
}

/// Hardcoded fallbacks for script options. Engine options have none.
#[derive(Debug, Clone)]
pub struct ScriptDefaults {
    pub main_git_branch: Option<String>,
    pub exclude_source_file: Option<Vec<String>>,
    pub exclude_module_file: Option<Vec<String>>,
}

impl Default for ScriptDefaults {
    fn default() -> Self {
        ScriptDefaults {
            main_git_branch: Some("main".to_string()),
            exclude_source_file: None,
            exclude_module_file: None,
        }
    }
}

// ── Resolved parameter sets ───────────────────────────────────────────────────

/// Options consumed by the task and handed to test definitions as data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScriptParameters {
    pub main_git_branch: Option<String>,
    pub exclude_source_file: Vec<String>,
    pub exclude_module_file: Vec<String>,
}

/// Options forwarded verbatim to the test engine.
///
/// `pass_thru` is not settable from outside: once resolution completes it
/// is always `true`, so the engine always returns a capturable result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineParameters {
    pass_thru: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_tag: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_verbosity: Option<String>,
}

impl EngineParameters {
    pub fn pass_thru(&self) -> bool {
        self.pass_thru
    }
}

impl Default for EngineParameters {
    fn default() -> Self {
        EngineParameters {
            pass_thru: true,
            tag: None,
            exclude_tag: None,
            output_verbosity: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedParameters {
    pub script: ScriptParameters,
    pub engine: EngineParameters,
}

/// Merge explicit options, the build configuration and defaults into the
/// script and engine parameter sets.
///
/// A missing `[qa]`, `[qa.script]` or `[qa.engine]` table simply leaves the
/// config-file layer empty for the affected keys.
pub fn resolve_parameters(
    explicit: &ExplicitOptions,
    build_info: Option<&BuildInfo>,
    defaults: &ScriptDefaults,
) -> ResolvedParameters {
    let script_file = build_info.and_then(BuildInfo::script);
    let engine_file = build_info.and_then(BuildInfo::engine);

    if let Some(section) = script_file {
        warn_unknown("qa.script", &section.unknown);
    }
    if let Some(section) = engine_file {
        warn_unknown("qa.engine", &section.unknown);
    }

    let script = ScriptParameters {
        main_git_branch: resolve_key(
            "script",
            "main_git_branch",
            explicit.main_git_branch.clone(),
            script_file.and_then(|s| s.main_git_branch.clone()),
            defaults.main_git_branch.clone(),
        ),
        exclude_source_file: resolve_key(
            "script",
            "exclude_source_file",
            explicit.exclude_source_file.clone(),
            script_file.and_then(|s| s.exclude_source_file.clone()),
            defaults.exclude_source_file.clone(),
        )
        .unwrap_or_default(),
        exclude_module_file: resolve_key(
            "script",
            "exclude_module_file",
            explicit.exclude_module_file.clone(),
            script_file.and_then(|s| s.exclude_module_file.clone()),
            defaults.exclude_module_file.clone(),
        )
        .unwrap_or_default(),
    };

    let configured_pass_thru = resolve_key(
        "engine",
        "pass_thru",
        explicit.pass_thru,
        engine_file.and_then(|e| e.pass_thru),
        None,
    );
    if configured_pass_thru == Some(false) {
        tracing::debug!(
            section = "engine",
            key = "pass_thru",
            "overriding configured pass_thru=false, structured results are required"
        );
    }

    let engine = EngineParameters {
        pass_thru: true,
        tag: resolve_key(
            "engine",
            "tag",
            explicit.tag.clone(),
            engine_file.and_then(|e| e.tag.clone()),
            None,
        ),
        exclude_tag: resolve_key(
            "engine",
            "exclude_tag",
            explicit.exclude_tag.clone(),
            engine_file.and_then(|e| e.exclude_tag.clone()),
            None,
        ),
        output_verbosity: resolve_key(
            "engine",
            "output_verbosity",
            explicit.output_verbosity.clone(),
            engine_file.and_then(|e| e.output_verbosity.clone()),
            None,
        ),
    };

    ResolvedParameters { script, engine }
}

fn warn_unknown(section: &str, unknown: &BTreeMap<String, toml::Value>) {
    for key in unknown.keys() {
        tracing::warn!(section, key = key.as_str(), "ignoring unrecognized option");
    }
}
