//! Built module version lookup.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{TaskError, TaskResult};

/// Name of the optional metadata file inside a built module directory.
pub const MODULE_METADATA_FILE: &str = "module.json";

/// Source of the version string of an already-built module.
pub trait VersionSource {
    fn module_version(&self, output_directory: &Path, project_name: &str) -> TaskResult<String>;
}

/// Reads the version from the build output layout.
///
/// Looks in `<output>/<project_name>/`:
/// 1. a `module.json` with a `version` (and optional `prerelease`) field, or
/// 2. version-named subdirectories (`1.2.3`, `1.2.3-preview0001`), taking
///    the highest.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltModuleVersion;

#[derive(Debug, Deserialize)]
struct ModuleMetadata {
    version: String,
    #[serde(default)]
    prerelease: Option<String>,
}

impl VersionSource for BuiltModuleVersion {
    fn module_version(&self, output_directory: &Path, project_name: &str) -> TaskResult<String> {
        let module_dir = output_directory.join(project_name);
        let fail = |message: String| TaskError::ModuleVersion {
            project_name: project_name.to_string(),
            search_path: module_dir.clone(),
            message,
        };

        let metadata_path = module_dir.join(MODULE_METADATA_FILE);
        if metadata_path.is_file() {
            let content = std::fs::read_to_string(&metadata_path)
                .map_err(|e| fail(format!("reading {}: {}", MODULE_METADATA_FILE, e)))?;
            let metadata: ModuleMetadata = serde_json::from_str(&content)
                .map_err(|e| fail(format!("parsing {}: {}", MODULE_METADATA_FILE, e)))?;
            let version = match metadata.prerelease.filter(|p| !p.is_empty()) {
                Some(pre) => format!("{}-{}", metadata.version, pre),
                None => metadata.version,
            };
            tracing::debug!(%version, source = %metadata_path.display(), "module version from metadata");
            return Ok(version);
        }

        let entries = std::fs::read_dir(&module_dir).map_err(|e| fail(e.to_string()))?;
        let mut best: Option<(ModuleVersion, PathBuf)> = None;
        for entry in entries {
            let entry = entry.map_err(|e| fail(e.to_string()))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(version) = ModuleVersion::parse(&name) else {
                continue;
            };
            let better = best
                .as_ref()
                .map_or(true, |(current, _)| version > *current);
            if better {
                best = Some((version, path));
            }
        }

        match best {
            Some((version, path)) => {
                tracing::debug!(version = %version.raw, source = %path.display(), "module version from directory");
                Ok(version.raw)
            }
            None => Err(fail("no versioned module directory found".to_string())),
        }
    }
}

/// A dotted numeric version with optional prerelease label.
#[derive(Debug, Clone)]
struct ModuleVersion {
    numbers: Vec<u64>,
    prerelease: Option<String>,
    raw: String,
}

impl ModuleVersion {
    fn parse(raw: &str) -> Option<ModuleVersion> {
        let (core, prerelease) = match raw.split_once('-') {
            Some((core, pre)) if !pre.is_empty() => (core, Some(pre.to_string())),
            Some(_) => return None,
            None => (raw, None),
        };
        let numbers = core
            .split('.')
            .map(|part| part.parse::<u64>().ok())
            .collect::<Option<Vec<u64>>>()?;
        if numbers.is_empty() || numbers.len() > 4 {
            return None;
        }
        Some(ModuleVersion {
            numbers,
            prerelease,
            raw: raw.to_string(),
        })
    }
}

impl Ord for ModuleVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let width = self.numbers.len().max(other.numbers.len());
        let pad = |v: &[u64]| {
            let mut v = v.to_vec();
            v.resize(width, 0);
            v
        };
        pad(&self.numbers)
            .cmp(&pad(&other.numbers))
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialEq for ModuleVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ModuleVersion {}

impl PartialOrd for ModuleVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
