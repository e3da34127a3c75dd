use std::path::Path;

use modqa_core::{BuiltModuleVersion, ExplicitOptions, TaskContext, VersionSource};
use serde_json::json;

use crate::OutputFormat;

/// Print the resolved layout and parameters. Never writes to disk and
/// never invokes the engine.
pub(crate) fn cmd_resolve(
    explicit: &ExplicitOptions,
    cwd: &Path,
    output: OutputFormat,
    quiet: bool,
) {
    let context = match TaskContext::resolve(explicit, cwd) {
        Ok(context) => context,
        Err(e) => crate::fail_task(&e, output, quiet),
    };

    let module_version = match BuiltModuleVersion
        .module_version(&context.output_directory, &context.project_name)
    {
        Ok(version) => Some(version),
        Err(e) => {
            tracing::warn!("{}", e);
            None
        }
    };

    match output {
        OutputFormat::Json => {
            let value = json!({
                "context": context,
                "module_version": module_version,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&value)
                    .unwrap_or_else(|e| format!("serialization error: {}", e))
            );
        }
        OutputFormat::Text => {
            let script = &context.parameters.script;
            let engine = &context.parameters.engine;
            println!("project_path:        {}", context.project_path.display());
            println!("project_name:        {}", context.project_name);
            println!("source_path:         {}", context.source_path.display());
            println!("output_directory:    {}", context.output_directory.display());
            println!("test_output_folder:  {}", context.test_output_folder.display());
            println!(
                "build_config:        {}",
                context
                    .build_config
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(none)".to_string())
            );
            println!("definitions_dir:     {}", context.definitions_dir.display());
            println!(
                "module_version:      {}",
                module_version.as_deref().unwrap_or("(not built)")
            );
            println!(
                "main_git_branch:     {}",
                script.main_git_branch.as_deref().unwrap_or("(unset)")
            );
            println!("exclude_source_file: {}", script.exclude_source_file.join(", "));
            println!("exclude_module_file: {}", script.exclude_module_file.join(", "));
            println!("pass_thru:           {}", engine.pass_thru());
            println!("tag:                 {}", list_or_unset(engine.tag.as_deref()));
            println!(
                "exclude_tag:         {}",
                list_or_unset(engine.exclude_tag.as_deref())
            );
            println!(
                "output_verbosity:    {}",
                engine.output_verbosity.as_deref().unwrap_or("(unset)")
            );
        }
    }
}

fn list_or_unset(values: Option<&[String]>) -> String {
    match values {
        Some(values) => values.join(", "),
        None => "(unset)".to_string(),
    }
}
