use std::path::Path;

use modqa_core::{run_task, BuiltModuleVersion, CommandEngine, ExplicitOptions};
use serde_json::json;

use crate::OutputFormat;

pub(crate) struct RunOptions<'a> {
    pub explicit: ExplicitOptions,
    pub engine: &'a Path,
    pub engine_args: Vec<String>,
    pub runtime_version: Option<String>,
    pub cwd: &'a Path,
}

/// Run the task. Exits 1 only on fatal errors; failing tests still exit 0
/// so the orchestrator decides what to do with the result file.
pub(crate) fn cmd_run(opts: RunOptions<'_>, output: OutputFormat, quiet: bool) {
    let engine = CommandEngine::new(opts.engine)
        .with_args(opts.engine_args)
        .with_runtime_version(opts.runtime_version);

    let outcome = match run_task(&opts.explicit, opts.cwd, &engine, &BuiltModuleVersion) {
        Ok(outcome) => outcome,
        Err(e) => crate::fail_task(&e, output, quiet),
    };

    let descriptor = &outcome.descriptor;
    let summary = outcome.summary();
    match output {
        OutputFormat::Json => {
            let value = json!({
                "result_file": descriptor.output_file(),
                "project_name": descriptor.project_name(),
                "module_version": descriptor.module_version(),
                "definitions": outcome.definitions,
                "passed": summary.map(|s| s.passed),
                "failed": summary.map(|s| s.failed),
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&value)
                    .unwrap_or_else(|e| format!("serialization error: {}", e))
            );
        }
        OutputFormat::Text => {
            if !quiet {
                match summary {
                    Some(s) => eprintln!(
                        "{} v{}: {} definition(s), {} passed, {} failed",
                        descriptor.project_name(),
                        descriptor.module_version(),
                        outcome.definitions,
                        s.passed,
                        s.failed
                    ),
                    None => eprintln!(
                        "{} v{}: {} definition(s)",
                        descriptor.project_name(),
                        descriptor.module_version(),
                        outcome.definitions
                    ),
                }
            }
            println!("{}", descriptor.output_file().display());
        }
    }
}
