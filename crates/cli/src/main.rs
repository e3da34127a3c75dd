mod commands;
mod logging;

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};
use modqa_core::{ExplicitOptions, TaskError};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Module QA test task.
#[derive(Parser)]
#[command(name = "modqa", version, about = "Module QA test task")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Increase diagnostic logging (repeatable); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the QA test suite and write the versioned result file
    Run {
        #[command(flatten)]
        task: TaskArgs,
        /// Test engine program; receives the run request as JSON on stdin
        #[arg(long)]
        engine: PathBuf,
        /// Extra argument passed to the engine program (repeatable)
        #[arg(long = "engine-arg", allow_hyphen_values = true)]
        engine_args: Vec<String>,
        /// Runtime version to embed in the result file name instead of
        /// probing `<engine> --version`
        #[arg(long)]
        runtime_version: Option<String>,
    },

    /// Show the resolved layout and parameters without running anything
    Resolve {
        #[command(flatten)]
        task: TaskArgs,
    },
}

/// Options shared by every subcommand. Anything left out falls back to
/// the build configuration file, then to defaults.
#[derive(Args, Debug, Clone, Default)]
struct TaskArgs {
    /// Project root (default: current directory)
    #[arg(long)]
    project_path: Option<PathBuf>,
    /// Build output directory, relative to the project root (default: output)
    #[arg(long)]
    output_directory: Option<PathBuf>,
    /// Project (module) name (default: project directory name)
    #[arg(long)]
    project_name: Option<String>,
    /// Module source directory, relative to the project root
    #[arg(long)]
    source_path: Option<PathBuf>,
    /// Test result folder, relative to the output directory (default: testResults)
    #[arg(long)]
    test_output_folder: Option<PathBuf>,
    /// Build configuration file (default: build.toml at the project root, if present)
    #[arg(long)]
    build_config: Option<PathBuf>,
    /// Directory to discover ../Tests/QA from (default: executable directory)
    #[arg(long)]
    task_dir: Option<PathBuf>,

    /// Branch that changed files are compared against
    #[arg(long)]
    main_git_branch: Option<String>,
    /// Source files excluded from QA checks (comma-separated or repeated)
    #[arg(long, value_delimiter = ',')]
    exclude_source_file: Vec<String>,
    /// Built module files excluded from QA checks (comma-separated or repeated)
    #[arg(long, value_delimiter = ',')]
    exclude_module_file: Vec<String>,

    /// Only run tests with these tags
    #[arg(long, value_delimiter = ',')]
    tag: Vec<String>,
    /// Skip tests with these tags
    #[arg(long, value_delimiter = ',')]
    exclude_tag: Vec<String>,
    /// Engine output verbosity
    #[arg(long)]
    output_verbosity: Option<String>,
    /// Accepted for compatibility; structured results are always requested
    #[arg(long)]
    pass_thru: Option<bool>,
}

impl TaskArgs {
    fn into_explicit(self) -> ExplicitOptions {
        ExplicitOptions {
            project_path: self.project_path,
            output_directory: self.output_directory,
            project_name: self.project_name,
            source_path: self.source_path,
            test_output_folder: self.test_output_folder,
            build_config: self.build_config,
            task_dir: self.task_dir,
            main_git_branch: self.main_git_branch,
            exclude_source_file: Some(self.exclude_source_file),
            exclude_module_file: Some(self.exclude_module_file),
            pass_thru: self.pass_thru,
            tag: Some(self.tag),
            exclude_tag: Some(self.exclude_tag),
            output_verbosity: self.output_verbosity,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet);

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            report_error(
                &format!("cannot determine current directory: {}", e),
                cli.output,
                cli.quiet,
            );
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Run {
            task,
            engine,
            engine_args,
            runtime_version,
        } => {
            commands::run::cmd_run(
                commands::run::RunOptions {
                    explicit: task.into_explicit(),
                    engine: &engine,
                    engine_args,
                    runtime_version,
                    cwd: &cwd,
                },
                cli.output,
                cli.quiet,
            );
        }
        Commands::Resolve { task } => {
            commands::resolve::cmd_resolve(&task.into_explicit(), &cwd, cli.output, cli.quiet);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error: {}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}

/// Report a fatal task error and exit with status 1.
pub(crate) fn fail_task(err: &TaskError, output: OutputFormat, quiet: bool) -> ! {
    if !quiet {
        match output {
            OutputFormat::Text => eprintln!("error: {}", err),
            OutputFormat::Json => eprintln!("{}", err.to_json_value()),
        }
    }
    process::exit(1);
}
