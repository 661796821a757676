//! kir command line tool.
//!
//! Provides the `kir` binary for running transformation passes over
//! programs stored as JSON. `run` goes through the same `PassRegistry` and
//! `PassManager` that library users drive directly.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kir_core::{print_program, Program};
use kir_transforms::{register_builtin_passes, OutlineOptions, PassError, PassManager, PassRegistry};

/// kir IR tools.
#[derive(Parser)]
#[command(name = "kir", about = "kir IR transformation tools")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). Ignored
    /// when RUST_LOG is set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List the registered passes.
    Passes,

    /// Run a pass pipeline over a program.
    Run {
        /// Path to the JSON-serialized program.
        #[arg(short, long)]
        input: PathBuf,

        /// Pass to run; repeat to build a pipeline.
        #[arg(short, long = "pass", required = true)]
        passes: Vec<String>,

        /// Where to write the resulting JSON (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the resulting IR to stderr.
        #[arg(long)]
        print: bool,

        /// Verify the program after every pass.
        #[arg(long)]
        verify_each: bool,

        /// Suffix appended to the enclosing function name of each kernel.
        #[arg(long, default_value = "_kernel")]
        kernel_suffix: String,

        /// Keep constant launch operands instead of folding them into kernels.
        #[arg(long)]
        no_inline_constants: bool,
    },

    /// Print a program as text.
    Print {
        /// Path to the JSON-serialized program.
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match cli.command {
        Commands::Passes => run_passes(),
        Commands::Run {
            input,
            passes,
            output,
            print,
            verify_each,
            kernel_suffix,
            no_inline_constants,
        } => {
            let options = OutlineOptions {
                kernel_suffix,
                inline_constants: !no_inline_constants,
            };
            run_pipeline(&input, &passes, output.as_deref(), print, verify_each, &options)
        }
        Commands::Print { input } => run_print(&input),
    };
    process::exit(exit_code);
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn registry(options: &OutlineOptions) -> PassRegistry {
    let mut registry = PassRegistry::new();
    register_builtin_passes(&mut registry, options);
    registry
}

fn run_passes() -> i32 {
    for (name, description) in registry(&OutlineOptions::default()).list() {
        println!("{:<24} {}", name, description);
    }
    0
}

/// Execute the run subcommand.
///
/// Returns exit code: 0 = success, 1 = pass or verification failure,
/// 2 = unknown pass, 3 = I/O or serialization error.
fn run_pipeline(
    input: &Path,
    passes: &[String],
    output: Option<&Path>,
    print: bool,
    verify_each: bool,
    options: &OutlineOptions,
) -> i32 {
    let mut manager = match PassManager::from_pipeline(&registry(options), passes) {
        Ok(manager) => manager,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 2;
        }
    };
    manager.set_verify_each(verify_each);

    let mut program = match load_program(input) {
        Ok(program) => program,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 3;
        }
    };

    match manager.run(&mut program) {
        Ok(()) => {}
        Err(PassError::Verification { pass, errors }) => {
            eprintln!("Verification failed after '{}' with {} error(s):", pass, errors.len());
            for err in &errors {
                eprintln!("  - {}", err);
            }
            return 1;
        }
        Err(e) => {
            eprintln!("Pass failed: {}", e);
            return 1;
        }
    }

    if print {
        eprintln!("{}", print_program(&program));
    }

    let json = match serde_json::to_string_pretty(&program) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error: failed to serialize program: {}", e);
            return 3;
        }
    };
    match output {
        Some(path) => {
            if let Err(e) = fs::write(path, json) {
                eprintln!("Error: failed to write '{}': {}", path.display(), e);
                return 3;
            }
            tracing::info!(path = %path.display(), "wrote program");
        }
        None => println!("{}", json),
    }
    0
}

fn run_print(input: &Path) -> i32 {
    match load_program(input) {
        Ok(program) => {
            println!("{}", print_program(&program));
            0
        }
        Err(msg) => {
            eprintln!("Error: {}", msg);
            3
        }
    }
}

fn load_program(path: &Path) -> Result<Program, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("failed to read '{}': {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("failed to parse '{}': {}", path.display(), e))
}
