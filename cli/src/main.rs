//! cmplog-opt - standalone driver for the cmplog switch-splitting and
//! branch-instrumentation pass.
//!
//! Parses an LLVM IR module (`.ll` or `.bc`), runs the four-stage pass
//! pipeline over it, writes the transformed module back out and emits the
//! `branches.txt` control-flow report the runtime callbacks key off of.

use std::{fs::File, path::PathBuf};

use clap::Parser;
use cmplog_pass::PassError;
use inkwell::context::Context;
use inkwell::memory_buffer::MemoryBuffer;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to read module {path}: {message}")]
    Read { path: PathBuf, message: String },
    #[error("failed to parse module {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("failed to write module {path}: {message}")]
    Write { path: PathBuf, message: String },
    #[error(transparent)]
    Pass(#[from] PassError),
}

/// Run the cmplog switch-splitting and branch-instrumentation pass over an
/// LLVM module.
#[derive(Parser, Debug)]
#[command(
    name = "cmplog-opt",
    about = "Lower switches and instrument predicate branches for cmplog-style fuzzing",
    version,
    rename_all = "kebab-case"
)]
struct Cli {
    /// Input LLVM IR file (.ll or .bc)
    #[arg(required = true)]
    input: PathBuf,

    /// Where to write the transformed module (defaults to overwriting the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit bitcode instead of textual IR, regardless of the output extension
    #[arg(long)]
    emit_bitcode: bool,

    /// Where to write the branches.txt control-flow report
    #[arg(long, default_value = "branches.txt")]
    report: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let cli = Cli::parse();

    let context = Context::create();
    let module = parse_module(&context, &cli.input)?;

    let report = File::create(&cli.report)?;
    cmplog_pass::run(&context, &module, report)?;

    let output = cli.output.unwrap_or_else(|| cli.input.clone());
    write_module(&module, &output, cli.emit_bitcode)?;

    log::info!(
        target: "cmplog-opt",
        "wrote instrumented module to {} and report to {}",
        output.display(),
        cli.report.display()
    );

    Ok(())
}

fn parse_module<'ctx>(
    context: &'ctx Context,
    path: &PathBuf,
) -> Result<inkwell::module::Module<'ctx>, CliError> {
    let buffer = MemoryBuffer::create_from_file(path).map_err(|e| CliError::Read {
        path: path.clone(),
        message: e.to_string(),
    })?;

    if path.extension().is_some_and(|ext| ext == "bc") {
        inkwell::module::Module::parse_bitcode_from_buffer(&buffer, context).map_err(|e| {
            CliError::Parse {
                path: path.clone(),
                message: e.to_string(),
            }
        })
    } else {
        context.create_module_from_ir(buffer).map_err(|e| CliError::Parse {
            path: path.clone(),
            message: e.to_string(),
        })
    }
}

fn write_module(
    module: &inkwell::module::Module<'_>,
    path: &PathBuf,
    emit_bitcode: bool,
) -> Result<(), CliError> {
    let as_bitcode = emit_bitcode || path.extension().is_some_and(|ext| ext == "bc");

    if as_bitcode {
        if module.write_bitcode_to_path(path) {
            Ok(())
        } else {
            Err(CliError::Write {
                path: path.clone(),
                message: "LLVMWriteBitcodeToFile failed".into(),
            })
        }
    } else {
        module.print_to_file(path).map_err(|e| CliError::Write {
            path: path.clone(),
            message: e.to_string(),
        })
    }
}
