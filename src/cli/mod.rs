//! The Kiba Command-Line Interface.
//!
//! Parses arguments, installs logging, loads configuration and dispatches to
//! the subcommand handlers. Handlers return [`KibaError`]; `run` renders it
//! and exits with status 1.

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::args::{Command, KibaArgs};
use crate::config::KibaConfig;
use crate::engine::CompilePipeline;
use crate::errors::{print_error, CompileContext, ErrorReporting, KibaError, SourceContext};
use crate::test_harness::{run_all_tests, TestConfig};

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = KibaArgs::parse();
    init_tracing(args.verbose);

    let result = load_config(args.config.as_deref()).and_then(|config| {
        let pipeline = CompilePipeline::new(config);
        match args.command {
            Command::Compile { file, output } => handle_compile(&pipeline, &file, output),
            Command::Check { file } => handle_check(&pipeline, &file),
            Command::Ast { file, json } => handle_ast(&pipeline, &file, json),
            Command::Raw { file } => handle_raw(&pipeline, &file),
            Command::Build { file, output } => handle_build(&pipeline, &file, output),
            Command::Test { path, filter } => handle_test(pipeline, path, filter.as_deref()),
        }
    });

    if let Err(error) = result {
        print_error(error);
        process::exit(1);
    }
}

/// Installs the stderr log subscriber. `-v`/`-vv` override `RUST_LOG`.
pub fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("kiba=debug"),
        _ => EnvFilter::new("kiba=trace"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn load_config(explicit: Option<&Path>) -> Result<KibaConfig, KibaError> {
    KibaConfig::discover(explicit, Path::new(".")).map_err(|error| {
        CompileContext::new(SourceContext::fallback("configuration"), "config").config_error(&error)
    })
}

// ============================================================================
// HANDLERS
// ============================================================================

fn handle_compile(
    pipeline: &CompilePipeline,
    file: &Path,
    output: Option<PathBuf>,
) -> Result<(), KibaError> {
    let source = CompilePipeline::read_file(file)?;
    let code = pipeline.compile(&file.display().to_string(), &source)?;
    emit(code, output.as_deref())
}

fn handle_check(pipeline: &CompilePipeline, file: &Path) -> Result<(), KibaError> {
    let name = file.display().to_string();
    let source = CompilePipeline::read_file(file)?;
    let program = pipeline.check(&name, &source)?;
    debug!(nodes = program.node_count(), "check passed");
    output::print_success(&format!("{name}: no problems found"));
    Ok(())
}

fn handle_ast(pipeline: &CompilePipeline, file: &Path, json: bool) -> Result<(), KibaError> {
    let source = CompilePipeline::read_file(file)?;
    let program = pipeline.build_ast(&file.display().to_string(), &source)?;
    if json {
        println!("{:#}", program.to_object());
    } else {
        println!("{}", program.pretty());
    }
    Ok(())
}

fn handle_raw(pipeline: &CompilePipeline, file: &Path) -> Result<(), KibaError> {
    let name = file.display().to_string();
    let source = CompilePipeline::read_file(file)?;
    let raw = pipeline.parse_source(&name, &source)?;
    let json = serde_json::to_string_pretty(&raw).map_err(|e| {
        CompileContext::new(SourceContext::from_file(&name, source.as_str()), "parse")
            .internal_error(&format!("failed to serialize raw tree: {e}"))
    })?;
    println!("{json}");
    Ok(())
}

fn handle_build(
    pipeline: &CompilePipeline,
    file: &Path,
    output: Option<PathBuf>,
) -> Result<(), KibaError> {
    let name = file.display().to_string();
    let json = CompilePipeline::read_file(file)?;
    let raw = pipeline.parse_raw_json(&name, &json)?;
    // spans in a raw tree point into source text that is not available here
    let code = pipeline.compile_raw(&raw, &SourceContext::fallback(&name))?;
    emit(code, output.as_deref())
}

fn handle_test(
    pipeline: CompilePipeline,
    path: PathBuf,
    filter: Option<&str>,
) -> Result<(), KibaError> {
    let config = TestConfig {
        test_root: path,
        compiler: pipeline.config,
        ..TestConfig::default()
    };
    let (_passed, failed, _skipped) = run_all_tests(filter, &config);
    if failed > 0 {
        process::exit(1);
    }
    Ok(())
}

fn emit(code: String, output: Option<&Path>) -> Result<(), KibaError> {
    let Some(path) = output else {
        println!("{code}");
        return Ok(());
    };
    std::fs::write(path, format!("{code}\n")).map_err(|error| {
        CompileContext::new(SourceContext::fallback("output"), "io")
            .io_error(&path.display().to_string(), &error)
    })?;
    output::print_success(&format!("wrote {}", path.display()));
    Ok(())
}
