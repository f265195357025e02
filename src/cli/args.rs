//! Command-line arguments and subcommands for the Kiba CLI.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "kiba", version, about = "Compiles Kiba source to JavaScript.")]
pub struct KibaArgs {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG applies otherwise.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file. Defaults to ./kiba.yaml when present.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Full pipeline: parse, build, analyze and generate JavaScript.
    Compile {
        #[arg(required = true)]
        file: PathBuf,
        /// Write the output here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Parse, build and analyze; report every diagnostic.
    Check {
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Show the Abstract Syntax Tree (AST) for a script.
    Ast {
        #[arg(required = true)]
        file: PathBuf,
        /// Print the structural JSON form instead of the label tree.
        #[arg(long)]
        json: bool,
    },
    /// Show the raw parse tree as JSON.
    Raw {
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Compile a raw parse tree (JSON) produced by an external parser.
    Build {
        #[arg(required = true)]
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Discover and run the YAML compile suites in a directory.
    Test {
        #[arg(default_value = "tests/suites")]
        path: PathBuf,
        /// Only run cases whose name contains this substring.
        #[arg(long)]
        filter: Option<String>,
    },
}
