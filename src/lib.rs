//! Kiba: a small expression-oriented language compiled to JavaScript.
//!
//! The pipeline is `syntax` (pest grammar → raw tree) → `ast` (typed tree) →
//! `analyzer` (scopes and rules) → `codegen` (JavaScript). [`engine`] wires
//! the stages together; [`cli`] and [`test_harness`] sit on top.

pub mod analyzer;
pub mod ast;
pub mod cli;
pub mod codegen;
pub mod config;
pub mod engine;
pub mod errors;
pub mod syntax;
pub mod test_harness;

pub use crate::engine::CompilePipeline;
pub use crate::errors::{ErrorKind, KibaError};
