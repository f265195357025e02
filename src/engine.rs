//! Compile pipeline: source → raw tree → AST → analysis → JavaScript.
//!
//! Every method builds its own trees and discards them afterwards, and every
//! stage failure leaves here as a [`KibaError`] tied to the source it came from.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info_span};

use crate::{
    analyzer::Analyzer,
    ast::{self, AstNode},
    codegen::CodeGenerator,
    config::KibaConfig,
    errors::{CompileContext, ErrorKind, ErrorReporting, KibaError, SourceContext},
    syntax::{self, RawNode},
};

/// A raw tree as an external parser may hand it over: a root node or a bare
/// list of top-level nodes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawTree {
    Node(RawNode),
    Nodes(Vec<RawNode>),
}

#[derive(Debug, Clone, Default)]
pub struct CompilePipeline {
    pub config: KibaConfig,
}

impl CompilePipeline {
    pub fn new(config: KibaConfig) -> Self {
        Self { config }
    }

    /// Parses source text into the raw tree.
    pub fn parse_source(&self, name: &str, source: &str) -> Result<RawNode, KibaError> {
        let _span = info_span!("parse", file = name).entered();
        let raw = syntax::parse(source)
            .map_err(|e| context(name, source, "parse").syntax_error(&e))?;
        debug!(statements = raw.children.len(), "parsed source");
        Ok(raw)
    }

    /// Parses and builds the AST for source text.
    pub fn build_ast(&self, name: &str, source: &str) -> Result<AstNode, KibaError> {
        let raw = self.parse_source(name, source)?;
        self.build_ast_from_raw(&RawTree::Node(raw), &SourceContext::from_file(name, source))
    }

    /// Builds the AST for a raw tree, wrapping bare node lists in a program.
    pub fn build_ast_from_raw(&self, raw: &RawTree, source: &SourceContext) -> Result<AstNode, KibaError> {
        let _span = info_span!("build", file = %source.name).entered();
        let program = match raw {
            RawTree::Node(node) => ast::build_ast(node),
            RawTree::Nodes(nodes) => ast::build_program(nodes),
        }
        .map_err(|e| CompileContext::new(source.clone(), "build").build_error(&e))?;
        debug!(nodes = program.node_count(), "built ast");
        Ok(program)
    }

    /// Runs the configured rules over a program.
    pub fn analyze(&self, program: &AstNode, source: &SourceContext) -> Result<(), KibaError> {
        let _span = info_span!("analyze", file = %source.name).entered();
        Analyzer::with_default_rules(&self.config.analyzer)
            .analyze(program)
            .map_err(|failure| CompileContext::new(source.clone(), "analyze").analysis_failure(failure))
    }

    /// Parses, builds and analyzes; returns the checked program.
    pub fn check(&self, name: &str, source: &str) -> Result<AstNode, KibaError> {
        let program = self.build_ast(name, source)?;
        self.analyze(&program, &SourceContext::from_file(name, source))?;
        Ok(program)
    }

    /// Renders an analyzed program.
    pub fn generate(&self, program: &AstNode) -> String {
        let _span = info_span!("generate").entered();
        CodeGenerator::with_config(&self.config.codegen).generate(program)
    }

    /// The full pipeline. Nothing is generated when analysis fails.
    pub fn compile(&self, name: &str, source: &str) -> Result<String, KibaError> {
        let program = self.check(name, source)?;
        Ok(self.generate(&program))
    }

    /// The pipeline for a raw tree produced outside this crate.
    pub fn compile_raw(&self, raw: &RawTree, source: &SourceContext) -> Result<String, KibaError> {
        let program = self.build_ast_from_raw(raw, source)?;
        self.analyze(&program, source)?;
        Ok(self.generate(&program))
    }

    /// Reads a raw tree from JSON text.
    pub fn parse_raw_json(&self, name: &str, json: &str) -> Result<RawTree, KibaError> {
        serde_json::from_str(json).map_err(|e| {
            context(name, json, "parse").report(
                ErrorKind::Syntax {
                    message: format!("invalid raw tree JSON: {e}"),
                },
                crate::errors::unspanned(),
            )
        })
    }

    pub fn read_file(path: &Path) -> Result<String, KibaError> {
        std::fs::read_to_string(path).map_err(|error| {
            CompileContext::new(SourceContext::fallback("CompilePipeline::read_file"), "io")
                .io_error(&path.display().to_string(), &error)
        })
    }
}

fn context(name: &str, source: &str, phase: &str) -> CompileContext {
    CompileContext::new(SourceContext::from_file(name, source), phase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::STD_LIBRARY_SHIM;
    use crate::errors::ErrorCategory;

    #[test]
    fn compile_produces_javascript() {
        let pipeline = CompilePipeline::default();
        assert_eq!(pipeline.compile("main.kiba", "var int = 1").unwrap(), "let int = 1");
    }

    #[test]
    fn analysis_failure_stops_generation() {
        let error = CompilePipeline::default()
            .compile("main.kiba", "identity(a)")
            .unwrap_err();
        assert_eq!(error.category(), ErrorCategory::Semantic);
        assert_eq!(error.diagnostics().len(), 2);
        assert_eq!(error.error_code(), "kiba::analyze::undefined_identifier");
    }

    #[test]
    fn syntax_errors_are_reported_with_parse_phase() {
        let error = CompilePipeline::default()
            .compile("main.kiba", "let = 1")
            .unwrap_err();
        assert_eq!(error.category(), ErrorCategory::Syntax);
        assert_eq!(error.source_info.phase, "parse");
    }

    #[test]
    fn bare_node_list_compiles() {
        let pipeline = CompilePipeline::default();
        let raw = pipeline
            .parse_raw_json(
                "raw.json",
                r#"[{ "type": "callExpression", "children": [
                    { "type": "propertyAccessExpression", "children": [
                        { "type": "identifier", "value": "std" },
                        { "type": "identifier", "value": "print" } ] },
                    { "type": "fnArgs", "children": [{ "type": "integer", "value": 1 }] } ] }]"#,
            )
            .unwrap();
        let code = pipeline
            .compile_raw(&raw, &SourceContext::fallback("raw.json"))
            .unwrap();
        assert_eq!(code, format!("{STD_LIBRARY_SHIM}std.print(1)"));
    }

    #[test]
    fn unknown_raw_tag_is_a_build_error() {
        let pipeline = CompilePipeline::default();
        let raw = pipeline
            .parse_raw_json("raw.json", r#"{ "type": "program", "children": [{ "type": "x" }] }"#)
            .unwrap();
        let error = pipeline
            .build_ast_from_raw(&raw, &SourceContext::fallback("raw.json"))
            .unwrap_err();
        assert_eq!(error.to_string(), "Build error: unknown node type: x");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let error = CompilePipeline::read_file(Path::new("no/such/file.kiba")).unwrap_err();
        assert_eq!(error.category(), ErrorCategory::Io);
    }
}
