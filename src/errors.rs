//! Kiba Error Handling
//!
//! Stage errors ([`SyntaxError`], [`BuildError`], [`AnalysisFailure`]) stay
//! typed inside their modules. At the pipeline boundary they become a single
//! [`KibaError`] that carries the source text and renders through miette.

use std::fmt;
use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};

use crate::analyzer::{AnalysisFailure, SemanticDiagnostic};
use crate::ast::BuildError;
use crate::config::ConfigError;
use crate::syntax::{Span, SyntaxError};

// ============================================================================
// SOURCE CONTEXT
// ============================================================================

/// Source text an error points into.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Used when no source text exists, e.g. for a raw tree read from JSON.
    pub fn fallback(context: &str) -> Self {
        Self {
            name: "fallback".to_string(),
            content: format!("// {context}"),
        }
    }

    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }
}

impl Default for SourceContext {
    fn default() -> Self {
        Self::fallback("no source")
    }
}

// ============================================================================
// ERROR TYPE
// ============================================================================

/// The crate-wide error.
#[derive(Debug)]
pub struct KibaError {
    pub kind: ErrorKind,
    pub source_info: SourceInfo,
    pub diagnostic_info: DiagnosticInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    Syntax { message: String },
    UnknownNodeType { tag: String },
    MalformedNode { message: String },
    SemanticDiagnostics { diagnostics: Vec<SemanticDiagnostic> },
    Io { path: String, message: String },
    InvalidConfig { message: String },
    Internal { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Syntax,
    Build,
    Semantic,
    Io,
    Config,
    Internal,
}

#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub source: Arc<NamedSource<String>>,
    pub source_len: usize,
    pub primary_span: SourceSpan,
    pub phase: String,
}

#[derive(Debug, Clone)]
pub struct DiagnosticInfo {
    pub help: Option<String>,
    pub error_code: String,
}

impl ErrorKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Syntax { .. } => ErrorCategory::Syntax,
            Self::UnknownNodeType { .. } | Self::MalformedNode { .. } => ErrorCategory::Build,
            Self::SemanticDiagnostics { .. } => ErrorCategory::Semantic,
            Self::Io { .. } => ErrorCategory::Io,
            Self::InvalidConfig { .. } => ErrorCategory::Config,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "syntax_error",
            Self::UnknownNodeType { .. } => "unknown_node_type",
            Self::MalformedNode { .. } => "malformed_node",
            Self::SemanticDiagnostics { .. } => "undefined_identifier",
            Self::Io { .. } => "read_failed",
            Self::InvalidConfig { .. } => "invalid_config",
            Self::Internal { .. } => "internal",
        }
    }

    fn default_help(&self) -> Option<String> {
        match self {
            Self::UnknownNodeType { .. } | Self::MalformedNode { .. } => {
                Some("the raw tree does not match this compiler's node set".into())
            }
            Self::SemanticDiagnostics { .. } => Some(
                "declare the name before using it, or list it under `analyzer.globals`".into(),
            ),
            Self::Internal { .. } => Some("this is a compiler bug, please report it".into()),
            _ => None,
        }
    }
}

impl KibaError {
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    pub fn error_code(&self) -> &str {
        &self.diagnostic_info.error_code
    }

    /// The semantic diagnostics carried by an analysis failure, else empty.
    pub fn diagnostics(&self) -> &[SemanticDiagnostic] {
        match &self.kind {
            ErrorKind::SemanticDiagnostics { diagnostics } => diagnostics,
            _ => &[],
        }
    }

    fn primary_label(&self) -> &'static str {
        match &self.kind {
            ErrorKind::Syntax { .. } => "unexpected input",
            ErrorKind::UnknownNodeType { .. } => "unknown node",
            ErrorKind::MalformedNode { .. } => "malformed node",
            ErrorKind::SemanticDiagnostics { .. } => "not defined",
            ErrorKind::Io { .. } => "read failed",
            ErrorKind::InvalidConfig { .. } => "invalid configuration",
            ErrorKind::Internal { .. } => "internal error",
        }
    }

    fn fits_source(&self, span: SourceSpan) -> bool {
        span.offset() + span.len() <= self.source_info.source_len
    }
}

impl std::error::Error for KibaError {}

impl fmt::Display for KibaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Syntax { message } => write!(f, "Syntax error: {message}"),
            ErrorKind::UnknownNodeType { tag } => write!(f, "Build error: unknown node type: {tag}"),
            ErrorKind::MalformedNode { message } => write!(f, "Build error: {message}"),
            ErrorKind::SemanticDiagnostics { diagnostics } => {
                let messages: Vec<&str> = diagnostics.iter().map(|d| d.message.as_str()).collect();
                write!(f, "Semantic error: {}", messages.join("; "))
            }
            ErrorKind::Io { path, message } => write!(f, "I/O error: {path}: {message}"),
            ErrorKind::InvalidConfig { message } => write!(f, "Configuration error: {message}"),
            ErrorKind::Internal { message } => write!(f, "Internal error: {message}"),
        }
    }
}

impl Diagnostic for KibaError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.diagnostic_info.error_code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diagnostic_info
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels: Vec<LabeledSpan> = match &self.kind {
            ErrorKind::SemanticDiagnostics { diagnostics } => diagnostics
                .iter()
                .map(|d| (d, to_source_span(d.span)))
                .filter(|(_, span)| self.fits_source(*span))
                .map(|(d, span)| LabeledSpan::new_with_span(Some(d.message.clone()), span))
                .collect(),
            _ => vec![LabeledSpan::new_with_span(
                Some(self.primary_label().to_string()),
                self.source_info.primary_span,
            )],
        };
        Some(Box::new(labels.into_iter()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&*self.source_info.source)
    }
}

// ============================================================================
// ERROR CREATION
// ============================================================================

/// Context-aware error creation.
pub trait ErrorReporting {
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> KibaError;

    fn syntax_error(&self, error: &SyntaxError) -> KibaError {
        self.report(
            ErrorKind::Syntax {
                message: error.message.clone(),
            },
            to_source_span(error.span),
        )
    }

    fn build_error(&self, error: &BuildError) -> KibaError {
        let kind = match error {
            BuildError::UnknownNodeType { tag, .. } => ErrorKind::UnknownNodeType { tag: tag.clone() },
            other => ErrorKind::MalformedNode {
                message: other.to_string(),
            },
        };
        self.report(kind, to_source_span(error.span()))
    }

    fn analysis_failure(&self, failure: AnalysisFailure) -> KibaError {
        let span = failure
            .diagnostics
            .first()
            .map(|d| to_source_span(d.span))
            .unwrap_or_else(unspanned);
        self.report(
            ErrorKind::SemanticDiagnostics {
                diagnostics: failure.diagnostics,
            },
            span,
        )
    }

    fn io_error(&self, path: &str, error: &std::io::Error) -> KibaError {
        self.report(
            ErrorKind::Io {
                path: path.to_string(),
                message: error.to_string(),
            },
            unspanned(),
        )
    }

    fn internal_error(&self, message: &str) -> KibaError {
        self.report(
            ErrorKind::Internal {
                message: message.to_string(),
            },
            unspanned(),
        )
    }

    fn config_error(&self, error: &ConfigError) -> KibaError {
        self.report(
            ErrorKind::InvalidConfig {
                message: error.to_string(),
            },
            unspanned(),
        )
    }
}

/// Error context for one compile phase over one source.
#[derive(Debug, Clone)]
pub struct CompileContext {
    pub source: SourceContext,
    pub phase: String,
}

impl CompileContext {
    pub fn new(source: SourceContext, phase: impl Into<String>) -> Self {
        Self {
            source,
            phase: phase.into(),
        }
    }
}

impl ErrorReporting for CompileContext {
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> KibaError {
        let error_code = format!("kiba::{}::{}", self.phase, kind.code_suffix());
        let source_len = self.source.content.len();
        let primary_span = if span.offset() + span.len() <= source_len {
            span
        } else {
            unspanned()
        };
        let help = kind.default_help();

        KibaError {
            kind,
            source_info: SourceInfo {
                source: self.source.to_named_source(),
                source_len,
                primary_span,
                phase: self.phase.clone(),
            },
            diagnostic_info: DiagnosticInfo { help, error_code },
        }
    }
}

// ============================================================================
// UTILITIES
// ============================================================================

/// Placeholder span for errors with no source location.
pub fn unspanned() -> SourceSpan {
    SourceSpan::from(0..0)
}

pub fn to_source_span(span: Span) -> SourceSpan {
    SourceSpan::from(span.start.offset..span.end.offset.max(span.start.offset))
}

/// Prints a KibaError with full miette diagnostics to stderr.
pub fn print_error(error: KibaError) {
    let report = miette::Report::new(error);
    eprintln!("{report:?}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Position;

    fn span(start: usize, end: usize) -> Span {
        Span::new(
            Position {
                offset: start,
                line: 1,
                column: start + 1,
            },
            Position {
                offset: end,
                line: 1,
                column: end + 1,
            },
        )
    }

    fn context() -> CompileContext {
        CompileContext::new(SourceContext::from_file("main.kiba", "identity(a)"), "analyze")
    }

    #[test]
    fn codes_follow_phase_and_kind() {
        let error = context().build_error(&BuildError::UnknownNodeType {
            tag: "x".into(),
            span: Span::default(),
        });
        assert_eq!(error.error_code(), "kiba::analyze::unknown_node_type");
        assert_eq!(error.category(), ErrorCategory::Build);
        assert_eq!(error.to_string(), "Build error: unknown node type: x");
    }

    #[test]
    fn every_semantic_diagnostic_gets_a_label() {
        let failure = AnalysisFailure {
            diagnostics: vec![
                SemanticDiagnostic {
                    rule: "undefined-identifier",
                    message: "Error on line 1: identity is not defined".into(),
                    span: span(0, 8),
                },
                SemanticDiagnostic {
                    rule: "undefined-identifier",
                    message: "Error on line 1: a is not defined".into(),
                    span: span(9, 10),
                },
            ],
        };
        let error = context().analysis_failure(failure);
        let labels: Vec<_> = error.labels().unwrap().collect();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[1].offset(), 9);
        assert_eq!(error.diagnostics().len(), 2);
        assert!(error.to_string().contains("a is not defined"));
    }

    #[test]
    fn spans_outside_the_source_are_dropped() {
        let error = context().syntax_error(&SyntaxError {
            message: "unexpected".into(),
            span: span(40, 45),
        });
        assert_eq!(error.source_info.primary_span, unspanned());
    }

    #[test]
    fn report_renders_through_miette() {
        let error = context().syntax_error(&SyntaxError {
            message: "expected ')'".into(),
            span: span(11, 11),
        });
        let rendered = format!("{:?}", miette::Report::new(error));
        assert!(rendered.contains("kiba::analyze::syntax_error"));
    }
}
