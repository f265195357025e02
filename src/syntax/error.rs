use thiserror::Error;

use crate::syntax::Span;

/// Structured representation of a syntax error.
///
/// Syntax errors are fatal: the pipeline stops before any AST is built.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} (line {line}, column {column})", line = .span.start.line, column = .span.start.column)]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
}

/// Constructs a syntax error at the given span.
///
/// # Example
/// ```rust
/// use kiba::syntax::{error::syntax_error, Span};
/// let error = syntax_error("unexpected ')'", Span::default());
/// assert_eq!(error.message, "unexpected ')'");
/// ```
pub fn syntax_error(message: impl Into<String>, span: Span) -> SyntaxError {
    SyntaxError {
        message: message.into(),
        span,
    }
}
