//! Syntax module for the Kiba language
//!
//! This module owns the front end: the pest grammar, the untyped raw parse
//! tree it produces, and the source-location types every later stage carries.
//! Nothing downstream of this module sees pest types; the AST builder only
//! consumes [`RawNode`] trees, which may equally come from JSON written by an
//! external parser.

use serde::{Deserialize, Serialize};

pub mod error;
pub mod parser;

pub use error::SyntaxError;
pub use parser::parse;

// ============================================================================
// SOURCE LOCATIONS
// ============================================================================

/// A point in the source text. Lines and columns are 1-based.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

/// Represents a span in the source code.
///
/// Attached to every raw and AST node and carried through the builder
/// unchanged. `Span::default()` is the empty span used for synthesized nodes.
///
/// # Examples
///
/// ```rust
/// use kiba::syntax::{Position, Span};
/// let span = Span::new(
///     Position { offset: 0, line: 1, column: 1 },
///     Position { offset: 5, line: 1, column: 6 },
/// );
/// assert_eq!(span.len(), 5);
/// assert!(Span::default().is_empty());
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// RAW PARSE TREE
// ============================================================================

/// Tag-specific literal payload of a raw node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Boolean(bool),
    Integer(i64),
    String(String),
}

/// One node of the untyped parse tree.
///
/// The serialized form matches what a PEG.js-style parser emits:
///
/// ```json
/// { "type": "variableDeclaration", "variableName": "a", "mutable": false,
///   "location": { "start": { "offset": 0, "line": 1, "column": 1 },
///                 "end":   { "offset": 9, "line": 1, "column": 10 } },
///   "children": [ { "type": "integer", "value": 1, "children": [] } ] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    #[serde(rename = "type")]
    pub tag: String,
    #[serde(default)]
    pub children: Vec<RawNode>,
    #[serde(default)]
    pub location: Span,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<RawValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
}

impl RawNode {
    /// Creates a node with the given tag and children and no extra fields.
    pub fn new(tag: impl Into<String>, children: Vec<RawNode>, location: Span) -> Self {
        Self {
            tag: tag.into(),
            children,
            location,
            value: None,
            name: None,
            variable_name: None,
            mutable: None,
            operator: None,
        }
    }

    pub fn with_value(mut self, value: RawValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, mutable: bool) -> Self {
        self.variable_name = Some(name.into());
        self.mutable = Some(mutable);
        self
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    /// Wraps a bare list of top-level nodes into a `program` node with an empty span.
    pub fn program(children: Vec<RawNode>) -> Self {
        Self::new(tags::PROGRAM, children, Span::default())
    }
}

/// The closed set of raw-node tags shared by the grammar and the AST builder.
pub mod tags {
    pub const PROGRAM: &str = "program";
    pub const INTEGER: &str = "integer";
    pub const STRING: &str = "string";
    pub const BOOLEAN: &str = "boolean";
    pub const VOID: &str = "void";
    pub const IDENTIFIER: &str = "identifier";
    pub const ARRAY: &str = "array";
    pub const OBJECT: &str = "object";
    pub const OBJECT_PROPERTY_DECLARATION: &str = "objectPropertyDeclaration";
    pub const VARIABLE_DECLARATION: &str = "variableDeclaration";
    pub const FN_DECLARATION: &str = "fnDeclaration";
    pub const NAMED_FN_EXPRESSION: &str = "namedFnExpression";
    pub const ANONYMOUS_FN_EXPRESSION: &str = "anonymousFnExpression";
    pub const FN_PARAMS: &str = "fnParams";
    pub const FN_ARGS: &str = "fnArgs";
    pub const CALL_EXPRESSION: &str = "callExpression";
    pub const BINARY_OPERATOR: &str = "binaryOperator";
    pub const BINARY_EXPRESSION: &str = "binaryExpression";
    pub const PROPERTY_ACCESS_EXPRESSION: &str = "propertyAccessExpression";
    pub const RETURN_EXPRESSION: &str = "returnExpression";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_node_reads_parser_json() {
        let json = r#"{
            "type": "variableDeclaration",
            "variableName": "a",
            "mutable": true,
            "children": [{ "type": "integer", "value": 1 }]
        }"#;
        let node: RawNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.tag, "variableDeclaration");
        assert_eq!(node.variable_name.as_deref(), Some("a"));
        assert_eq!(node.mutable, Some(true));
        assert_eq!(node.children[0].value, Some(RawValue::Integer(1)));
        assert_eq!(node.location, Span::default());
    }

    #[test]
    fn raw_values_keep_their_json_type() {
        let values: Vec<RawValue> = serde_json::from_str(r#"[true, 7, "7"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                RawValue::Boolean(true),
                RawValue::Integer(7),
                RawValue::String("7".into())
            ]
        );
    }
}
