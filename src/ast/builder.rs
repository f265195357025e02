//! # AST Builder Module
//!
//! ## Purpose
//! Transforms the untyped raw parse tree into the typed AST. Every raw node
//! becomes exactly one AST node; children keep their order and every node
//! keeps its source span.
//!
//! ## Invariants
//! - Never mutates input
//! - Node ids are assigned in post-order, starting from zero for each build
//! - Child shapes are checked against the node kind, so later stages can index
//!   children positionally

use thiserror::Error;

use crate::ast::{AstNode, NodeId, NodeKind};
use crate::syntax::{tags, RawNode, RawValue, Span};

// ============================================================================
// ERRORS
// ============================================================================

/// Failure while converting a raw node. The whole build aborts on the first one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("unknown node type: {tag}")]
    UnknownNodeType { tag: String, span: Span },

    #[error("{tag} node is missing required field '{field}'")]
    MissingField {
        tag: String,
        field: &'static str,
        span: Span,
    },

    #[error("{tag} node has invalid field '{field}': {reason}")]
    InvalidField {
        tag: String,
        field: &'static str,
        reason: String,
        span: Span,
    },

    #[error("{tag} node has invalid shape: {reason}")]
    InvalidShape {
        tag: String,
        reason: String,
        span: Span,
    },
}

impl BuildError {
    pub fn span(&self) -> Span {
        match self {
            BuildError::UnknownNodeType { span, .. }
            | BuildError::MissingField { span, .. }
            | BuildError::InvalidField { span, .. }
            | BuildError::InvalidShape { span, .. } => *span,
        }
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Builds the AST for a raw tree. The root may be a `program` or any other node.
///
/// # Examples
///
/// ```rust
/// use kiba::{ast::{build_ast, NodeType}, syntax::parse};
/// let ast = build_ast(&parse("var a = 1").unwrap()).unwrap();
/// assert!(ast.is(NodeType::Program));
/// assert!(ast.children[0].is(NodeType::VariableDeclaration));
/// ```
pub fn build_ast(raw: &RawNode) -> Result<AstNode, BuildError> {
    AstBuilder::new().build(raw)
}

/// Builds a `Program` node from a bare list of top-level raw nodes.
pub fn build_program(nodes: &[RawNode]) -> Result<AstNode, BuildError> {
    let mut builder = AstBuilder::new();
    let children = nodes
        .iter()
        .map(|node| builder.build(node))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(builder.make_node(NodeKind::Program, children, Span::default()))
}

/// Stateful converter holding the post-order id counter.
#[derive(Debug, Default)]
pub struct AstBuilder {
    next_id: u32,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(&mut self, raw: &RawNode) -> Result<AstNode, BuildError> {
        let kind = resolve_kind(raw)?;
        let children = raw
            .children
            .iter()
            .map(|child| self.build(child))
            .collect::<Result<Vec<_>, _>>()?;
        check_shape(raw, &kind, &children)?;
        Ok(self.make_node(kind, children, raw.location))
    }

    fn make_node(&mut self, kind: NodeKind, children: Vec<AstNode>, span: Span) -> AstNode {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        AstNode {
            id,
            kind,
            children,
            span,
        }
    }
}

// ============================================================================
// KIND RESOLUTION
// ============================================================================

fn resolve_kind(raw: &RawNode) -> Result<NodeKind, BuildError> {
    let kind = match raw.tag.as_str() {
        tags::PROGRAM => NodeKind::Program,
        tags::INTEGER => match raw.value {
            Some(RawValue::Integer(value)) => NodeKind::IntegerLiteral(value),
            Some(_) => return Err(invalid_field(raw, "value", "expected an integer")),
            None => return Err(missing_field(raw, "value")),
        },
        tags::STRING => match &raw.value {
            Some(RawValue::String(value)) => NodeKind::StringLiteral(value.clone()),
            Some(_) => return Err(invalid_field(raw, "value", "expected a string")),
            None => return Err(missing_field(raw, "value")),
        },
        tags::BOOLEAN => match raw.value {
            Some(RawValue::Boolean(value)) => NodeKind::BooleanLiteral(value),
            Some(_) => return Err(invalid_field(raw, "value", "expected a boolean")),
            None => return Err(missing_field(raw, "value")),
        },
        tags::VOID => NodeKind::VoidLiteral,
        tags::IDENTIFIER => NodeKind::Identifier(identifier_name(raw)?),
        tags::ARRAY => NodeKind::Array,
        tags::OBJECT => NodeKind::Object,
        tags::OBJECT_PROPERTY_DECLARATION => NodeKind::ObjectPropertyDeclaration,
        tags::VARIABLE_DECLARATION => {
            let name = raw
                .variable_name
                .as_ref()
                .or(raw.name.as_ref())
                .ok_or_else(|| missing_field(raw, "variableName"))?;
            NodeKind::VariableDeclaration {
                name: name.clone(),
                mutable: raw.mutable.unwrap_or(false),
            }
        }
        tags::FN_DECLARATION => {
            let name = raw.name.as_ref().ok_or_else(|| missing_field(raw, "name"))?;
            NodeKind::FunctionDeclaration { name: name.clone() }
        }
        tags::NAMED_FN_EXPRESSION => NodeKind::NamedFunctionExpression,
        tags::ANONYMOUS_FN_EXPRESSION => NodeKind::AnonymousFunctionExpression,
        tags::FN_PARAMS => NodeKind::FunctionParameters,
        tags::FN_ARGS => NodeKind::FunctionArguments,
        tags::CALL_EXPRESSION => NodeKind::CallExpression,
        tags::BINARY_OPERATOR => {
            let operator = raw
                .operator
                .as_ref()
                .ok_or_else(|| missing_field(raw, "operator"))?;
            NodeKind::BinaryOperator(operator.clone())
        }
        tags::BINARY_EXPRESSION => NodeKind::BinaryExpression,
        tags::PROPERTY_ACCESS_EXPRESSION => NodeKind::PropertyAccessExpression,
        tags::RETURN_EXPRESSION => NodeKind::ReturnExpression,
        _ => {
            return Err(BuildError::UnknownNodeType {
                tag: raw.tag.clone(),
                span: raw.location,
            })
        }
    };
    Ok(kind)
}

/// Identifier names live in `value`; some producers put them in `name`.
fn identifier_name(raw: &RawNode) -> Result<String, BuildError> {
    match (&raw.value, &raw.name) {
        (Some(RawValue::String(name)), _) => Ok(name.clone()),
        (Some(_), _) => Err(invalid_field(raw, "value", "expected a string")),
        (None, Some(name)) => Ok(name.clone()),
        (None, None) => Err(missing_field(raw, "value")),
    }
}

// ============================================================================
// SHAPE VALIDATION
// ============================================================================

fn check_shape(raw: &RawNode, kind: &NodeKind, children: &[AstNode]) -> Result<(), BuildError> {
    use crate::ast::NodeType as T;

    let types: Vec<T> = children.iter().map(AstNode::node_type).collect();

    match kind {
        NodeKind::IntegerLiteral(_)
        | NodeKind::StringLiteral(_)
        | NodeKind::BooleanLiteral(_)
        | NodeKind::VoidLiteral
        | NodeKind::Identifier(_)
        | NodeKind::BinaryOperator(_) => {
            if !children.is_empty() {
                return Err(invalid_shape(raw, "leaf node must not have children"));
            }
        }

        NodeKind::Program | NodeKind::Array | NodeKind::FunctionArguments => {}

        NodeKind::Object => {
            if types.iter().any(|t| *t != T::ObjectPropertyDeclaration) {
                return Err(invalid_shape(raw, "expected only property declarations"));
            }
        }

        NodeKind::ObjectPropertyDeclaration => {
            if types.len() != 2 || types[0] != T::Identifier {
                return Err(invalid_shape(raw, "expected [identifier, value]"));
            }
        }

        NodeKind::VariableDeclaration { .. } | NodeKind::ReturnExpression => {
            if children.is_empty() {
                return Err(invalid_shape(raw, "expected at least one expression"));
            }
        }

        NodeKind::FunctionDeclaration { .. } | NodeKind::AnonymousFunctionExpression => {
            if types.first() != Some(&T::FunctionParameters) {
                return Err(invalid_shape(raw, "expected [parameters, ..body]"));
            }
            if matches!(kind, NodeKind::AnonymousFunctionExpression) && types.len() < 2 {
                return Err(invalid_shape(raw, "function expression has no body"));
            }
        }

        NodeKind::NamedFunctionExpression => {
            if types.len() < 3 || types[0] != T::Identifier || types[1] != T::FunctionParameters {
                return Err(invalid_shape(raw, "expected [name, parameters, ..body]"));
            }
        }

        NodeKind::FunctionParameters => {
            if types.iter().any(|t| *t != T::Identifier) {
                return Err(invalid_shape(raw, "parameters must be identifiers"));
            }
        }

        NodeKind::CallExpression => {
            if types.len() != 2 || types[1] != T::FunctionArguments {
                return Err(invalid_shape(raw, "expected [callee, arguments]"));
            }
        }

        NodeKind::BinaryExpression => {
            let alternates = types
                .iter()
                .enumerate()
                .all(|(i, t)| (i % 2 == 1) == (*t == T::BinaryOperator));
            if types.len() < 3 || types.len() % 2 == 0 || !alternates {
                return Err(invalid_shape(raw, "expected alternating operands and operators"));
            }
        }

        NodeKind::PropertyAccessExpression => {
            if types.len() != 2 || types[1] != T::Identifier {
                return Err(invalid_shape(raw, "expected [object, property-identifier]"));
            }
        }
    }

    Ok(())
}

// ============================================================================
// ERROR HELPERS
// ============================================================================

fn missing_field(raw: &RawNode, field: &'static str) -> BuildError {
    BuildError::MissingField {
        tag: raw.tag.clone(),
        field,
        span: raw.location,
    }
}

fn invalid_field(raw: &RawNode, field: &'static str, reason: &str) -> BuildError {
    BuildError::InvalidField {
        tag: raw.tag.clone(),
        field,
        reason: reason.to_string(),
        span: raw.location,
    }
}

fn invalid_shape(raw: &RawNode, reason: &str) -> BuildError {
    BuildError::InvalidShape {
        tag: raw.tag.clone(),
        reason: reason.to_string(),
        span: raw.location,
    }
}
