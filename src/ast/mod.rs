//! AST module for the Kiba language
//!
//! This module provides the typed Abstract Syntax Tree shared by the scope
//! builder, the rule engine and the code generator. The tree is built once per
//! compile request by [`builder::AstBuilder`] and is read-only afterwards.

// ============================================================================
// IMPORTS
// ============================================================================

use std::fmt;

use serde_json::{json, Map, Value};

use crate::syntax::Span;

pub mod builder;

pub use builder::{build_ast, build_program, AstBuilder, BuildError};

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// Stable per-build node identity, assigned in post-order by the builder.
///
/// Used as the visited-set key during analysis: two structurally identical
/// nodes still have distinct ids.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Field-less discriminant of [`NodeKind`]; the key of the rule registry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NodeType {
    Program,
    IntegerLiteral,
    StringLiteral,
    BooleanLiteral,
    VoidLiteral,
    Identifier,
    Array,
    Object,
    ObjectPropertyDeclaration,
    VariableDeclaration,
    FunctionDeclaration,
    NamedFunctionExpression,
    AnonymousFunctionExpression,
    FunctionParameters,
    FunctionArguments,
    CallExpression,
    BinaryOperator,
    BinaryExpression,
    PropertyAccessExpression,
    ReturnExpression,
}

impl NodeType {
    /// Human-readable type name, used in labels and the structural JSON form.
    pub const fn name(self) -> &'static str {
        match self {
            NodeType::Program => "program",
            NodeType::IntegerLiteral => "integer",
            NodeType::StringLiteral => "string",
            NodeType::BooleanLiteral => "boolean",
            NodeType::VoidLiteral => "void",
            NodeType::Identifier => "identifier",
            NodeType::Array => "array",
            NodeType::Object => "object",
            NodeType::ObjectPropertyDeclaration => "object property declaration",
            NodeType::VariableDeclaration => "variable declaration",
            NodeType::FunctionDeclaration => "function declaration",
            NodeType::NamedFunctionExpression => "named fn expression",
            NodeType::AnonymousFunctionExpression => "anonymous fn expression",
            NodeType::FunctionParameters => "function parameters",
            NodeType::FunctionArguments => "function arguments",
            NodeType::CallExpression => "call expression",
            NodeType::BinaryOperator => "binary operator",
            NodeType::BinaryExpression => "binary expression",
            NodeType::PropertyAccessExpression => "property access expression",
            NodeType::ReturnExpression => "return expression",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The closed set of node variants and their variant-specific data.
///
/// The meaning of `AstNode::children` for each variant:
///
/// | Variant | Children |
/// |---|---|
/// | `Program` | top-level statements |
/// | `Array` | elements |
/// | `Object` | property declarations |
/// | `ObjectPropertyDeclaration` | `[name, value]` |
/// | `VariableDeclaration` | initializer expression(s) |
/// | `FunctionDeclaration` | `[parameters, ..body]` |
/// | `NamedFunctionExpression` | `[name-identifier, parameters, ..body]` |
/// | `AnonymousFunctionExpression` | `[parameters, ..body]` |
/// | `FunctionParameters` | parameter identifiers |
/// | `FunctionArguments` | argument expressions |
/// | `CallExpression` | `[callee, arguments]` |
/// | `BinaryExpression` | operand/operator sequence |
/// | `PropertyAccessExpression` | `[object, property]` |
/// | `ReturnExpression` | returned expression(s) |
///
/// Literals, `Identifier` and `BinaryOperator` are leaves.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Program,
    IntegerLiteral(i64),
    StringLiteral(String),
    BooleanLiteral(bool),
    VoidLiteral,
    Identifier(String),
    Array,
    Object,
    ObjectPropertyDeclaration,
    VariableDeclaration { name: String, mutable: bool },
    FunctionDeclaration { name: String },
    NamedFunctionExpression,
    AnonymousFunctionExpression,
    FunctionParameters,
    FunctionArguments,
    CallExpression,
    BinaryOperator(String),
    BinaryExpression,
    PropertyAccessExpression,
    ReturnExpression,
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Program => NodeType::Program,
            NodeKind::IntegerLiteral(_) => NodeType::IntegerLiteral,
            NodeKind::StringLiteral(_) => NodeType::StringLiteral,
            NodeKind::BooleanLiteral(_) => NodeType::BooleanLiteral,
            NodeKind::VoidLiteral => NodeType::VoidLiteral,
            NodeKind::Identifier(_) => NodeType::Identifier,
            NodeKind::Array => NodeType::Array,
            NodeKind::Object => NodeType::Object,
            NodeKind::ObjectPropertyDeclaration => NodeType::ObjectPropertyDeclaration,
            NodeKind::VariableDeclaration { .. } => NodeType::VariableDeclaration,
            NodeKind::FunctionDeclaration { .. } => NodeType::FunctionDeclaration,
            NodeKind::NamedFunctionExpression => NodeType::NamedFunctionExpression,
            NodeKind::AnonymousFunctionExpression => NodeType::AnonymousFunctionExpression,
            NodeKind::FunctionParameters => NodeType::FunctionParameters,
            NodeKind::FunctionArguments => NodeType::FunctionArguments,
            NodeKind::CallExpression => NodeType::CallExpression,
            NodeKind::BinaryOperator(_) => NodeType::BinaryOperator,
            NodeKind::BinaryExpression => NodeType::BinaryExpression,
            NodeKind::PropertyAccessExpression => NodeType::PropertyAccessExpression,
            NodeKind::ReturnExpression => NodeType::ReturnExpression,
        }
    }
}

/// One node of the program tree. Children are exclusively owned.
#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub children: Vec<AstNode>,
    pub span: Span,
}

// ============================================================================
// PUBLIC API IMPLEMENTATION
// ============================================================================

impl AstNode {
    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    pub fn is(&self, node_type: NodeType) -> bool {
        self.node_type() == node_type
    }

    /// The name of an `Identifier` node.
    pub fn identifier_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// The name a declaration binds in its enclosing scope, if any.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use kiba::{ast::build_ast, syntax::parse};
    /// let program = build_ast(&parse("let f = (x) -> x\nvar y = 1").unwrap()).unwrap();
    /// let names: Vec<_> = program.children.iter().filter_map(|c| c.declared_name()).collect();
    /// assert_eq!(names, vec!["f", "y"]);
    /// ```
    pub fn declared_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::VariableDeclaration { name, .. } => Some(name),
            NodeKind::FunctionDeclaration { name } => Some(name),
            NodeKind::NamedFunctionExpression => self.children.first()?.identifier_name(),
            _ => None,
        }
    }

    /// Whether this node opens a new lexical scope.
    pub fn is_scope_forming(&self) -> bool {
        matches!(
            self.node_type(),
            NodeType::NamedFunctionExpression
                | NodeType::AnonymousFunctionExpression
                | NodeType::FunctionDeclaration
        )
    }

    /// Direct children of the given type, in source order.
    pub fn children_of_type(&self, node_type: NodeType) -> impl Iterator<Item = &AstNode> + '_ {
        self.children.iter().filter(move |c| c.is(node_type))
    }

    /// Pre-order iterator over this node and all its descendants.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    pub fn node_count(&self) -> usize {
        self.walk().count()
    }

    /// Short diagnostic label, e.g. `identifier: a`.
    pub fn label(&self) -> String {
        let name = self.node_type().name();
        match &self.kind {
            NodeKind::IntegerLiteral(value) => format!("{name}: {value}"),
            NodeKind::StringLiteral(value) => format!("{name}: '{value}'"),
            NodeKind::BooleanLiteral(value) => format!("{name}: {value}"),
            NodeKind::Identifier(value) => format!("{name}: {value}"),
            NodeKind::BinaryOperator(operator) => format!("{name}: {operator}"),
            NodeKind::VariableDeclaration { name: var, mutable } => {
                if *mutable {
                    format!("{name}: {var} (mutable)")
                } else {
                    format!("{name}: {var}")
                }
            }
            NodeKind::FunctionDeclaration { name: function } => format!("{name}: {function}"),
            _ => name.to_string(),
        }
    }

    /// Structural JSON form without ids and spans.
    pub fn to_object(&self) -> Value {
        let mut object = Map::new();
        object.insert("_type".into(), json!(self.node_type().name()));

        match &self.kind {
            NodeKind::IntegerLiteral(value) => {
                object.insert("value".into(), json!(value));
            }
            NodeKind::StringLiteral(value) | NodeKind::Identifier(value) => {
                object.insert("value".into(), json!(value));
            }
            NodeKind::BooleanLiteral(value) => {
                object.insert("value".into(), json!(value));
            }
            NodeKind::BinaryOperator(operator) => {
                object.insert("operator".into(), json!(operator));
            }
            NodeKind::VariableDeclaration { name, mutable } => {
                object.insert("name".into(), json!(name));
                object.insert("mutable".into(), json!(mutable));
            }
            NodeKind::FunctionDeclaration { name } => {
                object.insert("name".into(), json!(name));
            }
            _ => {}
        }

        let children = self.children.iter().map(AstNode::to_object).collect();
        object.insert("children".into(), Value::Array(children));
        Value::Object(object)
    }

    /// Equality that ignores node ids and source spans.
    pub fn structurally_eq(&self, other: &AstNode) -> bool {
        self.kind == other.kind
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.structurally_eq(b))
    }

    /// Indented label tree, one node per line.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.pretty_into(&mut out, 0);
        out
    }

    // ------------------------------------------------------------------------
    // Pretty-printing helpers
    // ------------------------------------------------------------------------

    fn pretty_into(&self, out: &mut String, depth: usize) {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&"  ".repeat(depth));
        out.push_str(&self.label());
        for child in &self.children {
            child.pretty_into(out, depth + 1);
        }
    }
}

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty())
    }
}

/// Pre-order traversal produced by [`AstNode::walk`].
pub struct Walk<'a> {
    stack: Vec<&'a AstNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a AstNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn program(source: &str) -> AstNode {
        build_ast(&parse(source).unwrap()).unwrap()
    }

    #[test]
    fn labels_carry_variant_data() {
        let ast = program("var a = 'x'");
        let declaration = &ast.children[0];
        assert_eq!(declaration.label(), "variable declaration: a (mutable)");
        assert_eq!(declaration.children[0].label(), "string: 'x'");
    }

    #[test]
    fn structural_object_drops_spans_and_ids() {
        let ast = program("let a = 1");
        assert_eq!(
            ast.to_object(),
            json!({
                "_type": "program",
                "children": [{
                    "_type": "variable declaration",
                    "name": "a",
                    "mutable": false,
                    "children": [{ "_type": "integer", "value": 1, "children": [] }]
                }]
            })
        );
    }

    #[test]
    fn walk_is_pre_order() {
        let ast = program("f(a)");
        let types: Vec<_> = ast.walk().map(AstNode::node_type).collect();
        assert_eq!(
            types,
            vec![
                NodeType::Program,
                NodeType::CallExpression,
                NodeType::Identifier,
                NodeType::FunctionArguments,
                NodeType::Identifier,
            ]
        );
    }

    #[test]
    fn pretty_indents_children() {
        let ast = program("let a = [1]");
        assert_eq!(
            ast.pretty(),
            "program\n  variable declaration: a\n    array\n      integer: 1"
        );
    }

    #[test]
    fn scope_forming_variants() {
        let ast = program("fn f() { return 1 }\nlet g = () -> 1\nh(() -> 2)");
        assert!(ast.children[0].is_scope_forming());
        assert!(ast.children[1].is_scope_forming());
        assert!(!ast.children[2].is_scope_forming());
    }
}
