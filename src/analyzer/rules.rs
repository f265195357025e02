//! Semantic rules run by the [`Analyzer`](super::Analyzer).

use std::collections::HashSet;
use std::fmt;

use crate::analyzer::RuleContext;
use crate::ast::{AstNode, NodeType};
use crate::syntax::Span;

/// One finding reported by a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticDiagnostic {
    /// Name of the rule that produced it.
    pub rule: &'static str,
    pub message: String,
    pub span: Span,
}

impl fmt::Display for SemanticDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

pub type RuleResult = Option<SemanticDiagnostic>;

/// A check registered against one node type.
pub trait Rule {
    fn name(&self) -> &'static str;

    fn check(&self, node: &AstNode, context: &RuleContext<'_, '_>) -> RuleResult;
}

// ============================================================================
// UNDEFINED IDENTIFIER
// ============================================================================

/// Reports identifiers that no enclosing scope binds.
#[derive(Debug, Clone, Default)]
pub struct UndefinedIdentifierRule {
    globals: HashSet<String>,
}

impl UndefinedIdentifierRule {
    pub const NAME: &'static str = "undefined-identifier";

    pub fn new() -> Self {
        Self::default()
    }

    /// Names treated as always defined, such as the standard library binding.
    pub fn with_globals<I, S>(globals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            globals: globals.into_iter().map(Into::into).collect(),
        }
    }
}

impl Rule for UndefinedIdentifierRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn check(&self, node: &AstNode, context: &RuleContext<'_, '_>) -> RuleResult {
        let name = node.identifier_name()?;

        if is_name_position(node, context.parent) || self.globals.contains(name) {
            return None;
        }
        if context.scope.resolves(name) {
            return None;
        }

        Some(SemanticDiagnostic {
            rule: Self::NAME,
            message: format!("Error on line {}: {} is not defined", node.span.start.line, name),
            span: node.span,
        })
    }
}

/// Property names and object keys name a slot; they do not reference a binding.
fn is_name_position(node: &AstNode, parent: Option<&AstNode>) -> bool {
    let Some(parent) = parent else {
        return false;
    };
    let slot = match parent.node_type() {
        NodeType::PropertyAccessExpression => 1,
        NodeType::ObjectPropertyDeclaration => 0,
        _ => return false,
    };
    parent.children.get(slot).is_some_and(|child| child.id == node.id)
}
