//! # Semantic Analyzer
//!
//! ## Purpose
//! Runs registered rules over every AST node, each node seen once from the
//! innermost scope that contains it, and reports all findings together.
//!
//! ## Traversal
//! - Scopes are processed children first.
//! - Within a scope, the context node's subtree is walked post-order.
//! - A node already checked from an inner scope is skipped, along with its
//!   subtree. Visits are keyed by [`NodeId`].

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::{debug, instrument, trace};

use crate::ast::{AstNode, NodeId, NodeType};
use crate::config::AnalyzerConfig;

pub mod rules;
pub mod scope;

pub use rules::{Rule, RuleResult, SemanticDiagnostic, UndefinedIdentifierRule};
pub use scope::{Scope, ScopeId, ScopeRef, ScopeTree};

/// The batch of diagnostics from a failed analysis. Never empty.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} semantic error(s)", .diagnostics.len())]
pub struct AnalysisFailure {
    pub diagnostics: Vec<SemanticDiagnostic>,
}

/// What a rule sees besides the node itself.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'t, 'ast> {
    /// The scope the node was encountered in.
    pub scope: ScopeRef<'t, 'ast>,
    /// The node's parent, when it lies inside the scope being walked.
    pub parent: Option<&'ast AstNode>,
}

/// Rule registry keyed by node type. Rules for one type run in registration order.
#[derive(Default)]
pub struct Analyzer {
    rules: HashMap<NodeType, Vec<Box<dyn Rule>>>,
}

impl Analyzer {
    /// An analyzer with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// An analyzer with the built-in rules registered.
    pub fn with_default_rules(config: &AnalyzerConfig) -> Self {
        let mut analyzer = Self::new();
        analyzer.add_rule(
            NodeType::Identifier,
            UndefinedIdentifierRule::with_globals(config.globals.iter().cloned()),
        );
        analyzer
    }

    pub fn add_rule(&mut self, node_type: NodeType, rule: impl Rule + 'static) -> &mut Self {
        self.rules.entry(node_type).or_default().push(Box::new(rule));
        self
    }

    pub fn rule_count(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    pub fn build_program_scope(program: &AstNode) -> ScopeTree<'_> {
        ScopeTree::build(program)
    }

    /// Runs every rule over the scope tree and returns findings in traversal order.
    pub fn process(&self, scopes: &ScopeTree<'_>) -> Vec<SemanticDiagnostic> {
        let mut visited = HashSet::new();
        let mut diagnostics = Vec::new();

        for id in scopes.post_order() {
            let scope = scopes.scope(id);
            self.visit(scope.context(), None, scope, &mut visited, &mut diagnostics);
        }

        diagnostics
    }

    /// Builds scopes for `program` and fails with every diagnostic found.
    #[instrument(level = "debug", skip_all)]
    pub fn analyze(&self, program: &AstNode) -> Result<(), AnalysisFailure> {
        let scopes = Self::build_program_scope(program);
        debug!(scopes = scopes.len(), rules = self.rule_count(), "built scope tree");

        let diagnostics = self.process(&scopes);
        debug!(diagnostics = diagnostics.len(), "analysis finished");

        if diagnostics.is_empty() {
            Ok(())
        } else {
            Err(AnalysisFailure { diagnostics })
        }
    }

    fn visit<'t, 'ast>(
        &self,
        node: &'ast AstNode,
        parent: Option<&'ast AstNode>,
        scope: ScopeRef<'t, 'ast>,
        visited: &mut HashSet<NodeId>,
        diagnostics: &mut Vec<SemanticDiagnostic>,
    ) {
        if visited.contains(&node.id) {
            return;
        }
        for child in &node.children {
            self.visit(child, Some(node), scope, visited, diagnostics);
        }
        visited.insert(node.id);

        let Some(rules) = self.rules.get(&node.node_type()) else {
            return;
        };
        let context = RuleContext { scope, parent };
        for rule in rules {
            if let Some(diagnostic) = rule.check(node, &context) {
                trace!(rule = rule.name(), node = %node.id, "{}", diagnostic.message);
                diagnostics.push(diagnostic);
            }
        }
    }
}

/// Analyzes `program` with the built-in rules and default globals.
pub fn analyze(program: &AstNode) -> Result<(), AnalysisFailure> {
    Analyzer::with_default_rules(&AnalyzerConfig::default()).analyze(program)
}
