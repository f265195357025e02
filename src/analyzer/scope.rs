//! Lexical scope tree.
//!
//! Scopes live in an arena owned by [`ScopeTree`] and refer to each other by
//! [`ScopeId`]. The program node is always the root scope; every
//! scope-forming node below it opens a child scope.

use crate::ast::{AstNode, NodeKind, NodeType};

/// Index of a scope inside its [`ScopeTree`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ScopeId(pub usize);

/// One lexical scope, borrowing the nodes it was built from.
#[derive(Debug)]
pub struct Scope<'ast> {
    /// The node that opened this scope: the program or a function.
    pub context: &'ast AstNode,
    pub parent: Option<ScopeId>,
    /// Direct `VariableDeclaration` children of the context node.
    pub variable_declarations: Vec<&'ast AstNode>,
    /// Direct `FunctionDeclaration` and `NamedFunctionExpression` children.
    pub function_bindings: Vec<&'ast AstNode>,
    /// The context node's `FunctionParameters` child, if any.
    pub parameters: Option<&'ast AstNode>,
    pub children: Vec<ScopeId>,
}

impl<'ast> Scope<'ast> {
    fn open(context: &'ast AstNode, parent: Option<ScopeId>) -> Self {
        Self {
            context,
            parent,
            variable_declarations: context.children_of_type(NodeType::VariableDeclaration).collect(),
            function_bindings: context
                .children
                .iter()
                .filter(|c| {
                    c.is(NodeType::FunctionDeclaration) || c.is(NodeType::NamedFunctionExpression)
                })
                .collect(),
            parameters: context.children_of_type(NodeType::FunctionParameters).next(),
            children: Vec::new(),
        }
    }

    /// Whether `name` is bound directly in this scope.
    pub fn declares(&self, name: &str) -> bool {
        let declared_variable = self
            .variable_declarations
            .iter()
            .any(|d| d.declared_name() == Some(name));

        let declared_parameter = self.parameters.is_some_and(|params| {
            params
                .children
                .iter()
                .any(|p| p.identifier_name() == Some(name))
        });

        // a named function expression can refer to itself from its own body
        let self_reference = matches!(self.context.kind, NodeKind::NamedFunctionExpression)
            && self.context.declared_name() == Some(name);

        let declared_function = self
            .function_bindings
            .iter()
            .any(|f| f.declared_name() == Some(name));

        declared_variable || declared_parameter || self_reference || declared_function
    }
}

/// Arena of scopes rooted at the program scope.
#[derive(Debug)]
pub struct ScopeTree<'ast> {
    scopes: Vec<Scope<'ast>>,
}

impl<'ast> ScopeTree<'ast> {
    /// Builds the scope tree for a program. Child scopes are ordered by
    /// their position in the source.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use kiba::{analyzer::ScopeTree, ast::build_ast, syntax::parse};
    /// let ast = build_ast(&parse("let f = (a) -> a\nlet g = (b) -> b").unwrap()).unwrap();
    /// let scopes = ScopeTree::build(&ast);
    /// assert_eq!(scopes.len(), 3);
    /// assert_eq!(scopes.get(scopes.root()).children.len(), 2);
    /// ```
    pub fn build(program: &'ast AstNode) -> Self {
        let mut tree = Self { scopes: Vec::new() };
        tree.open_scope(program, None);
        tree
    }

    pub const fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn get(&self, id: ScopeId) -> &Scope<'ast> {
        &self.scopes[id.0]
    }

    pub fn scope(&self, id: ScopeId) -> ScopeRef<'_, 'ast> {
        ScopeRef { tree: self, id }
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Scope ids with every child scope before its parent.
    pub fn post_order(&self) -> Vec<ScopeId> {
        let mut order = Vec::with_capacity(self.scopes.len());
        let mut stack = vec![(self.root(), false)];

        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            for child in self.get(id).children.iter().rev() {
                stack.push((*child, false));
            }
        }

        order
    }

    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    fn open_scope(&mut self, context: &'ast AstNode, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope::open(context, parent));

        let mut nested = Vec::new();
        for child in &context.children {
            collect_scope_forming(child, &mut nested);
        }
        for node in nested {
            let child = self.open_scope(node, Some(id));
            self.scopes[id.0].children.push(child);
        }

        id
    }
}

/// Collects the nearest scope-forming nodes at or below `node`, in source order.
fn collect_scope_forming<'ast>(node: &'ast AstNode, found: &mut Vec<&'ast AstNode>) {
    if node.is_scope_forming() {
        found.push(node);
        return;
    }
    for child in &node.children {
        collect_scope_forming(child, found);
    }
}

/// A scope together with the tree it belongs to, for parent-chain walks.
#[derive(Debug, Copy, Clone)]
pub struct ScopeRef<'t, 'ast> {
    tree: &'t ScopeTree<'ast>,
    id: ScopeId,
}

impl<'t, 'ast> ScopeRef<'t, 'ast> {
    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn scope(&self) -> &'t Scope<'ast> {
        self.tree.get(self.id)
    }

    pub fn context(&self) -> &'ast AstNode {
        self.scope().context
    }

    pub fn parent(&self) -> Option<ScopeRef<'t, 'ast>> {
        self.scope().parent.map(|id| self.tree.scope(id))
    }

    /// This scope followed by each enclosing scope up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = ScopeRef<'t, 'ast>> {
        std::iter::successors(Some(*self), |scope| scope.parent())
    }

    /// Whether `name` is bound in this scope or any enclosing one.
    pub fn resolves(&self, name: &str) -> bool {
        self.ancestors().any(|scope| scope.scope().declares(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build_ast;
    use crate::syntax::parse;

    fn program(source: &str) -> AstNode {
        build_ast(&parse(source).unwrap()).unwrap()
    }

    #[test]
    fn program_is_root_scope() {
        let ast = program("var a = 1");
        let scopes = ScopeTree::build(&ast);
        let root = scopes.get(scopes.root());
        assert_eq!(scopes.len(), 1);
        assert!(root.parent.is_none());
        assert_eq!(root.context.id, ast.id);
        assert_eq!(root.variable_declarations.len(), 1);
        assert!(root.parameters.is_none());
    }

    #[test]
    fn nested_lambdas_form_a_chain() {
        let ast = program("let b = 1\nlet kek = (a) -> { let c = () -> a + b; return void }");
        let scopes = ScopeTree::build(&ast);
        assert_eq!(scopes.len(), 3);

        let kek = scopes.get(scopes.root()).children[0];
        let inner = scopes.get(kek).children[0];
        assert_eq!(scopes.get(inner).parent, Some(kek));

        let inner = scopes.scope(inner);
        assert!(inner.resolves("a"));
        assert!(inner.resolves("b"));
        assert!(inner.resolves("c"));
        assert!(!inner.resolves("d"));
        assert_eq!(inner.ancestors().count(), 3);
    }

    #[test]
    fn lambda_argument_forms_scope() {
        let ast = program("map(list, (x) -> x * 2)");
        let scopes = ScopeTree::build(&ast);
        assert_eq!(scopes.len(), 2);
        let lambda = scopes.scope(scopes.get(scopes.root()).children[0]);
        assert!(lambda.context().is(NodeType::AnonymousFunctionExpression));
        assert!(lambda.scope().declares("x"));
    }

    #[test]
    fn named_function_sees_its_own_name() {
        let ast = program("let loop = (n) -> loop(n)");
        let scopes = ScopeTree::build(&ast);
        let function = scopes.get(scopes.get(scopes.root()).children[0]);
        assert!(function.declares("loop"));
        assert!(function.declares("n"));
    }

    #[test]
    fn function_declarations_are_bound_in_enclosing_scope() {
        let ast = program("fn add(a, b) { return a + b }");
        let scopes = ScopeTree::build(&ast);
        assert!(scopes.get(scopes.root()).declares("add"));
        let body = scopes.get(ScopeId(1));
        assert!(body.declares("a"));
        assert!(!body.declares("add"));
    }

    #[test]
    fn post_order_visits_children_first() {
        let ast = program("let f = () -> { let g = () -> 1; return g }\nlet h = () -> 2");
        let scopes = ScopeTree::build(&ast);
        let order = scopes.post_order();
        assert_eq!(order.len(), 4);
        assert_eq!(order.last(), Some(&scopes.root()));
        let f = scopes.get(scopes.root()).children[0];
        let g = scopes.get(f).children[0];
        let position = |id| order.iter().position(|s| *s == id);
        assert!(position(g) < position(f));
    }
}
