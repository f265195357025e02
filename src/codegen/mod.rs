//! JavaScript code generation.
//!
//! [`CodeGenerator`] is a single-pass visitor over an analyzed program. The
//! only state it carries besides its settings is whether the program touched
//! the standard library; when it did, [`STD_LIBRARY_SHIM`] is prepended to the
//! output.

use tracing::debug;

use crate::ast::{AstNode, NodeKind, NodeType};
use crate::config::CodegenConfig;

/// Runtime binding for the `std` object, prepended when a program uses it.
pub const STD_LIBRARY_SHIM: &str =
    "// std-library-code\nconst std = { print: console.log }\n//end of std-library-code\n";

/// Identifier whose property access triggers the shim.
pub const STD_LIBRARY_NAME: &str = "std";

/// Renders a program with the default settings.
///
/// # Examples
///
/// ```rust
/// use kiba::{ast::build_ast, codegen::generate, syntax::parse};
/// let ast = build_ast(&parse("let a = [1, 2, 3]").unwrap()).unwrap();
/// assert_eq!(generate(&ast), "const a = [1,2,3]");
/// ```
pub fn generate(program: &AstNode) -> String {
    CodeGenerator::new().generate(program)
}

#[derive(Debug, Clone)]
pub struct CodeGenerator {
    indent: String,
    std_library_accessed: bool,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::with_config(&CodegenConfig::default())
    }
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &CodegenConfig) -> Self {
        Self {
            indent: config.indent.clone(),
            std_library_accessed: false,
        }
    }

    pub fn std_library_accessed(&self) -> bool {
        self.std_library_accessed
    }

    /// Renders `program`, prefixed by the shim if the standard library was used.
    pub fn generate(&mut self, program: &AstNode) -> String {
        let code = self.render(program);
        debug!(std_library = self.std_library_accessed, bytes = code.len(), "generated code");

        if self.std_library_accessed {
            format!("{STD_LIBRARY_SHIM}{code}")
        } else {
            code
        }
    }

    /// Renders a single node and its subtree.
    pub fn render(&mut self, node: &AstNode) -> String {
        match &node.kind {
            NodeKind::Program => self.render_all(&node.children, "\n"),

            NodeKind::IntegerLiteral(value) => value.to_string(),
            NodeKind::StringLiteral(value) => quote(value),
            NodeKind::BooleanLiteral(value) => value.to_string(),
            NodeKind::VoidLiteral => "undefined".to_string(),
            NodeKind::Identifier(name) => name.clone(),

            NodeKind::Array => format!("[{}]", self.render_all(&node.children, ",")),

            NodeKind::Object if node.children.is_empty() => "{}".to_string(),
            NodeKind::Object => format!("{{ {} }}", self.render_all(&node.children, ", ")),

            NodeKind::ObjectPropertyDeclaration => {
                let key = self.render(&node.children[0]);
                let value = self.render(&node.children[1]);
                format!("{key}: {value}")
            }

            NodeKind::VariableDeclaration { name, mutable } => {
                let keyword = if *mutable { "let" } else { "const" };
                format!("{keyword} {name} = {}", self.render_all(&node.children, ","))
            }

            NodeKind::FunctionDeclaration { name } => {
                let params = self.render(&node.children[0]);
                let body = &node.children[1..];
                if body.is_empty() {
                    format!("function {name}({params}) {{}}")
                } else {
                    format!("function {name}({params}) {{\n{}\n}}", self.render_block(body))
                }
            }

            NodeKind::NamedFunctionExpression => {
                let name = self.render(&node.children[0]);
                let lambda = self.render_lambda(&node.children[1], &node.children[2..]);
                format!("const {name} = {lambda}")
            }

            NodeKind::AnonymousFunctionExpression => {
                self.render_lambda(&node.children[0], &node.children[1..])
            }

            NodeKind::FunctionParameters | NodeKind::FunctionArguments => {
                self.render_all(&node.children, ", ")
            }

            NodeKind::CallExpression => {
                let callee = self.render_operand(&node.children[0]);
                let arguments = self.render(&node.children[1]);
                format!("{callee}({arguments})")
            }

            NodeKind::BinaryOperator(operator) => operator.clone(),

            NodeKind::BinaryExpression => {
                let parts: Vec<String> =
                    node.children.iter().map(|c| self.render_operand(c)).collect();
                parts.join(" ")
            }

            NodeKind::PropertyAccessExpression => {
                let object = &node.children[0];
                if object.identifier_name() == Some(STD_LIBRARY_NAME) {
                    self.std_library_accessed = true;
                }
                let object = self.render_operand(object);
                let property = self.render(&node.children[1]);
                format!("{object}.{property}")
            }

            NodeKind::ReturnExpression => {
                format!("return {}", self.render_all(&node.children, ","))
            }
        }
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn render_all(&mut self, nodes: &[AstNode], separator: &str) -> String {
        let parts: Vec<String> = nodes.iter().map(|n| self.render(n)).collect();
        parts.join(separator)
    }

    /// Renders a node used as an operand, callee or property target.
    fn render_operand(&mut self, node: &AstNode) -> String {
        let code = self.render(node);
        let needs_parens = node.is(NodeType::BinaryExpression)
            || node.is(NodeType::AnonymousFunctionExpression)
            || node.is(NodeType::NamedFunctionExpression);
        if needs_parens {
            format!("({code})")
        } else {
            code
        }
    }

    /// One statement per line, each line indented one level.
    fn render_block(&mut self, body: &[AstNode]) -> String {
        let mut lines = Vec::new();
        for statement in body {
            let code = self.render(statement);
            lines.extend(code.lines().map(|line| format!("{}{line}", self.indent)));
        }
        lines.join("\n")
    }

    /// A trailing `return` gives the lambda a block body; otherwise it is an expression lambda.
    fn render_lambda(&mut self, params: &AstNode, body: &[AstNode]) -> String {
        let params = self.render(params);

        let is_block = body.last().is_some_and(|n| n.is(NodeType::ReturnExpression));
        if is_block {
            return format!("({params}) => {{\n{}\n}}", self.render_block(body));
        }

        match body {
            [single] if single.is(NodeType::Object) => {
                format!("({params}) => ({})", self.render(single))
            }
            [single] => format!("({params}) => {}", self.render(single)),
            _ => format!("({params}) => ({})", self.render_all(body, ", ")),
        }
    }
}

/// Single-quotes a string literal, escaping bare single quotes.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');

    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push('\\');
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }

    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build_ast;
    use crate::syntax::parse;

    fn compile(source: &str) -> String {
        generate(&build_ast(&parse(source).unwrap()).unwrap())
    }

    #[test]
    fn mutable_declaration_uses_let() {
        assert_eq!(compile("var int = 1"), "let int = 1");
    }

    #[test]
    fn immutable_declaration_uses_const() {
        assert_eq!(compile("let a = [1, 2, 3]"), "const a = [1,2,3]");
    }

    #[test]
    fn std_access_adds_shim() {
        let code = compile("std.print(x)");
        assert_eq!(code, format!("{STD_LIBRARY_SHIM}std.print(x)"));
    }

    #[test]
    fn no_std_access_no_shim() {
        let code = compile("print(x)\nlet s = { std: 1 }");
        assert!(!code.contains(STD_LIBRARY_SHIM));
    }

    #[test]
    fn flag_is_visible_after_generation() {
        let ast = build_ast(&parse("let out = std.print").unwrap()).unwrap();
        let mut generator = CodeGenerator::new();
        assert!(!generator.std_library_accessed());
        generator.generate(&ast);
        assert!(generator.std_library_accessed());
    }

    #[test]
    fn trailing_return_makes_block_lambda() {
        assert_eq!(
            compile("let kek = (a) -> { let c = () -> a + b; return void }"),
            "const kek = (a) => {\n  const c = () => a + b\n  return undefined\n}"
        );
    }

    #[test]
    fn block_without_return_stays_expression_lambda() {
        assert_eq!(compile("let f = () -> { a; b }"), "const f = () => (a, b)");
    }

    #[test]
    fn object_body_is_parenthesized() {
        assert_eq!(compile("() -> { a: 1, b: 'x' }"), "() => ({ a: 1, b: 'x' })");
    }

    #[test]
    fn function_declaration_renders_named_function() {
        assert_eq!(
            compile("fn add(a, b) { return a + b }"),
            "function add(a, b) {\n  return a + b\n}"
        );
        assert_eq!(compile("fn noop() {}"), "function noop() {}");
    }

    #[test]
    fn nested_blocks_are_reindented() {
        assert_eq!(
            compile("fn outer() { let inner = () -> { return 1 }; return inner }"),
            "function outer() {\n  const inner = () => {\n    return 1\n  }\n  return inner\n}"
        );
    }

    #[test]
    fn nested_binary_expression_keeps_grouping() {
        assert_eq!(compile("(a + b) * c"), "(a + b) * c");
        assert_eq!(compile("a - (b - c)"), "a - (b - c)");
    }

    #[test]
    fn immediately_invoked_lambda_is_parenthesized() {
        assert_eq!(compile("((x) -> x)(1)"), "((x) => x)(1)");
    }

    #[test]
    fn literals_use_javascript_syntax() {
        assert_eq!(compile("f(true, false, void, -3, {})"), "f(true, false, undefined, -3, {})");
    }

    #[test]
    fn strings_are_single_quoted() {
        assert_eq!(compile("\"it's\""), r"'it\'s'");
        assert_eq!(compile(r"'a\'b'"), r"'a\'b'");
    }

    #[test]
    fn custom_indent() {
        let ast = build_ast(&parse("fn f() { return 1 }").unwrap()).unwrap();
        let config = CodegenConfig {
            indent: "    ".into(),
        };
        assert_eq!(
            CodeGenerator::with_config(&config).generate(&ast),
            "function f() {\n    return 1\n}"
        );
    }
}
