use kiba::analyzer::{analyze, Analyzer, ScopeTree};
use kiba::ast::{build_ast, build_program, AstNode, NodeKind, NodeType};
use kiba::codegen::{generate, CodeGenerator, STD_LIBRARY_SHIM};
use kiba::config::{AnalyzerConfig, KibaConfig};
use kiba::errors::ErrorCategory;
use kiba::syntax::{parse, RawNode};
use kiba::CompilePipeline;

// ---
// Helpers
// ---

fn ast(source: &str) -> AstNode {
    build_ast(&parse(source).expect("parse")).expect("build")
}

fn diagnostic_count(source: &str) -> usize {
    analyze(&ast(source)).err().map_or(0, |failure| failure.diagnostics.len())
}

// ---
// Building
// ---

#[test]
fn mutable_declaration_shape() {
    let program = ast("var int = 1");
    assert!(program.is(NodeType::Program));
    assert_eq!(program.children.len(), 1);

    let declaration = &program.children[0];
    assert_eq!(
        declaration.kind,
        NodeKind::VariableDeclaration {
            name: "int".into(),
            mutable: true
        }
    );
    assert_eq!(declaration.children[0].kind, NodeKind::IntegerLiteral(1));
}

#[test]
fn array_declaration_shape() {
    let program = ast("let a = [1, 2, 3]");
    let array = &program.children[0].children[0];
    assert!(array.is(NodeType::Array));
    let values: Vec<_> = array.children.iter().map(|c| c.kind.clone()).collect();
    assert_eq!(
        values,
        vec![
            NodeKind::IntegerLiteral(1),
            NodeKind::IntegerLiteral(2),
            NodeKind::IntegerLiteral(3)
        ]
    );
}

#[test]
fn repeated_builds_are_structurally_equal() {
    let source = "fn add(a, b) { return a + b }\nlet r = add(1, 2)\nstd.print({ r: r })";
    let raw = parse(source).unwrap();
    for _ in 0..3 {
        assert!(build_ast(&raw).unwrap().structurally_eq(&ast(source)));
    }
}

#[test]
fn raw_json_round_trips_through_the_builder() {
    let raw = parse("let f = (x) -> [x, 'y', true]").unwrap();
    let json = serde_json::to_string(&raw).unwrap();
    let reread: RawNode = serde_json::from_str(&json).unwrap();
    let original = build_ast(&raw).unwrap();
    let rebuilt = build_ast(&reread).unwrap();
    assert_eq!(original, rebuilt);
}

#[test]
fn bare_node_list_becomes_program() {
    let raw = parse("var a = 1\na").unwrap();
    let program = build_program(&raw.children).unwrap();
    assert!(program.is(NodeType::Program));
    assert!(program.structurally_eq(&ast("var a = 1\na")));
}

// ---
// Analysis
// ---

#[test]
fn undefined_call_has_two_diagnostics() {
    assert_eq!(diagnostic_count("identity(a)"), 2);
}

#[test]
fn declared_names_produce_no_diagnostics() {
    assert_eq!(diagnostic_count("var a = 1\nlet id = (x) -> x\nid(a)"), 0);
}

#[test]
fn inner_closure_resolves_parameter_and_outer_declaration() {
    assert_eq!(
        diagnostic_count("let b = 1\nlet kek = (a) -> { let c = () -> a + b; return void }"),
        0
    );
}

#[test]
fn self_reference_resolves() {
    assert_eq!(diagnostic_count("let fact = (n) -> n * fact(n - 1)"), 0);
}

#[test]
fn scope_tree_matches_function_nesting() {
    let program = ast("let outer = () -> { let inner = () -> 1; return inner }");
    let scopes = ScopeTree::build(&program);
    assert_eq!(scopes.len(), 3);
    let order = scopes.post_order();
    assert_eq!(order.last(), Some(&scopes.root()));
}

#[test]
fn custom_globals_are_honoured() {
    let config = AnalyzerConfig {
        globals: vec!["std".into(), "console".into()],
    };
    let analyzer = Analyzer::with_default_rules(&config);
    assert!(analyzer.analyze(&ast("console.log(1)")).is_ok());
}

// ---
// Generation
// ---

#[test]
fn shim_is_present_exactly_when_std_is_accessed() {
    let with_std = generate(&ast("let x = 1\nstd.print(x)"));
    assert!(with_std.starts_with(STD_LIBRARY_SHIM));

    let without_std = generate(&ast("let x = 1\nprint(x)"));
    assert!(!without_std.contains(STD_LIBRARY_SHIM));
}

#[test]
fn generator_state_is_per_instance() {
    let program = ast("std.print(1)");
    let mut first = CodeGenerator::new();
    first.generate(&program);
    assert!(first.std_library_accessed());
    assert!(!CodeGenerator::new().std_library_accessed());
}

// ---
// Pipeline
// ---

#[test]
fn pipeline_compiles_scenarios() {
    let pipeline = CompilePipeline::default();
    assert_eq!(pipeline.compile("a.kiba", "var int = 1").unwrap(), "let int = 1");
    assert_eq!(pipeline.compile("b.kiba", "let a = [1, 2, 3]").unwrap(), "const a = [1,2,3]");
}

#[test]
fn pipeline_reports_all_diagnostics_at_once() {
    let error = CompilePipeline::default()
        .compile("c.kiba", "first(1)\nsecond(2)\nthird(3)")
        .unwrap_err();
    assert_eq!(error.category(), ErrorCategory::Semantic);
    let lines: Vec<_> = error.diagnostics().iter().map(|d| d.span.start.line).collect();
    assert_eq!(lines, vec![1, 2, 3]);
}

#[test]
fn pipeline_uses_configured_indent() {
    let mut config = KibaConfig::default();
    config.codegen.indent = "\t".into();
    let code = CompilePipeline::new(config)
        .compile("d.kiba", "fn one() { return 1 }")
        .unwrap();
    assert_eq!(code, "function one() {\n\treturn 1\n}");
}
