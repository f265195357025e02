//! Kiba Parser
//!
//! Converts Kiba source code into the raw parse tree with source location
//! tracking. This parser is purely syntactic: typed AST construction happens
//! in `ast::builder`, scope analysis in `analyzer`.

use pest::{
    error::{Error, InputLocation, LineColLocation},
    iterators::{Pair, Pairs},
    Parser,
};
use pest_derive::Parser;

use crate::syntax::{
    error::{syntax_error, SyntaxError},
    tags, Position, RawNode, RawValue, Span,
};

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct KibaParser;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parse Kiba source code into a raw `program` node.
pub fn parse(source_text: &str) -> Result<RawNode, SyntaxError> {
    if source_text.trim().is_empty() {
        return Ok(RawNode::program(vec![]));
    }

    let mut pairs = KibaParser::parse(Rule::program, source_text).map_err(convert_parse_error)?;

    let program = pairs
        .next()
        .ok_or_else(|| syntax_error("empty parse result", Span::default()))?;
    let location = get_span(&program);

    let children = build_all(program.into_inner().filter(|p| p.as_rule() != Rule::EOI))?;
    Ok(RawNode::new(tags::PROGRAM, children, location))
}

// ============================================================================
// RAW TREE BUILDERS
// ============================================================================

fn build_raw_node(pair: Pair<Rule>) -> Result<RawNode, SyntaxError> {
    let span = get_span(&pair);

    match pair.as_rule() {
        Rule::fn_declaration => {
            let mut inner = pair.into_inner();
            expect_pair(&mut inner, "fn", span)?;
            let name = expect_pair(&mut inner, "function name", span)?.as_str().to_string();
            let mut children = vec![build_raw_node(expect_pair(&mut inner, "parameters", span)?)?];
            children.extend(build_all(inner)?);
            Ok(RawNode::new(tags::FN_DECLARATION, children, span).with_name(name))
        }

        Rule::named_fn_expression => {
            let mut inner = pair.into_inner();
            expect_pair(&mut inner, "declaration keyword", span)?;
            let children = build_all(inner)?;
            Ok(RawNode::new(tags::NAMED_FN_EXPRESSION, children, span))
        }

        Rule::variable_declaration => {
            let mut inner = pair.into_inner();
            let keyword = expect_pair(&mut inner, "declaration keyword", span)?;
            let mutable = keyword.as_rule() == Rule::mutable_keyword;
            let name = expect_pair(&mut inner, "variable name", span)?.as_str().to_string();
            let children = build_all(inner)?;
            Ok(RawNode::new(tags::VARIABLE_DECLARATION, children, span).with_variable(name, mutable))
        }

        Rule::return_expression => {
            let mut inner = pair.into_inner();
            expect_pair(&mut inner, "return", span)?;
            Ok(RawNode::new(tags::RETURN_EXPRESSION, build_all(inner)?, span))
        }

        Rule::anonymous_fn_expression => Ok(RawNode::new(
            tags::ANONYMOUS_FN_EXPRESSION,
            build_all(pair.into_inner())?,
            span,
        )),

        Rule::fn_params => Ok(RawNode::new(tags::FN_PARAMS, build_all(pair.into_inner())?, span)),

        Rule::call_arguments => Ok(RawNode::new(tags::FN_ARGS, build_all(pair.into_inner())?, span)),

        Rule::expression => build_expression(pair),

        Rule::postfix => build_postfix(pair),

        Rule::binary_operator => {
            Ok(RawNode::new(tags::BINARY_OPERATOR, vec![], span).with_operator(pair.as_str()))
        }

        Rule::array => Ok(RawNode::new(tags::ARRAY, build_all(pair.into_inner())?, span)),

        Rule::object => Ok(RawNode::new(tags::OBJECT, build_all(pair.into_inner())?, span)),

        Rule::object_property => Ok(RawNode::new(
            tags::OBJECT_PROPERTY_DECLARATION,
            build_all(pair.into_inner())?,
            span,
        )),

        Rule::integer => {
            let text = pair.as_str();
            let value = text
                .parse::<i64>()
                .map_err(|_| syntax_error(format!("invalid integer literal '{text}'"), span))?;
            Ok(RawNode::new(tags::INTEGER, vec![], span).with_value(RawValue::Integer(value)))
        }

        Rule::boolean => {
            let value = pair.as_str() == "true";
            Ok(RawNode::new(tags::BOOLEAN, vec![], span).with_value(RawValue::Boolean(value)))
        }

        Rule::void => Ok(RawNode::new(tags::VOID, vec![], span)),

        Rule::string => {
            // grammar guarantees exactly one inner content pair
            let content = pair
                .into_inner()
                .next()
                .map(|inner| inner.as_str().to_string())
                .unwrap_or_default();
            Ok(RawNode::new(tags::STRING, vec![], span).with_value(RawValue::String(content)))
        }

        Rule::identifier => Ok(RawNode::new(tags::IDENTIFIER, vec![], span)
            .with_value(RawValue::String(pair.as_str().to_string()))),

        rule => Err(syntax_error(format!("unsupported rule: {rule:?}"), span)),
    }
}

/// A single operand collapses to itself; anything longer becomes a binary expression.
fn build_expression(pair: Pair<Rule>) -> Result<RawNode, SyntaxError> {
    let span = get_span(&pair);
    let mut children = build_all(pair.into_inner())?;

    if children.len() == 1 {
        return Ok(children.remove(0));
    }
    Ok(RawNode::new(tags::BINARY_EXPRESSION, children, span))
}

/// Folds call and property suffixes left to right: `a.b(c)` is `call(access(a, b), args(c))`.
fn build_postfix(pair: Pair<Rule>) -> Result<RawNode, SyntaxError> {
    let span = get_span(&pair);
    let mut inner = pair.into_inner();
    let mut node = build_raw_node(expect_pair(&mut inner, "expression", span)?)?;

    for suffix in inner {
        let location = Span::new(span.start, get_span(&suffix).end);
        node = match suffix.as_rule() {
            Rule::call_arguments => {
                let arguments = build_raw_node(suffix)?;
                RawNode::new(tags::CALL_EXPRESSION, vec![node, arguments], location)
            }
            Rule::property_suffix => {
                let suffix_span = get_span(&suffix);
                let property = suffix
                    .into_inner()
                    .next()
                    .ok_or_else(|| syntax_error("expected property name", suffix_span))?;
                let property = build_raw_node(property)?;
                RawNode::new(tags::PROPERTY_ACCESS_EXPRESSION, vec![node, property], location)
            }
            rule => return Err(syntax_error(format!("unexpected suffix {rule:?}"), location)),
        };
    }

    Ok(node)
}

fn build_all<'i>(pairs: impl Iterator<Item = Pair<'i, Rule>>) -> Result<Vec<RawNode>, SyntaxError> {
    pairs.map(build_raw_node).collect()
}

// ============================================================================
// UTILITIES
// ============================================================================

fn expect_pair<'i>(pairs: &mut Pairs<'i, Rule>, element: &str, span: Span) -> Result<Pair<'i, Rule>, SyntaxError> {
    pairs
        .next()
        .ok_or_else(|| syntax_error(format!("missing {element}"), span))
}

fn get_span(pair: &Pair<Rule>) -> Span {
    let span = pair.as_span();
    Span::new(to_position(span.start_pos()), to_position(span.end_pos()))
}

fn to_position(pos: pest::Position<'_>) -> Position {
    let (line, column) = pos.line_col();
    Position {
        offset: pos.pos(),
        line,
        column,
    }
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

fn convert_parse_error(error: Error<Rule>) -> SyntaxError {
    let error = error.renamed_rules(|rule| describe_rule(rule).to_string());

    let (start_offset, end_offset) = match error.location {
        InputLocation::Pos(pos) => (pos, pos),
        InputLocation::Span((start, end)) => (start, end),
    };
    let ((start_line, start_col), (end_line, end_col)) = match error.line_col {
        LineColLocation::Pos(pos) => (pos, pos),
        LineColLocation::Span(start, end) => (start, end),
    };

    let span = Span::new(
        Position {
            offset: start_offset,
            line: start_line,
            column: start_col,
        },
        Position {
            offset: end_offset,
            line: end_line,
            column: end_col,
        },
    );

    syntax_error(error.variant.message().into_owned(), span)
}

fn describe_rule(rule: &Rule) -> &'static str {
    match rule {
        Rule::EOI => "end of input",
        Rule::expression | Rule::postfix => "expression",
        Rule::binary_operator => "operator",
        Rule::fn_declaration => "function declaration",
        Rule::named_fn_expression | Rule::anonymous_fn_expression => "function expression",
        Rule::variable_declaration => "variable declaration",
        Rule::return_expression => "return",
        Rule::fn_params => "parameter list",
        Rule::call_arguments => "argument list",
        Rule::property_suffix => "property access",
        Rule::identifier => "identifier",
        Rule::integer => "integer",
        Rule::string => "string",
        Rule::boolean => "boolean",
        Rule::void => "void",
        Rule::array => "array",
        Rule::object => "object",
        Rule::object_property => "object property",
        Rule::mutable_keyword | Rule::immutable_keyword => "declaration keyword",
        Rule::kw_fn => "fn",
        Rule::kw_return => "return",
        _ => "token",
    }
}
