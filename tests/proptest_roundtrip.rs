//! Property-based tests with proptest.
//!
//! Scanner output must cover the template exactly, dotted identifiers
//! must segment one part per identifier, and printing a parsed expression
//! must reparse to the same tree.

use proptest::prelude::*;
use whisker::ast::PathPart;
use whisker::diagnostics::Diagnostics;
use whisker::options::{Delimiters, ParserOptions};
use whisker::path::tokenize_path;
use whisker::scanner::scan;
use whisker::source::LineIndex;
use whisker::{EngineConfig, Evaluator, Value, parse_text, to_parsable_string};

// -- Leaf strategies --

fn identifier() -> impl Strategy<Value = String> {
    "[a-zA-Z_][a-zA-Z0-9_]{0,8}"
        .prop_filter("keywords", |s| !matches!(s.as_str(), "null" | "this" | "true" | "false"))
}

fn path_text() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => prop::collection::vec(identifier(), 1..=3).prop_map(|parts| parts.join(".")),
        1 => identifier().prop_map(|name| format!("../{name}")),
        1 => identifier().prop_map(|name| format!("~.{name}")),
        1 => Just("this".to_string()),
    ]
}

fn atom() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => path_text(),
        2 => (0u32..10_000).prop_map(|n| n.to_string()),
        1 => "[a-zA-Z0-9 ]{0,8}".prop_map(|s| format!("'{s}'")),
        1 => path_text().prop_map(|p| format!("{p}.ToUpper()")),
        1 => (0u32..100, 0u32..10).prop_map(|(n, d)| format!("{n} .{d}")),
    ]
}

fn operator() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "+", "-", "*", "/", "%", "==", "!=", "<", ">", "<=", ">=", "&&", "||", "??",
    ])
}

fn expression() -> impl Strategy<Value = String> {
    atom().prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            (inner.clone(), operator(), inner.clone()).prop_map(|(a, op, b)| format!("{a} {op} {b}")),
            inner.clone().prop_map(|a| format!("({a})")),
            inner.clone().prop_map(|a| format!("!{a}")),
            (path_text(), inner.clone()).prop_map(|(p, body)| format!("{p}.Where(x => {body})")),
            (path_text(), inner.clone()).prop_map(|(p, a)| format!("{p}.Pad([width] {a})")),
            inner.clone().prop_map(|a| format!("({a}).Length")),
            (inner.clone(), inner).prop_map(|(a, b)| format!("({a}, {b})")),
        ]
    })
}

fn template_text() -> impl Strategy<Value = String> {
    "[a-z {}'\"\n]{0,60}"
}

// -- Property tests --

proptest! {
    /// Literal and tag ranges tile the template and rebuild it exactly.
    #[test]
    fn scan_reconstructs_template(text in template_text()) {
        let delimiters = Delimiters::default();
        let mut lines = LineIndex::new();
        let scanned = scan(&text, &delimiters, &mut lines);

        prop_assert_eq!(scanned.reconstruct(&delimiters), text.clone());
        prop_assert_eq!(lines.newline_count(), text.matches('\n').count());

        let mut cursor = 0;
        for tag in &scanned.matches {
            if let Some(literal) = &tag.preceding {
                prop_assert_eq!(literal.range.index, cursor);
                prop_assert_eq!(&text[literal.range.index..literal.range.end()], literal.text.as_str());
                cursor = literal.range.end();
            }
            prop_assert_eq!(tag.range.index, cursor);
            prop_assert!(tag.content_range.index >= tag.range.index);
            prop_assert!(tag.content_range.end() <= tag.range.end());
            prop_assert_eq!(
                &text[tag.content_range.index..tag.content_range.end()],
                tag.content.as_str()
            );
            cursor = tag.range.end();
        }
        if let Some(literal) = &scanned.trailing {
            prop_assert_eq!(literal.range.index, cursor);
            cursor = literal.range.end();
        }
        prop_assert_eq!(cursor, text.len());
    }

    /// N dot-joined identifiers give N data parts in order.
    #[test]
    fn path_segmentation(names in prop::collection::vec(identifier(), 1..8)) {
        let text = names.join(".");
        let mut diagnostics = Diagnostics::new();
        let token = tokenize_path(&text, &mut diagnostics);
        prop_assert!(diagnostics.is_empty());
        let expected: Vec<PathPart> = names.into_iter().map(PathPart::DataPath).collect();
        prop_assert_eq!(token.parts, expected);
    }

    /// parse(print(parse(text))) == parse(text)
    #[test]
    fn print_parse_round_trip(text in expression()) {
        let options = ParserOptions::default();
        let (expr, diagnostics) = parse_text(&text, &options);
        prop_assume!(diagnostics.is_empty());

        let printed = to_parsable_string(&expr);
        let (reparsed, diagnostics) = parse_text(&printed, &options);
        prop_assert!(diagnostics.is_empty(), "{} -> {}: {:?}", text, printed, diagnostics);
        prop_assert_eq!(reparsed, expr, "{} -> {}", text, printed);
    }

    /// Operators apply strictly left to right.
    #[test]
    fn flat_association(
        a in 0i32..100,
        b in 0i32..100,
        c in 0i32..100,
        op1 in prop::sample::select(vec!["+", "-", "*"]),
        op2 in prop::sample::select(vec!["+", "-", "*"]),
    ) {
        let options = ParserOptions::default();
        let config = EngineConfig::default();
        let (flat, _) = parse_text(&format!("{a} {op1} {b} {op2} {c}"), &options);
        let (grouped, _) = parse_text(&format!("({a} {op1} {b}) {op2} {c}"), &options);
        let evaluator = Evaluator::new();
        let flat = evaluator.evaluate_value(&flat, Value::Null, &config).unwrap();
        let grouped = evaluator.evaluate_value(&grouped, Value::Null, &config).unwrap();
        prop_assert_eq!(flat, grouped);
    }
}
