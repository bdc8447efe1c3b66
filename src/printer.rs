//! Canonical source form of an expression tree.
//!
//! [`to_parsable_string`] prints an [`Expression`] so that tokenizing and
//! parsing the output yields an equal tree.

use std::fmt::Write;

use crate::ast::{Expression, ExpressionArgument, PathPart, Placement};

pub fn to_parsable_string(expr: &Expression) -> String {
    let mut out = String::new();
    write_expression(&mut out, expr);
    out
}

fn write_expression(out: &mut String, expr: &Expression) {
    match expr {
        Expression::Path {
            parts,
            formatter,
            arguments,
        } => {
            write_parts(out, parts);
            if let Some(name) = formatter {
                if parts.is_empty() {
                    if name.is_empty() {
                        out.push('.');
                    }
                } else if name.is_empty() || !out.ends_with('/') {
                    out.push('.');
                }
                out.push_str(name);
                write_arguments(out, arguments);
            }
        }
        Expression::List(children) => {
            let mut previous: Option<&Expression> = None;
            for child in children {
                let text = to_parsable_string(child);
                let segment = text.strip_prefix('.').unwrap_or(&text);
                // `5` then `.0` must not glue into the literal `5.0`
                if matches!(previous, Some(Expression::Number(_)))
                    && segment.starts_with(|c: char| c.is_ascii_digit())
                {
                    out.push(' ');
                }
                if previous.is_some() && !text.starts_with('.') {
                    out.push('.');
                }
                out.push_str(&text);
                previous = Some(child);
            }
        }
        Expression::Bracket(children) => {
            out.push('(');
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_expression(out, child);
            }
            out.push(')');
        }
        Expression::Operator {
            operator,
            left,
            right,
        } => match operator.placement() {
            Placement::Left => {
                out.push_str(operator.text());
                write_expression(out, left);
            }
            Placement::Right => {
                write_expression(out, left);
                out.push(' ');
                out.push_str(operator.text());
                if let Some(right) = right {
                    out.push(' ');
                    write_expression(out, right);
                }
            }
        },
        Expression::Lambda { parameter, body } => {
            write_expression(out, parameter);
            out.push_str(" => ");
            write_expression(out, body);
        }
        Expression::String { value, delimiter } => {
            out.push(*delimiter);
            for c in value.chars() {
                if c == *delimiter {
                    out.push('\\');
                }
                out.push(c);
            }
            out.push(*delimiter);
        }
        Expression::Number(number) => out.push_str(&number.to_literal()),
    }
}

fn write_parts(out: &mut String, parts: &[PathPart]) {
    let mut previous: Option<&PathPart> = None;
    for part in parts {
        if previous.is_some_and(|p| *p != PathPart::ParentSelector) {
            out.push('.');
        }
        match part {
            PathPart::DataPath(name) => out.push_str(name),
            PathPart::RootSelector => out.push('~'),
            PathPart::ParentSelector => out.push_str("../"),
            PathPart::SelfAssignment => out.push('.'),
            PathPart::ThisPath => out.push_str("this"),
            PathPart::ObjectSelector => out.push('?'),
            PathPart::Null => out.push_str("null"),
            PathPart::Boolean(value) => {
                let _ = write!(out, "{value}");
            }
        }
        previous = Some(part);
    }
}

fn write_arguments(out: &mut String, arguments: &[ExpressionArgument]) {
    out.push('(');
    for (i, argument) in arguments.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        if let Some(name) = &argument.name {
            out.push('[');
            out.push_str(name);
            out.push_str("] ");
        }
        write_expression(out, &argument.value);
    }
    out.push(')');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParserOptions;
    use crate::parser::parse_text;

    fn round_trip(text: &str) -> String {
        let (expr, diagnostics) = parse_text(text, &ParserOptions::default());
        assert!(diagnostics.is_empty(), "{text}: {diagnostics:?}");
        to_parsable_string(&expr)
    }

    #[test]
    fn test_canonical_forms() {
        assert_eq!(round_trip("a.b.c"), "a.b.c");
        assert_eq!(round_trip("../x"), "../x");
        assert_eq!(round_trip("~.total"), "~.total");
        assert_eq!(round_trip("2+3*4"), "2 + 3 * 4");
        assert_eq!(round_trip("!flag"), "!flag");
        assert_eq!(
            round_trip("list.Where(x=>x.Age>10)"),
            "list.Where(x => x.Age > 10)"
        );
        assert_eq!(round_trip("F([places] 2,'a')"), "F([places] 2, 'a')");
        assert_eq!(round_trip("'abc'.ToUpper().Length"), "'abc'.ToUpper().Length");
        assert_eq!(round_trip("price.(2)"), "price.(2)");
        assert_eq!(round_trip("\"it's\""), "\"it's\"");
        assert_eq!(round_trip("'it\\'s'"), "'it\\'s'");
        assert_eq!(round_trip("5 .0"), "5 .0");
        assert_eq!(round_trip("5 .Length"), "5.Length");
    }
}
