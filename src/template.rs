//! Whole-template compilation and flat rendering.
//!
//! Every tag is compiled as one expression. Rendering concatenates the
//! literal text with each expression's rendered result; there are no
//! block tags at this level.

use crate::ast::Expression;
use crate::config::EngineConfig;
use crate::context::{ContextId, Scope};
use crate::diagnostics::{CompileError, Diagnostics, ParseErrorKind};
use crate::evaluator::{EvalError, Evaluator, render_to_string};
use crate::lexer::{TokenizerContext, tokenize};
use crate::options::ParserOptions;
use crate::parser::{StopAt, parse_expression_bounded};
use crate::scanner::scan;
use crate::source::{LineIndex, SourceRange};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Expression {
        expression: Expression,
        /// Range of the whole tag, delimiters included.
        range: SourceRange,
    },
}

/// A compiled template.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    segments: Vec<Segment>,
}

/// Compile `text`, collecting the diagnostics of every tag.
///
/// ```
/// use whisker::{compile, EngineConfig, Value};
/// use whisker::options::ParserOptions;
///
/// let template = compile("Hello {{name}}", &ParserOptions::default()).unwrap();
/// let data = Value::object([("name", Value::from("World"))]);
/// assert_eq!(template.render(data, &EngineConfig::default()).unwrap(), "Hello World");
/// ```
pub fn compile(text: &str, options: &ParserOptions) -> Result<Template, CompileError> {
    let (template, diagnostics) = compile_with_diagnostics(text, options);
    if diagnostics.is_empty() {
        Ok(template)
    } else {
        Err(CompileError {
            errors: diagnostics.into_errors(),
        })
    }
}

/// Best-effort compilation: the template is built even when diagnostics
/// were reported.
pub fn compile_with_diagnostics(text: &str, options: &ParserOptions) -> (Template, Diagnostics) {
    let mut lines = LineIndex::new();
    let scanned = scan(text, &options.delimiters, &mut lines);
    let mut diagnostics = Diagnostics::new();
    let mut segments = Vec::new();

    for tag in scanned.matches {
        if let Some(literal) = tag.preceding {
            segments.push(Segment::Text(literal.text));
        }

        let mut context = TokenizerContext::new(options).with_base_offset(tag.content_range.index);
        let mut queue = tokenize(&tag.content, &mut context);
        let mut tag_diagnostics = context.diagnostics;
        let expression = parse_expression_bounded(
            &mut queue,
            &mut tag_diagnostics,
            StopAt::END,
            options.max_nesting_depth,
        );

        if tag.unterminated {
            let string_reported = tag_diagnostics
                .iter()
                .any(|e| e.kind.message() == "unterminated string");
            if !string_reported {
                let open = SourceRange::new(tag.range.index, options.delimiters.open.len());
                let kind = ParseErrorKind::UnclosedScope("unclosed tag".to_string());
                tag_diagnostics.push(kind, open);
            }
        }

        diagnostics.extend(tag_diagnostics);
        segments.push(Segment::Expression {
            expression,
            range: tag.range,
        });
    }

    if let Some(literal) = scanned.trailing {
        segments.push(Segment::Text(literal.text));
    }

    diagnostics.locate(&lines);
    tracing::debug!(
        segments = segments.len(),
        errors = diagnostics.len(),
        "compiled template"
    );
    (Template { segments }, diagnostics)
}

impl Template {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Expressions in source order.
    pub fn expressions(&self) -> impl Iterator<Item = &Expression> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Expression { expression, .. } => Some(expression),
            Segment::Text(_) => None,
        })
    }

    pub fn render(&self, root: Value, config: &EngineConfig) -> Result<String, EvalError> {
        let mut scope = Scope::new(config);
        let root = scope.arena.root(root);
        self.render_in(root, &mut scope)
    }

    /// Render against an existing scope, e.g. one carrying a cancellation
    /// token.
    pub fn render_in(&self, context: ContextId, scope: &mut Scope<'_>) -> Result<String, EvalError> {
        let evaluator = Evaluator::new();
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Expression { expression, .. } => {
                    let result = evaluator.evaluate(expression, context, scope)?;
                    out.push_str(&render_to_string(scope.arena.get(result)));
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unterminated_string_reports_once() {
        let err = compile("{{'abc}}", &ParserOptions::default()).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].range.index, 2);
    }

    #[test]
    fn test_unclosed_tag() {
        let err = compile("Hi {{name", &ParserOptions::default()).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(
            err.errors[0].kind,
            ParseErrorKind::UnclosedScope("unclosed tag".to_string())
        );
        assert_eq!(err.errors[0].range.index, 3);
    }

    #[test]
    fn test_literal_only() {
        let template = compile("no tags here", &ParserOptions::default()).unwrap();
        assert_eq!(template.segments(), &[Segment::Text("no tags here".to_string())]);
        assert_eq!(template.expressions().count(), 0);
    }
}
