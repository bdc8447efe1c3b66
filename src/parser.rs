//! Recursive-descent expression parser.
//!
//! Operators have no precedence: each Right-placed operator takes the
//! whole chain parsed so far as its left operand and a single operand on
//! its right, so `2 + 3 * 4` is `(2 + 3) * 4`.

use crate::ast::{
    BracketKind, Expression, ExpressionArgument, OperatorKind, PathToken, Placement, TokenKind,
};
use crate::diagnostics::{Diagnostics, ParseErrorKind};
use crate::lexer::{TokenQueue, TokenizerContext, tokenize};
use crate::options::{DEFAULT_MAX_NESTING_DEPTH, ParserOptions};
use crate::source::SourceRange;

/// Where a nested list of siblings ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StopAt {
    /// Stop before `,`.
    pub separator: bool,
    /// Stop before `)`.
    pub close_bracket: bool,
    /// Stop before a Right-placed operator or a lambda arrow.
    pub operator: bool,
}

impl StopAt {
    /// Parse to the end of the queue.
    pub const END: StopAt = StopAt {
        separator: false,
        close_bracket: false,
        operator: false,
    };

    /// One formatter argument or bracket element.
    pub const ARGUMENT: StopAt = StopAt {
        separator: true,
        close_bracket: true,
        operator: false,
    };

    pub const fn with_operator(self) -> StopAt {
        StopAt {
            operator: true,
            ..self
        }
    }

    const fn without_operator(self) -> StopAt {
        StopAt {
            operator: false,
            ..self
        }
    }
}

/// Parse the queue up to `stop`. An empty expression is reported and
/// yields an empty chain.
pub fn parse_expression(
    queue: &mut TokenQueue,
    diagnostics: &mut Diagnostics,
    stop: StopAt,
) -> Expression {
    parse_expression_bounded(queue, diagnostics, stop, DEFAULT_MAX_NESTING_DEPTH)
}

/// [`parse_expression`] with an explicit nesting limit.
pub fn parse_expression_bounded(
    queue: &mut TokenQueue,
    diagnostics: &mut Diagnostics,
    stop: StopAt,
    max_depth: usize,
) -> Expression {
    let range = queue.next_range();
    let mut parser = Parser::new(queue, diagnostics).with_max_depth(max_depth);
    match parser.parse_list(stop) {
        Some(expr) => expr,
        None => {
            parser.syntax("empty expression", range);
            Expression::List(Vec::new())
        }
    }
}

/// Tokenize and parse a standalone expression.
pub fn parse_text(text: &str, options: &ParserOptions) -> (Expression, Diagnostics) {
    let mut context = TokenizerContext::new(options);
    let mut queue = tokenize(text, &mut context);
    let mut diagnostics = context.diagnostics;
    let expr = parse_expression_bounded(
        &mut queue,
        &mut diagnostics,
        StopAt::END,
        options.max_nesting_depth,
    );
    (expr, diagnostics)
}

pub struct Parser<'q, 'd> {
    queue: &'q mut TokenQueue,
    diagnostics: &'d mut Diagnostics,
    depth: usize,
    max_depth: usize,
    /// Set once the nesting limit was hit; later errors are follow-ons.
    too_deep: bool,
}

impl<'q, 'd> Parser<'q, 'd> {
    pub fn new(queue: &'q mut TokenQueue, diagnostics: &'d mut Diagnostics) -> Self {
        Parser {
            queue,
            diagnostics,
            depth: 0,
            max_depth: DEFAULT_MAX_NESTING_DEPTH,
            too_deep: false,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn syntax(&mut self, message: impl Into<String>, range: SourceRange) {
        if !self.too_deep {
            self.diagnostics.syntax(message, range);
        }
    }

    /// Report the nesting limit once and give up on the rest of the input.
    fn abandon_nesting(&mut self) {
        if !self.too_deep {
            let range = self.queue.next_range();
            self.diagnostics.syntax(
                format!("expression nested deeper than {} levels", self.max_depth),
                range,
            );
            self.too_deep = true;
        }
        self.queue.clear();
    }

    fn check_close(&self) -> bool {
        matches!(
            self.queue.peek_kind(),
            Some(TokenKind::Bracket(BracketKind::Close))
        )
    }

    fn should_stop(&self, stop: StopAt, has_items: bool) -> bool {
        match self.queue.peek_kind() {
            None => true,
            Some(TokenKind::ArgumentSeparator) => stop.separator,
            Some(TokenKind::Bracket(BracketKind::Close)) => stop.close_bracket,
            Some(TokenKind::Operator(op)) => stop.operator && op.placement() == Placement::Right,
            Some(TokenKind::LambdaArrow) => stop.operator && has_items,
            Some(_) => false,
        }
    }

    /// Parse siblings until `stop`, collapsing a single-element chain.
    pub fn parse_list(&mut self, stop: StopAt) -> Option<Expression> {
        if self.depth >= self.max_depth {
            self.abandon_nesting();
            return None;
        }
        self.depth += 1;
        let expr = self.parse_siblings(stop);
        self.depth -= 1;
        expr
    }

    fn parse_siblings(&mut self, stop: StopAt) -> Option<Expression> {
        let mut items: Vec<Expression> = Vec::new();
        // Operators and lambdas wrap everything parsed so far.
        let mut wrapped = 0;

        while !self.should_stop(stop, !items.is_empty()) {
            if self.depth + wrapped > self.max_depth {
                self.abandon_nesting();
                break;
            }
            let Some(token) = self.queue.pop() else {
                break;
            };
            let range = token.range;

            match token.kind {
                TokenKind::Path(path) => {
                    let continuation = path.continuation;
                    let expr = self.parse_path(path, range);
                    if continuation {
                        items.push(expr);
                    } else {
                        self.push_operand(&mut items, expr, range);
                    }
                }
                TokenKind::Number(number) => {
                    self.push_operand(&mut items, Expression::Number(number), range)
                }
                TokenKind::String { value, delimiter } => {
                    self.push_operand(&mut items, Expression::String { value, delimiter }, range)
                }
                TokenKind::Bracket(BracketKind::Open) => {
                    let group = self.parse_group(range);
                    self.push_operand(&mut items, group, range);
                }
                TokenKind::Operator(op) => match op.placement() {
                    Placement::Left => {
                        let expr = self.parse_prefix(op, range, stop);
                        self.push_operand(&mut items, expr, range);
                    }
                    Placement::Right => {
                        let expr = self.parse_infix(op, std::mem::take(&mut items), range, stop);
                        items.push(expr);
                        wrapped += 1;
                    }
                },
                TokenKind::LambdaArrow => {
                    let expr = self.parse_lambda(std::mem::take(&mut items), range, stop);
                    items.push(expr);
                    wrapped += 1;
                }
                TokenKind::Bracket(BracketKind::Close) => {
                    self.syntax("unexpected ')'", range);
                }
                TokenKind::ArgumentSeparator => {
                    self.syntax("unexpected ','", range);
                }
                TokenKind::ArgumentName(name) => {
                    self.syntax(
                        format!("argument name '[{name}]' outside a formatter call"),
                        range,
                    );
                }
            }
        }

        Expression::chain(items)
    }

    fn push_operand(&mut self, items: &mut Vec<Expression>, expr: Expression, range: SourceRange) {
        if !items.is_empty() {
            self.syntax("missing operator", range);
        }
        items.push(expr);
    }

    fn parse_path(&mut self, path: PathToken, range: SourceRange) -> Expression {
        let PathToken {
            parts, formatter, ..
        } = path;
        let arguments = match formatter {
            Some(_) if self.take_open_bracket() => self.parse_arguments(range),
            Some(ref name) => {
                self.syntax(format!("missing '(' after formatter '{name}'"), range);
                Vec::new()
            }
            None => Vec::new(),
        };
        Expression::Path {
            parts,
            formatter,
            arguments,
        }
    }

    fn take_open_bracket(&mut self) -> bool {
        if matches!(
            self.queue.peek_kind(),
            Some(TokenKind::Bracket(BracketKind::Open))
        ) {
            self.queue.pop();
            true
        } else {
            false
        }
    }

    /// Arguments after an opening `(`, through the matching `)`.
    fn parse_arguments(&mut self, open: SourceRange) -> Vec<ExpressionArgument> {
        let mut arguments = Vec::new();
        if self.check_close() {
            self.queue.pop();
            return arguments;
        }

        loop {
            let name = match self.queue.peek_kind() {
                Some(TokenKind::ArgumentName(name)) => {
                    let name = name.clone();
                    self.queue.pop();
                    Some(name)
                }
                _ => None,
            };

            let start = self.queue.next_range();
            match self.parse_list(StopAt::ARGUMENT) {
                Some(value) => arguments.push(ExpressionArgument { name, value }),
                None => self.syntax("empty argument", start),
            }

            match self.queue.peek_kind() {
                Some(TokenKind::ArgumentSeparator) => {
                    self.queue.pop();
                }
                Some(TokenKind::Bracket(BracketKind::Close)) => {
                    self.queue.pop();
                    break;
                }
                None => {
                    if !self.too_deep {
                        let kind = ParseErrorKind::UnclosedScope("missing ')'".to_string());
                        self.diagnostics.push(kind, open);
                    }
                    break;
                }
                Some(other) => unreachable!("argument list stopped at {other:?}"),
            }
        }
        arguments
    }

    fn parse_group(&mut self, open: SourceRange) -> Expression {
        let arguments = self.parse_arguments(open);
        let mut children = Vec::with_capacity(arguments.len());
        for argument in arguments {
            if let Some(name) = argument.name {
                self.syntax(
                    format!("argument name '[{name}]' outside a formatter call"),
                    open,
                );
            }
            children.push(argument.value);
        }
        Expression::Bracket(children)
    }

    fn parse_prefix(&mut self, op: OperatorKind, range: SourceRange, stop: StopAt) -> Expression {
        let operand = match self.parse_list(stop.with_operator()) {
            Some(operand) => operand,
            None => {
                self.syntax(format!("missing operand after '{}'", op.text()), range);
                Expression::List(Vec::new())
            }
        };
        Expression::Operator {
            operator: op,
            left: Box::new(operand),
            right: None,
        }
    }

    fn parse_infix(
        &mut self,
        op: OperatorKind,
        items: Vec<Expression>,
        range: SourceRange,
        stop: StopAt,
    ) -> Expression {
        let left = Expression::chain(items).unwrap_or_else(|| {
            self.syntax(format!("missing left operand for '{}'", op.text()), range);
            Expression::List(Vec::new())
        });

        let right = if op.is_binary() {
            let right = self.parse_list(stop.with_operator()).unwrap_or_else(|| {
                self.syntax(format!("missing right operand for '{}'", op.text()), range);
                Expression::List(Vec::new())
            });
            Some(Box::new(right))
        } else {
            None
        };

        Expression::Operator {
            operator: op,
            left: Box::new(left),
            right,
        }
    }

    fn parse_lambda(&mut self, items: Vec<Expression>, range: SourceRange, stop: StopAt) -> Expression {
        let parameter = match Expression::chain(items) {
            Some(parameter) => {
                if parameter.lambda_parameter_names().is_none() {
                    self.syntax(
                        "lambda parameters must be plain names, e.g. 'x' or '(a, b)'",
                        range,
                    );
                }
                parameter
            }
            None => {
                self.syntax("lambda without a parameter", range);
                Expression::Bracket(Vec::new())
            }
        };

        let body = self.parse_list(stop.without_operator()).unwrap_or_else(|| {
            self.syntax("missing lambda body", range);
            Expression::List(Vec::new())
        });

        Expression::Lambda {
            parameter: Box::new(parameter),
            body: Box::new(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::number::Number;

    fn parse(text: &str) -> Expression {
        let (expr, diagnostics) = parse_text(text, &ParserOptions::default());
        assert!(diagnostics.is_empty(), "{text}: {diagnostics:?}");
        expr
    }

    fn op(operator: OperatorKind, left: Expression, right: Expression) -> Expression {
        Expression::Operator {
            operator,
            left: Box::new(left),
            right: Some(Box::new(right)),
        }
    }

    fn num(n: i32) -> Expression {
        Expression::Number(Number::Int(n))
    }

    #[test]
    fn test_flat_association() {
        assert_eq!(
            parse("2 + 3 * 4"),
            op(
                OperatorKind::Multiply,
                op(OperatorKind::Add, num(2), num(3)),
                num(4)
            )
        );
    }

    #[test]
    fn test_chain() {
        let expr = parse("'abc'.ToUpper()");
        let Expression::List(children) = expr else {
            panic!("expected chain, got {expr:?}");
        };
        assert_eq!(children.len(), 2);
        assert!(children[1].is_formatter_call());
    }

    #[test]
    fn test_missing_operator() {
        let (_, diagnostics) = parse_text("a b", &ParserOptions::default());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.errors()[0].kind.message(), "missing operator");
    }

    #[test]
    fn test_nesting_limit() {
        let options = ParserOptions::default().with_max_nesting_depth(4);
        let (_, diagnostics) = parse_text("((1))", &options);
        assert!(diagnostics.is_empty());
        let (_, diagnostics) = parse_text("((((((1))))))", &options);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics.errors()[0].kind.message().contains("nested deeper than 4"));
    }

    #[test]
    fn test_empty() {
        let (expr, diagnostics) = parse_text("   ", &ParserOptions::default());
        assert_eq!(expr, Expression::List(Vec::new()));
        assert_eq!(diagnostics.len(), 1);
    }
}
