use crate::ast::{OperatorKind, PathPart};
use crate::number::Number;

/// Abstract Syntax Tree node for one compiled expression.
///
/// Each node exclusively owns its children.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Path, optionally ending in a formatter call
    ///
    /// # Examples
    /// ```text
    /// a.b.c
    /// list.Where(x => x.Active)
    /// Format([places] 2)
    /// ```
    Path {
        parts: Vec<PathPart>,
        formatter: Option<String>,
        arguments: Vec<ExpressionArgument>,
    },

    /// Chain: each child is evaluated against the previous child's result
    ///
    /// # Example
    /// ```text
    /// 'abc'.ToUpper().Length
    /// ```
    List(Vec<Expression>),

    /// Parenthesised, comma-separated group
    ///
    /// # Examples
    /// ```text
    /// (a + b)
    /// (a, b) => a + b
    /// ```
    Bracket(Vec<Expression>),

    /// Operator application. A prefix operator keeps its operand in `left`.
    Operator {
        operator: OperatorKind,
        left: Box<Expression>,
        right: Option<Box<Expression>>,
    },

    /// Lambda passed to a formatter
    ///
    /// # Example
    /// ```text
    /// x => x.Age > 10
    /// ```
    Lambda {
        parameter: Box<Expression>,
        body: Box<Expression>,
    },

    /// String literal, remembering its quote character
    String { value: String, delimiter: char },

    /// Numeric literal
    Number(Number),
}

/// One formatter argument, optionally named (`[name] value`).
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionArgument {
    pub name: Option<String>,
    pub value: Expression,
}

impl Expression {
    /// A plain path of named segments.
    pub fn data_path<S: AsRef<str>>(segments: &[S]) -> Self {
        Expression::Path {
            parts: segments
                .iter()
                .map(|s| PathPart::DataPath(s.as_ref().to_string()))
                .collect(),
            formatter: None,
            arguments: Vec::new(),
        }
    }

    /// Collapse a chain of one element to that element.
    pub fn chain(mut children: Vec<Expression>) -> Option<Self> {
        match children.len() {
            0 => None,
            1 => children.pop(),
            _ => Some(Expression::List(children)),
        }
    }

    /// Names bound by a lambda parameter expression: one bare segment, or
    /// a bracket of bare segments.
    pub fn lambda_parameter_names(&self) -> Option<Vec<&str>> {
        match self {
            Expression::Bracket(children) => children.iter().map(Self::bare_segment).collect(),
            other => Self::bare_segment(other).map(|name| vec![name]),
        }
    }

    fn bare_segment(expr: &Expression) -> Option<&str> {
        match expr {
            Expression::Path {
                parts,
                formatter: None,
                arguments,
            } if arguments.is_empty() => match parts.as_slice() {
                [PathPart::DataPath(name)] => Some(name.as_str()),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn is_formatter_call(&self) -> bool {
        matches!(self, Expression::Path { formatter: Some(_), .. })
    }
}
