use crate::ast::{OperatorKind, PathPart};
use crate::number::Number;
use crate::source::SourceRange;

/// Open or close parenthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketKind {
    Open,
    Close,
}

/// The output of the path tokenizer for one path run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathToken {
    pub parts: Vec<PathPart>,
    /// Set when the path is directly followed by `(`. The empty name is
    /// the unnamed default formatter (`a.(...)`).
    pub formatter: Option<String>,
    /// The run began with `.` followed by a segment (`.Length`), so it
    /// continues the expression before it.
    pub continuation: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Data path, possibly naming a formatter
    ///
    /// # Examples
    /// ```text
    /// name
    /// ../parent.value
    /// list.Where
    /// ```
    Path(PathToken),

    /// Numeric literal
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 2.5
    /// 10m
    /// ```
    Number(Number),

    /// String literal in single or double quotes
    ///
    /// # Examples
    /// ```text
    /// 'hello'
    /// "it's"
    /// ```
    String { value: String, delimiter: char },

    /// Operator from the operator table
    Operator(OperatorKind),

    /// Lambda arrow (`=>`)
    LambdaArrow,

    /// `(` or `)`
    Bracket(BracketKind),

    /// Named formatter argument (`[name]`)
    ArgumentName(String),

    /// Argument separator (`,`)
    ArgumentSeparator,
}

/// A token with its source range.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub range: SourceRange,
}

impl Token {
    pub fn new(kind: TokenKind, range: SourceRange) -> Self {
        Token { kind, range }
    }
}
