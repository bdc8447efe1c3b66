//! Compile-time diagnostics.
//!
//! The scanner, tokenizer and parser never stop at the first problem.
//! Each one pushes a [`ParseError`] into a shared [`Diagnostics`]
//! collection and keeps going, so one pass reports every defect.

use std::fmt;

use crate::source::{LineIndex, SourceRange, TextPosition};

/// Classifies a compile-time diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Unexpected character or token, unterminated string or bracket,
    /// invalid path character.
    Syntax(String),
    /// A closing construct with nothing open.
    UnopenedScope(String),
    /// An opened construct that never closed.
    UnclosedScope(String),
    /// A numeric literal that fits no supported numeric kind.
    NumberConversion(String),
}

impl ParseErrorKind {
    pub fn message(&self) -> &str {
        match self {
            Self::Syntax(m)
            | Self::UnopenedScope(m)
            | Self::UnclosedScope(m)
            | Self::NumberConversion(m) => m,
        }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax(m) => write!(f, "syntax error: {m}"),
            Self::UnopenedScope(m) => write!(f, "unopened scope: {m}"),
            Self::UnclosedScope(m) => write!(f, "unclosed scope: {m}"),
            Self::NumberConversion(m) => write!(f, "invalid number: {m}"),
        }
    }
}

/// One located diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at {position}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub range: SourceRange,
    pub position: TextPosition,
}

impl ParseError {
    pub fn is_syntax(&self) -> bool {
        matches!(self.kind, ParseErrorKind::Syntax(_))
    }
}

/// Accumulated diagnostics of one compilation.
///
/// Positions are resolved lazily: errors are recorded with their range
/// only, and [`Diagnostics::locate`] fills in line/column once the
/// scanner has seen every newline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    errors: Vec<ParseError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: ParseErrorKind, range: SourceRange) {
        tracing::trace!(%kind, index = range.index, "diagnostic");
        self.errors.push(ParseError {
            kind,
            range,
            position: TextPosition::default(),
        });
    }

    pub fn syntax(&mut self, message: impl Into<String>, range: SourceRange) {
        self.push(ParseErrorKind::Syntax(message.into()), range);
    }

    pub fn locate(&mut self, lines: &LineIndex) {
        for error in &mut self.errors {
            error.position = lines.position_of(error.range);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParseError> {
        self.errors.iter()
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    /// Append another collection, e.g. from a nested tag.
    pub fn extend(&mut self, other: Self) {
        self.errors.extend(other.errors);
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a ParseError;
    type IntoIter = std::slice::Iter<'a, ParseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// All diagnostics of a failed compilation, as a single error value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct CompileError {
    pub errors: Vec<ParseError>,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [] => write!(f, "compilation failed"),
            [only] => write!(f, "{only}"),
            [first, rest @ ..] => write!(f, "{first} (and {} more)", rest.len()),
        }
    }
}
