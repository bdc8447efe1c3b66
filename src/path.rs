//! Path tokenizer.
//!
//! Turns one path-like run of characters (`../a.b`, `~.total`, `list.?`,
//! `.Length`) into [`PathPart`]s. The expression tokenizer feeds it one
//! character at a time and stops as soon as [`PathTokenizer::push`]
//! declines a character.

use crate::ast::{PathPart, PathToken};
use crate::diagnostics::Diagnostics;
use crate::source::SourceRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    /// `.` as the first character
    LeadingDot,
    InSegment,
    /// `.` after a completed part
    AfterDot,
    /// `..`
    Dots,
    /// `../`
    AfterParent,
    /// `../.`
    ParentDot,
    /// `~`
    AfterRoot,
    /// `?`
    AfterSelector,
}

/// Characters that may appear anywhere in a path.
pub fn is_path_char(c: char) -> bool {
    is_segment_char(c) || matches!(c, '.' | '/' | '~' | '?')
}

/// Characters that may start a path.
pub fn is_path_start(c: char) -> bool {
    is_segment_char(c) || matches!(c, '.' | '~' | '?')
}

fn is_segment_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

pub struct PathTokenizer {
    state: State,
    current: String,
    parts: Vec<PathPart>,
    continuation: bool,
    failed: bool,
}

impl Default for PathTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PathTokenizer {
    pub fn new() -> Self {
        PathTokenizer {
            state: State::Start,
            current: String::new(),
            parts: Vec::new(),
            continuation: false,
            failed: false,
        }
    }

    /// Whether the first error has been reported. The remainder of the
    /// run is still consumed but ignored.
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Offer the next character. Returns `false` if the character does not
    /// belong to this path and must be handled by the caller.
    pub fn push(&mut self, c: char, offset: usize, diagnostics: &mut Diagnostics) -> bool {
        if !is_path_char(c) {
            return false;
        }
        // `/` outside a `../` run is the division operator.
        if c == '/' && self.state != State::Dots {
            return false;
        }
        if self.failed {
            return true;
        }

        match (self.state, c) {
            (State::Start, '.') => self.state = State::LeadingDot,
            (State::Start, '~') => {
                self.parts.push(PathPart::RootSelector);
                self.state = State::AfterRoot;
            }
            (State::Start | State::AfterDot | State::AfterParent, '?') => {
                self.parts.push(PathPart::ObjectSelector);
                self.state = State::AfterSelector;
            }
            (State::LeadingDot, '?') => {
                self.continuation = true;
                self.parts.push(PathPart::ObjectSelector);
                self.state = State::AfterSelector;
            }
            (State::LeadingDot, '.') => self.state = State::Dots,
            (State::LeadingDot, c) if is_segment_char(c) => {
                self.continuation = true;
                self.start_segment(c);
            }
            (State::Start | State::AfterDot | State::AfterParent, c) if is_segment_char(c) => {
                self.start_segment(c);
            }
            (State::InSegment, c) if is_segment_char(c) => self.current.push(c),
            (State::InSegment, '.') => {
                if self.complete_segment(offset, diagnostics) {
                    self.state = State::AfterDot;
                }
            }
            // `a?` ends the path at the `?`
            (State::InSegment, '?') => return false,
            (State::Dots, '/') => {
                self.parts.push(PathPart::ParentSelector);
                self.state = State::AfterParent;
            }
            (State::AfterParent, '.') => self.state = State::ParentDot,
            (State::ParentDot, '.') => self.state = State::Dots,
            (State::AfterRoot | State::AfterSelector, '.') => self.state = State::AfterDot,
            (_, '~') => self.fail("'~' is only allowed at the start of a path", offset, diagnostics),
            (State::AfterDot, '.') => self.fail("empty path segment", offset, diagnostics),
            (State::Dots, '.') => self.fail("too many dots in parent path", offset, diagnostics),
            (_, c) => self.fail(
                format!("unexpected character '{c}' in path"),
                offset,
                diagnostics,
            ),
        }
        true
    }

    /// Finish the run. `end` is the offset just past the last character;
    /// `followed_by_paren` is true when the next non-blank character is `(`.
    pub fn finish(
        mut self,
        end: usize,
        followed_by_paren: bool,
        diagnostics: &mut Diagnostics,
    ) -> PathToken {
        let mut formatter = None;
        if !self.failed {
            match self.state {
                State::InSegment if followed_by_paren => {
                    formatter = Some(std::mem::take(&mut self.current));
                }
                State::InSegment => {
                    self.complete_segment(end, diagnostics);
                }
                State::AfterDot | State::ParentDot if followed_by_paren => {
                    formatter = Some(String::new());
                }
                State::LeadingDot if followed_by_paren => {
                    self.continuation = true;
                    formatter = Some(String::new());
                }
                State::LeadingDot => self.parts.push(PathPart::SelfAssignment),
                State::Dots => self.parts.push(PathPart::ParentSelector),
                State::AfterDot | State::ParentDot => {
                    self.fail("path cannot end with '.'", end.saturating_sub(1), diagnostics)
                }
                State::Start | State::AfterParent | State::AfterRoot | State::AfterSelector => {}
            }
        }
        PathToken {
            parts: self.parts,
            formatter,
            continuation: self.continuation,
        }
    }

    fn start_segment(&mut self, c: char) {
        self.current.clear();
        self.current.push(c);
        self.state = State::InSegment;
    }

    /// Turn the buffered segment into a part. Keywords only count as the
    /// first part of a path that does not continue another expression.
    fn complete_segment(&mut self, offset: usize, diagnostics: &mut Diagnostics) -> bool {
        let text = std::mem::take(&mut self.current);
        if self.parts.last() == Some(&PathPart::Null) {
            self.fail("nothing may follow 'null'", offset, diagnostics);
            return false;
        }
        let first = self.parts.is_empty() && !self.continuation;
        let keyword = match text.as_str() {
            "null" => Some(PathPart::Null),
            "this" => Some(PathPart::ThisPath),
            "true" => Some(PathPart::Boolean(true)),
            "false" => Some(PathPart::Boolean(false)),
            _ => None,
        };
        let part = match keyword {
            Some(part) if first || !part.must_be_first() => part,
            _ => PathPart::DataPath(text),
        };
        self.parts.push(part);
        true
    }

    fn fail(&mut self, message: impl Into<String>, offset: usize, diagnostics: &mut Diagnostics) {
        if !self.failed {
            self.failed = true;
            diagnostics.syntax(message, SourceRange::new(offset, 1));
        }
    }
}

/// Tokenize a standalone path. Used by tests and by callers that accept
/// user-supplied paths outside a template.
pub fn tokenize_path(text: &str, diagnostics: &mut Diagnostics) -> PathToken {
    let mut tokenizer = PathTokenizer::new();
    for (offset, c) in text.char_indices() {
        if !tokenizer.push(c, offset, diagnostics) {
            diagnostics.syntax(
                format!("unexpected character '{c}' in path"),
                SourceRange::new(offset, c.len_utf8()),
            );
            break;
        }
    }
    tokenizer.finish(text.len(), false, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(text: &str) -> Vec<PathPart> {
        let mut diagnostics = Diagnostics::new();
        let token = tokenize_path(text, &mut diagnostics);
        assert!(diagnostics.is_empty(), "{text}: {diagnostics:?}");
        token.parts
    }

    fn data(name: &str) -> PathPart {
        PathPart::DataPath(name.to_string())
    }

    #[test]
    fn test_segments() {
        assert_eq!(parts("a.b.c"), vec![data("a"), data("b"), data("c")]);
        assert_eq!(parts("$index"), vec![data("$index")]);
    }

    #[test]
    fn test_parent_and_root() {
        assert_eq!(
            parts("../../x"),
            vec![PathPart::ParentSelector, PathPart::ParentSelector, data("x")]
        );
        assert_eq!(parts(".."), vec![PathPart::ParentSelector]);
        assert_eq!(parts("~.total"), vec![PathPart::RootSelector, data("total")]);
    }

    #[test]
    fn test_keywords_only_first() {
        assert_eq!(parts("this.x"), vec![PathPart::ThisPath, data("x")]);
        assert_eq!(parts("true"), vec![PathPart::Boolean(true)]);
        assert_eq!(parts("a.null"), vec![data("a"), data("null")]);
    }

    #[test]
    fn test_self_and_selector() {
        assert_eq!(parts("."), vec![PathPart::SelfAssignment]);
        assert_eq!(parts("a.?"), vec![data("a"), PathPart::ObjectSelector]);
    }

    #[test]
    fn test_continuation() {
        let mut diagnostics = Diagnostics::new();
        let token = tokenize_path(".Length", &mut diagnostics);
        assert!(token.continuation);
        assert_eq!(token.parts, vec![data("Length")]);
    }

    #[test]
    fn test_formatter_name() {
        let mut diagnostics = Diagnostics::new();
        let mut tokenizer = PathTokenizer::new();
        for (i, c) in "list.Where".char_indices() {
            assert!(tokenizer.push(c, i, &mut diagnostics));
        }
        let token = tokenizer.finish(10, true, &mut diagnostics);
        assert_eq!(token.parts, vec![data("list")]);
        assert_eq!(token.formatter.as_deref(), Some("Where"));
    }

    #[test]
    fn test_errors() {
        let mut diagnostics = Diagnostics::new();
        tokenize_path("null.x", &mut diagnostics);
        assert_eq!(diagnostics.len(), 1);

        let mut diagnostics = Diagnostics::new();
        tokenize_path("a~b", &mut diagnostics);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.errors()[0].range.index, 1);

        let mut diagnostics = Diagnostics::new();
        tokenize_path("a.", &mut diagnostics);
        assert_eq!(diagnostics.len(), 1);
    }
}
