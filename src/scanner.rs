//! Tag scanner: splits template text into literal spans and tag spans.
//!
//! The scanner walks the template one character at a time. Outside a tag
//! it looks for the open delimiter; inside a tag it looks for the close
//! delimiter, except while inside a quoted string, so that
//! `{{ Format("}}") }}` closes only at the last `}}`.
//!
//! ```
//! use whisker::scanner::scan;
//! use whisker::options::Delimiters;
//! use whisker::source::LineIndex;
//!
//! let mut lines = LineIndex::new();
//! let scan = scan("Hello {{name}}!", &Delimiters::default(), &mut lines);
//! assert_eq!(scan.matches.len(), 1);
//! assert_eq!(scan.matches[0].content, "name");
//! assert_eq!(scan.trailing.unwrap().text, "!");
//! ```

use crate::options::Delimiters;
use crate::source::{LineIndex, SourceRange};

/// A run of literal template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    pub text: String,
    pub range: SourceRange,
}

/// One tag occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatch {
    /// Literal text between the previous tag (or the start) and this one.
    pub preceding: Option<Literal>,
    /// Tag content with delimiters stripped.
    pub content: String,
    /// Range of `content`.
    pub content_range: SourceRange,
    /// Range of the whole tag, delimiters included.
    pub range: SourceRange,
    /// The close delimiter was never found; `content` runs to the end.
    pub unterminated: bool,
}

/// Result of scanning a whole template.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Scan {
    pub matches: Vec<TagMatch>,
    /// Literal text after the last tag.
    pub trailing: Option<Literal>,
}

impl Scan {
    /// Rebuild the source text from the scanned fragments.
    pub fn reconstruct(&self, delimiters: &Delimiters) -> String {
        let mut out = String::new();
        for m in &self.matches {
            if let Some(lit) = &m.preceding {
                out.push_str(&lit.text);
            }
            out.push_str(&delimiters.open);
            out.push_str(&m.content);
            if !m.unterminated {
                out.push_str(&delimiters.close);
            }
        }
        if let Some(lit) = &self.trailing {
            out.push_str(&lit.text);
        }
        out
    }
}

/// Scan `text`, recording newline offsets into `lines`.
pub fn scan(text: &str, delimiters: &Delimiters, lines: &mut LineIndex) -> Scan {
    let mut scanner = Scanner::new(text, delimiters, lines);
    let matches = scanner.by_ref().collect();
    Scan {
        matches,
        trailing: scanner.trailing.take(),
    }
}

/// Incremental scanner yielding one [`TagMatch`] per call.
pub struct Scanner<'a> {
    text: &'a str,
    delimiters: &'a Delimiters,
    lines: &'a mut LineIndex,
    pos: usize,
    done: bool,
    trailing: Option<Literal>,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str, delimiters: &'a Delimiters, lines: &'a mut LineIndex) -> Self {
        Scanner {
            text,
            delimiters,
            lines,
            pos: 0,
            done: false,
            trailing: None,
        }
    }

    /// Literal text after the last tag; available once iteration ends.
    pub fn trailing(&self) -> Option<&Literal> {
        self.trailing.as_ref()
    }

    fn rest(&self) -> &'a str {
        let text: &'a str = self.text;
        &text[self.pos..]
    }

    fn current_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current_char()?;
        if ch == '\n' {
            self.lines.record(self.pos);
        }
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn advance_by(&mut self, bytes: usize) {
        let target = (self.pos + bytes).min(self.text.len());
        while self.pos < target {
            if self.advance().is_none() {
                break;
            }
        }
    }

    fn literal(&self, start: usize, end: usize) -> Option<Literal> {
        (end > start).then(|| Literal {
            text: self.text[start..end].to_string(),
            range: SourceRange::between(start, end),
        })
    }

    fn finish(&mut self, literal_start: usize) {
        self.done = true;
        self.trailing = self.literal(literal_start, self.text.len());
    }

    fn next_match(&mut self) -> Option<TagMatch> {
        if self.done {
            return None;
        }

        let literal_start = self.pos;
        let delimiters: &'a Delimiters = self.delimiters;
        let open = delimiters.open.as_str();
        let close = delimiters.close.as_str();

        // Find the next open delimiter.
        loop {
            if self.pos >= self.text.len() || open.is_empty() {
                self.advance_by(self.text.len() - self.pos);
                self.finish(literal_start);
                return None;
            }
            if self.rest().starts_with(open) {
                break;
            }
            self.advance();
        }

        let tag_start = self.pos;
        let preceding = self.literal(literal_start, tag_start);
        self.advance_by(open.len());
        let content_start = self.pos;

        let mut quote: Option<char> = None;
        loop {
            if self.pos >= self.text.len() {
                self.done = true;
                let content_range = SourceRange::between(content_start, self.text.len());
                return Some(TagMatch {
                    preceding,
                    content: self.text[content_start..].to_string(),
                    content_range,
                    range: SourceRange::between(tag_start, self.text.len()),
                    unterminated: true,
                });
            }

            match quote {
                Some(q) => {
                    let ch = self.advance();
                    if ch == Some('\\') && self.current_char() == Some(q) {
                        self.advance();
                    } else if ch == Some(q) {
                        quote = None;
                    }
                }
                None if !close.is_empty() && self.rest().starts_with(close) => {
                    let content_end = self.pos;
                    self.advance_by(close.len());
                    return Some(TagMatch {
                        preceding,
                        content: self.text[content_start..content_end].to_string(),
                        content_range: SourceRange::between(content_start, content_end),
                        range: SourceRange::between(tag_start, self.pos),
                        unterminated: false,
                    });
                }
                None => {
                    if let Some(ch @ ('\'' | '"')) = self.advance() {
                        quote = Some(ch);
                    }
                }
            }
        }
    }
}

impl Iterator for Scanner<'_> {
    type Item = TagMatch;

    fn next(&mut self) -> Option<TagMatch> {
        self.next_match()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_simple() {
        let mut lines = LineIndex::new();
        let scan = scan("Hello {{name}}", &Delimiters::default(), &mut lines);
        assert_eq!(scan.matches.len(), 1);
        let m = &scan.matches[0];
        assert_eq!(m.preceding.as_ref().map(|l| l.text.as_str()), Some("Hello "));
        assert_eq!(m.content, "name");
        assert_eq!(m.range, SourceRange::new(6, 8));
        assert_eq!(m.content_range, SourceRange::new(8, 4));
        assert!(scan.trailing.is_none());
    }

    #[test]
    fn test_scan_string_mode() {
        let mut lines = LineIndex::new();
        let scan = scan("{{ F('}}') }}x", &Delimiters::default(), &mut lines);
        assert_eq!(scan.matches[0].content, " F('}}') ");
        assert_eq!(scan.trailing.unwrap().text, "x");
    }

    #[test]
    fn test_scan_escaped_quote_in_string() {
        let mut lines = LineIndex::new();
        let scan = scan(r"{{ 'a\'}}' }}", &Delimiters::default(), &mut lines);
        assert_eq!(scan.matches[0].content, r" 'a\'}}' ");
        assert!(!scan.matches[0].unterminated);
    }

    #[test]
    fn test_scan_unterminated() {
        let mut lines = LineIndex::new();
        let scan = scan("a {{b\nc", &Delimiters::default(), &mut lines);
        assert_eq!(scan.matches.len(), 1);
        assert!(scan.matches[0].unterminated);
        assert_eq!(scan.matches[0].content, "b\nc");
        assert_eq!(lines.newline_count(), 1);
    }

    #[test]
    fn test_scan_custom_delimiters() {
        let mut lines = LineIndex::new();
        let delimiters = Delimiters::new("<%", "%>");
        let scan = scan("x<%a%>y<%b%>", &delimiters, &mut lines);
        let contents: Vec<_> = scan.matches.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b"]);
    }
}
