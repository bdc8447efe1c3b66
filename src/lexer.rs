//! Expression tokenizer.
//!
//! Lexes the content of one tag into a [`TokenQueue`]. Problems are
//! recorded in the context's [`Diagnostics`] and lexing continues, so a
//! single pass reports every defect in the tag.

use std::collections::VecDeque;

use crate::ast::{BracketKind, OperatorKind, Token, TokenKind};
use crate::diagnostics::{Diagnostics, ParseErrorKind};
use crate::number::Number;
use crate::options::ParserOptions;
use crate::path::{PathTokenizer, is_path_start};
use crate::source::SourceRange;

/// Everything the tokenizer needs besides the content itself.
#[derive(Debug)]
pub struct TokenizerContext<'a> {
    pub options: &'a ParserOptions,
    pub diagnostics: Diagnostics,
    /// Absolute offset of the content within the template.
    pub base_offset: usize,
}

impl<'a> TokenizerContext<'a> {
    pub fn new(options: &'a ParserOptions) -> Self {
        TokenizerContext {
            options,
            diagnostics: Diagnostics::new(),
            base_offset: 0,
        }
    }

    pub fn with_base_offset(mut self, offset: usize) -> Self {
        self.base_offset = offset;
        self
    }
}

/// Tokens of one expression, consumed front to back by the parser.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenQueue {
    tokens: VecDeque<Token>,
    /// Offset (relative to the content) where tokenizing stopped.
    pub end_index: usize,
    /// Absolute offset of the end of the content, for errors at the end.
    pub end_offset: usize,
}

impl TokenQueue {
    pub fn new(tokens: Vec<Token>) -> Self {
        let end_offset = tokens.last().map_or(0, |t| t.range.end());
        TokenQueue {
            tokens: tokens.into(),
            end_index: end_offset,
            end_offset,
        }
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.front()
    }

    pub fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.front().map(|t| &t.kind)
    }

    pub fn pop(&mut self) -> Option<Token> {
        self.tokens.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    /// Drop every remaining token.
    pub fn clear(&mut self) {
        self.tokens.clear();
    }

    /// Range of the next token, or an empty range at the end of input.
    pub fn next_range(&self) -> SourceRange {
        self.peek()
            .map_or(SourceRange::new(self.end_offset, 0), |t| t.range)
    }
}

/// Tokenize one tag's content.
pub fn tokenize(content: &str, context: &mut TokenizerContext<'_>) -> TokenQueue {
    let mut lexer = Lexer::new(content, context);
    lexer.run();
    let Lexer {
        tokens,
        position,
        base,
        end,
        ..
    } = lexer;
    let end_index = match position {
        Some(index) => index,
        None => end - base,
    };
    TokenQueue {
        tokens: tokens.into(),
        end_index,
        end_offset: end,
    }
}

struct Lexer<'c, 'o> {
    input: Vec<(usize, char)>,
    index: usize,
    base: usize,
    end: usize,
    open_brackets: usize,
    tokens: Vec<Token>,
    /// Set when a statement terminator stopped tokenizing.
    position: Option<usize>,
    context: &'c mut TokenizerContext<'o>,
}

impl<'c, 'o> Lexer<'c, 'o> {
    fn new(content: &str, context: &'c mut TokenizerContext<'o>) -> Self {
        let base = context.base_offset;
        Lexer {
            input: content.char_indices().collect(),
            index: 0,
            base,
            end: base + content.len(),
            open_brackets: 0,
            tokens: Vec::new(),
            position: None,
            context,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.index).map(|&(_, c)| c)
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.index + offset).map(|&(_, c)| c)
    }

    /// Absolute offset of the character at `index`.
    fn offset_at(&self, index: usize) -> usize {
        self.input
            .get(index)
            .map_or(self.end, |&(offset, _)| self.base + offset)
    }

    fn offset(&self) -> usize {
        self.offset_at(self.index)
    }

    fn advance(&mut self) {
        self.index += 1;
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        let range = SourceRange::between(start, self.offset());
        self.tokens.push(Token::new(kind, range));
    }

    fn error(&mut self, message: impl Into<String>, range: SourceRange) {
        self.context.diagnostics.syntax(message, range);
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn run(&mut self) {
        loop {
            self.skip_whitespace();
            let Some(ch) = self.current_char() else {
                break;
            };
            let start = self.offset();

            if self.context.options.statement_terminator == Some(ch) {
                self.position = Some(start - self.base);
                break;
            }

            match ch {
                '(' => {
                    self.advance();
                    self.open_brackets += 1;
                    self.push(TokenKind::Bracket(BracketKind::Open), start);
                }
                ')' => {
                    self.advance();
                    if self.open_brackets == 0 {
                        self.context.diagnostics.push(
                            ParseErrorKind::UnopenedScope("unexpected ')'".to_string()),
                            SourceRange::new(start, 1),
                        );
                    } else {
                        self.open_brackets -= 1;
                        self.push(TokenKind::Bracket(BracketKind::Close), start);
                    }
                }
                ',' => {
                    self.advance();
                    if self.tokens.is_empty() {
                        self.error("expression cannot start with ','", SourceRange::new(start, 1));
                    } else {
                        self.push(TokenKind::ArgumentSeparator, start);
                    }
                }
                '[' => self.read_argument_name(start),
                '\'' | '"' => self.read_string(ch, start),
                '?' if self.peek_char(1) == Some('?') => self.read_operator(ch, start),
                '+' | '-' | '*' | '/' | '%' | '^' | '<' | '>' | '=' | '!' | '&' | '|' => {
                    self.read_operator(ch, start)
                }
                c if c.is_ascii_digit() => self.read_number(start),
                c if is_path_start(c) => self.read_path(start),
                c => {
                    self.advance();
                    self.error(
                        format!("unexpected character '{c}'"),
                        SourceRange::new(start, c.len_utf8()),
                    );
                }
            }
        }
    }

    fn read_operator(&mut self, first: char, start: usize) {
        if let Some(second) = self.peek_char(1) {
            let pair: String = [first, second].iter().collect();
            if pair == "=>" {
                self.advance();
                self.advance();
                self.push(TokenKind::LambdaArrow, start);
                return;
            }
            if let Some(kind) = OperatorKind::from_text(&pair) {
                self.advance();
                self.advance();
                self.push(TokenKind::Operator(kind), start);
                return;
            }
        }

        self.advance();
        match OperatorKind::from_text(&first.to_string()) {
            Some(kind) => self.push(TokenKind::Operator(kind), start),
            None => self.error(
                format!("unknown operator '{first}'"),
                SourceRange::new(start, 1),
            ),
        }
    }

    fn read_number(&mut self, start: usize) {
        let separator = self.context.options.decimal_separator;
        let mut text = String::new();
        let mut seen_separator = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else if ch == separator
                && !seen_separator
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                seen_separator = true;
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        // Type suffix; anything alphanumeric glued on is part of the literal.
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let number = match Number::parse_literal(&text, separator) {
            Ok(number) => number,
            Err(err) => {
                let range = SourceRange::between(start, self.offset());
                self.context
                    .diagnostics
                    .push(ParseErrorKind::NumberConversion(err.to_string()), range);
                Number::Int(0)
            }
        };
        self.push(TokenKind::Number(number), start);
    }

    fn read_string(&mut self, delimiter: char, start: usize) {
        self.advance(); // opening quote
        let mut value = String::new();

        loop {
            match self.current_char() {
                None => {
                    self.error("unterminated string", SourceRange::new(start, 1));
                    break;
                }
                Some('\\') if self.peek_char(1) == Some(delimiter) => {
                    value.push(delimiter);
                    self.advance();
                    self.advance();
                }
                Some(c) if c == delimiter => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        self.push(TokenKind::String { value, delimiter }, start);
    }

    fn read_argument_name(&mut self, start: usize) {
        self.advance(); // '['
        let mut name = String::new();

        loop {
            match self.current_char() {
                None => {
                    self.error("missing ']' after argument name", SourceRange::new(start, 1));
                    break;
                }
                Some(']') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    name.push(c);
                    self.advance();
                }
            }
        }

        self.push(TokenKind::ArgumentName(name.trim().to_string()), start);
    }

    fn read_path(&mut self, start: usize) {
        let mut tokenizer = PathTokenizer::new();

        while let Some(ch) = self.current_char() {
            // `??` after a path is the coalescing operator
            if ch == '?' && self.peek_char(1) == Some('?') {
                break;
            }
            let offset = self.offset();
            if !tokenizer.push(ch, offset, &mut self.context.diagnostics) {
                break;
            }
            self.advance();
        }

        let end = self.offset();
        let followed_by_paren = self.input[self.index..]
            .iter()
            .map(|&(_, c)| c)
            .find(|c| !c.is_whitespace())
            == Some('(');
        let token = tokenizer.finish(end, followed_by_paren, &mut self.context.diagnostics);
        self.push(TokenKind::Path(token), start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{PathPart, PathToken};

    fn kinds(content: &str) -> (Vec<TokenKind>, Diagnostics) {
        let options = ParserOptions::default();
        let mut context = TokenizerContext::new(&options);
        let queue = tokenize(content, &mut context);
        (
            queue.iter().map(|t| t.kind.clone()).collect(),
            context.diagnostics,
        )
    }

    #[test]
    fn test_operators() {
        let (tokens, diagnostics) = kinds("a >= 1 && !b ?? c");
        assert!(diagnostics.is_empty());
        assert_eq!(tokens[1], TokenKind::Operator(OperatorKind::GreaterEqual));
        assert_eq!(tokens[3], TokenKind::Operator(OperatorKind::And));
        assert_eq!(tokens[4], TokenKind::Operator(OperatorKind::Not));
        assert_eq!(tokens[6], TokenKind::Operator(OperatorKind::NullCoalesce));
    }

    #[test]
    fn test_lambda_arrow() {
        let (tokens, _) = kinds("x => x");
        assert_eq!(tokens[1], TokenKind::LambdaArrow);
    }

    #[test]
    fn test_lone_equals_is_error() {
        let (tokens, diagnostics) = kinds("a = b");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_numbers() {
        let (tokens, _) = kinds("42 2.5 10m 3u");
        assert_eq!(tokens[0], TokenKind::Number(Number::Int(42)));
        assert_eq!(tokens[1], TokenKind::Number(Number::Double(2.5)));
        assert_eq!(tokens[3], TokenKind::Number(Number::UInt(3)));
    }

    #[test]
    fn test_formatter_lookahead() {
        let (tokens, _) = kinds("name.ToUpper ()");
        assert_eq!(
            tokens[0],
            TokenKind::Path(PathToken {
                parts: vec![PathPart::DataPath("name".to_string())],
                formatter: Some("ToUpper".to_string()),
                continuation: false,
            })
        );
        assert_eq!(tokens[1], TokenKind::Bracket(BracketKind::Open));
    }

    #[test]
    fn test_unterminated_string() {
        let (tokens, diagnostics) = kinds("'abc");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.errors()[0].range, SourceRange::new(0, 1));
        assert_eq!(
            tokens[0],
            TokenKind::String {
                value: "abc".to_string(),
                delimiter: '\''
            }
        );
    }

    #[test]
    fn test_statement_terminator() {
        let options = ParserOptions::default().with_statement_terminator(';');
        let mut context = TokenizerContext::new(&options);
        let queue = tokenize("a; b", &mut context);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.end_index, 1);
    }
}
