//! Compile-time options.

/// Tag delimiters; Mustache's `{{` / `}}` by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    pub open: String,
    pub close: String,
}

impl Delimiters {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::new("{{", "}}")
    }
}

/// Options shared by the scanner, tokenizer and parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
    pub delimiters: Delimiters,
    /// Culture decimal separator recognised inside numeric literals.
    pub decimal_separator: char,
    /// Character that ends an expression early, e.g. `;`.
    pub statement_terminator: Option<char>,
    /// Deepest nesting of brackets, calls, prefix operators and operator
    /// chains the parser accepts.
    pub max_nesting_depth: usize,
}

/// Default for [`ParserOptions::max_nesting_depth`].
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 256;

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            delimiters: Delimiters::default(),
            decimal_separator: '.',
            statement_terminator: None,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

impl ParserOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiters(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.delimiters = Delimiters::new(open, close);
        self
    }

    pub fn with_decimal_separator(mut self, separator: char) -> Self {
        self.decimal_separator = separator;
        self
    }

    pub fn with_statement_terminator(mut self, terminator: char) -> Self {
        self.statement_terminator = Some(terminator);
        self
    }

    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }
}
