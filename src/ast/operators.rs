/// Where an operator sits relative to its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    /// Prefix: the operand follows (`!x`).
    Left,
    /// Infix or postfix: takes the preceding expression as its left operand.
    Right,
}

/// Operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    // Arithmetic
    /// Addition, or string concatenation when either side is a string (`+`)
    Add,
    /// Subtraction (`-`)
    Subtract,
    /// Multiplication (`*`)
    Multiply,
    /// Division (`/`)
    Divide,
    /// Remainder (`%`)
    Modulo,
    /// Exponentiation (`^`)
    Power,

    // Comparison
    /// Equal (`==`)
    Equal,
    /// Not equal (`!=`)
    NotEqual,
    /// Less than (`<`)
    LessThan,
    /// Greater than (`>`)
    GreaterThan,
    /// Less than or equal (`<=`)
    LessEqual,
    /// Greater than or equal (`>=`)
    GreaterEqual,

    // Logical
    /// Logical AND (`&&`)
    And,
    /// Logical OR (`||`)
    Or,
    /// Logical NOT (`!`)
    Not,

    // Null-coalescing
    /// Null-coalescing (`??`)
    NullCoalesce,
}

/// One row of the operator table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorInfo {
    pub kind: OperatorKind,
    pub text: &'static str,
    pub placement: Placement,
    pub is_binary: bool,
}

const fn right(kind: OperatorKind, text: &'static str) -> OperatorInfo {
    OperatorInfo {
        kind,
        text,
        placement: Placement::Right,
        is_binary: true,
    }
}

/// Every operator the tokenizer recognises.
pub const OPERATORS: &[OperatorInfo] = &[
    right(OperatorKind::Add, "+"),
    right(OperatorKind::Subtract, "-"),
    right(OperatorKind::Multiply, "*"),
    right(OperatorKind::Divide, "/"),
    right(OperatorKind::Modulo, "%"),
    right(OperatorKind::Power, "^"),
    right(OperatorKind::Equal, "=="),
    right(OperatorKind::NotEqual, "!="),
    right(OperatorKind::LessThan, "<"),
    right(OperatorKind::GreaterThan, ">"),
    right(OperatorKind::LessEqual, "<="),
    right(OperatorKind::GreaterEqual, ">="),
    right(OperatorKind::And, "&&"),
    right(OperatorKind::Or, "||"),
    right(OperatorKind::NullCoalesce, "??"),
    OperatorInfo {
        kind: OperatorKind::Not,
        text: "!",
        placement: Placement::Left,
        is_binary: false,
    },
];

impl OperatorKind {
    pub fn from_text(text: &str) -> Option<Self> {
        OPERATORS.iter().find(|info| info.text == text).map(|info| info.kind)
    }

    pub fn info(self) -> &'static OperatorInfo {
        match OPERATORS.iter().find(|info| info.kind == self) {
            Some(info) => info,
            None => unreachable!("every operator kind has a table entry"),
        }
    }

    pub fn text(self) -> &'static str {
        self.info().text
    }

    pub fn placement(self) -> Placement {
        self.info().placement
    }

    pub fn is_binary(self) -> bool {
        self.info().is_binary
    }
}
