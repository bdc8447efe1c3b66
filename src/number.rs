//! Numeric values that remember which primitive kind produced them.
//!
//! Arithmetic between two numbers runs in the wider of the two kinds and
//! tags the result with that kind. Kinds are declared in rank order, so
//! the derived `Ord` on [`NumberKind`] is the widening rule:
//!
//! ```text
//! i8 < u8 < i16 < u16 < i32 < u32 < i64 < u64 < f32 < f64 < decimal
//! ```
//!
//! Integer arithmetic wraps on overflow. Integer division by zero is an
//! error; float division follows IEEE 754.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

/// The primitive kind a [`Number`] carries, in widening order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NumberKind {
    SByte,
    Byte,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    Decimal,
}

impl NumberKind {
    pub const fn is_integer(self) -> bool {
        !matches!(self, Self::Float | Self::Double | Self::Decimal)
    }

    /// Kind an operation between `self` and `other` is performed in.
    pub fn widen(self, other: Self) -> Self {
        self.max(other)
    }

    /// Literal suffix used when printing a number of this kind.
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::SByte => "SB",
            Self::Byte => "B",
            Self::Short => "S",
            Self::UShort => "US",
            Self::Int => "",
            Self::UInt => "U",
            Self::Long => "L",
            Self::ULong => "UL",
            Self::Float => "F",
            Self::Double => "D",
            Self::Decimal => "M",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::SByte => "i8",
            Self::Byte => "u8",
            Self::Short => "i16",
            Self::UShort => "u16",
            Self::Int => "i32",
            Self::UInt => "u32",
            Self::Long => "i64",
            Self::ULong => "u64",
            Self::Float => "f32",
            Self::Double => "f64",
            Self::Decimal => "decimal",
        }
    }
}

impl fmt::Display for NumberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised by numeric parsing and arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NumberError {
    #[error("'{0}' is not a valid numeric literal")]
    InvalidLiteral(String),
    #[error("'{text}' does not fit in {kind}")]
    OutOfRange { text: String, kind: NumberKind },
    #[error("{value} cannot be represented as {kind}")]
    NotRepresentable { value: String, kind: NumberKind },
    #[error("division by zero")]
    DivisionByZero,
    #[error("decimal arithmetic overflowed")]
    Overflow,
    #[error("exponent {0} is not a non-negative integer")]
    InvalidExponent(String),
}

/// Arithmetic operations defined on [`Number`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
}

/// A numeric value tagged with its kind.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    SByte(i8),
    Byte(u8),
    Short(i16),
    UShort(u16),
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
}

macro_rules! impl_from_primitive {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Number {
                fn from(v: $t) -> Self {
                    Number::$variant(v)
                }
            }
        )*
    };
}

impl_from_primitive! {
    i8 => SByte,
    u8 => Byte,
    i16 => Short,
    u16 => UShort,
    i32 => Int,
    u32 => UInt,
    i64 => Long,
    u64 => ULong,
    f32 => Float,
    f64 => Double,
    Decimal => Decimal,
}

impl Number {
    pub const fn kind(&self) -> NumberKind {
        match self {
            Self::SByte(_) => NumberKind::SByte,
            Self::Byte(_) => NumberKind::Byte,
            Self::Short(_) => NumberKind::Short,
            Self::UShort(_) => NumberKind::UShort,
            Self::Int(_) => NumberKind::Int,
            Self::UInt(_) => NumberKind::UInt,
            Self::Long(_) => NumberKind::Long,
            Self::ULong(_) => NumberKind::ULong,
            Self::Float(_) => NumberKind::Float,
            Self::Double(_) => NumberKind::Double,
            Self::Decimal(_) => NumberKind::Decimal,
        }
    }

    /// Integer value, for integer kinds only.
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Self::SByte(v) => Some(v.into()),
            Self::Byte(v) => Some(v.into()),
            Self::Short(v) => Some(v.into()),
            Self::UShort(v) => Some(v.into()),
            Self::Int(v) => Some(v.into()),
            Self::UInt(v) => Some(v.into()),
            Self::Long(v) => Some(v.into()),
            Self::ULong(v) => Some(v.into()),
            Self::Float(_) | Self::Double(_) | Self::Decimal(_) => None,
        }
    }

    pub fn to_f64(&self) -> f64 {
        match *self {
            Self::Float(v) => f64::from(v),
            Self::Double(v) => v,
            Self::Decimal(v) => v.to_f64().unwrap_or(f64::NAN),
            _ => self.as_i128().map_or(f64::NAN, |v| v as f64),
        }
    }

    pub fn to_decimal(&self) -> Option<Decimal> {
        match *self {
            Self::Float(v) => Decimal::from_f32(v),
            Self::Double(v) => Decimal::from_f64(v),
            Self::Decimal(v) => Some(v),
            _ => self.as_i128().and_then(Decimal::from_i128),
        }
    }

    /// Integral value as `i64`, truncating fractional kinds.
    pub fn to_i64(&self) -> Option<i64> {
        match *self {
            Self::Float(v) => v.trunc().to_i64(),
            Self::Double(v) => v.trunc().to_i64(),
            Self::Decimal(v) => v.trunc().to_i64(),
            _ => self.as_i128().and_then(|v| i64::try_from(v).ok()),
        }
    }

    /// Non-negative integral value usable as an index.
    pub fn to_usize(&self) -> Option<usize> {
        self.to_i64().and_then(|v| usize::try_from(v).ok())
    }

    pub fn is_zero(&self) -> bool {
        match *self {
            Self::Float(v) => v == 0.0,
            Self::Double(v) => v == 0.0,
            Self::Decimal(v) => v.is_zero(),
            _ => self.as_i128() == Some(0),
        }
    }

    /// Convert to `kind`. Integer targets wrap like a primitive cast;
    /// fractional sources truncate toward zero.
    pub fn convert(&self, kind: NumberKind) -> Result<Number, NumberError> {
        if self.kind() == kind {
            return Ok(*self);
        }
        let not_representable = || NumberError::NotRepresentable {
            value: self.to_string(),
            kind,
        };
        let converted = match kind {
            NumberKind::Float => Number::Float(self.to_f64() as f32),
            NumberKind::Double => Number::Double(self.to_f64()),
            NumberKind::Decimal => Number::Decimal(self.to_decimal().ok_or_else(not_representable)?),
            _ => {
                let integral = match *self {
                    Self::Float(v) if v.is_finite() => v.trunc() as i128,
                    Self::Double(v) if v.is_finite() => v.trunc() as i128,
                    Self::Decimal(v) => v.trunc().to_i128().ok_or_else(not_representable)?,
                    Self::Float(_) | Self::Double(_) => return Err(not_representable()),
                    _ => self.as_i128().ok_or_else(not_representable)?,
                };
                Number::from_i128_wrapping(kind, integral)
            }
        };
        Ok(converted)
    }

    fn from_i128_wrapping(kind: NumberKind, v: i128) -> Number {
        match kind {
            NumberKind::SByte => Number::SByte(v as i8),
            NumberKind::Byte => Number::Byte(v as u8),
            NumberKind::Short => Number::Short(v as i16),
            NumberKind::UShort => Number::UShort(v as u16),
            NumberKind::Int => Number::Int(v as i32),
            NumberKind::UInt => Number::UInt(v as u32),
            NumberKind::Long => Number::Long(v as i64),
            NumberKind::ULong => Number::ULong(v as u64),
            NumberKind::Float => Number::Float(v as f32),
            NumberKind::Double => Number::Double(v as f64),
            NumberKind::Decimal => Number::Decimal(Decimal::from_i128(v).unwrap_or(Decimal::MAX)),
        }
    }

    /// Apply `op` in the wider kind of the two operands.
    pub fn apply(self, op: ArithmeticOp, rhs: Number) -> Result<Number, NumberError> {
        let kind = self.kind().widen(rhs.kind());
        let a = self.convert(kind)?;
        let b = rhs.convert(kind)?;

        match (a, b) {
            (Number::Float(x), Number::Float(y)) => Ok(Number::Float(float_op(op, x, y))),
            (Number::Double(x), Number::Double(y)) => Ok(Number::Double(float_op(op, x, y))),
            (Number::Decimal(x), Number::Decimal(y)) => decimal_op(op, x, y).map(Number::Decimal),
            _ => {
                let (x, y) = match (a.as_i128(), b.as_i128()) {
                    (Some(x), Some(y)) => (x, y),
                    _ => unreachable!("operands converted to a shared integer kind"),
                };
                let r = match op {
                    ArithmeticOp::Add => x.wrapping_add(y),
                    ArithmeticOp::Subtract => x.wrapping_sub(y),
                    ArithmeticOp::Multiply => x.wrapping_mul(y),
                    ArithmeticOp::Divide => x.checked_div(y).ok_or(NumberError::DivisionByZero)?,
                    ArithmeticOp::Modulo => x.checked_rem(y).ok_or(NumberError::DivisionByZero)?,
                    ArithmeticOp::Power => {
                        let exp = u32::try_from(y)
                            .map_err(|_| NumberError::InvalidExponent(y.to_string()))?;
                        x.wrapping_pow(exp)
                    }
                };
                Ok(Number::from_i128_wrapping(kind, r))
            }
        }
    }

    pub fn add(self, rhs: Number) -> Result<Number, NumberError> {
        self.apply(ArithmeticOp::Add, rhs)
    }

    pub fn subtract(self, rhs: Number) -> Result<Number, NumberError> {
        self.apply(ArithmeticOp::Subtract, rhs)
    }

    pub fn multiply(self, rhs: Number) -> Result<Number, NumberError> {
        self.apply(ArithmeticOp::Multiply, rhs)
    }

    pub fn divide(self, rhs: Number) -> Result<Number, NumberError> {
        self.apply(ArithmeticOp::Divide, rhs)
    }

    /// Compare in the wider kind. `None` when a float is NaN.
    pub fn compare(&self, other: &Number) -> Option<Ordering> {
        let kind = self.kind().widen(other.kind());
        let a = self.convert(kind).ok()?;
        let b = other.convert(kind).ok()?;
        match (a, b) {
            (Number::Float(x), Number::Float(y)) => x.partial_cmp(&y),
            (Number::Double(x), Number::Double(y)) => x.partial_cmp(&y),
            (Number::Decimal(x), Number::Decimal(y)) => Some(x.cmp(&y)),
            _ => Some(a.as_i128()?.cmp(&b.as_i128()?)),
        }
    }

    /// Parse a numeric literal as written in an expression.
    ///
    /// The body is digits with at most one `decimal_separator`; an optional
    /// alphabetic suffix selects the kind (see [`NumberKind::suffix`]).
    /// Without a suffix an integer is `i32`, `i64` or `u64`, whichever
    /// fits first, and a fractional literal is `f64`.
    pub fn parse_literal(text: &str, decimal_separator: char) -> Result<Number, NumberError> {
        let invalid = || NumberError::InvalidLiteral(text.to_string());
        let split = text
            .char_indices()
            .find(|(_, c)| c.is_alphabetic())
            .map_or(text.len(), |(i, _)| i);
        let (body, suffix) = text.split_at(split);

        if body.is_empty() || !suffix.chars().all(char::is_alphabetic) {
            return Err(invalid());
        }

        let mut separators = 0;
        let mut normalized = String::with_capacity(body.len());
        for c in body.chars() {
            if c.is_ascii_digit() {
                normalized.push(c);
            } else if c == decimal_separator {
                separators += 1;
                normalized.push('.');
            } else {
                return Err(invalid());
            }
        }
        if separators > 1 || normalized.starts_with('.') || normalized.ends_with('.') {
            return Err(invalid());
        }
        let fractional = separators == 1;

        let out_of_range = |kind| NumberError::OutOfRange {
            text: text.to_string(),
            kind,
        };
        macro_rules! integer {
            ($t:ty, $variant:ident) => {{
                if fractional {
                    return Err(invalid());
                }
                normalized
                    .parse::<$t>()
                    .map(Number::$variant)
                    .map_err(|_| out_of_range(NumberKind::$variant))
            }};
        }

        match suffix.to_ascii_lowercase().as_str() {
            "" if fractional => normalized
                .parse::<f64>()
                .map(Number::Double)
                .map_err(|_| invalid()),
            "" => normalized
                .parse::<i32>()
                .map(Number::Int)
                .or_else(|_| normalized.parse::<i64>().map(Number::Long))
                .or_else(|_| normalized.parse::<u64>().map(Number::ULong))
                .map_err(|_| out_of_range(NumberKind::ULong)),
            "sb" => integer!(i8, SByte),
            "b" => integer!(u8, Byte),
            "s" => integer!(i16, Short),
            "us" => integer!(u16, UShort),
            "u" => integer!(u32, UInt),
            "l" => integer!(i64, Long),
            "ul" | "lu" => integer!(u64, ULong),
            "f" => normalized
                .parse::<f32>()
                .map(Number::Float)
                .map_err(|_| invalid()),
            "d" => normalized
                .parse::<f64>()
                .map(Number::Double)
                .map_err(|_| invalid()),
            "m" => Decimal::from_str(&normalized)
                .map(Number::Decimal)
                .map_err(|_| out_of_range(NumberKind::Decimal)),
            _ => Err(invalid()),
        }
    }

    /// Literal text that parses back to this exact kind and value.
    pub fn to_literal(&self) -> String {
        match self {
            Self::Double(v) => {
                let text = v.to_string();
                if text.contains('.') {
                    text
                } else {
                    format!("{text}D")
                }
            }
            other => format!("{other}{}", other.kind().suffix()),
        }
    }
}

fn float_op<F>(op: ArithmeticOp, x: F, y: F) -> F
where
    F: num_like::Float,
{
    match op {
        ArithmeticOp::Add => x + y,
        ArithmeticOp::Subtract => x - y,
        ArithmeticOp::Multiply => x * y,
        ArithmeticOp::Divide => x / y,
        ArithmeticOp::Modulo => x % y,
        ArithmeticOp::Power => x.pow(y),
    }
}

fn decimal_op(op: ArithmeticOp, x: Decimal, y: Decimal) -> Result<Decimal, NumberError> {
    match op {
        ArithmeticOp::Add => x.checked_add(y).ok_or(NumberError::Overflow),
        ArithmeticOp::Subtract => x.checked_sub(y).ok_or(NumberError::Overflow),
        ArithmeticOp::Multiply => x.checked_mul(y).ok_or(NumberError::Overflow),
        ArithmeticOp::Divide if y.is_zero() => Err(NumberError::DivisionByZero),
        ArithmeticOp::Divide => x.checked_div(y).ok_or(NumberError::Overflow),
        ArithmeticOp::Modulo if y.is_zero() => Err(NumberError::DivisionByZero),
        ArithmeticOp::Modulo => x.checked_rem(y).ok_or(NumberError::Overflow),
        ArithmeticOp::Power => {
            if !y.fract().is_zero() || y.is_sign_negative() {
                return Err(NumberError::InvalidExponent(y.to_string()));
            }
            let exp = y.to_u64().ok_or_else(|| NumberError::InvalidExponent(y.to_string()))?;
            decimal_pow(x, exp)
        }
    }
}

/// Square-and-multiply, so the loop is bounded by the exponent's bit count.
fn decimal_pow(base: Decimal, mut exp: u64) -> Result<Decimal, NumberError> {
    let mut acc = Decimal::ONE;
    let mut base = base;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = acc.checked_mul(base).ok_or(NumberError::Overflow)?;
        }
        exp >>= 1;
        if exp == 0 || acc.is_zero() {
            break;
        }
        base = base.checked_mul(base).ok_or(NumberError::Overflow)?;
    }
    Ok(acc)
}

mod num_like {
    use std::ops::{Add, Div, Mul, Rem, Sub};

    pub trait Float:
        Copy + Add<Output = Self> + Sub<Output = Self> + Mul<Output = Self> + Div<Output = Self> + Rem<Output = Self>
    {
        fn pow(self, exp: Self) -> Self;
    }

    impl Float for f32 {
        fn pow(self, exp: Self) -> Self {
            self.powf(exp)
        }
    }

    impl Float for f64 {
        fn pow(self, exp: Self) -> Self {
            self.powf(exp)
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(other)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SByte(v) => write!(f, "{v}"),
            Self::Byte(v) => write!(f, "{v}"),
            Self::Short(v) => write!(f, "{v}"),
            Self::UShort(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::ULong(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_default_kinds() {
        assert_eq!(Number::parse_literal("42", '.').unwrap().kind(), NumberKind::Int);
        assert_eq!(
            Number::parse_literal("3000000000", '.').unwrap().kind(),
            NumberKind::Long
        );
        assert_eq!(
            Number::parse_literal("18446744073709551615", '.').unwrap().kind(),
            NumberKind::ULong
        );
        assert_eq!(Number::parse_literal("2.5", '.').unwrap().kind(), NumberKind::Double);
    }

    #[test]
    fn test_literal_suffixes() {
        let cases = [
            ("1sb", NumberKind::SByte),
            ("1B", NumberKind::Byte),
            ("1s", NumberKind::Short),
            ("1us", NumberKind::UShort),
            ("1u", NumberKind::UInt),
            ("1L", NumberKind::Long),
            ("1ul", NumberKind::ULong),
            ("1.5f", NumberKind::Float),
            ("1d", NumberKind::Double),
            ("1.50m", NumberKind::Decimal),
        ];
        for (text, kind) in cases {
            assert_eq!(Number::parse_literal(text, '.').unwrap().kind(), kind, "{text}");
        }
    }

    #[test]
    fn test_literal_errors() {
        assert!(Number::parse_literal("300b", '.').is_err());
        assert!(Number::parse_literal("1.5u", '.').is_err());
        assert!(Number::parse_literal("12abc", '.').is_err());
        assert!(Number::parse_literal("99999999999999999999", '.').is_err());
    }

    #[test]
    fn test_culture_separator() {
        let n = Number::parse_literal("2,5", ',').unwrap();
        assert_eq!(n, Number::Double(2.5));
    }

    #[test]
    fn test_widening() {
        let r = Number::Int(2).add(Number::Long(3)).unwrap();
        assert_eq!(r.kind(), NumberKind::Long);
        let r = Number::ULong(2).add(Number::Long(3)).unwrap();
        assert_eq!(r.kind(), NumberKind::ULong);
        let r = Number::Float(1.5).multiply(Number::ULong(2)).unwrap();
        assert_eq!(r.kind(), NumberKind::Float);
        let r = Number::Double(0.5).add(Number::Decimal(Decimal::ONE)).unwrap();
        assert_eq!(r.kind(), NumberKind::Decimal);
        assert_eq!(r.to_string(), "1.5");
    }

    #[test]
    fn test_integer_wraps_and_divides() {
        let r = Number::Byte(250).add(Number::Byte(10)).unwrap();
        assert!(matches!(r, Number::Byte(4)));
        let r = Number::Int(7).divide(Number::Int(2)).unwrap();
        assert!(matches!(r, Number::Int(3)));
        assert_eq!(
            Number::Int(1).divide(Number::Int(0)),
            Err(NumberError::DivisionByZero)
        );
    }

    #[test]
    fn test_decimal_power() {
        let pow = |base: Decimal, exp: u64| {
            Number::Decimal(base).apply(ArithmeticOp::Power, Number::Decimal(Decimal::from(exp)))
        };
        assert_eq!(pow(Decimal::TWO, 10), Ok(Number::Decimal(Decimal::from(1024))));
        assert_eq!(pow(Decimal::new(5, 1), 100_000_000_000), Ok(Number::Decimal(Decimal::ZERO)));
        assert_eq!(pow(Decimal::ONE, u64::MAX), Ok(Number::Decimal(Decimal::ONE)));
        assert_eq!(
            pow(Decimal::NEGATIVE_ONE, 100_000_000_001),
            Ok(Number::Decimal(Decimal::NEGATIVE_ONE))
        );
        assert_eq!(pow(Decimal::ZERO, u64::MAX), Ok(Number::Decimal(Decimal::ZERO)));
        assert_eq!(pow(Decimal::TEN, 40), Err(NumberError::Overflow));
    }

    #[test]
    fn test_literal_printing_preserves_kind() {
        for text in ["5", "5L", "5UL", "2.5", "3D", "1.50M", "7SB", "2.5F"] {
            let n = Number::parse_literal(text, '.').unwrap();
            let printed = n.to_literal();
            let reparsed = Number::parse_literal(&printed, '.').unwrap();
            assert_eq!(reparsed.kind(), n.kind(), "{text} -> {printed}");
            assert_eq!(reparsed, n);
        }
    }
}
