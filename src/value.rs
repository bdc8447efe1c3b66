use std::any::Any;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::number::{Number, NumberKind};

/// A runtime value flowing through expression evaluation.
///
/// Data arrives either as plain values (usually converted from JSON) or as
/// host objects supplied by the embedding application, which are resolved
/// through the resolver chain (see [`crate::resolver`]).
///
/// # Examples
///
/// ```
/// use whisker::Value;
///
/// let name = Value::from("World");
/// let age = Value::from(42);
/// let person = Value::object([("name", name), ("age", age)]);
/// assert_eq!(person.member("name"), Some(Value::from("World")));
/// ```
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,

    Boolean(bool),

    /// Number tagged with the primitive kind that produced it
    Number(Number),

    String(String),

    Array(Vec<Value>),

    /// Object with ordered string keys
    Object(BTreeMap<String, Value>),

    /// Opaque value owned by the host application
    Host(Arc<dyn HostObject>),
}

/// A value supplied by the host application.
///
/// Members are looked up in order through [`HostObject::property`], the
/// type descriptors registered for [`HostObject::type_name`], and finally
/// the configured introspector, which by default reads
/// [`HostObject::introspect`].
pub trait HostObject: Any + Send + Sync + fmt::Debug {
    fn type_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Direct member access.
    fn property(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Serialized view used by the default introspector.
    fn introspect(&self) -> Option<serde_json::Value> {
        None
    }

    /// The object type descriptors downcast to.
    fn as_any(&self) -> &dyn Any;
}

/// Wraps any serializable type as a host object whose members are found
/// through serde.
#[derive(Debug, Clone)]
pub struct Reflected<T>(pub T);

impl<T> HostObject for Reflected<T>
where
    T: Serialize + fmt::Debug + Send + Sync + 'static,
{
    fn type_name(&self) -> &str {
        std::any::type_name::<T>()
    }

    fn introspect(&self) -> Option<serde_json::Value> {
        serde_json::to_value(&self.0).ok()
    }

    fn as_any(&self) -> &dyn Any {
        &self.0
    }
}

/// Broad classification of a [`Value`], used in messages and for
/// formatter overload scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Null,
    Boolean,
    Number(NumberKind),
    String,
    Array,
    Object,
    Host,
}

impl Value {
    /// Build an object from key/value pairs.
    pub fn object<K, I>(entries: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Wrap a host object.
    pub fn host<T: HostObject>(object: T) -> Value {
        Value::Host(Arc::new(object))
    }

    /// Wrap a serializable value as a host object.
    pub fn reflect<T>(object: T) -> Value
    where
        T: Serialize + fmt::Debug + Send + Sync + 'static,
    {
        Value::host(Reflected(object))
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Number(n) => ValueType::Number(n.kind()),
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Object(_) => ValueType::Object,
            Value::Host(_) => ValueType::Host,
        }
    }

    /// Human-readable type name for messages and resolvers.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Host(host) => host.type_name(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Member lookup on plain values: object keys, sequence indices and
    /// the `Length` of strings and sequences.
    pub fn member(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(map) => map.get(key).cloned(),
            Value::Array(items) => match key.parse::<usize>() {
                Ok(index) => items.get(index).cloned(),
                Err(_) if key == "Length" => Some(Value::from(items.len())),
                Err(_) => None,
            },
            Value::String(s) if key == "Length" => Some(Value::from(s.chars().count())),
            _ => None,
        }
    }

    /// The default falsy rule: null, false, zero, the empty string and the
    /// empty sequence.
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Boolean(b) => !b,
            Value::Number(n) => n.is_zero(),
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(_) | Value::Host(_) => false,
        }
    }

    /// Equality as used by `==`: numbers compare by value across kinds.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.compare(b) == Some(Ordering::Equal),
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.loose_eq(vb))
            }
            (a, b) => a == b,
        }
    }

    /// Ordering for comparison operators; only numbers and strings order.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.compare(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Text produced when the value is written into template output.
    /// Null renders as nothing; objects render as compact JSON.
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(Value::render)
                .collect::<Vec<_>>()
                .join(", "),
            Value::Object(_) => crate::output::to_json(self),
            Value::Host(host) => match host.introspect() {
                Some(json) => crate::output::to_json(&Value::from(json)),
                None => host.type_name().to_string(),
            },
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a.kind() == b.kind() && a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Host(a), Value::Host(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        match i32::try_from(n) {
            Ok(n) => Value::Number(Number::Int(n)),
            Err(_) => Value::Number(Number::Long(n as i64)),
        }
    }
}

macro_rules! impl_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Number(Number::from(n))
                }
            }
        )*
    };
}

impl_from_number!(i8, u8, i16, u16, i32, u32, i64, u64, f32, f64, rust_decimal::Decimal);

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => {
                let number = if let Some(i) = n.as_i64() {
                    match i32::try_from(i) {
                        Ok(i) => Number::Int(i),
                        Err(_) => Number::Long(i),
                    }
                } else if let Some(u) = n.as_u64() {
                    Number::ULong(u)
                } else {
                    Number::Double(n.as_f64().unwrap_or(f64::NAN))
                };
                Value::Number(number)
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
            Value::Host(host) => host
                .introspect()
                .unwrap_or_else(|| serde_json::Value::String(host.type_name().to_string())),
        }
    }
}

fn number_to_json(n: &Number) -> serde_json::Value {
    if let Some(i) = n.as_i128() {
        if let Ok(i) = i64::try_from(i) {
            return serde_json::Value::Number(i.into());
        }
        if let Ok(u) = u64::try_from(i) {
            return serde_json::Value::Number(u.into());
        }
    }
    serde_json::Number::from_f64(n.to_f64())
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_falsy() {
        assert!(Value::Null.is_falsy());
        assert!(Value::from(0).is_falsy());
        assert!(Value::from(0.0).is_falsy());
        assert!(Value::from("").is_falsy());
        assert!(Value::Array(vec![]).is_falsy());
        assert!(!Value::from("x").is_falsy());
        assert!(!Value::object([("a", Value::Null)]).is_falsy());
    }

    #[test]
    fn test_loose_eq_across_kinds() {
        assert!(Value::from(1).loose_eq(&Value::from(1.0)));
        assert_ne!(Value::from(1), Value::from(1.0));
    }

    #[test]
    fn test_json_numbers() {
        let v = Value::from(serde_json::json!({"a": 1, "b": 5000000000u64, "c": 1.5}));
        assert_eq!(v.member("a"), Some(Value::Number(Number::Int(1))));
        assert_eq!(v.member("b"), Some(Value::Number(Number::Long(5_000_000_000))));
        assert_eq!(v.member("c"), Some(Value::Number(Number::Double(1.5))));
    }

    #[test]
    fn test_render() {
        assert_eq!(Value::Null.render(), "");
        assert_eq!(Value::from(vec![Value::from(1), Value::from("a")]).render(), "1, a");
    }
}
