//! Member resolution for host values.
//!
//! A path segment is resolved against the current value by trying, in
//! order: the configured [`ValueResolver`]s, plain object/sequence lookup,
//! [`HostObject::property`], the [`TypeDescriptor`] registered for the
//! host's type name, and finally the configured [`Introspector`]. The
//! first source that produces a value wins.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::value::{HostObject, Value};

/// A custom member lookup plugged into the engine.
pub trait ValueResolver: Send + Sync {
    fn can_resolve(&self, type_name: &str, value: &Value, key: &str) -> bool;

    fn resolve(&self, value: &Value, key: &str) -> Value;
}

type Getter = Arc<dyn Fn(&dyn HostObject) -> Option<Value> + Send + Sync>;

/// Statically registered members of one host type.
///
/// ```
/// use whisker::resolver::TypeDescriptor;
/// use whisker::Value;
///
/// #[derive(Debug)]
/// struct Point { x: i32, y: i32 }
///
/// let descriptor = TypeDescriptor::of::<Point>()
///     .property("X", |p: &Point| Value::from(p.x))
///     .property("Y", |p: &Point| Value::from(p.y));
/// assert_eq!(descriptor.property_names().count(), 2);
/// ```
#[derive(Clone)]
pub struct TypeDescriptor {
    type_name: String,
    properties: BTreeMap<String, Getter>,
}

impl TypeDescriptor {
    pub fn new(type_name: impl Into<String>) -> Self {
        TypeDescriptor {
            type_name: type_name.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Descriptor keyed by the Rust type name of `T`.
    pub fn of<T: 'static>() -> Self {
        Self::new(std::any::type_name::<T>())
    }

    pub fn property<T, F>(mut self, name: impl Into<String>, getter: F) -> Self
    where
        T: 'static,
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        let getter: Getter = Arc::new(move |host: &dyn HostObject| {
            host.as_any().downcast_ref::<T>().map(&getter)
        });
        self.properties.insert(name.into(), getter);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn get(&self, host: &dyn HostObject, key: &str) -> Option<Value> {
        self.properties.get(key).and_then(|getter| getter(host))
    }

    pub fn members(&self, host: &dyn HostObject) -> Vec<(String, Value)> {
        self.properties
            .iter()
            .filter_map(|(name, getter)| getter(host).map(|v| (name.clone(), v)))
            .collect()
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Last-resort member discovery for host values.
pub trait Introspector: Send + Sync {
    fn member(&self, host: &dyn HostObject, key: &str) -> Option<Value>;

    /// Every member, for the object selector (`?`).
    fn members(&self, host: &dyn HostObject) -> Option<Vec<(String, Value)>>;
}

/// Reads members from the host's serde representation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeIntrospector;

impl Introspector for SerdeIntrospector {
    fn member(&self, host: &dyn HostObject, key: &str) -> Option<Value> {
        let json = host.introspect()?;
        Value::from(json).member(key)
    }

    fn members(&self, host: &dyn HostObject) -> Option<Vec<(String, Value)>> {
        match Value::from(host.introspect()?) {
            Value::Object(map) => Some(map.into_iter().collect()),
            _ => None,
        }
    }
}

/// Introspector that finds nothing; registering it makes unknown host
/// members unresolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIntrospection;

impl Introspector for NoIntrospection {
    fn member(&self, _host: &dyn HostObject, _key: &str) -> Option<Value> {
        None
    }

    fn members(&self, _host: &dyn HostObject) -> Option<Vec<(String, Value)>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Reflected;

    #[derive(Debug, serde::Serialize)]
    struct Person {
        name: String,
        age: u32,
    }

    #[test]
    fn test_serde_introspection() {
        let person = Reflected(Person {
            name: "Ada".to_string(),
            age: 36,
        });
        let introspector = SerdeIntrospector;
        assert_eq!(introspector.member(&person, "name"), Some(Value::from("Ada")));
        assert_eq!(introspector.member(&person, "missing"), None);
        let members = introspector.members(&person).unwrap_or_default();
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn test_descriptor_downcast() {
        let person = Reflected(Person {
            name: "Ada".to_string(),
            age: 36,
        });
        let descriptor =
            TypeDescriptor::of::<Person>().property("Age", |p: &Person| Value::from(p.age));
        assert_eq!(descriptor.type_name(), person.type_name());
        assert_eq!(descriptor.get(&person, "Age"), Some(Value::from(36u32)));
    }
}
