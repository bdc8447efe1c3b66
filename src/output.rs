//! JSON output for evaluation results.
//!
//! Used when an object is written into template output and by the CLI to
//! print `eval` results. Output is deterministic: object keys are already
//! ordered in [`Value::Object`].
//!
//! # Examples
//!
//! ```
//! use whisker::Value;
//! use whisker::output::{to_json, to_json_pretty};
//!
//! let value = Value::object([("b", Value::from(2)), ("a", Value::from("x"))]);
//! assert_eq!(to_json(&value), r#"{"a":"x","b":2}"#);
//! assert_eq!(to_json_pretty(&Value::from(42)), "42");
//! ```

use std::collections::BTreeMap;

use crate::number::Number;
use crate::value::Value;

pub struct JsonPrinter {
    pretty: bool,
}

impl JsonPrinter {
    pub fn new(pretty: bool) -> Self {
        JsonPrinter { pretty }
    }

    pub fn print(&self, value: &Value) -> String {
        self.print_value(value, 0)
    }

    fn print_value(&self, value: &Value, indent: usize) -> String {
        match value {
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => self.print_number(n),
            Value::String(s) => format!("\"{}\"", self.escape_string(s)),
            Value::Array(arr) => self.print_array(arr, indent),
            Value::Object(obj) => self.print_object(obj, indent),
            Value::Host(host) => match host.introspect() {
                Some(json) => self.print_value(&Value::from(json), indent),
                None => format!("\"{}\"", self.escape_string(host.type_name())),
            },
        }
    }

    fn print_number(&self, n: &Number) -> String {
        let f = n.to_f64();
        if !n.kind().is_integer() && !f.is_finite() {
            // JSON has no NaN or infinity
            return "null".to_string();
        }
        n.to_string()
    }

    fn print_array(&self, arr: &[Value], indent: usize) -> String {
        if arr.is_empty() {
            return "[]".to_string();
        }

        if self.pretty {
            let items: Vec<String> = arr
                .iter()
                .map(|v| {
                    format!(
                        "{}{}",
                        self.indent(indent + 1),
                        self.print_value(v, indent + 1)
                    )
                })
                .collect();
            format!("[\n{}\n{}]", items.join(",\n"), self.indent(indent))
        } else {
            let items: Vec<String> = arr.iter().map(|v| self.print_value(v, indent)).collect();
            format!("[{}]", items.join(","))
        }
    }

    fn print_object(&self, obj: &BTreeMap<String, Value>, indent: usize) -> String {
        if obj.is_empty() {
            return "{}".to_string();
        }

        if self.pretty {
            let items: Vec<String> = obj
                .iter()
                .map(|(k, v)| {
                    format!(
                        "{}\"{}\": {}",
                        self.indent(indent + 1),
                        self.escape_string(k),
                        self.print_value(v, indent + 1)
                    )
                })
                .collect();
            format!("{{\n{}\n{}}}", items.join(",\n"), self.indent(indent))
        } else {
            let items: Vec<String> = obj
                .iter()
                .map(|(k, v)| format!("\"{}\":{}", self.escape_string(k), self.print_value(v, indent)))
                .collect();
            format!("{{{}}}", items.join(","))
        }
    }

    fn indent(&self, level: usize) -> String {
        "  ".repeat(level)
    }

    fn escape_string(&self, s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        for c in s.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
                c => out.push(c),
            }
        }
        out
    }
}

/// Compact JSON.
pub fn to_json(value: &Value) -> String {
    JsonPrinter::new(false).print(value)
}

/// JSON with 2-space indentation, one member per line.
pub fn to_json_pretty(value: &Value) -> String {
    JsonPrinter::new(true).print(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_nested() {
        let value = Value::object([("items", Value::from(vec![Value::from(1), Value::from(2)]))]);
        assert_eq!(to_json_pretty(&value), "{\n  \"items\": [\n    1,\n    2\n  ]\n}");
    }

    #[test]
    fn test_escaping() {
        assert_eq!(to_json(&Value::from("a\"b\n")), "\"a\\\"b\\n\"");
    }
}
