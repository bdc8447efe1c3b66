use std::any::Any;
use std::sync::{Arc, Mutex};

use serde_json::json;
use whisker::options::ParserOptions;
use whisker::resolver::{NoIntrospection, TypeDescriptor, ValueResolver};
use whisker::{
    CancellationToken, EngineConfig, EvalError, Evaluator, FormatterSignature, HostObject,
    ParamType, Scope, Value, compile, parse_text,
};

fn data(json: serde_json::Value) -> Value {
    Value::from(json)
}

fn eval_with(text: &str, root: Value, config: &EngineConfig) -> Result<Value, EvalError> {
    let (expr, diagnostics) = parse_text(text, &ParserOptions::default());
    assert!(diagnostics.is_empty(), "{text}: {diagnostics:?}");
    Evaluator::new().evaluate_value(&expr, root, config)
}

fn eval(text: &str, root: Value) -> Value {
    eval_with(text, root, &EngineConfig::default()).unwrap()
}

fn render(template: &str, root: Value) -> String {
    compile(template, &ParserOptions::default())
        .unwrap()
        .render(root, &EngineConfig::default())
        .unwrap()
}

fn ints(values: &[i32]) -> Value {
    Value::Array(values.iter().map(|&v| Value::from(v)).collect())
}

// ============================================================================
// Templates
// ============================================================================

#[test]
fn test_hello_world() {
    let root = data(json!({"name": "World"}));
    assert_eq!(render("Hello {{name}}", root), "Hello World");
}

#[test]
fn test_render_multiple_tags() {
    let root = data(json!({"first": "Ada", "last": "Lovelace", "born": 1815}));
    assert_eq!(
        render("{{first}} {{ last }} ({{born}})", root),
        "Ada Lovelace (1815)"
    );
}

#[test]
fn test_render_null_is_empty() {
    assert_eq!(render("[{{missing}}]", data(json!({}))), "[]");
}

#[test]
fn test_render_custom_delimiters() {
    let options = ParserOptions::default().with_delimiters("<%", "%>");
    let template = compile("x=<% x %>", &options).unwrap();
    let out = template
        .render(data(json!({"x": 1})), &EngineConfig::default())
        .unwrap();
    assert_eq!(out, "x=1");
}

// ============================================================================
// Paths
// ============================================================================

#[test]
fn test_nested_path() {
    let root = data(json!({"a": {"b": {"c": 42}}}));
    assert_eq!(eval("a.b.c", root), Value::from(42));
}

#[test]
fn test_array_index_and_length() {
    let root = data(json!({"list": [10, 20, 30]}));
    assert_eq!(eval("list.1", root.clone()), Value::from(20));
    assert_eq!(eval("list.Length", root), Value::from(3));
}

#[test]
fn test_this_and_self() {
    let root = data(json!({"a": 1}));
    assert_eq!(eval("this.a", root.clone()), Value::from(1));
    assert_eq!(eval(".", root.clone()), root);
}

#[test]
fn test_root_from_nested_context() {
    let config = EngineConfig::default();
    let mut scope = Scope::new(&config);
    let root_value = data(json!({"total": 99, "order": {"items": [1, 2]}}));
    let order_value = root_value.member("order").unwrap_or_default();
    let items_value = order_value.member("items").unwrap_or_default();

    let root = scope.arena.root(root_value);
    let order = scope.arena.child(root, "order", order_value);
    let items = scope.arena.child(order, "items", items_value);

    let (expr, _) = parse_text("~.total", &ParserOptions::default());
    let result = Evaluator::new().evaluate(&expr, items, &mut scope).unwrap();
    assert_eq!(scope.arena.value(result), &Value::from(99));
}

#[test]
fn test_parent_selector() {
    let config = EngineConfig::default();
    let mut scope = Scope::new(&config);
    let root = scope.arena.root(data(json!({"name": "outer"})));
    let inner = scope.arena.child(root, "inner", data(json!({"name": "inner"})));

    let (expr, _) = parse_text("../name", &ParserOptions::default());
    let result = Evaluator::new().evaluate(&expr, inner, &mut scope).unwrap();
    assert_eq!(scope.arena.value(result), &Value::from("outer"));
}

#[test]
fn test_parent_from_lambda_skips_frame() {
    let config = EngineConfig::default();
    let mut scope = Scope::new(&config);
    let root = scope.arena.root(data(json!({"title": "Report"})));
    let order = scope
        .arena
        .child(root, "order", data(json!({"title": "Order", "items": [1, 2]})));

    let (expr, _) = parse_text("items.Select(x => ../title)", &ParserOptions::default());
    let result = Evaluator::new().evaluate(&expr, order, &mut scope).unwrap();
    assert_eq!(
        scope.arena.value(result),
        &Value::Array(vec![Value::from("Report"), Value::from("Report")])
    );
}

#[test]
fn test_parent_of_lambda_parameter_skips_frame() {
    // Evaluates its argument as a path starting at the bound `x`.
    let config = EngineConfig::default().with_formatter(
        "FromParameter",
        FormatterSignature::new(ParamType::Any).param("path", ParamType::String),
        |call| {
            let x = call.scope().alias("x").ok_or_else(|| call.error("x is not bound"))?;
            let text = call.value(0);
            let (expr, _) = parse_text(text.as_str().unwrap_or_default(), &ParserOptions::default());
            let result = Evaluator::new().evaluate(&expr, x, call.scope())?;
            Ok(call.scope().arena.value(result).clone())
        },
    );
    let mut scope = Scope::new(&config);
    let root = scope.arena.root(data(json!({"title": "Report"})));
    let order = scope
        .arena
        .child(root, "order", data(json!({"title": "Order", "items": [1, 2]})));

    let (expr, _) = parse_text(
        "items.Select(x => x.FromParameter('../title'))",
        &ParserOptions::default(),
    );
    let result = Evaluator::new().evaluate(&expr, order, &mut scope).unwrap();
    assert_eq!(
        scope.arena.value(result),
        &Value::Array(vec![Value::from("Order"), Value::from("Order")])
    );
}

#[test]
fn test_null_propagation() {
    let root = data(json!({"a": null}));
    assert_eq!(eval("a.b.c.d", root.clone()), Value::Null);
    // Also under strict: a known null is not an unresolved path
    let strict = EngineConfig::default().strict();
    assert_eq!(eval_with("a.b.c", root, &strict).unwrap(), Value::Null);
}

#[test]
fn test_object_selector() {
    let root = data(json!({"obj": {"x": 1, "y": 2}}));
    let keys = eval("obj.?.Select(p => p.Key)", root.clone());
    assert_eq!(keys, Value::Array(vec![Value::from("x"), Value::from("y")]));
    let values = eval("obj.?.Select(p => p.Value)", root);
    assert_eq!(values, ints(&[1, 2]));
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn test_flat_operator_evaluation() {
    assert_eq!(eval("2 + 3 * 4", Value::Null), Value::from(20));
    assert_eq!(eval("2 + (3 * 4)", Value::Null), Value::from(14));
}

#[test]
fn test_numeric_widening() {
    assert_eq!(eval("1 + 2.5", Value::Null), Value::from(3.5));
    assert_eq!(eval("7 % 4", Value::Null), Value::from(3));
    assert_eq!(eval("1 == 1.0", Value::Null), Value::from(true));
}

#[test]
fn test_decimal_power_with_huge_exponent() {
    assert_eq!(eval("2m ^ 10m", Value::Null), Value::from(1024));
    assert_eq!(eval("0.5m ^ 100000000000m", Value::Null), Value::from(0));
    assert_eq!(eval("1m ^ 100000000000m", Value::Null), Value::from(1));
}

#[test]
fn test_string_concatenation() {
    let root = data(json!({"name": "Ada"}));
    assert_eq!(eval("'Hi ' + name + '!'", root), Value::from("Hi Ada!"));
    assert_eq!(eval("'n' + 1", Value::Null), Value::from("n1"));
}

#[test]
fn test_division_by_zero() {
    let err = eval_with("10 / 0", Value::Null, &EngineConfig::default()).unwrap_err();
    assert_eq!(err, EvalError::DivisionByZero);
}

#[test]
fn test_comparisons() {
    let root = data(json!({"age": 30, "name": "b"}));
    assert_eq!(eval("age > 18", root.clone()), Value::from(true));
    assert_eq!(eval("age <= 18", root.clone()), Value::from(false));
    assert_eq!(eval("name < 'c'", root.clone()), Value::from(true));
    assert_eq!(eval("name != 'b'", root), Value::from(false));
}

#[test]
fn test_logical_operators() {
    let root = data(json!({"yes": true, "no": false, "items": []}));
    assert_eq!(eval("yes && no", root.clone()), Value::from(false));
    assert_eq!(eval("yes || no", root.clone()), Value::from(true));
    assert_eq!(eval("!items", root.clone()), Value::from(true));
    assert_eq!(eval("!yes", root), Value::from(false));
}

#[test]
fn test_short_circuit_skips_right() {
    // The right side would fail under strict if it were evaluated.
    let strict = EngineConfig::default().strict();
    let root = data(json!({"no": false}));
    assert_eq!(eval_with("no && missing", root, &strict).unwrap(), Value::from(false));
}

#[test]
fn test_null_coalesce() {
    let root = data(json!({"a": null, "b": "fallback", "c": 0}));
    assert_eq!(eval("a ?? b", root.clone()), Value::from("fallback"));
    assert_eq!(eval("c ?? b", root), Value::from(0));
}

#[test]
fn test_null_arithmetic() {
    let root = data(json!({"a": null}));
    assert_eq!(eval("a + 1", root), Value::Null);
}

#[test]
fn test_type_error() {
    let root = data(json!({"list": [1]}));
    let err = eval_with("list - 1", root, &EngineConfig::default()).unwrap_err();
    assert!(matches!(err, EvalError::TypeError(_)));
}

// ============================================================================
// Lambdas and Variables
// ============================================================================

#[test]
fn test_where_filters() {
    let root = data(json!({"people": [
        {"Name": "Ann", "Age": 8},
        {"Name": "Bob", "Age": 40},
        {"Name": "Cy", "Age": 12}
    ]}));
    let names = eval("people.Where(x => x.Age > 10).Select(x => x.Name)", root);
    assert_eq!(names, Value::Array(vec![Value::from("Bob"), Value::from("Cy")]));
}

#[test]
fn test_index_variables() {
    let root = data(json!({"list": ["a", "b", "c"]}));
    assert_eq!(eval("list.Select(x => $index)", root.clone()), ints(&[0, 1, 2]));
    assert_eq!(
        eval("list.Select(x => $last)", root.clone()),
        Value::Array(vec![Value::from(false), Value::from(false), Value::from(true)])
    );
    assert_eq!(eval("list.Select((x, i) => i * 10)", root), ints(&[0, 10, 20]));
}

#[test]
fn test_lambda_reads_outer_data() {
    let root = data(json!({"limit": 2, "list": [1, 2, 3]}));
    assert_eq!(eval("list.Where(x => x > limit)", root), ints(&[3]));
}

#[test]
fn test_lambda_alias_shadows_data() {
    let root = data(json!({"x": 100, "list": [1, 2]}));
    assert_eq!(eval("list.Select(x => x)", root), ints(&[1, 2]));
}

#[test]
fn test_lambda_outside_formatter() {
    let (expr, _) = parse_text("x => x", &ParserOptions::default());
    let err = Evaluator::new()
        .evaluate_value(&expr, Value::Null, &EngineConfig::default())
        .unwrap_err();
    assert!(matches!(err, EvalError::TypeError(_)));
}

// ============================================================================
// Error Policy
// ============================================================================

#[test]
fn test_unresolved_recovers_to_null() {
    assert_eq!(eval("nope", data(json!({}))), Value::Null);
}

#[test]
fn test_unresolved_strict() {
    let strict = EngineConfig::default().strict();
    let err = eval_with("a.nope", data(json!({"a": {}})), &strict).unwrap_err();
    match err {
        EvalError::UnresolvedPath { path, key, type_name } => {
            assert_eq!(path, "a");
            assert_eq!(key, "nope");
            assert_eq!(type_name, "object");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_unresolved_hook() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let config = EngineConfig::default().with_unresolved_hook(move |u| {
        if let Ok(mut seen) = sink.lock() {
            seen.push(u.key.clone());
        }
    });
    eval_with("first.second", data(json!({})), &config).unwrap();
    // `second` is looked up on null and is not reported
    assert_eq!(*seen.lock().unwrap(), vec!["first".to_string()]);
}

#[test]
fn test_formatter_resolution_policy() {
    let root = data(json!({"n": 1}));
    assert_eq!(eval("n.NoSuchFormatter()", root.clone()), Value::Null);

    let strict = EngineConfig::default().strict();
    let err = eval_with("n.NoSuchFormatter()", root, &strict).unwrap_err();
    assert!(matches!(err, EvalError::FormatterResolution { name, .. } if name == "NoSuchFormatter"));
}

#[test]
fn test_cancellation() {
    let config = EngineConfig::default();
    let token = CancellationToken::new();
    let mut scope = Scope::new(&config).with_cancellation(token.clone());
    let root = scope.arena.root(data(json!({"name": "x"})));
    token.cancel();

    // Plain paths are not polled
    let (path, _) = parse_text("name", &ParserOptions::default());
    assert!(Evaluator::new().evaluate(&path, root, &mut scope).is_ok());

    let (call, _) = parse_text("name.ToUpper()", &ParserOptions::default());
    let err = Evaluator::new().evaluate(&call, root, &mut scope).unwrap_err();
    assert_eq!(err, EvalError::Cancelled);
    assert!(scope.arena.is_aborted());
}

#[test]
fn test_recursion_limit() {
    let config = EngineConfig::default().with_max_depth(3);
    let err = eval_with("((((1))))", Value::Null, &config).unwrap_err();
    assert_eq!(err, EvalError::RecursionLimit(3));
    assert_eq!(eval_with("(1)", Value::Null, &config).unwrap(), Value::from(1));
}

// ============================================================================
// Host Values
// ============================================================================

#[derive(Debug, serde::Serialize)]
struct Person {
    name: String,
    age: u32,
}

#[derive(Debug)]
struct Point {
    x: i32,
    y: i32,
}

impl HostObject for Point {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
struct Counter;

impl HostObject for Counter {
    fn property(&self, name: &str) -> Option<Value> {
        (name == "Count").then(|| Value::from(7))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct UpperKeys;

impl ValueResolver for UpperKeys {
    fn can_resolve(&self, type_name: &str, _value: &Value, key: &str) -> bool {
        type_name == "object" && key.starts_with("UPPER_")
    }

    fn resolve(&self, _value: &Value, key: &str) -> Value {
        Value::from(key.trim_start_matches("UPPER_").to_uppercase())
    }
}

#[test]
fn test_serde_introspection() {
    let person = Value::reflect(Person {
        name: "Ada".to_string(),
        age: 36,
    });
    let root = Value::object([("person", person)]);
    assert_eq!(eval("person.name", root.clone()), Value::from("Ada"));
    assert_eq!(eval("person.age + 1", root), Value::from(37));
}

#[test]
fn test_type_descriptor() {
    let config = EngineConfig::default().with_type_descriptor(
        TypeDescriptor::of::<Point>()
            .property("X", |p: &Point| Value::from(p.x))
            .property("Y", |p: &Point| Value::from(p.y)),
    );
    let root = Value::object([("p", Value::host(Point { x: 3, y: 4 }))]);
    assert_eq!(eval_with("p.X * p.Y", root.clone(), &config).unwrap(), Value::from(12));
    let keys = eval_with("p.?.Select(m => m.Key)", root, &config).unwrap();
    assert_eq!(keys, Value::Array(vec![Value::from("X"), Value::from("Y")]));
}

#[test]
fn test_host_property() {
    let root = Value::object([("c", Value::host(Counter))]);
    assert_eq!(eval("c.Count", root), Value::from(7));
}

#[test]
fn test_custom_resolver_runs_first() {
    let config = EngineConfig::default().with_resolver(UpperKeys);
    let root = data(json!({"UPPER_abc": "shadowed"}));
    assert_eq!(eval_with("UPPER_abc", root, &config).unwrap(), Value::from("ABC"));
}

#[test]
fn test_no_introspection() {
    let config = EngineConfig::default()
        .with_introspector(NoIntrospection)
        .strict();
    let person = Value::reflect(Person {
        name: "Ada".to_string(),
        age: 36,
    });
    let root = Value::object([("person", person)]);
    let err = eval_with("person.name", root, &config).unwrap_err();
    assert!(matches!(err, EvalError::UnresolvedPath { .. }));
}
