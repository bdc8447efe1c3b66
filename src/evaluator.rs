use crate::ast::{Expression, OperatorKind, PathPart};
use crate::config::{EngineConfig, UnresolvedPath};
use crate::context::{ContextId, ContextObject, Scope};
use crate::formatter::{ArgValue, CallArgument, FormatterCall, LambdaArg, Selected};
use crate::number::{ArithmeticOp, NumberError};
use crate::value::Value;

/// Errors that can occur while evaluating an expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// Type mismatch or invalid operation for the given type
    #[error("type error: {0}")]
    TypeError(String),

    #[error("division by zero")]
    DivisionByZero,

    /// A path segment nothing could resolve (strict mode only)
    #[error("cannot resolve '{key}' on {type_name} at '{path}'")]
    UnresolvedPath {
        path: String,
        key: String,
        type_name: String,
    },

    /// No formatter candidate accepts the call (strict mode only)
    #[error("no formatter '{name}' accepts {receiver}({arguments})")]
    FormatterResolution {
        name: String,
        receiver: String,
        arguments: String,
    },

    #[error("cannot convert '{value}' to {target}")]
    ArgumentConversion { value: String, target: String },

    #[error(transparent)]
    NumberConversion(NumberError),

    #[error("recursion limit of {0} exceeded")]
    RecursionLimit(usize),

    #[error("evaluation cancelled")]
    Cancelled,

    /// Raised by a formatter implementation
    #[error("formatter '{name}' failed: {message}")]
    Formatter { name: String, message: String },
}

impl From<NumberError> for EvalError {
    fn from(err: NumberError) -> Self {
        match err {
            NumberError::DivisionByZero => EvalError::DivisionByZero,
            other => EvalError::NumberConversion(other),
        }
    }
}

/// Text written into template output for an evaluation result.
pub fn render_to_string(context: &ContextObject) -> String {
    context.value.render()
}

/// Walks expression trees against a [`Scope`].
///
/// Paths resolve from a target context; formatter arguments, brackets and
/// lambda bodies evaluate in the context the expression appeared in. In a
/// chain such as `'abc'.ToUpper().Length` each link is the target of the
/// next while the outer context stays fixed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Evaluator
    }

    /// Evaluate `expr` against `context` and return the result context.
    ///
    /// # Examples
    ///
    /// ```
    /// use whisker::{EngineConfig, Evaluator, Scope, Value};
    /// use whisker::options::ParserOptions;
    /// use whisker::parser::parse_text;
    ///
    /// let (expr, diagnostics) = parse_text("a.b.c", &ParserOptions::default());
    /// assert!(diagnostics.is_empty());
    ///
    /// let data = Value::object([("a", Value::object([("b", Value::object([("c", Value::from(42))]))]))]);
    /// let config = EngineConfig::default();
    /// let mut scope = Scope::new(&config);
    /// let root = scope.arena.root(data);
    /// let result = Evaluator::new().evaluate(&expr, root, &mut scope).unwrap();
    /// assert_eq!(scope.arena.value(result), &Value::from(42));
    /// ```
    pub fn evaluate(
        &self,
        expr: &Expression,
        context: ContextId,
        scope: &mut Scope<'_>,
    ) -> Result<ContextId, EvalError> {
        self.eval(expr, context, context, false, scope)
    }

    /// Evaluate against a fresh scope and return the resulting value.
    pub fn evaluate_value(
        &self,
        expr: &Expression,
        root: Value,
        config: &EngineConfig,
    ) -> Result<Value, EvalError> {
        let mut scope = Scope::new(config);
        let root = scope.arena.root(root);
        let result = self.evaluate(expr, root, &mut scope)?;
        Ok(scope.arena.value(result).clone())
    }

    fn eval(
        &self,
        expr: &Expression,
        target: ContextId,
        outer: ContextId,
        chained: bool,
        scope: &mut Scope<'_>,
    ) -> Result<ContextId, EvalError> {
        scope.enter()?;
        let result = self.eval_inner(expr, target, outer, chained, scope);
        scope.leave();
        result
    }

    fn eval_inner(
        &self,
        expr: &Expression,
        target: ContextId,
        outer: ContextId,
        chained: bool,
        scope: &mut Scope<'_>,
    ) -> Result<ContextId, EvalError> {
        match expr {
            Expression::Path {
                parts,
                formatter,
                arguments,
            } => {
                let current = self.walk_path(parts, target, chained, scope)?;
                match formatter {
                    Some(name) => self.call_formatter(name, arguments, current, outer, scope),
                    None => Ok(current),
                }
            }
            Expression::List(children) => {
                let Some((first, rest)) = children.split_first() else {
                    return Ok(scope.arena.child(target, "", Value::Null));
                };
                let mut current = self.eval(first, target, outer, chained, scope)?;
                for child in rest {
                    current = self.eval(child, current, outer, true, scope)?;
                }
                Ok(current)
            }
            Expression::Bracket(children) => match children.as_slice() {
                [] => Ok(scope.arena.child(target, "", Value::Null)),
                [only] => self.eval(only, target, outer, chained, scope),
                many => {
                    let mut values = Vec::with_capacity(many.len());
                    for child in many {
                        let id = self.eval(child, target, outer, chained, scope)?;
                        values.push(scope.arena.value(id).clone());
                    }
                    Ok(scope.arena.child(target, "", Value::Array(values)))
                }
            },
            Expression::Operator {
                operator,
                left,
                right,
            } => self.eval_operator(*operator, left, right.as_deref(), target, outer, chained, scope),
            Expression::Lambda { .. } => Err(EvalError::TypeError(
                "a lambda can only be passed to a formatter".to_string(),
            )),
            Expression::String { value, .. } => {
                Ok(scope.arena.child(target, "", Value::String(value.clone())))
            }
            Expression::Number(number) => Ok(scope.arena.child(target, "", Value::Number(*number))),
        }
    }

    fn walk_path(
        &self,
        parts: &[PathPart],
        start: ContextId,
        chained: bool,
        scope: &mut Scope<'_>,
    ) -> Result<ContextId, EvalError> {
        let mut current = start;
        for (i, part) in parts.iter().enumerate() {
            current = match part {
                PathPart::DataPath(name) => {
                    let alias = if i == 0 && !chained { scope.alias(name) } else { None };
                    match alias {
                        Some(id) => id,
                        None => self.resolve_member(current, name, scope)?,
                    }
                }
                PathPart::RootSelector => scope.arena.root_of(current),
                PathPart::ParentSelector => scope.arena.natural_parent(current),
                PathPart::SelfAssignment | PathPart::ThisPath => current,
                PathPart::ObjectSelector => {
                    let members = members_of(scope.arena.value(current), scope.config);
                    scope.arena.child(current, "?", members)
                }
                PathPart::Null => scope.arena.child(current, "", Value::Null),
                PathPart::Boolean(b) => scope.arena.child(current, "", Value::Boolean(*b)),
            };
        }
        Ok(current)
    }

    fn resolve_member(
        &self,
        current: ContextId,
        key: &str,
        scope: &mut Scope<'_>,
    ) -> Result<ContextId, EvalError> {
        let config = scope.config;
        let value = scope.arena.value(current);

        // Null propagates silently
        if value.is_null() {
            return Ok(scope.arena.child(current, key, Value::Null));
        }

        if let Some(found) = lookup(value, key, config) {
            tracing::trace!(key, type_name = found.type_name(), "resolved");
            return Ok(scope.arena.child(current, key, found));
        }

        let unresolved = UnresolvedPath {
            path: scope.arena.path_of(current),
            key: key.to_string(),
            type_name: value.type_name().to_string(),
        };
        config.notify_unresolved(&unresolved);
        if config.is_strict() {
            return Err(EvalError::UnresolvedPath {
                path: unresolved.path,
                key: unresolved.key,
                type_name: unresolved.type_name,
            });
        }
        Ok(scope.arena.child(current, key, Value::Null))
    }

    fn call_formatter(
        &self,
        name: &str,
        arguments: &[crate::ast::ExpressionArgument],
        receiver_context: ContextId,
        outer: ContextId,
        scope: &mut Scope<'_>,
    ) -> Result<ContextId, EvalError> {
        scope.check_cancelled()?;

        let mut call_args = Vec::with_capacity(arguments.len());
        for argument in arguments {
            let value = match &argument.value {
                Expression::Lambda { parameter, body } => ArgValue::Lambda(LambdaArg {
                    params: parameter
                        .lambda_parameter_names()
                        .unwrap_or_default()
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                    body,
                    context: outer,
                }),
                other => {
                    let id = self.eval(other, outer, outer, false, scope)?;
                    ArgValue::Value(scope.arena.value(id).clone())
                }
            };
            call_args.push(CallArgument {
                name: argument.name.as_deref(),
                value,
            });
        }

        let config = scope.config;
        let receiver = scope.arena.value(receiver_context);
        let selected = match config
            .formatters()
            .resolve(name, receiver, &call_args, config.converters())
        {
            Ok(selected) => selected,
            Err(err) if !config.is_strict() => {
                tracing::warn!(formatter = name, %err, "formatter call skipped");
                return Ok(scope.arena.child(receiver_context, name, Value::Null));
            }
            Err(err) => return Err(err),
        };
        tracing::debug!(formatter = name, score = selected.score, "dispatching formatter");

        let Selected {
            candidate,
            receiver,
            args,
            ..
        } = selected;
        let mut call = FormatterCall::new(name, receiver, args, scope, outer);
        let result = candidate.call(&mut call)?;
        Ok(scope.arena.child(receiver_context, name, result))
    }

    /// Run a lambda body. The parameters (and `variables`) are bound as
    /// aliases in a synthetic frame below the call site, and the body is
    /// evaluated against the call site itself.
    pub fn invoke_lambda(
        &self,
        lambda: &LambdaArg<'_>,
        args: Vec<Value>,
        variables: &[(&str, Value)],
        scope: &mut Scope<'_>,
    ) -> Result<Value, EvalError> {
        scope.check_cancelled()?;

        let call_site = lambda.context;
        let frame = scope.arena.synthetic(call_site, Value::Null);
        let mark = scope.alias_mark();
        for (name, value) in lambda.params.iter().zip(args) {
            let id = scope.arena.child(frame, name.as_str(), value);
            scope.push_alias(name.as_str(), id);
        }
        for (name, value) in variables {
            let id = scope.arena.child(frame, *name, value.clone());
            scope.push_alias(*name, id);
        }

        let result = self.eval(lambda.body, call_site, call_site, false, scope);
        scope.restore_aliases(mark);
        let id = result?;
        Ok(scope.arena.value(id).clone())
    }

    #[allow(clippy::too_many_arguments)]
    fn eval_operator(
        &self,
        operator: OperatorKind,
        left: &Expression,
        right: Option<&Expression>,
        target: ContextId,
        outer: ContextId,
        chained: bool,
        scope: &mut Scope<'_>,
    ) -> Result<ContextId, EvalError> {
        let left_id = self.eval(left, target, outer, chained, scope)?;

        let value = match operator {
            OperatorKind::Not => Value::Boolean(scope.is_falsy(scope.arena.value(left_id))),
            OperatorKind::And => {
                if scope.is_falsy(scope.arena.value(left_id)) {
                    Value::Boolean(false)
                } else {
                    let right_id = self.eval_right(right, outer, scope)?;
                    Value::Boolean(!scope.is_falsy(scope.arena.value(right_id)))
                }
            }
            OperatorKind::Or => {
                if !scope.is_falsy(scope.arena.value(left_id)) {
                    Value::Boolean(true)
                } else {
                    let right_id = self.eval_right(right, outer, scope)?;
                    Value::Boolean(!scope.is_falsy(scope.arena.value(right_id)))
                }
            }
            OperatorKind::NullCoalesce => {
                if scope.arena.value(left_id).is_null() {
                    return self.eval_right(right, outer, scope);
                }
                return Ok(left_id);
            }
            _ => {
                let right_id = self.eval_right(right, outer, scope)?;
                let l = scope.arena.value(left_id);
                let r = scope.arena.value(right_id);
                apply_binary(operator, l, r)?
            }
        };

        Ok(scope.arena.child(target, "", value))
    }

    fn eval_right(
        &self,
        right: Option<&Expression>,
        outer: ContextId,
        scope: &mut Scope<'_>,
    ) -> Result<ContextId, EvalError> {
        match right {
            Some(expr) => self.eval(expr, outer, outer, false, scope),
            None => Ok(scope.arena.child(outer, "", Value::Null)),
        }
    }
}

/// Member lookup through the resolver chain.
fn lookup(value: &Value, key: &str, config: &EngineConfig) -> Option<Value> {
    let type_name = value.type_name();
    for resolver in config.resolvers() {
        if resolver.can_resolve(type_name, value, key) {
            return Some(resolver.resolve(value, key));
        }
    }

    if let Some(found) = value.member(key) {
        return Some(found);
    }

    let Value::Host(host) = value else {
        return None;
    };
    if let Some(found) = host.property(key) {
        return Some(found);
    }
    if let Some(descriptor) = config.descriptor(host.type_name())
        && let Some(found) = descriptor.get(host.as_ref(), key)
    {
        return Some(found);
    }
    config.introspector().member(host.as_ref(), key)
}

/// `{Key, Value}` pairs for the object selector.
fn members_of(value: &Value, config: &EngineConfig) -> Value {
    let entries: Vec<(String, Value)> = match value {
        Value::Null => return Value::Null,
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v.clone()))
            .collect(),
        Value::Host(host) => match config.descriptor(host.type_name()) {
            Some(descriptor) => descriptor.members(host.as_ref()),
            None => config
                .introspector()
                .members(host.as_ref())
                .unwrap_or_default(),
        },
        _ => Vec::new(),
    };
    Value::Array(
        entries
            .into_iter()
            .map(|(key, value)| Value::object([("Key", Value::from(key)), ("Value", value)]))
            .collect(),
    )
}

fn apply_binary(operator: OperatorKind, l: &Value, r: &Value) -> Result<Value, EvalError> {
    let arithmetic = match operator {
        OperatorKind::Equal => return Ok(Value::Boolean(l.loose_eq(r))),
        OperatorKind::NotEqual => return Ok(Value::Boolean(!l.loose_eq(r))),
        OperatorKind::LessThan => return Ok(Value::Boolean(l.compare(r).is_some_and(|o| o.is_lt()))),
        OperatorKind::GreaterThan => {
            return Ok(Value::Boolean(l.compare(r).is_some_and(|o| o.is_gt())));
        }
        OperatorKind::LessEqual => return Ok(Value::Boolean(l.compare(r).is_some_and(|o| o.is_le()))),
        OperatorKind::GreaterEqual => {
            return Ok(Value::Boolean(l.compare(r).is_some_and(|o| o.is_ge())));
        }
        OperatorKind::Add => ArithmeticOp::Add,
        OperatorKind::Subtract => ArithmeticOp::Subtract,
        OperatorKind::Multiply => ArithmeticOp::Multiply,
        OperatorKind::Divide => ArithmeticOp::Divide,
        OperatorKind::Modulo => ArithmeticOp::Modulo,
        OperatorKind::Power => ArithmeticOp::Power,
        OperatorKind::And | OperatorKind::Or | OperatorKind::Not | OperatorKind::NullCoalesce => {
            unreachable!("logical operators are evaluated before operands are combined")
        }
    };

    match (l, r) {
        (Value::String(_), _) | (_, Value::String(_)) if arithmetic == ArithmeticOp::Add => {
            Ok(Value::String(format!("{}{}", l.render(), r.render())))
        }
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.apply(arithmetic, *b)?)),
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (a, b) => Err(EvalError::TypeError(format!(
            "cannot apply '{}' to {} and {}",
            operator.text(),
            a.type_name(),
            b.type_name()
        ))),
    }
}
