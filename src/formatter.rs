//! Formatter registration and overload resolution.
//!
//! A formatter is a named function called on the value a path resolved to
//! (the receiver), e.g. `name.ToUpper()` or `list.Where(x => x.Active)`.
//! Several candidates may share a name; the call picks one by scoring
//! the receiver and every argument against each candidate's signature:
//!
//! | match | score |
//! |-------|-------|
//! | exact type | 3 |
//! | assignable (`Any`, or null) | 2 |
//! | convertible by a registered [`ValueConverter`] | 1 |
//!
//! Each named argument that matches a parameter name adds one point. The
//! highest total wins and ties go to the candidate registered first.

use std::fmt;
use std::sync::Arc;

use crate::ast::Expression;
use crate::context::{ContextId, Scope};
use crate::evaluator::{EvalError, Evaluator};
use crate::value::{Value, ValueType};

const EXACT: u32 = 3;
const ASSIGNABLE: u32 = 2;
const CONVERTIBLE: u32 = 1;
const NAMED_BONUS: u32 = 1;

/// Declared type of a receiver or parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Any,
    Boolean,
    /// Any numeric kind
    Number,
    /// Integer numeric kinds only
    Integer,
    String,
    Array,
    Object,
    Lambda,
    /// Host object with this type name
    Host(String),
}

impl ParamType {
    fn exact(&self, value: &Value) -> bool {
        match (self, value.value_type()) {
            (ParamType::Boolean, ValueType::Boolean)
            | (ParamType::Number, ValueType::Number(_))
            | (ParamType::String, ValueType::String)
            | (ParamType::Array, ValueType::Array)
            | (ParamType::Object, ValueType::Object) => true,
            (ParamType::Integer, ValueType::Number(kind)) => kind.is_integer(),
            (ParamType::Host(name), ValueType::Host) => value.type_name() == name,
            _ => false,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Any => f.write_str("any"),
            ParamType::Boolean => f.write_str("boolean"),
            ParamType::Number => f.write_str("number"),
            ParamType::Integer => f.write_str("integer"),
            ParamType::String => f.write_str("string"),
            ParamType::Array => f.write_str("array"),
            ParamType::Object => f.write_str("object"),
            ParamType::Lambda => f.write_str("lambda"),
            ParamType::Host(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: ParamType,
    /// Collects every remaining positional argument. Only valid last.
    pub rest: bool,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Param {
            name: name.into(),
            ty,
            rest: false,
        }
    }

    pub fn rest(name: impl Into<String>, ty: ParamType) -> Self {
        Param {
            name: name.into(),
            ty,
            rest: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatterSignature {
    pub receiver: ParamType,
    pub params: Vec<Param>,
}

impl FormatterSignature {
    pub fn new(receiver: ParamType) -> Self {
        FormatterSignature {
            receiver,
            params: Vec::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.params.push(Param::new(name, ty));
        self
    }

    pub fn rest(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.params.push(Param::rest(name, ty));
        self
    }

    fn rest_param(&self) -> Option<&Param> {
        self.params.last().filter(|p| p.rest)
    }

    fn fixed_params(&self) -> &[Param] {
        match self.rest_param() {
            Some(_) => &self.params[..self.params.len() - 1],
            None => &self.params,
        }
    }
}

/// Converts a value so it can be passed for a parameter of another type.
pub trait ValueConverter: Send + Sync {
    fn can_convert(&self, value: &Value, target: &ParamType) -> bool;

    fn convert(&self, value: &Value, target: &ParamType) -> Result<Value, EvalError>;
}

/// Renders scalars as strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToStringConverter;

impl ValueConverter for ToStringConverter {
    fn can_convert(&self, value: &Value, target: &ParamType) -> bool {
        *target == ParamType::String && matches!(value, Value::Number(_) | Value::Boolean(_))
    }

    fn convert(&self, value: &Value, _target: &ParamType) -> Result<Value, EvalError> {
        Ok(Value::String(value.render()))
    }
}

/// Parses numeric strings, and truncates fractional numbers for integer
/// parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberConverter;

impl ValueConverter for NumberConverter {
    fn can_convert(&self, value: &Value, target: &ParamType) -> bool {
        match (value, target) {
            (Value::String(s), ParamType::Number | ParamType::Integer) => {
                s.trim().parse::<f64>().is_ok()
            }
            (Value::Number(n), ParamType::Integer) => !n.kind().is_integer(),
            _ => false,
        }
    }

    fn convert(&self, value: &Value, target: &ParamType) -> Result<Value, EvalError> {
        let failed = || EvalError::ArgumentConversion {
            value: value.render(),
            target: target.to_string(),
        };
        match (value, target) {
            (Value::String(s), ParamType::Integer) => {
                let text = s.trim();
                match text.parse::<i64>() {
                    Ok(i) => Ok(Value::from(i)),
                    Err(_) => text
                        .parse::<f64>()
                        .map(|f| Value::from(f.trunc() as i64))
                        .map_err(|_| failed()),
                }
            }
            (Value::String(s), _) => s.trim().parse::<f64>().map(Value::from).map_err(|_| failed()),
            (Value::Number(n), ParamType::Integer) => n.to_i64().map(Value::from).ok_or_else(failed),
            _ => Err(failed()),
        }
    }
}

/// A lambda argument: parameter names, body, and the context the call
/// appeared in.
#[derive(Debug, Clone)]
pub struct LambdaArg<'e> {
    pub params: Vec<String>,
    pub body: &'e Expression,
    pub context: ContextId,
}

/// One evaluated formatter argument.
#[derive(Debug, Clone)]
pub enum ArgValue<'e> {
    Value(Value),
    Lambda(LambdaArg<'e>),
}

impl ArgValue<'_> {
    fn kind_name(&self) -> String {
        match self {
            ArgValue::Value(v) => v.type_name().to_string(),
            ArgValue::Lambda(_) => "lambda".to_string(),
        }
    }
}

/// An argument as written at the call site.
#[derive(Debug, Clone)]
pub struct CallArgument<'e> {
    pub name: Option<&'e str>,
    pub value: ArgValue<'e>,
}

/// What a formatter function receives.
pub struct FormatterCall<'e, 's, 'c> {
    pub name: &'e str,
    pub receiver: Value,
    /// Arguments in parameter order; values bound to a rest parameter
    /// follow the fixed ones.
    pub args: Vec<ArgValue<'e>>,
    scope: &'s mut Scope<'c>,
    context: ContextId,
}

impl<'e, 's, 'c> FormatterCall<'e, 's, 'c> {
    pub(crate) fn new(
        name: &'e str,
        receiver: Value,
        args: Vec<ArgValue<'e>>,
        scope: &'s mut Scope<'c>,
        context: ContextId,
    ) -> Self {
        FormatterCall {
            name,
            receiver,
            args,
            scope,
            context,
        }
    }

    /// Context the formatter was called from.
    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn scope(&mut self) -> &mut Scope<'c> {
        &mut *self.scope
    }

    pub fn is_falsy(&self, value: &Value) -> bool {
        self.scope.is_falsy(value)
    }

    /// Value argument at `index`, or null when absent.
    pub fn value(&self, index: usize) -> Value {
        match self.args.get(index) {
            Some(ArgValue::Value(v)) => v.clone(),
            _ => Value::Null,
        }
    }

    pub fn lambda(&self, index: usize) -> Result<LambdaArg<'e>, EvalError> {
        match self.args.get(index) {
            Some(ArgValue::Lambda(lambda)) => Ok(lambda.clone()),
            _ => Err(EvalError::Formatter {
                name: self.name.to_string(),
                message: format!("argument {} must be a lambda", index + 1),
            }),
        }
    }

    /// Call a lambda argument with positional values.
    pub fn invoke(&mut self, lambda: &LambdaArg<'e>, args: Vec<Value>) -> Result<Value, EvalError> {
        Evaluator::new().invoke_lambda(lambda, args, &[], self.scope)
    }

    /// Call a lambda for one element of a sequence. The element binds to the
    /// first parameter and the index to the second; `$index`, `$first` and
    /// `$last` are available to the body.
    pub fn invoke_for_element(
        &mut self,
        lambda: &LambdaArg<'e>,
        element: &Value,
        index: usize,
        len: usize,
    ) -> Result<Value, EvalError> {
        let variables = [
            ("$index", Value::from(index)),
            ("$first", Value::from(index == 0)),
            ("$last", Value::from(index + 1 == len)),
        ];
        Evaluator::new().invoke_lambda(
            lambda,
            vec![element.clone(), Value::from(index)],
            &variables,
            self.scope,
        )
    }

    pub fn error(&self, message: impl Into<String>) -> EvalError {
        EvalError::Formatter {
            name: self.name.to_string(),
            message: message.into(),
        }
    }
}

pub type FormatterFn =
    dyn Fn(&mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> + Send + Sync;

#[derive(Clone)]
pub struct FormatterCandidate {
    pub name: String,
    pub signature: FormatterSignature,
    function: Arc<FormatterFn>,
}

impl FormatterCandidate {
    pub fn call(&self, call: &mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> {
        (self.function)(call)
    }
}

impl fmt::Debug for FormatterCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatterCandidate")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// The winning candidate with its receiver and arguments bound.
#[derive(Debug)]
pub struct Selected<'r, 'e> {
    pub candidate: &'r FormatterCandidate,
    pub receiver: Value,
    pub args: Vec<ArgValue<'e>>,
    pub score: u32,
}

#[derive(Debug, Clone, Default)]
pub struct FormatterRegistry {
    candidates: Vec<FormatterCandidate>,
}

impl FormatterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, signature: FormatterSignature, function: F)
    where
        F: Fn(&mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.candidates.push(FormatterCandidate {
            name: name.into(),
            signature,
            function: Arc::new(function),
        });
    }

    pub fn candidates<'r>(&'r self, name: &'r str) -> impl Iterator<Item = &'r FormatterCandidate> {
        self.candidates.iter().filter(move |c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Pick the best candidate for a call. When nothing binds and some
    /// argument failed conversion, that failure is reported instead.
    pub fn resolve<'r, 'e>(
        &'r self,
        name: &str,
        receiver: &Value,
        args: &[CallArgument<'e>],
        converters: &[Arc<dyn ValueConverter>],
    ) -> Result<Selected<'r, 'e>, EvalError> {
        let mut binder = Binder::new(converters);
        let mut best: Option<Selected<'r, 'e>> = None;

        for candidate in self.candidates.iter().filter(|c| c.name == name) {
            let Some(selected) = binder.bind(candidate, receiver, args) else {
                continue;
            };
            tracing::trace!(formatter = name, score = selected.score, signature = ?candidate.signature, "candidate");
            // Strictly greater: ties keep the earlier registration.
            if best.as_ref().is_none_or(|b| selected.score > b.score) {
                best = Some(selected);
            }
        }

        best.ok_or_else(|| {
            binder
                .conversion_failure
                .unwrap_or_else(|| EvalError::FormatterResolution {
                    name: name.to_string(),
                    receiver: receiver.type_name().to_string(),
                    arguments: args
                        .iter()
                        .map(|a| a.value.kind_name())
                        .collect::<Vec<_>>()
                        .join(", "),
                })
        })
    }
}

/// Binds call arguments to candidate signatures.
struct Binder<'a> {
    converters: &'a [Arc<dyn ValueConverter>],
    /// First converter error seen across all candidates.
    conversion_failure: Option<EvalError>,
}

impl<'a> Binder<'a> {
    fn new(converters: &'a [Arc<dyn ValueConverter>]) -> Self {
        Binder {
            converters,
            conversion_failure: None,
        }
    }

    /// Score one value against a declared type, converting when needed.
    fn score_value(&mut self, value: &Value, ty: &ParamType) -> Option<(u32, Value)> {
        if *ty == ParamType::Lambda {
            return None;
        }
        if ty.exact(value) {
            return Some((EXACT, value.clone()));
        }
        if *ty == ParamType::Any || value.is_null() {
            return Some((ASSIGNABLE, value.clone()));
        }
        let converter = self.converters.iter().find(|c| c.can_convert(value, ty))?;
        match converter.convert(value, ty) {
            Ok(converted) => Some((CONVERTIBLE, converted)),
            Err(err) => {
                tracing::debug!(%err, "argument conversion failed");
                self.conversion_failure.get_or_insert(err);
                None
            }
        }
    }

    fn score_arg<'e>(&mut self, arg: &ArgValue<'e>, ty: &ParamType) -> Option<(u32, ArgValue<'e>)> {
        match (arg, ty) {
            (ArgValue::Lambda(_), ParamType::Lambda) => Some((EXACT, arg.clone())),
            (ArgValue::Lambda(_), _) => None,
            (ArgValue::Value(v), ty) => self
                .score_value(v, ty)
                .map(|(score, v)| (score, ArgValue::Value(v))),
        }
    }

    fn bind<'r, 'e>(
        &mut self,
        candidate: &'r FormatterCandidate,
        receiver: &Value,
        args: &[CallArgument<'e>],
    ) -> Option<Selected<'r, 'e>> {
        let signature = &candidate.signature;
        let fixed = signature.fixed_params();
        let rest = signature.rest_param();

        let (mut score, receiver) = self.score_value(receiver, &signature.receiver)?;
        let mut slots: Vec<Option<ArgValue<'e>>> = vec![None; fixed.len()];
        let mut rest_values = Vec::new();

        for arg in args.iter().filter(|a| a.name.is_some()) {
            let name = arg.name.unwrap_or_default();
            let index = fixed.iter().position(|p| p.name.eq_ignore_ascii_case(name))?;
            if slots[index].is_some() {
                return None;
            }
            let (s, value) = self.score_arg(&arg.value, &fixed[index].ty)?;
            score += s + NAMED_BONUS;
            slots[index] = Some(value);
        }

        for arg in args.iter().filter(|a| a.name.is_none()) {
            match slots.iter().position(Option::is_none) {
                Some(index) => {
                    let (s, value) = self.score_arg(&arg.value, &fixed[index].ty)?;
                    score += s;
                    slots[index] = Some(value);
                }
                None => {
                    let param = rest?;
                    let (s, value) = self.score_arg(&arg.value, &param.ty)?;
                    score += s;
                    rest_values.push(value);
                }
            }
        }

        let mut bound: Vec<ArgValue<'e>> = slots.into_iter().collect::<Option<Vec<_>>>()?;
        bound.extend(rest_values);

        Some(Selected {
            candidate,
            receiver,
            args: bound,
            score,
        })
    }
}
