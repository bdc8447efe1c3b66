//! Built-in formatters registered by [`EngineConfig::default`].
//!
//! [`EngineConfig::default`]: crate::config::EngineConfig

use crate::evaluator::EvalError;
use crate::formatter::{FormatterCall, FormatterRegistry, FormatterSignature, ParamType};
use crate::number::Number;
use crate::value::Value;

pub fn register(registry: &mut FormatterRegistry) {
    use ParamType::{Any, Array, Integer, Lambda, Object, String};
    let sig = FormatterSignature::new;

    registry.register("Where", sig(Array).param("predicate", Lambda), filter);
    registry.register("Select", sig(Array).param("selector", Lambda), select);
    registry.register("Any", sig(Array), any);
    registry.register("Any", sig(Array).param("predicate", Lambda), any_matching);
    registry.register("All", sig(Array).param("predicate", Lambda), all_matching);
    registry.register("Count", sig(Array), count);
    registry.register("Count", sig(Array).param("predicate", Lambda), count_matching);
    registry.register("Count", sig(Object), count);
    registry.register("First", sig(Array), first);
    registry.register("First", sig(Array).param("predicate", Lambda), first_matching);
    registry.register("Last", sig(Array), last);
    registry.register("Last", sig(Array).param("predicate", Lambda), last_matching);
    registry.register("Sum", sig(Array), sum);
    registry.register("Sum", sig(Array).param("selector", Lambda), sum);

    registry.register("ToUpper", sig(String), to_upper);
    registry.register("ToLower", sig(String), to_lower);
    registry.register("Trim", sig(String), trim);
    registry.register("Contains", sig(String).param("value", String), contains_text);
    registry.register("Contains", sig(Array).param("value", Any), contains_element);
    registry.register("Matches", sig(String).param("pattern", String), matches);
    registry.register("Join", sig(Array), join);
    registry.register("Join", sig(Array).param("separator", String), join);

    registry.register("Keys", sig(Object), keys);

    registry.register("", sig(ParamType::Number).param("places", Integer), format_number);
    registry.register("", sig(Any), format_any);
}

fn take_array(call: &mut FormatterCall<'_, '_, '_>) -> Result<Vec<Value>, EvalError> {
    match std::mem::take(&mut call.receiver) {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Err(EvalError::TypeError(format!(
            "{}() requires array, got {}",
            call.name,
            other.type_name()
        ))),
    }
}

/// Evaluate the lambda at argument `index` for every element, in order.
fn map_elements(
    call: &mut FormatterCall<'_, '_, '_>,
    items: &[Value],
    index: usize,
) -> Result<Vec<Value>, EvalError> {
    let lambda = call.lambda(index)?;
    let len = items.len();
    items
        .iter()
        .enumerate()
        .map(|(i, item)| call.invoke_for_element(&lambda, item, i, len))
        .collect()
}

/// Elements for which the predicate at argument 0 is truthy.
fn matching(call: &mut FormatterCall<'_, '_, '_>) -> Result<Vec<Value>, EvalError> {
    let items = take_array(call)?;
    let results = map_elements(call, &items, 0)?;
    Ok(items
        .into_iter()
        .zip(results)
        .filter(|(_, result)| !call.is_falsy(result))
        .map(|(item, _)| item)
        .collect())
}

// ========================================
// Sequence Formatters
// ========================================

fn filter(call: &mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> {
    Ok(Value::Array(matching(call)?))
}

fn select(call: &mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> {
    let items = take_array(call)?;
    Ok(Value::Array(map_elements(call, &items, 0)?))
}

fn any(call: &mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> {
    Ok(Value::Boolean(!take_array(call)?.is_empty()))
}

/// Stops at the first truthy result.
fn any_matching(call: &mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> {
    let items = take_array(call)?;
    let lambda = call.lambda(0)?;
    for (i, item) in items.iter().enumerate() {
        let result = call.invoke_for_element(&lambda, item, i, items.len())?;
        if !call.is_falsy(&result) {
            return Ok(Value::Boolean(true));
        }
    }
    Ok(Value::Boolean(false))
}

/// Stops at the first falsy result.
fn all_matching(call: &mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> {
    let items = take_array(call)?;
    let lambda = call.lambda(0)?;
    for (i, item) in items.iter().enumerate() {
        let result = call.invoke_for_element(&lambda, item, i, items.len())?;
        if call.is_falsy(&result) {
            return Ok(Value::Boolean(false));
        }
    }
    Ok(Value::Boolean(true))
}

fn count(call: &mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> {
    let len = match &call.receiver {
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        _ => 0,
    };
    Ok(Value::from(len))
}

fn count_matching(call: &mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> {
    Ok(Value::from(matching(call)?.len()))
}

fn first(call: &mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> {
    Ok(take_array(call)?.into_iter().next().unwrap_or_default())
}

fn first_matching(call: &mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> {
    let items = take_array(call)?;
    let lambda = call.lambda(0)?;
    for (i, item) in items.iter().enumerate() {
        let result = call.invoke_for_element(&lambda, item, i, items.len())?;
        if !call.is_falsy(&result) {
            return Ok(item.clone());
        }
    }
    Ok(Value::Null)
}

fn last(call: &mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> {
    Ok(take_array(call)?.pop().unwrap_or_default())
}

fn last_matching(call: &mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> {
    Ok(matching(call)?.pop().unwrap_or_default())
}

/// Sums the elements, or the selector's results. Nulls are skipped and the
/// total widens like any other addition.
fn sum(call: &mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> {
    let items = take_array(call)?;
    let values = if call.args.is_empty() {
        items
    } else {
        map_elements(call, &items, 0)?
    };

    let mut total = Number::Int(0);
    for value in values {
        match value {
            Value::Number(n) => total = total.add(n)?,
            Value::Null => {}
            other => {
                return Err(call.error(format!(
                    "requires numeric values, got {}",
                    other.type_name()
                )));
            }
        }
    }
    Ok(Value::Number(total))
}

fn join(call: &mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> {
    let separator = match call.value(0) {
        Value::String(s) => s,
        _ => ", ".to_string(),
    };
    let items = take_array(call)?;
    let parts: Vec<String> = items.iter().map(Value::render).collect();
    Ok(Value::String(parts.join(&separator)))
}

fn contains_element(call: &mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> {
    let needle = call.value(0);
    let found = call
        .receiver
        .as_array()
        .is_some_and(|items| items.iter().any(|item| item.loose_eq(&needle)));
    Ok(Value::Boolean(found))
}

// ========================================
// String Formatters
// ========================================

fn receiver_text(call: &FormatterCall<'_, '_, '_>) -> String {
    call.receiver.as_str().unwrap_or_default().to_string()
}

fn to_upper(call: &mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> {
    Ok(Value::String(receiver_text(call).to_uppercase()))
}

fn to_lower(call: &mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> {
    Ok(Value::String(receiver_text(call).to_lowercase()))
}

fn trim(call: &mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> {
    Ok(Value::String(receiver_text(call).trim().to_string()))
}

fn contains_text(call: &mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> {
    let needle = call.value(0);
    let found = match (call.receiver.as_str(), needle.as_str()) {
        (Some(haystack), Some(needle)) => haystack.contains(needle),
        _ => false,
    };
    Ok(Value::Boolean(found))
}

fn matches(call: &mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> {
    let pattern = call.value(0);
    let pattern = pattern.as_str().unwrap_or_default();
    let re = regex::Regex::new(pattern).map_err(|e| call.error(format!("invalid regex: {e}")))?;
    Ok(Value::Boolean(call.receiver.as_str().is_some_and(|s| re.is_match(s))))
}

// ========================================
// Object Formatters
// ========================================

fn keys(call: &mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> {
    let keys = call
        .receiver
        .as_object()
        .map(|map| map.keys().map(|k| Value::from(k.as_str())).collect())
        .unwrap_or_default();
    Ok(Value::Array(keys))
}

// ========================================
// Default Formatter
// ========================================

/// Largest scale a decimal can carry.
const MAX_DECIMAL_PLACES: u32 = 28;

/// `amount.(2)`: fixed number of decimal places.
fn format_number(call: &mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> {
    let places = call
        .value(0)
        .as_number()
        .and_then(|n| n.to_usize())
        .and_then(|n| u32::try_from(n).ok())
        .filter(|&n| n <= MAX_DECIMAL_PLACES)
        .ok_or_else(|| {
            call.error(format!(
                "decimal places must be an integer from 0 to {MAX_DECIMAL_PLACES}"
            ))
        })?;
    let text = match call.receiver.as_number() {
        Some(Number::Decimal(d)) => format!("{:.*}", places as usize, d.round_dp(places)),
        Some(n) => format!("{:.*}", places as usize, n.to_f64()),
        None => String::new(),
    };
    Ok(Value::String(text))
}

fn format_any(call: &mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> {
    Ok(Value::String(call.receiver.render()))
}
