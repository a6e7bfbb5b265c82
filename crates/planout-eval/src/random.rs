//! Randomization operators.
//!
//! Each draw hashes a name of the form `salt[.unit][.extra…]` where the
//! salt resolves to the `full_salt` argument when present, and otherwise to
//! `experiment_salt "." (argument salt | parameter salt)`. Outputs are pure
//! functions of that name; nothing here consults a random number generator.

use serde_json::{Map, Value as Json};

use crate::error::EvalError;
use crate::hash;
use crate::interpreter::{operand, Interpreter};
use crate::value::Value;

/// Resolve the salt portion of the hash name.
fn salt_string(interp: &mut Interpreter, m: &Map<String, Json>) -> Result<String, EvalError> {
    if let Some(node) = m.get("full_salt") {
        return eval_salt_component(interp, node, "full_salt");
    }
    let local = match m.get("salt") {
        Some(node) => eval_salt_component(interp, node, "salt")?,
        None => interp.parameter_salt.clone().unwrap_or_default(),
    };
    Ok(format!("{}.{}", interp.salt, local))
}

fn eval_salt_component(
    interp: &mut Interpreter,
    node: &Json,
    which: &str,
) -> Result<String, EvalError> {
    match interp.evaluate(node)? {
        Value::Str(s) => Ok(s),
        other => Err(EvalError::TypeMismatch(format!(
            "'{which}' must be a string, got {}",
            other.type_name()
        ))),
    }
}

/// Build the full hash name for a draw: salt, then the unit's canonical
/// string, then any per-element components.
fn experiment_id(
    interp: &mut Interpreter,
    m: &Map<String, Json>,
    op: &'static str,
    appended: &[String],
) -> Result<String, EvalError> {
    let unit = interp.evaluate(operand(m, "unit", op)?)?;
    let unit_str = unit.unit_str();

    let mut name = salt_string(interp, m)?;
    if !unit_str.is_empty() {
        name.push('.');
        name.push_str(&unit_str);
    }
    for extra in appended {
        name.push('.');
        name.push_str(extra);
    }
    Ok(name)
}

fn get_hash(
    interp: &mut Interpreter,
    m: &Map<String, Json>,
    op: &'static str,
    appended: &[String],
) -> Result<u64, EvalError> {
    Ok(hash::hash(&experiment_id(interp, m, op, appended)?))
}

fn get_uniform(
    interp: &mut Interpreter,
    m: &Map<String, Json>,
    op: &'static str,
    min: f64,
    max: f64,
    appended: &[String],
) -> Result<f64, EvalError> {
    Ok(hash::uniform(get_hash(interp, m, op, appended)?, min, max))
}

/// Evaluate an optional numeric argument, falling back to a default.
fn number_or(
    interp: &mut Interpreter,
    m: &Map<String, Json>,
    key: &str,
    default: f64,
) -> Result<f64, EvalError> {
    match m.get(key) {
        Some(node) => interp.evaluate(node)?.as_number(),
        None => Ok(default),
    }
}

/// `choices[hash % len]`
pub(crate) fn uniform_choice(
    interp: &mut Interpreter,
    m: &Map<String, Json>,
) -> Result<Value, EvalError> {
    let choices = interp.eval_list(m, "choices", "uniformChoice")?;
    if choices.is_empty() {
        return Err(EvalError::Runtime("uniformChoice: empty choices".into()));
    }
    let idx = (get_hash(interp, m, "uniformChoice", &[])? % choices.len() as u64) as usize;
    Ok(choices[idx].clone())
}

/// 1 with probability `p`, else 0.
pub(crate) fn bernoulli_trial(
    interp: &mut Interpreter,
    m: &Map<String, Json>,
) -> Result<Value, EvalError> {
    let p = interp.evaluate(operand(m, "p", "bernoulliTrial")?)?.as_number()?;
    let draw = get_uniform(interp, m, "bernoulliTrial", 0.0, 1.0, &[])?;
    Ok(Value::Int(if draw <= p { 1 } else { 0 }))
}

/// Keep each choice independently with probability `p`; the per-choice
/// draw appends the choice's canonical string to the hash name.
pub(crate) fn bernoulli_filter(
    interp: &mut Interpreter,
    m: &Map<String, Json>,
) -> Result<Value, EvalError> {
    let p = interp.evaluate(operand(m, "p", "bernoulliFilter")?)?.as_number()?;
    let choices = interp.eval_list(m, "choices", "bernoulliFilter")?;
    let mut kept = Vec::with_capacity(choices.len());
    for choice in choices {
        let draw = get_uniform(
            interp,
            m,
            "bernoulliFilter",
            0.0,
            1.0,
            &[choice.unit_str()],
        )?;
        if draw <= p {
            kept.push(choice);
        }
    }
    Ok(Value::List(kept))
}

/// Draw a uniform in `[0, total)` over the cumulative weights and take the
/// first choice whose cumulative weight reaches it.
pub(crate) fn weighted_choice(
    interp: &mut Interpreter,
    m: &Map<String, Json>,
) -> Result<Value, EvalError> {
    let weights = interp.eval_list(m, "weights", "weightedChoice")?;
    let mut cumulative = Vec::with_capacity(weights.len());
    let mut total = 0.0;
    for weight in &weights {
        total += weight.as_number()?;
        cumulative.push(total);
    }

    let stop = get_uniform(interp, m, "weightedChoice", 0.0, total, &[])?;
    let choices = interp.eval_list(m, "choices", "weightedChoice")?;
    for (choice, weight) in choices.iter().zip(&cumulative) {
        if stop <= *weight {
            return Ok(choice.clone());
        }
    }
    Ok(Value::Null)
}

/// `min + hash % (max - min + 1)`, defaults `min=0`, `max=1`.
pub(crate) fn random_integer(
    interp: &mut Interpreter,
    m: &Map<String, Json>,
) -> Result<Value, EvalError> {
    let min = number_or(interp, m, "min", 0.0)? as i64;
    let max = number_or(interp, m, "max", 1.0)? as i64;
    let range = max - min + 1;
    if range <= 0 {
        return Err(EvalError::Runtime(format!(
            "randomInteger: empty range [{min}, {max}]"
        )));
    }
    let offset = (get_hash(interp, m, "randomInteger", &[])? % range as u64) as i64;
    Ok(Value::Int(min + offset))
}

/// The uniform mapping over `[min, max]`, defaults `[0, 1]`.
pub(crate) fn random_float(
    interp: &mut Interpreter,
    m: &Map<String, Json>,
) -> Result<Value, EvalError> {
    let min = number_or(interp, m, "min", 0.0)?;
    let max = number_or(interp, m, "max", 1.0)?;
    Ok(Value::Float(get_uniform(
        interp,
        m,
        "randomFloat",
        min,
        max,
        &[],
    )?))
}

/// Fisher–Yates shuffle, then the first `draws` entries (default: all).
///
/// Every swap reuses the one hash of the draw name: the swap partner at
/// position `i` is `hash % (i + 1)`. This matches the published assignment
/// behavior and must not be "fixed" to a per-swap hash.
pub(crate) fn sample(
    interp: &mut Interpreter,
    m: &Map<String, Json>,
) -> Result<Value, EvalError> {
    let mut choices = interp.eval_list(m, "choices", "sample")?;
    let h = get_hash(interp, m, "sample", &[])?;

    for i in (0..choices.len()).rev() {
        let j = (h % (i as u64 + 1)) as usize;
        choices.swap(i, j);
    }

    let draws = match m.get("draws") {
        Some(node) => interp.evaluate(node)?.as_number()? as usize,
        None => choices.len(),
    };
    if draws > choices.len() {
        return Err(EvalError::Runtime(format!(
            "sample: {draws} draws requested from {} choices",
            choices.len()
        )));
    }
    choices.truncate(draws);
    Ok(Value::List(choices))
}
