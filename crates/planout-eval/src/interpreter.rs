//! The ops-tree walker.
//!
//! An [`Interpreter`] owns one compiled script plus the environments it
//! runs against: inputs (read-only), overrides (which shadow everything),
//! and outputs (written by `set`). `run` is one-shot: a second call
//! returns the cached outputs until `reset` is called.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value as Json};

use crate::error::EvalError;
use crate::random;
use crate::value::Value;

/// A deterministic experiment interpreter.
pub struct Interpreter {
    /// Experiment name (informational; namespaces prefix it on dispatch).
    pub name: String,
    /// Experiment salt, included in every hash this interpreter computes.
    pub salt: String,
    /// Caller-supplied parameters. Immutable during evaluation.
    pub inputs: HashMap<String, Value>,
    /// Caller-supplied pins. Shadow both inputs and outputs on lookup.
    pub overrides: HashMap<String, Value>,
    outputs: BTreeMap<String, Value>,
    code: Json,
    evaluated: bool,
    in_experiment: bool,
    /// Name of the variable currently being assigned; the default salt for
    /// a randomization operator embedded in its right-hand side.
    pub(crate) parameter_salt: Option<String>,
}

impl Interpreter {
    /// Create an interpreter for a compiled ops tree.
    pub fn new(salt: impl Into<String>, code: Json) -> Self {
        Self {
            name: String::new(),
            salt: salt.into(),
            inputs: HashMap::new(),
            overrides: HashMap::new(),
            outputs: BTreeMap::new(),
            code,
            evaluated: false,
            in_experiment: false,
            parameter_salt: None,
        }
    }

    /// Set the experiment name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the input parameters.
    pub fn with_inputs(mut self, inputs: HashMap<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Set the overrides.
    pub fn with_overrides(mut self, overrides: HashMap<String, Value>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Execute the script once.
    ///
    /// On success the collected outputs are returned; a `return` statement
    /// in the script is a successful early exit that additionally records
    /// the truthiness of its value as the [`in_experiment`] flag. Any
    /// runtime error empties the outputs and is propagated. A second call
    /// on an evaluated instance returns the cached outputs.
    ///
    /// [`in_experiment`]: Interpreter::in_experiment
    pub fn run(&mut self) -> Result<&BTreeMap<String, Value>, EvalError> {
        if self.evaluated {
            return Ok(&self.outputs);
        }

        let code = std::mem::take(&mut self.code);
        let result = self.evaluate(&code);
        self.code = code;

        match result {
            Ok(_) => {}
            Err(EvalError::Stop(value)) => match value.is_truthy() {
                Ok(flag) => self.in_experiment = flag,
                Err(err) => {
                    self.outputs.clear();
                    return Err(err);
                }
            },
            Err(err) => {
                self.outputs.clear();
                return Err(err);
            }
        }

        self.evaluated = true;
        Ok(&self.outputs)
    }

    /// Forget the previous run so the instance can be evaluated again.
    pub fn reset(&mut self) {
        self.outputs.clear();
        self.evaluated = false;
        self.in_experiment = false;
        self.parameter_salt = None;
    }

    /// Whether a `return` statement with a truthy value ended the run.
    pub fn in_experiment(&self) -> bool {
        self.in_experiment
    }

    /// The outputs collected by the most recent run.
    pub fn outputs(&self) -> &BTreeMap<String, Value> {
        &self.outputs
    }

    /// Resolve a name: overrides first, then inputs, then outputs.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.overrides
            .get(name)
            .or_else(|| self.inputs.get(name))
            .or_else(|| self.outputs.get(name))
    }

    // ─────────────────────────────────────────────────────────────
    // Evaluation
    // ─────────────────────────────────────────────────────────────

    /// Evaluate one ops-tree node.
    ///
    /// Mappings carrying an `op` field dispatch to their operator; plain
    /// mappings evaluate to themselves; arrays evaluate element-wise,
    /// left to right; scalars evaluate to themselves.
    pub(crate) fn evaluate(&mut self, node: &Json) -> Result<Value, EvalError> {
        match node {
            Json::Object(map) => match map.get("op").and_then(Json::as_str) {
                Some(op) => self.execute_op(op, map),
                None => Ok(Value::from_json(node)),
            },
            Json::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.evaluate(item)?);
                }
                Ok(Value::List(values))
            }
            scalar => Ok(Value::from_json(scalar)),
        }
    }

    /// Dispatch on the operator name. The operator set is closed; unknown
    /// names are runtime errors.
    fn execute_op(&mut self, op: &str, m: &Map<String, Json>) -> Result<Value, EvalError> {
        match op {
            "seq" => {
                let body = operand(m, "seq", "seq")?;
                self.evaluate(body)
            }
            "set" => self.op_set(m),
            "get" => self.op_get(m),
            "array" => {
                let values = operand(m, "values", "array")?;
                self.evaluate(values)
            }
            "map" => self.op_map(m),
            "index" => self.op_index(m),
            "length" => self.op_length(m),
            "coalesce" => self.op_coalesce(m),
            "cond" => self.op_cond(m),
            "<" | "<=" | ">" | ">=" | "equals" => self.op_compare(op, m),
            "and" => self.op_and(m),
            "or" => self.op_or(m),
            "not" => self.op_not(m),
            "min" => self.op_extremum(m, "min", Ordering::Less),
            "max" => self.op_extremum(m, "max", Ordering::Greater),
            "sum" => self.op_sum(m),
            "product" => self.op_product(m),
            "negative" => self.op_negative(m),
            "round" => self.op_round(m),
            "%" => self.op_modulo(m),
            "/" => self.op_divide(m),
            "literal" => Ok(Value::from_json(operand(m, "value", "literal")?)),
            "return" => {
                let value = self.evaluate(operand(m, "value", "return")?)?;
                Err(EvalError::Stop(value))
            }
            "uniformChoice" => random::uniform_choice(self, m),
            "bernoulliTrial" => random::bernoulli_trial(self, m),
            "bernoulliFilter" => random::bernoulli_filter(self, m),
            "weightedChoice" => random::weighted_choice(self, m),
            "randomInteger" => random::random_integer(self, m),
            "randomFloat" => random::random_float(self, m),
            "sample" => random::sample(self, m),
            other => Err(EvalError::UnknownOperator(other.to_string())),
        }
    }

    /// Evaluate the operand at `key` and require a list.
    pub(crate) fn eval_list(
        &mut self,
        m: &Map<String, Json>,
        key: &'static str,
        op: &'static str,
    ) -> Result<Vec<Value>, EvalError> {
        match self.evaluate(operand(m, key, op)?)? {
            Value::List(items) => Ok(items),
            other => Err(EvalError::TypeMismatch(format!(
                "operator {op}: '{key}' must be a list, got {}",
                other.type_name()
            ))),
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Core operators
    // ─────────────────────────────────────────────────────────────

    fn op_set(&mut self, m: &Map<String, Json>) -> Result<Value, EvalError> {
        let var = operand(m, "var", "set")?
            .as_str()
            .ok_or_else(|| EvalError::TypeMismatch("set: 'var' must be a string".into()))?
            .to_string();

        // The assigned name becomes the parameter salt for any
        // randomization operator inside the right-hand side.
        self.parameter_salt = Some(var.clone());

        let value = self.evaluate(operand(m, "value", "set")?)?;
        self.outputs.insert(var, value);
        Ok(Value::Bool(true))
    }

    fn op_get(&mut self, m: &Map<String, Json>) -> Result<Value, EvalError> {
        let var = operand(m, "var", "get")?
            .as_str()
            .ok_or_else(|| EvalError::TypeMismatch("get: 'var' must be a string".into()))?;
        self.get(var)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedVariable(var.to_string()))
    }

    /// `{op: "map", key: expr, ...}`: every field except `op` is evaluated.
    fn op_map(&mut self, m: &Map<String, Json>) -> Result<Value, EvalError> {
        let mut map = BTreeMap::new();
        for (key, node) in m {
            if key == "op" {
                continue;
            }
            map.insert(key.clone(), self.evaluate(node)?);
        }
        Ok(Value::Map(map))
    }

    fn op_index(&mut self, m: &Map<String, Json>) -> Result<Value, EvalError> {
        let base = self.evaluate(operand(m, "base", "index")?)?;
        let index = self.evaluate(operand(m, "index", "index")?)?;

        match base {
            Value::List(items) => {
                let idx = index.as_number()? as i64;
                if idx < 0 || idx as usize >= items.len() {
                    return Ok(Value::Null);
                }
                Ok(items[idx as usize].clone())
            }
            Value::Map(map) => match index {
                Value::Str(key) => Ok(map.get(&key).cloned().unwrap_or(Value::Null)),
                _ => Ok(Value::Null),
            },
            Value::Host(host) => {
                if let Value::Str(name) = &index {
                    // Host records commonly capitalize their exported
                    // fields; the lookup is case-insensitive on the first
                    // letter only.
                    if let Some(value) = host
                        .field(name)
                        .or_else(|| host.field(&flip_first_case(name)))
                    {
                        return Ok(value);
                    }
                }
                Ok(host.key(&index).unwrap_or(Value::Null))
            }
            other => Err(EvalError::TypeMismatch(format!(
                "cannot index into a {}",
                other.type_name()
            ))),
        }
    }

    /// Length of the operator's single list argument. Every shape found in
    /// stored scripts is accepted: the compiled one-argument form
    /// `value: list`, plus `values: [list]` and `values: list`.
    fn op_length(&mut self, m: &Map<String, Json>) -> Result<Value, EvalError> {
        let node = one_or_many(m, "length")?;
        let items = self.require_list(node, "length")?;
        if items.len() == 1 {
            if let Value::List(inner) = &items[0] {
                return Ok(Value::Int(inner.len() as i64));
            }
        }
        Ok(Value::Int(items.len() as i64))
    }

    /// The non-null entries of the operand list, in order.
    fn op_coalesce(&mut self, m: &Map<String, Json>) -> Result<Value, EvalError> {
        let items = self.eval_list(m, "values", "coalesce")?;
        Ok(Value::List(
            items.into_iter().filter(|v| *v != Value::Null).collect(),
        ))
    }

    /// Scan the `cond` array of `{if, then}` pairs, evaluating conditions
    /// lazily, and take the first truthy branch.
    fn op_cond(&mut self, m: &Map<String, Json>) -> Result<Value, EvalError> {
        let conditions = operand(m, "cond", "cond")?
            .as_array()
            .ok_or_else(|| EvalError::TypeMismatch("cond: 'cond' must be an array".into()))?;

        for case in conditions {
            let case = case
                .as_object()
                .ok_or_else(|| EvalError::TypeMismatch("cond: cases must be mappings".into()))?;
            let condition = case.get("if").ok_or(EvalError::MissingOperand {
                op: "cond",
                operand: "if",
            })?;
            let consequence = case.get("then").ok_or(EvalError::MissingOperand {
                op: "cond",
                operand: "then",
            })?;
            if self.evaluate(condition)?.is_truthy()? {
                return self.evaluate(consequence);
            }
        }
        Ok(Value::Bool(true))
    }

    fn op_compare(&mut self, op: &str, m: &Map<String, Json>) -> Result<Value, EvalError> {
        let op_name: &'static str = match op {
            "<" => "<",
            "<=" => "<=",
            ">" => ">",
            ">=" => ">=",
            _ => "equals",
        };
        let left = self.evaluate(operand(m, "left", op_name)?)?;
        let right = self.evaluate(operand(m, "right", op_name)?)?;
        let ordering = left.compare(&right)?;
        let result = match op {
            "<" => ordering == Ordering::Less,
            "<=" => ordering != Ordering::Greater,
            ">" => ordering == Ordering::Greater,
            ">=" => ordering != Ordering::Less,
            _ => ordering == Ordering::Equal,
        };
        Ok(Value::Bool(result))
    }

    /// Short-circuit conjunction: operands evaluate in order and the first
    /// falsy one determines the result.
    fn op_and(&mut self, m: &Map<String, Json>) -> Result<Value, EvalError> {
        match operand(m, "values", "and")? {
            Json::Array(items) => {
                if items.is_empty() {
                    return Ok(Value::Bool(false));
                }
                for item in items {
                    if !self.evaluate(item)?.is_truthy()? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            node => {
                let values = self.require_list(node, "and")?;
                if values.is_empty() {
                    return Ok(Value::Bool(false));
                }
                for value in &values {
                    if !value.is_truthy()? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
        }
    }

    /// Short-circuit disjunction, symmetric to [`Self::op_and`].
    fn op_or(&mut self, m: &Map<String, Json>) -> Result<Value, EvalError> {
        match operand(m, "values", "or")? {
            Json::Array(items) => {
                for item in items {
                    if self.evaluate(item)?.is_truthy()? {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            node => {
                let values = self.require_list(node, "or")?;
                for value in &values {
                    if value.is_truthy()? {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
        }
    }

    fn op_not(&mut self, m: &Map<String, Json>) -> Result<Value, EvalError> {
        let value = self.evaluate(operand(m, "value", "not")?)?;
        Ok(Value::Bool(!value.is_truthy()?))
    }

    fn op_extremum(
        &mut self,
        m: &Map<String, Json>,
        op: &'static str,
        keep: Ordering,
    ) -> Result<Value, EvalError> {
        let values = self.eval_list(m, "values", op)?;
        let mut values = values.into_iter();
        let mut best = values
            .next()
            .ok_or_else(|| EvalError::Runtime(format!("executing {op}() with no values")))?;
        for value in values {
            if value.compare(&best)? == keep {
                best = value;
            }
        }
        Ok(best)
    }

    /// Left-fold addition. All-string operands concatenate; all-integer
    /// operands stay integral; any float promotes the fold to doubles.
    fn op_sum(&mut self, m: &Map<String, Json>) -> Result<Value, EvalError> {
        let values = self.eval_list(m, "values", "sum")?;
        if values.is_empty() {
            return Err(EvalError::Runtime("executing sum() with no values".into()));
        }
        if values.iter().all(|v| matches!(v, Value::Str(_))) {
            let mut out = String::new();
            for value in &values {
                if let Value::Str(s) = value {
                    out.push_str(s);
                }
            }
            return Ok(Value::Str(out));
        }
        if values.iter().all(|v| matches!(v, Value::Int(_))) {
            let mut total = 0i64;
            for value in &values {
                if let Value::Int(n) = value {
                    total += n;
                }
            }
            return Ok(Value::Int(total));
        }
        let mut total = 0.0;
        for value in &values {
            total += value.as_number()?;
        }
        Ok(Value::Float(total))
    }

    /// Left-fold multiplication; integral when every operand is.
    fn op_product(&mut self, m: &Map<String, Json>) -> Result<Value, EvalError> {
        let values = self.eval_list(m, "values", "product")?;
        if values.is_empty() {
            return Err(EvalError::Runtime(
                "executing product() with no values".into(),
            ));
        }
        if values.iter().all(|v| matches!(v, Value::Int(_))) {
            let mut total = 1i64;
            for value in &values {
                if let Value::Int(n) = value {
                    total *= n;
                }
            }
            return Ok(Value::Int(total));
        }
        let mut total = 1.0;
        for value in &values {
            total *= value.as_number()?;
        }
        Ok(Value::Float(total))
    }

    fn op_negative(&mut self, m: &Map<String, Json>) -> Result<Value, EvalError> {
        match self.evaluate(operand(m, "value", "negative")?)? {
            Value::Int(n) => Ok(Value::Int(-n)),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(EvalError::TypeMismatch(format!(
                "negative expects a number, got {}",
                other.type_name()
            ))),
        }
    }

    /// Rounding. The compiled one-argument form `value: number` rounds a
    /// single number; the `values: list` form rounds element-wise and
    /// returns the rounded list. Halves round up.
    fn op_round(&mut self, m: &Map<String, Json>) -> Result<Value, EvalError> {
        let node = one_or_many(m, "round")?;
        match self.evaluate(node)? {
            Value::List(values) => {
                let mut rounded = Vec::with_capacity(values.len());
                for value in values {
                    rounded.push(round_number(value)?);
                }
                Ok(Value::List(rounded))
            }
            value => round_number(value),
        }
    }

    /// Both operands truncate to integers; the result is a double.
    fn op_modulo(&mut self, m: &Map<String, Json>) -> Result<Value, EvalError> {
        let left = self.evaluate(operand(m, "left", "%")?)?.as_number()? as i64;
        let right = self.evaluate(operand(m, "right", "%")?)?.as_number()? as i64;
        if right == 0 {
            return Err(EvalError::Runtime("modulo by zero".into()));
        }
        Ok(Value::Float((left % right) as f64))
    }

    /// Division always produces a double.
    fn op_divide(&mut self, m: &Map<String, Json>) -> Result<Value, EvalError> {
        let left = self.evaluate(operand(m, "left", "/")?)?.as_number()?;
        let right = self.evaluate(operand(m, "right", "/")?)?.as_number()?;
        if right == 0.0 {
            return Err(EvalError::Runtime("division by zero".into()));
        }
        Ok(Value::Float(left / right))
    }

    fn require_list(&mut self, node: &Json, op: &'static str) -> Result<Vec<Value>, EvalError> {
        match self.evaluate(node)? {
            Value::List(items) => Ok(items),
            other => Err(EvalError::TypeMismatch(format!(
                "operator {op}: 'values' must be a list, got {}",
                other.type_name()
            ))),
        }
    }
}

/// Fetch a required operand, or report which one is missing.
pub(crate) fn operand<'m>(
    m: &'m Map<String, Json>,
    key: &'static str,
    op: &'static str,
) -> Result<&'m Json, EvalError> {
    m.get(key).ok_or(EvalError::MissingOperand { op, operand: key })
}

/// Fetch the argument of an operator that compiles to either call shape:
/// `values` (positional list) or `value` (the one-argument form).
fn one_or_many<'m>(m: &'m Map<String, Json>, op: &'static str) -> Result<&'m Json, EvalError> {
    m.get("values")
        .or_else(|| m.get("value"))
        .ok_or(EvalError::MissingOperand {
            op,
            operand: "values",
        })
}

/// Round one number: halves away from the floor, integers unchanged.
fn round_number(value: Value) -> Result<Value, EvalError> {
    match value {
        Value::Int(n) => Ok(Value::Int(n)),
        Value::Float(f) => {
            let floor = f.floor();
            if (f - floor).abs() < 0.5 {
                Ok(Value::Float(floor))
            } else {
                Ok(Value::Float(f.ceil()))
            }
        }
        other => Err(EvalError::TypeMismatch(format!(
            "round expects numbers, got {}",
            other.type_name()
        ))),
    }
}

/// Swap the case of the first letter: `value` ↔ `Value`.
fn flip_first_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => {
            first.to_uppercase().chain(chars).collect()
        }
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
