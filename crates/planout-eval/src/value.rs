//! The dynamic runtime value type and its coercion rules.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::EvalError;

/// Absolute tolerance used by numeric comparison and truthiness.
pub(crate) const FLOAT_TOLERANCE: f64 = 1e-4;

/// Capability implemented by caller-supplied records so the interpreter can
/// index into them by field name or key.
///
/// The `index` operator is the only place host values are inspected; no
/// other operator looks inside them.
pub trait HostValue {
    /// Look up an exported field by name.
    fn field(&self, name: &str) -> Option<Value>;

    /// Look up an entry by key, for hosts wrapping keyed containers.
    fn key(&self, key: &Value) -> Option<Value> {
        let _ = key;
        None
    }
}

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// An opaque reference to a caller-supplied record.
    Host(Rc<dyn HostValue>),
}

impl Value {
    /// Convert a JSON scalar or container into a runtime value, without
    /// evaluating anything. Integral JSON numbers become `Int`.
    pub fn from_json(node: &serde_json::Value) -> Value {
        match node {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// The name of this value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Host(_) => "host value",
        }
    }

    /// Truthiness. Booleans are themselves; strings are truthy iff
    /// non-empty; numbers are truthy iff equal to 1 within the comparison
    /// tolerance (a quirk of the language, relied on by `cond` tests).
    /// Every other type is an error.
    pub fn is_truthy(&self) -> Result<bool, EvalError> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Str(s) => Ok(!s.is_empty()),
            Value::Int(_) | Value::Float(_) => {
                Ok(cmp_float(self.as_number()?, 1.0) == Ordering::Equal)
            }
            other => Err(EvalError::TypeMismatch(format!(
                "cannot take the truthiness of a {}",
                other.type_name()
            ))),
        }
    }

    /// Numeric coercion: integers and floats are themselves, booleans map
    /// to 0/1. Everything else is an error.
    pub fn as_number(&self) -> Result<f64, EvalError> {
        match self {
            Value::Int(n) => Ok(*n as f64),
            Value::Float(f) => Ok(*f),
            Value::Bool(true) => Ok(1.0),
            Value::Bool(false) => Ok(0.0),
            other => Err(EvalError::TypeMismatch(format!(
                "expected a number, got {}",
                other.type_name()
            ))),
        }
    }

    /// Ordering used by the comparison operators and `min`/`max`.
    ///
    /// Two strings compare lexicographically; any other pair must be
    /// numeric-coercible and compares as doubles with absolute tolerance.
    pub fn compare(&self, other: &Value) -> Result<Ordering, EvalError> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            _ => Ok(cmp_float(self.as_number()?, other.as_number()?)),
        }
    }

    /// Canonical string form used when a value participates in a hash name:
    /// integers without decimals, floats in shortest round-trip form,
    /// strings verbatim. Lists join their elements with `.`; types with no
    /// canonical form contribute the empty string.
    pub fn unit_str(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => format!("{f}"),
            Value::List(items) => items
                .iter()
                .map(Value::unit_str)
                .collect::<Vec<_>>()
                .join("."),
            _ => String::new(),
        }
    }
}

/// Compare two doubles with absolute tolerance [`FLOAT_TOLERANCE`].
pub(crate) fn cmp_float(lhs: f64, rhs: f64) -> Ordering {
    if (lhs - rhs).abs() < FLOAT_TOLERANCE {
        Ordering::Equal
    } else if lhs < rhs {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Host(a), Value::Host(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Map(map) => f.debug_map().entries(map).finish(),
            Value::Host(_) => f.write_str("Host(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness_quirk_numbers_equal_one() {
        assert!(Value::Int(1).is_truthy().unwrap());
        assert!(Value::Float(1.00009).is_truthy().unwrap());
        assert!(!Value::Int(0).is_truthy().unwrap());
        assert!(!Value::Int(42).is_truthy().unwrap());
        assert!(!Value::Float(1.01).is_truthy().unwrap());
    }

    #[test]
    fn test_truthiness_strings_and_bools() {
        assert!(Value::Str("x".into()).is_truthy().unwrap());
        assert!(!Value::Str(String::new()).is_truthy().unwrap());
        assert!(Value::Bool(true).is_truthy().unwrap());
        assert!(!Value::Bool(false).is_truthy().unwrap());
    }

    #[test]
    fn test_truthiness_of_list_is_an_error() {
        assert!(Value::List(vec![]).is_truthy().is_err());
        assert!(Value::Null.is_truthy().is_err());
    }

    #[test]
    fn test_compare_with_tolerance() {
        let a = Value::Float(1.00005);
        let b = Value::Int(1);
        assert_eq!(a.compare(&b).unwrap(), Ordering::Equal);
        assert_eq!(
            Value::Int(2).compare(&Value::Int(3)).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            Value::Bool(true).compare(&Value::Int(1)).unwrap(),
            Ordering::Equal
        );
    }

    #[test]
    fn test_compare_strings_lexicographic() {
        let a = Value::Str("apple".into());
        let b = Value::Str("banana".into());
        assert_eq!(a.compare(&b).unwrap(), Ordering::Less);
    }

    #[test]
    fn test_unit_str_forms() {
        assert_eq!(Value::Int(123454).unit_str(), "123454");
        assert_eq!(Value::Float(8.0).unit_str(), "8");
        assert_eq!(Value::Float(3.14).unit_str(), "3.14");
        assert_eq!(Value::Str("test-id".into()).unit_str(), "test-id");
        let list = Value::List(vec![Value::Str("a".into()), Value::Int(4)]);
        assert_eq!(list.unit_str(), "a.4");
    }

    #[test]
    fn test_from_json_integral_numbers_stay_integers() {
        assert_eq!(Value::from_json(&json!(5)), Value::Int(5));
        assert_eq!(Value::from_json(&json!(3.14)), Value::Float(3.14));
        assert_eq!(
            Value::from_json(&json!([1, "a", null])),
            Value::List(vec![Value::Int(1), Value::Str("a".into()), Value::Null])
        );
    }
}
