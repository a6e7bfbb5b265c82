//! Runtime error types for the PlanOut evaluator.

use thiserror::Error;

use crate::value::Value;

/// Evaluation failure, or the distinguished `return` signal.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// A mapping node carried an `op` name outside the built-in set.
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    /// An operator node is missing a required field.
    #[error("operator {op}: missing operand '{operand}'")]
    MissingOperand {
        op: &'static str,
        operand: &'static str,
    },

    /// A `get` of a name bound in neither overrides, inputs, nor outputs.
    #[error("no input for key '{0}'")]
    UndefinedVariable(String),

    /// A value had the wrong type for the operation applied to it.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Any other precondition failure (empty choices, bad draw count, …).
    #[error("{0}")]
    Runtime(String),

    /// The `return` operator. Not a failure: `Interpreter::run` converts
    /// this into a successful early exit, recording the truthiness of the
    /// carried value as the `in_experiment` flag.
    #[error("return")]
    Stop(Value),
}
