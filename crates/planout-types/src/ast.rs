//! AST node types and the canonical ops-tree emitter.
//!
//! The parser produces these nodes; [`Program::to_ops`] serializes them to
//! the structured form the interpreter consumes. Every emitted node is a
//! JSON mapping carrying an `"op"` field plus operator-specific fields,
//! except bare scalars (numbers, strings, booleans, `null`), which emit as
//! themselves.

use serde_json::{json, Map, Value};

/// A complete parsed script: a sequence of top-level statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub seq: Vec<Stmt>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize to the canonical ops tree.
    ///
    /// An empty program emits `{}`.
    pub fn to_ops(&self) -> Value {
        if self.seq.is_empty() {
            return json!({});
        }
        json!({
            "op": "seq",
            "seq": self.seq.iter().map(Stmt::to_ops).collect::<Vec<_>>(),
        })
    }
}

/// A top-level node: assignment, return, if-chain, or switch.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `x = expr;` or `x <- expr;`
    Assign { var: String, value: Expr },
    /// `return expr;`
    Return { value: Expr },
    /// An `if`/`else if`/`else` chain. A trailing `else` is represented as
    /// a final conditional whose condition is the literal `true`.
    Cond { cases: Vec<Conditional> },
    /// `switch { cond => stmt; ... }`
    Switch { cases: Vec<Case> },
}

/// One branch of an if-chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub condition: Expr,
    pub consequence: Vec<Stmt>,
}

/// One case of a switch statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub condition: Expr,
    pub result: Box<Stmt>,
}

impl Stmt {
    pub fn to_ops(&self) -> Value {
        match self {
            Stmt::Assign { var, value } => json!({
                "op": "set",
                "var": var,
                "value": value.to_ops(),
            }),
            Stmt::Return { value } => json!({
                "op": "return",
                "value": value.to_ops(),
            }),
            Stmt::Cond { cases } => json!({
                "op": "cond",
                "cond": cases
                    .iter()
                    .map(|c| {
                        json!({
                            "if": c.condition.to_ops(),
                            "then": {
                                "op": "seq",
                                "seq": c.consequence.iter().map(Stmt::to_ops).collect::<Vec<_>>(),
                            },
                        })
                    })
                    .collect::<Vec<_>>(),
            }),
            Stmt::Switch { cases } => json!({
                "op": "switch",
                "cases": cases
                    .iter()
                    .map(|c| {
                        // The field spelling "condidion" is part of the
                        // published ops-tree format and must not be fixed.
                        json!({
                            "op": "case",
                            "condidion": c.condition.to_ops(),
                            "result": c.result.to_ops(),
                        })
                    })
                    .collect::<Vec<_>>(),
            }),
        }
    }
}

/// Binary operators emitted in `left`/`right` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeftRightOp {
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Equals,
    Div,
    Mod,
}

impl LeftRightOp {
    fn op_name(self) -> &'static str {
        match self {
            LeftRightOp::Less => "<",
            LeftRightOp::LessEq => "<=",
            LeftRightOp::Greater => ">",
            LeftRightOp::GreaterEq => ">=",
            LeftRightOp::Equals => "equals",
            LeftRightOp::Div => "/",
            LeftRightOp::Mod => "%",
        }
    }
}

/// Binary operators emitted in `values` shape (a two-element array).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuesOp {
    Sum,
    Product,
    Or,
    And,
    Coalesce,
}

impl ValuesOp {
    fn op_name(self) -> &'static str {
        match self {
            ValuesOp::Sum => "sum",
            ValuesOp::Product => "product",
            ValuesOp::Or => "or",
            ValuesOp::And => "and",
            ValuesOp::Coalesce => "coalesce",
        }
    }
}

/// Arguments of a function-call expression.
///
/// Positional and named arguments cannot be mixed.
#[derive(Debug, Clone, PartialEq)]
pub enum CallArgs {
    None,
    One(Box<Expr>),
    Many(Vec<Expr>),
    Named(Vec<(String, Expr)>),
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Identifier reference.
    Get(String),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
    /// A pre-parsed `@…` JSON literal.
    Json(Value),
    /// `[a, b, c]`
    Array(Vec<Expr>),
    /// `base[index]`
    Index { base: Box<Expr>, index: Box<Expr> },
    /// `!expr`
    Not(Box<Expr>),
    /// `-expr` (unless folded into a numeric literal at parse time)
    Negative(Box<Expr>),
    /// `< <= > >= == / %`
    LeftRight {
        op: LeftRightOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `+ * || && ??` (and lowered `-`)
    Values { op: ValuesOp, values: Vec<Expr> },
    /// `name(...)`
    Call { name: String, args: CallArgs },
}

impl Expr {
    pub fn to_ops(&self) -> Value {
        match self {
            Expr::Get(name) => json!({ "op": "get", "var": name }),
            Expr::Int(n) => json!(n),
            Expr::Float(f) => json!(f),
            Expr::Str(s) => json!(s),
            Expr::Bool(b) => json!(b),
            Expr::Null => Value::Null,
            Expr::Json(value) => json!({ "op": "literal", "value": value }),
            Expr::Array(values) => json!({
                "op": "array",
                "values": values.iter().map(Expr::to_ops).collect::<Vec<_>>(),
            }),
            Expr::Index { base, index } => json!({
                "op": "index",
                "base": base.to_ops(),
                "index": index.to_ops(),
            }),
            Expr::Not(value) => json!({ "op": "not", "value": value.to_ops() }),
            Expr::Negative(value) => json!({ "op": "negative", "value": value.to_ops() }),
            Expr::LeftRight { op, left, right } => json!({
                "op": op.op_name(),
                "left": left.to_ops(),
                "right": right.to_ops(),
            }),
            Expr::Values { op, values } => json!({
                "op": op.op_name(),
                "values": values.iter().map(Expr::to_ops).collect::<Vec<_>>(),
            }),
            Expr::Call { name, args } => match args {
                CallArgs::None => json!({ "op": name }),
                CallArgs::One(arg) => json!({ "op": name, "value": arg.to_ops() }),
                CallArgs::Many(args) => json!({
                    "op": name,
                    "values": args.iter().map(Expr::to_ops).collect::<Vec<_>>(),
                }),
                CallArgs::Named(args) => {
                    let mut map = Map::new();
                    for (key, value) in args {
                        map.insert(key.clone(), value.to_ops());
                    }
                    map.insert("op".into(), json!(name));
                    Value::Object(map)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_program_emits_empty_object() {
        assert_eq!(Program::new().to_ops(), json!({}));
    }

    #[test]
    fn test_assignment_emission() {
        let prog = Program {
            seq: vec![Stmt::Assign {
                var: "x".into(),
                value: Expr::Int(5),
            }],
        };
        assert_eq!(
            prog.to_ops(),
            json!({"op":"seq","seq":[{"op":"set","var":"x","value":5}]})
        );
    }

    #[test]
    fn test_switch_case_field_spelling() {
        let stmt = Stmt::Switch {
            cases: vec![Case {
                condition: Expr::Bool(true),
                result: Box::new(Stmt::Return {
                    value: Expr::Int(1),
                }),
            }],
        };
        let ops = stmt.to_ops();
        assert!(ops["cases"][0].get("condidion").is_some());
        assert!(ops["cases"][0].get("condition").is_none());
    }

    #[test]
    fn test_null_emits_bare() {
        assert_eq!(Expr::Null.to_ops(), Value::Null);
    }

    #[test]
    fn test_call_shapes() {
        let none = Expr::Call {
            name: "f".into(),
            args: CallArgs::None,
        };
        assert_eq!(none.to_ops(), json!({"op":"f"}));

        let one = Expr::Call {
            name: "f".into(),
            args: CallArgs::One(Box::new(Expr::Int(3))),
        };
        assert_eq!(one.to_ops(), json!({"op":"f","value":3}));

        let many = Expr::Call {
            name: "f".into(),
            args: CallArgs::Many(vec![Expr::Int(1), Expr::Str("2".into())]),
        };
        assert_eq!(many.to_ops(), json!({"op":"f","values":[1,"2"]}));

        let named = Expr::Call {
            name: "f".into(),
            args: CallArgs::Named(vec![("a".into(), Expr::Int(1))]),
        };
        assert_eq!(named.to_ops(), json!({"op":"f","a":1}));
    }

    #[test]
    fn test_angle_brackets_not_escaped() {
        let expr = Expr::LeftRight {
            op: LeftRightOp::Less,
            left: Box::new(Expr::Int(1)),
            right: Box::new(Expr::Int(2)),
        };
        let text = serde_json::to_string(&expr.to_ops()).unwrap();
        assert!(text.contains("\"<\""));
    }
}
