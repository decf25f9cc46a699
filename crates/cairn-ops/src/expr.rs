//! Expressions embedded in update data.
//!
//! An expression is a single-key object whose key names an operator
//! (`{"$not": "$existing.done"}`), or a string of the form
//! `"$existing.<path>"`. Anything else is a literal; arrays and multi-key
//! objects are evaluated element-wise.

use serde_json::{Map, Number, Value};

/// Expression evaluation failures.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EvalError {
    #[error("unknown operator {0}")]
    UnknownOperator(String),

    #[error("{op} takes {expected} argument(s), got {actual}")]
    Arity {
        op: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{op} expects {expected}, got {got}")]
    TypeMismatch {
        op: &'static str,
        expected: &'static str,
        got: Value,
    },
}

/// Evaluates an expression against a context value.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, expr: &Value, ctx: &Value) -> Result<Value, EvalError>;
}

const EXISTING_PREFIX: &str = "$existing.";

/// Small built-in evaluator: `$not`, `$and`, `$or`, `$eq`, `$add`,
/// `$concat`, `$if`, `$get` and the `"$existing.<path>"` shorthand.
#[derive(Clone, Copy, Debug, Default)]
pub struct BasicEvaluator;

impl Evaluator for BasicEvaluator {
    fn evaluate(&self, expr: &Value, ctx: &Value) -> Result<Value, EvalError> {
        match expr {
            Value::String(s) => match s.strip_prefix(EXISTING_PREFIX) {
                Some(path) => Ok(lookup(ctx.get("existing").unwrap_or(&Value::Null), path)),
                None => Ok(expr.clone()),
            },
            Value::Array(items) => items
                .iter()
                .map(|item| self.evaluate(item, ctx))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => match single_operator(map) {
                Some((op, arg)) => self.apply(op, arg, ctx),
                None => map
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), self.evaluate(v, ctx)?)))
                    .collect::<Result<Map<_, _>, EvalError>>()
                    .map(Value::Object),
            },
            _ => Ok(expr.clone()),
        }
    }
}

impl BasicEvaluator {
    fn apply(&self, op: &str, arg: &Value, ctx: &Value) -> Result<Value, EvalError> {
        match op {
            "$not" => {
                let value = self.evaluate(arg, ctx)?;
                Ok(Value::Bool(!truthy("$not", &value)?))
            }
            "$and" => {
                for value in self.args("$and", arg, ctx)? {
                    if !truthy("$and", &value)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            "$or" => {
                for value in self.args("$or", arg, ctx)? {
                    if truthy("$or", &value)? {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            "$eq" => {
                let values = self.args("$eq", arg, ctx)?;
                expect_arity("$eq", 2, values.len())?;
                Ok(Value::Bool(values[0] == values[1]))
            }
            "$add" => add(self.args("$add", arg, ctx)?),
            "$concat" => {
                let mut out = String::new();
                for value in self.args("$concat", arg, ctx)? {
                    match value {
                        Value::String(s) => out.push_str(&s),
                        Value::Number(n) => out.push_str(&n.to_string()),
                        Value::Bool(b) => out.push_str(&b.to_string()),
                        Value::Null => {}
                        other => {
                            return Err(EvalError::TypeMismatch {
                                op: "$concat",
                                expected: "scalars",
                                got: other,
                            })
                        }
                    }
                }
                Ok(Value::String(out))
            }
            "$if" => {
                let branches = arg.as_array().ok_or_else(|| EvalError::TypeMismatch {
                    op: "$if",
                    expected: "[condition, then, else]",
                    got: arg.clone(),
                })?;
                expect_arity("$if", 3, branches.len())?;
                let condition = self.evaluate(&branches[0], ctx)?;
                let branch = if truthy("$if", &condition)? { &branches[1] } else { &branches[2] };
                self.evaluate(branch, ctx)
            }
            "$get" => {
                let path = self.evaluate(arg, ctx)?;
                match path {
                    Value::String(path) => Ok(lookup(ctx, &path)),
                    other => Err(EvalError::TypeMismatch {
                        op: "$get",
                        expected: "a path string",
                        got: other,
                    }),
                }
            }
            other => Err(EvalError::UnknownOperator(other.to_string())),
        }
    }

    fn args(&self, op: &'static str, arg: &Value, ctx: &Value) -> Result<Vec<Value>, EvalError> {
        match arg {
            Value::Array(items) => items.iter().map(|item| self.evaluate(item, ctx)).collect(),
            other => Err(EvalError::TypeMismatch {
                op,
                expected: "an argument array",
                got: other.clone(),
            }),
        }
    }
}

fn single_operator(map: &Map<String, Value>) -> Option<(&str, &Value)> {
    if map.len() != 1 {
        return None;
    }
    map.iter()
        .next()
        .filter(|(k, _)| k.starts_with('$'))
        .map(|(k, v)| (k.as_str(), v))
}

fn expect_arity(op: &'static str, expected: usize, actual: usize) -> Result<(), EvalError> {
    if expected == actual {
        Ok(())
    } else {
        Err(EvalError::Arity {
            op,
            expected,
            actual,
        })
    }
}

/// Booleans, with a missing value (`null`) read as false.
fn truthy(op: &'static str, value: &Value) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Null => Ok(false),
        other => Err(EvalError::TypeMismatch {
            op,
            expected: "a boolean",
            got: other.clone(),
        }),
    }
}

fn add(values: Vec<Value>) -> Result<Value, EvalError> {
    let mut int_sum: i64 = 0;
    let mut float_sum: f64 = 0.0;
    let mut all_int = true;
    for value in values {
        let Value::Number(n) = &value else {
            return Err(EvalError::TypeMismatch {
                op: "$add",
                expected: "numbers",
                got: value,
            });
        };
        match n.as_i64() {
            Some(i) if all_int => match int_sum.checked_add(i) {
                Some(sum) => int_sum = sum,
                None => {
                    all_int = false;
                    float_sum = int_sum as f64 + i as f64;
                }
            },
            _ => {
                if all_int {
                    all_int = false;
                    float_sum = int_sum as f64;
                }
                float_sum += n.as_f64().unwrap_or_default();
            }
        }
    }
    if all_int {
        return Ok(Value::Number(int_sum.into()));
    }
    Number::from_f64(float_sum)
        .map(Value::Number)
        .ok_or(EvalError::TypeMismatch {
            op: "$add",
            expected: "a finite sum",
            got: Value::Null,
        })
}

/// Dot-separated path lookup; numeric segments index arrays. Missing paths
/// yield `null`.
fn lookup(root: &Value, path: &str) -> Value {
    let mut current = root;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return Value::Null,
        }
    }
    current.clone()
}
