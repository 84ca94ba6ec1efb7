//! Helper functions for working with template data values.
use serde_json::Value;

use crate::{error::RenderError, lexer::token::Operator};

pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(ref s) => s.to_owned(),
        _ => value.to_string(),
    }
}

// Look up a field in an array or object.
pub(crate) fn find_field<'b, S: AsRef<str>>(
    target: &'b Value,
    field: S,
) -> Option<&'b Value> {
    match target {
        Value::Object(ref map) => map.get(field.as_ref()),
        Value::Array(ref list) => {
            field.as_ref().parse::<usize>().ok().and_then(|i| list.get(i))
        }
        _ => None,
    }
}

pub(crate) fn is_truthy(val: &Value) -> bool {
    match val {
        Value::Object(_) => true,
        Value::Array(_) => true,
        Value::String(ref s) => !s.is_empty(),
        Value::Bool(ref b) => *b,
        Value::Number(ref n) => {
            if n.is_i64() {
                n.as_i64().unwrap() != 0
            } else if n.is_u64() {
                n.as_u64().unwrap() != 0
            } else if n.is_f64() {
                n.as_f64().unwrap() != 0.0
            } else {
                false
            }
        }
        _ => false,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn operands(op: Operator, lhs: &Value, rhs: &Value) -> RenderError {
    RenderError::InvalidOperand(
        op.as_str().to_string(),
        format!("cannot apply to {} and {}", lhs, rhs),
    )
}

pub(crate) fn arithmetic(
    op: Operator,
    lhs: &Value,
    rhs: &Value,
) -> Result<Value, RenderError> {
    if let (Operator::Plus, Value::String(a), Value::String(b)) =
        (op, lhs, rhs)
    {
        return Ok(Value::from(format!("{}{}", a, b)));
    }

    // integers stay integers
    if let (Some(a), Some(b)) = (lhs.as_i64(), rhs.as_i64()) {
        let value = match op {
            Operator::Plus => a.checked_add(b),
            Operator::Minus => a.checked_sub(b),
            Operator::Multiply => a.checked_mul(b),
            Operator::Divide => a.checked_div(b),
            Operator::Modulo => a.checked_rem(b),
            _ => return Err(operands(op, lhs, rhs)),
        };
        return value.map(Value::from).ok_or_else(|| {
            RenderError::InvalidOperand(
                op.as_str().to_string(),
                "arithmetic overflow or division by zero".to_string(),
            )
        });
    }

    match (as_f64(lhs), as_f64(rhs)) {
        (Some(a), Some(b)) => {
            let value = match op {
                Operator::Plus => a + b,
                Operator::Minus => a - b,
                Operator::Multiply => a * b,
                Operator::Divide => a / b,
                Operator::Modulo => a % b,
                _ => return Err(operands(op, lhs, rhs)),
            };
            serde_json::Number::from_f64(value)
                .map(Value::Number)
                .ok_or_else(|| {
                    RenderError::InvalidOperand(
                        op.as_str().to_string(),
                        "result is not a representable number".to_string(),
                    )
                })
        }
        _ => Err(operands(op, lhs, rhs)),
    }
}

// Numbers compare as numbers regardless of representation.
fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    match (as_f64(lhs), as_f64(rhs)) {
        (Some(a), Some(b)) => a == b,
        _ => lhs == rhs,
    }
}

pub(crate) fn compare(
    op: Operator,
    lhs: &Value,
    rhs: &Value,
) -> Result<bool, RenderError> {
    match op {
        Operator::Equal => return Ok(loose_eq(lhs, rhs)),
        Operator::NotEqual => return Ok(!loose_eq(lhs, rhs)),
        _ => {}
    }

    if let (Some(a), Some(b)) = (as_f64(lhs), as_f64(rhs)) {
        return Ok(match op {
            Operator::Greater => a > b,
            Operator::GreaterOrEqual => a >= b,
            Operator::Lesser => a < b,
            Operator::LesserOrEqual => a <= b,
            _ => return Err(operands(op, lhs, rhs)),
        });
    }

    if let (Value::String(a), Value::String(b)) = (lhs, rhs) {
        return Ok(match op {
            Operator::Greater => a > b,
            Operator::GreaterOrEqual => a >= b,
            Operator::Lesser => a < b,
            Operator::LesserOrEqual => a <= b,
            _ => return Err(operands(op, lhs, rhs)),
        });
    }

    Err(operands(op, lhs, rhs))
}
