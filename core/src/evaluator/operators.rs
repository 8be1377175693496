//! Binary, comparison and unary operator implementations.
//!
//! Operands are dynamically typed: numbers are promoted along
//! `Integer < Long < Double`, and `==` compares across types the way the
//! coercion registry would convert them.

use core::cmp::Ordering;

use crate::coercion::registry;
use crate::evaluator::RuntimeError;
use crate::parser::{BinaryOp, ComparisonOp};
use crate::types::builtins;
use crate::values::Value;

fn invalid(op: &str, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::InvalidOperands {
        op: op.into(),
        left: left.type_name(),
        right: right.type_name(),
    }
}

/// Evaluate a binary operation on two integers.
///
/// Uses wrapping arithmetic to prevent panics on overflow.
/// Division by zero returns an error.
pub(super) fn eval_binary_int(op: BinaryOp, left: i64, right: i64) -> Result<i64, RuntimeError> {
    match op {
        BinaryOp::Add => Ok(left.wrapping_add(right)),
        BinaryOp::Sub => Ok(left.wrapping_sub(right)),
        BinaryOp::Mul => Ok(left.wrapping_mul(right)),
        BinaryOp::Div if right == 0 => Err(RuntimeError::DivisionByZero),
        BinaryOp::Rem if right == 0 => Err(RuntimeError::DivisionByZero),
        // wrapping_div handles i64::MIN / -1
        BinaryOp::Div => Ok(left.wrapping_div(right)),
        BinaryOp::Rem => Ok(left.wrapping_rem(right)),
    }
}

/// Evaluate a binary operation on two floats.
///
/// Follows IEEE 754 semantics (produces inf/nan rather than panicking).
pub(super) fn eval_binary_float(op: BinaryOp, left: f64, right: f64) -> f64 {
    match op {
        BinaryOp::Add => left + right,
        BinaryOp::Sub => left - right,
        BinaryOp::Mul => left * right,
        BinaryOp::Div => left / right,
        BinaryOp::Rem => left % right,
    }
}

/// `+ - * / %` on arbitrary values. `+` concatenates when either side is a
/// string.
pub(super) fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, RuntimeError> {
    if op == BinaryOp::Add && (matches!(left, Value::Str(_)) || matches!(right, Value::Str(_))) {
        return Ok(Value::str(ecow::eco_format!("{left}{right}")));
    }
    match (&left, &right) {
        (Value::Int(l), Value::Int(r)) => {
            // Computed in i64 so `Integer.MIN_VALUE / -1` wraps like Java.
            let result = eval_binary_int(op, *l as i64, *r as i64)?;
            Ok(Value::Int(result as i32))
        }
        (Value::Double(_), _) | (_, Value::Double(_)) if left.is_numeric() && right.is_numeric() => {
            let (l, r) = (left.as_f64(), right.as_f64());
            match (l, r) {
                (Some(l), Some(r)) => Ok(Value::Double(eval_binary_float(op, l, r))),
                _ => Err(invalid(op.symbol(), &left, &right)),
            }
        }
        _ => match (left.as_i64(), right.as_i64()) {
            (Some(l), Some(r)) => Ok(Value::Long(eval_binary_int(op, l, r)?)),
            _ => Err(invalid(op.symbol(), &left, &right)),
        },
    }
}

pub(super) fn negate(value: Value) -> Result<Value, RuntimeError> {
    match value {
        Value::Int(i) => Ok(Value::Int(i.wrapping_neg())),
        Value::Long(l) => Ok(Value::Long(l.wrapping_neg())),
        Value::Double(d) => Ok(Value::Double(-d)),
        other => Err(invalid("-", &other, &other)),
    }
}

fn numeric_eq(left: &Value, right: &Value) -> Option<bool> {
    if !left.is_numeric() || !right.is_numeric() {
        return None;
    }
    match (left.as_i64(), right.as_i64()) {
        (Some(l), Some(r)) => Some(l == r),
        _ => Some(left.as_f64()? == right.as_f64()?),
    }
}

/// Loose equality: numbers compare by value across kinds, and a string
/// compares equal to a boolean or number it converts to.
pub(super) fn loose_eq(left: &Value, right: &Value) -> bool {
    if let Some(eq) = numeric_eq(left, right) {
        return eq;
    }
    match (left, right) {
        (Value::Str(_), Value::Bool(_)) | (Value::Bool(_), Value::Str(_)) => {
            let (text, flag) = if left.as_str().is_some() {
                (left, right)
            } else {
                (right, left)
            };
            registry()
                .convert(text.clone(), builtins::boolean())
                .is_ok_and(|converted| &converted == flag)
        }
        (Value::Str(s), number) | (number, Value::Str(s)) if number.is_numeric() => {
            match (s.trim().parse::<f64>(), number.as_f64()) {
                (Ok(parsed), Some(n)) => parsed == n,
                _ => false,
            }
        }
        _ => left == right,
    }
}

fn ordering(left: &Value, right: &Value) -> Option<Ordering> {
    if left.is_numeric() && right.is_numeric() {
        return match (left.as_i64(), right.as_i64()) {
            (Some(l), Some(r)) => Some(l.cmp(&r)),
            _ => left.as_f64()?.partial_cmp(&right.as_f64()?),
        };
    }
    match (left, right) {
        (Value::Str(l), Value::Str(r)) => Some(l.as_str().cmp(r.as_str())),
        _ => None,
    }
}

pub(super) fn compare(op: ComparisonOp, left: &Value, right: &Value) -> Result<bool, RuntimeError> {
    match op {
        ComparisonOp::Eq => return Ok(loose_eq(left, right)),
        ComparisonOp::Neq => return Ok(!loose_eq(left, right)),
        _ => {}
    }
    let numeric_nan = [left, right]
        .iter()
        .any(|v| matches!(v, Value::Double(d) if d.is_nan()));
    if numeric_nan && left.is_numeric() && right.is_numeric() {
        return Ok(false);
    }
    let ordering = ordering(left, right).ok_or_else(|| invalid(op.symbol(), left, right))?;
    Ok(match op {
        ComparisonOp::Lt => ordering == Ordering::Less,
        ComparisonOp::Le => ordering != Ordering::Greater,
        ComparisonOp::Gt => ordering == Ordering::Greater,
        ComparisonOp::Ge => ordering != Ordering::Less,
        ComparisonOp::Eq | ComparisonOp::Neq => false,
    })
}
