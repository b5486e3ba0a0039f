use std::cmp::Ordering;

use crate::core::{DbError, Result, Value};

use super::parser::{BinaryOp, Expr};

/// Resolves column references and bind arguments while evaluating.
pub struct EvalContext<'a> {
    pub columns: &'a [String],
    pub row: &'a [Value],
    pub params: &'a [Value],
    pub table: &'a str,
}

impl EvalContext<'_> {
    pub fn evaluate(&self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Param(idx) => self.param(*idx),
            Expr::Column(name) => self.column(name),
            Expr::Default => Err(DbError::ExecutionError(
                "DEFAULT is only allowed in a VALUES list".into(),
            )),
            Expr::Not(inner) => match self.evaluate(inner)? {
                Value::Null => Ok(Value::Null),
                value => Ok(Value::Boolean(!truthy(&value))),
            },
            Expr::Negate(inner) => match self.evaluate(inner)? {
                Value::Integer(i) => Ok(Value::Integer(-i)),
                Value::Float(f) => Ok(Value::Float(-f)),
                Value::Null => Ok(Value::Null),
                other => Err(DbError::TypeMismatch(format!(
                    "cannot negate {}",
                    other.type_name()
                ))),
            },
            Expr::IsNull { expr, negated } => {
                let is_null = self.evaluate(expr)?.is_null();
                Ok(Value::Boolean(is_null != *negated))
            }
            Expr::Binary { left, op, right } => self.binary(left, *op, right),
        }
    }

    /// `true` only when the expression yields a true value; NULL never
    /// matches.
    pub fn matches(&self, expr: Option<&Expr>) -> Result<bool> {
        match expr {
            None => Ok(true),
            Some(expr) => Ok(truthy(&self.evaluate(expr)?)),
        }
    }

    pub fn param(&self, idx: usize) -> Result<Value> {
        self.params.get(idx).cloned().ok_or_else(|| {
            DbError::ExecutionError(format!(
                "statement uses bind argument {} but only {} were given",
                idx + 1,
                self.params.len()
            ))
        })
    }

    fn column(&self, name: &str) -> Result<Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|idx| self.row.get(idx))
            .cloned()
            .ok_or_else(|| DbError::ColumnNotFound(name.to_string(), self.table.to_string()))
    }

    fn binary(&self, left: &Expr, op: BinaryOp, right: &Expr) -> Result<Value> {
        match op {
            BinaryOp::And => {
                if !truthy(&self.evaluate(left)?) {
                    return Ok(Value::Boolean(false));
                }
                Ok(Value::Boolean(truthy(&self.evaluate(right)?)))
            }
            BinaryOp::Or => {
                if truthy(&self.evaluate(left)?) {
                    return Ok(Value::Boolean(true));
                }
                Ok(Value::Boolean(truthy(&self.evaluate(right)?)))
            }
            BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Lt
            | BinaryOp::LtEq
            | BinaryOp::Gt
            | BinaryOp::GtEq => {
                let l = self.evaluate(left)?;
                let r = self.evaluate(right)?;
                compare(&l, &r, op).map(Value::Boolean)
            }
            BinaryOp::Plus | BinaryOp::Minus | BinaryOp::Multiply | BinaryOp::Divide => {
                let l = self.evaluate(left)?;
                let r = self.evaluate(right)?;
                arithmetic(&l, &r, op)
            }
        }
    }
}

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Boolean(b) => *b,
        Value::Integer(i) => *i != 0,
        _ => false,
    }
}

fn compare(left: &Value, right: &Value, op: BinaryOp) -> Result<bool> {
    if left.is_null() || right.is_null() {
        return Ok(false);
    }

    let ordering = match (left, right) {
        // drivers commonly store booleans as integers
        (Value::Boolean(b), Value::Integer(i)) | (Value::Integer(i), Value::Boolean(b)) => {
            return Ok(match op {
                BinaryOp::Eq => (*i != 0) == *b,
                BinaryOp::NotEq => (*i != 0) != *b,
                _ => false,
            });
        }
        _ => left.compare(right)?,
    };

    Ok(match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::NotEq => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::LtEq => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::GtEq => ordering != Ordering::Less,
        _ => false,
    })
}

fn arithmetic(left: &Value, right: &Value, op: BinaryOp) -> Result<Value> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Integer(a), Value::Integer(b)) => {
            let result = match op {
                BinaryOp::Plus => a.checked_add(*b),
                BinaryOp::Minus => a.checked_sub(*b),
                BinaryOp::Multiply => a.checked_mul(*b),
                BinaryOp::Divide if *b == 0 => {
                    return Err(DbError::ExecutionError("division by zero".into()))
                }
                BinaryOp::Divide => a.checked_div(*b),
                _ => None,
            };
            result
                .map(Value::Integer)
                .ok_or_else(|| DbError::ExecutionError(format!("integer overflow in {} {:?} {}", a, op, b)))
        }
        _ => {
            let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
                return Err(DbError::TypeMismatch(format!(
                    "cannot apply {:?} to {} and {}",
                    op,
                    left.type_name(),
                    right.type_name()
                )));
            };
            Ok(Value::Float(match op {
                BinaryOp::Plus => a + b,
                BinaryOp::Minus => a - b,
                BinaryOp::Multiply => a * b,
                _ => a / b,
            }))
        }
    }
}
