use std::fmt::{Display, Formatter};

use crate::bytecode::Operation;

/// The contents of the accumulator or of a storage cell. Discrete points hold booleans; words,
/// timers and arithmetic results hold integers.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Value {
  Bool(bool),
  Int(i64),
}

impl Default for Value {
  fn default() -> Self {
    Value::Bool(false)
  }
}

impl Value {
  pub fn is_true(self) -> bool {
    match self {
      Value::Bool(b) => b,
      Value::Int(i)  => i != 0
    }
  }

  /// The numeric view of the value; booleans are 0 or 1.
  pub fn as_int(self) -> i64 {
    match self {
      Value::Bool(b) => b as i64,
      Value::Int(i)  => i
    }
  }

  /// Boolean negation for booleans, bitwise complement for integers.
  pub fn negate(self) -> Value {
    match self {
      Value::Bool(b) => Value::Bool(!b),
      Value::Int(i)  => Value::Int(!i)
    }
  }

  pub fn negate_if(self, condition: bool) -> Value {
    match condition {
      true  => self.negate(),
      false => self
    }
  }

  /**
    Combines `self` (the accumulator) with `rhs` (the operand) under one of the binary
    operations. Returns `None` for division by zero and for operations that are not binary.

    Logic on two booleans stays boolean; any other logic is bitwise on the numeric views.
    Arithmetic wraps.
  */
  pub fn combine(self, operation: Operation, rhs: Value) -> Option<Value> {
    let (a, b) = (self.as_int(), rhs.as_int());

    let result =
      match (operation, self, rhs) {

        (Operation::And, Value::Bool(x), Value::Bool(y)) => Value::Bool(x & y),
        (Operation::Or,  Value::Bool(x), Value::Bool(y)) => Value::Bool(x | y),
        (Operation::Xor, Value::Bool(x), Value::Bool(y)) => Value::Bool(x ^ y),
        (Operation::And, _, _) => Value::Int(a & b),
        (Operation::Or,  _, _) => Value::Int(a | b),
        (Operation::Xor, _, _) => Value::Int(a ^ b),

        (Operation::Add, _, _) => Value::Int(a.wrapping_add(b)),
        (Operation::Sub, _, _) => Value::Int(a.wrapping_sub(b)),
        (Operation::Mul, _, _) => Value::Int(a.wrapping_mul(b)),
        (Operation::Div, _, _) => {
          if b == 0 {
            return None;
          }
          Value::Int(a.wrapping_div(b))
        }

        (Operation::Gt, _, _) => Value::Bool(a >  b),
        (Operation::Ge, _, _) => Value::Bool(a >= b),
        (Operation::Eq, _, _) => Value::Bool(a == b),
        (Operation::Ne, _, _) => Value::Bool(a != b),
        (Operation::Le, _, _) => Value::Bool(a <= b),
        (Operation::Lt, _, _) => Value::Bool(a <  b),

        _ => return None
      };

    Some(result)
  }
}

impl From<bool> for Value {
  fn from(b: bool) -> Self {
    Value::Bool(b)
  }
}

impl From<i64> for Value {
  fn from(i: i64) -> Self {
    Value::Int(i)
  }
}

impl Display for Value {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Value::Bool(b) => write!(f, "{}", *b as u8),
      Value::Int(i)  => write!(f, "{}", i)
    }
  }
}
