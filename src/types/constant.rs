//! Compile-time constant values and their arithmetic.
//!
//! Integers are held as `i128`, which covers every sized Go integer kind;
//! untyped integer results beyond that range become [`Value::Unknown`].
//! Floats are `f64`. Complex constants are not folded.

use crate::types::ty::BasicKind;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i128),
    Float(f64),
    String(String),
    /// A constant whose value could not be computed.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstError {
    DivisionByZero,
    /// The operator does not apply to the operand values.
    Mismatch,
}

impl Value {
    pub fn as_int(&self) -> Option<i128> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 && f.abs() < 1e38 => Some(*f as i128),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    /// Convert to the representation used by `kind`: floats for float
    /// kinds, integers for integer kinds.
    pub fn convert_to(&self, kind: BasicKind) -> Value {
        if kind.is_float() {
            return self.as_float().map_or(Value::Unknown, Value::Float);
        }
        if kind.is_integer() {
            return self.as_int().map_or(Value::Unknown, Value::Int);
        }
        self.clone()
    }

    /// Whether the value can be stored in a variable of type `kind`.
    pub fn representable(&self, kind: BasicKind) -> bool {
        match self {
            Value::Unknown => true,
            Value::Bool(_) => kind.is_boolean(),
            Value::String(_) => kind.is_string(),
            Value::Int(i) => {
                if kind.is_integer() {
                    kind.int_range()
                        .map_or(true, |(lo, hi)| (lo..=hi).contains(i))
                } else {
                    kind.is_float() || kind.is_complex()
                }
            }
            Value::Float(f) => {
                if kind.is_integer() {
                    self.as_int().is_some_and(|i| Value::Int(i).representable(kind))
                } else if kind == BasicKind::Float32 {
                    f.is_finite() && f.abs() <= f32::MAX as f64
                } else {
                    kind.is_float() || kind.is_complex()
                }
            }
        }
    }

    /// Apply a unary operator.
    pub fn unary(op: &str, x: &Value, kind: BasicKind) -> Result<Value, ConstError> {
        let value = match (op, x) {
            (_, Value::Unknown) => Value::Unknown,
            ("+", Value::Int(_) | Value::Float(_)) => x.clone(),
            ("-", Value::Int(i)) => i.checked_neg().map_or(Value::Unknown, Value::Int),
            ("-", Value::Float(f)) => Value::Float(-f),
            ("!", Value::Bool(b)) => Value::Bool(!b),
            ("^", Value::Int(i)) => {
                if kind.is_unsigned() {
                    let (_, hi) = kind.int_range().ok_or(ConstError::Mismatch)?;
                    Value::Int(hi ^ i)
                } else {
                    Value::Int(!i)
                }
            }
            _ => return Err(ConstError::Mismatch),
        };
        Ok(value)
    }

    /// Apply an arithmetic or logical binary operator. `integer` selects
    /// truncated division.
    pub fn binary(op: &str, x: &Value, y: &Value, integer: bool) -> Result<Value, ConstError> {
        if x.is_unknown() || y.is_unknown() {
            return Ok(Value::Unknown);
        }
        match (x, y) {
            (Value::Bool(a), Value::Bool(b)) => match op {
                "&&" => Ok(Value::Bool(*a && *b)),
                "||" => Ok(Value::Bool(*a || *b)),
                _ => Err(ConstError::Mismatch),
            },
            (Value::String(a), Value::String(b)) if op == "+" => Ok(Value::String(format!("{a}{b}"))),
            (Value::Int(a), Value::Int(b)) if integer => int_binary(op, *a, *b),
            _ => {
                let (Some(a), Some(b)) = (x.as_float(), y.as_float()) else {
                    return Err(ConstError::Mismatch);
                };
                if integer {
                    let (Some(a), Some(b)) = (x.as_int(), y.as_int()) else {
                        return Err(ConstError::Mismatch);
                    };
                    return int_binary(op, a, b);
                }
                let value = match op {
                    "+" => a + b,
                    "-" => a - b,
                    "*" => a * b,
                    "/" if b == 0.0 => return Err(ConstError::DivisionByZero),
                    "/" => a / b,
                    _ => return Err(ConstError::Mismatch),
                };
                Ok(Value::Float(value))
            }
        }
    }

    /// Shift `x` by `count` bits.
    pub fn shift(op: &str, x: &Value, count: u32) -> Result<Value, ConstError> {
        match x {
            Value::Unknown => Ok(Value::Unknown),
            _ => {
                let value = x.as_int().ok_or(ConstError::Mismatch)?;
                let shifted = match op {
                    "<<" => value.checked_shl(count).filter(|v| v >> count == value),
                    ">>" => Some(if count >= 127 { value.signum().min(0) } else { value >> count }),
                    _ => return Err(ConstError::Mismatch),
                };
                Ok(shifted.map_or(Value::Unknown, Value::Int))
            }
        }
    }

    /// Evaluate a comparison. `None` when either side is unknown.
    pub fn compare(op: &str, x: &Value, y: &Value) -> Option<bool> {
        use std::cmp::Ordering;

        let ordering = match (x, y) {
            (Value::Bool(a), Value::Bool(b)) => {
                return match op {
                    "==" => Some(a == b),
                    "!=" => Some(a != b),
                    _ => None,
                }
            }
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            _ => {
                let (a, b) = (x.as_float()?, y.as_float()?);
                a.partial_cmp(&b)?
            }
        };
        let result = match op {
            "==" => ordering == Ordering::Equal,
            "!=" => ordering != Ordering::Equal,
            "<" => ordering == Ordering::Less,
            "<=" => ordering != Ordering::Greater,
            ">" => ordering == Ordering::Greater,
            ">=" => ordering != Ordering::Less,
            _ => return None,
        };
        Some(result)
    }
}

fn int_binary(op: &str, a: i128, b: i128) -> Result<Value, ConstError> {
    let value = match op {
        "+" => a.checked_add(b),
        "-" => a.checked_sub(b),
        "*" => a.checked_mul(b),
        "/" | "%" if b == 0 => return Err(ConstError::DivisionByZero),
        "/" => a.checked_div(b),
        "%" => a.checked_rem(b),
        "&" => Some(a & b),
        "|" => Some(a | b),
        "^" => Some(a ^ b),
        "&^" => Some(a & !b),
        _ => return Err(ConstError::Mismatch),
    };
    Ok(value.map_or(Value::Unknown, Value::Int))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Unknown => f.write_str("unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn integer_division_truncates() {
        let v = Value::binary("/", &Value::Int(7), &Value::Int(2), true).unwrap();
        assert_eq!(v, Value::Int(3));
        let v = Value::binary("/", &Value::Int(7), &Value::Int(2), false).unwrap();
        assert_eq!(v, Value::Float(3.5));
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(
            Value::binary("/", &Value::Int(1), &Value::Int(0), true),
            Err(ConstError::DivisionByZero)
        );
        assert_eq!(
            Value::binary("/", &Value::Float(1.0), &Value::Int(0), false),
            Err(ConstError::DivisionByZero)
        );
    }

    #[test]
    fn string_concatenation() {
        let v = Value::binary(
            "+",
            &Value::String("go".into()),
            &Value::String("gen".into()),
            false,
        )
        .unwrap();
        assert_eq!(v, Value::String("gogen".into()));
    }

    #[test]
    fn representability() {
        assert!(Value::Int(255).representable(BasicKind::Uint8));
        assert!(!Value::Int(256).representable(BasicKind::Uint8));
        assert!(!Value::Int(-1).representable(BasicKind::Uint));
        assert!(Value::Float(2.0).representable(BasicKind::Int));
        assert!(!Value::Float(2.5).representable(BasicKind::Int));
        assert!(!Value::String("x".into()).representable(BasicKind::Int));
    }

    #[test]
    fn complement_of_unsigned() {
        let v = Value::unary("^", &Value::Int(0), BasicKind::Uint8).unwrap();
        assert_eq!(v, Value::Int(255));
        let v = Value::unary("^", &Value::Int(0), BasicKind::UntypedInt).unwrap();
        assert_eq!(v, Value::Int(-1));
    }

    #[test]
    fn shifts() {
        assert_eq!(Value::shift("<<", &Value::Int(1), 10), Ok(Value::Int(1024)));
        assert_eq!(Value::shift(">>", &Value::Int(-8), 1), Ok(Value::Int(-4)));
    }

    proptest! {
        #[test]
        fn comparisons_agree_with_integers(a in -1000i128..1000, b in -1000i128..1000) {
            let (x, y) = (Value::Int(a), Value::Int(b));
            prop_assert_eq!(Value::compare("<", &x, &y), Some(a < b));
            prop_assert_eq!(Value::compare("==", &x, &y), Some(a == b));
            prop_assert_eq!(Value::compare(">=", &x, &y), Some(a >= b));
        }

        #[test]
        fn addition_matches_i128(a in any::<i64>(), b in any::<i64>()) {
            let v = Value::binary("+", &Value::Int(a as i128), &Value::Int(b as i128), true).unwrap();
            prop_assert_eq!(v, Value::Int(a as i128 + b as i128));
        }
    }
}
