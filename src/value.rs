//! Numeric stack cell

use crate::error::ErrorKind;
use num_bigint::{BigInt, Sign};
use num_traits::{Signed, ToPrimitive, Zero};
use std::{cmp::Ordering, fmt};

/// A single stack cell. Most values are exact integers of any size; `/`
/// and negative exponents produce reals.
#[derive(Debug, Clone)]
pub enum Value {
    Int(BigInt),
    Real(f64),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(i) => !i.is_zero(),
            Value::Real(r) => *r != 0.0,
        }
    }

    pub fn is_zero(&self) -> bool {
        !self.is_truthy()
    }

    /// Nearest real, infinite for integers beyond the `f64` range.
    pub fn as_f64(&self) -> f64 {
        match self {
            Value::Int(i) => i.to_f64().unwrap_or(f64::NAN),
            Value::Real(r) => *r,
        }
    }

    /// Exact integer or a `TypeError`.
    pub fn as_bigint(&self) -> Result<&BigInt, ErrorKind> {
        match self {
            Value::Int(i) => Ok(i),
            Value::Real(r) => Err(ErrorKind::Type(format!(
                "expected an integer, got the real number {}",
                Value::Real(*r)
            ))),
        }
    }

    /// Exact integer clamped to the `i64` range, for indices and counts.
    pub fn as_clamped_int(&self) -> Result<i64, ErrorKind> {
        let i = self.as_bigint()?;
        Ok(i.to_i64().unwrap_or(match i.sign() {
            Sign::Minus => i64::MIN,
            _ => i64::MAX,
        }))
    }

    /// Character with this value's code point.
    pub fn as_char(&self) -> Result<char, ErrorKind> {
        let code = self.as_bigint()?;
        code.to_u32()
            .and_then(char::from_u32)
            .ok_or_else(|| ErrorKind::Value(format!("{} is not a valid character code", code)))
    }

    /// Real operand for mixed arithmetic.
    fn to_real(&self) -> Result<f64, ErrorKind> {
        let r = self.as_f64();
        match self {
            Value::Int(_) if !r.is_finite() => Err(ErrorKind::Overflow(
                "integer too large to convert to a real number".to_string(),
            )),
            _ => Ok(r),
        }
    }

    pub fn add(self, rhs: Value) -> Result<Value, ErrorKind> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
            (a, b) => Ok(Value::Real(a.to_real()? + b.to_real()?)),
        }
    }

    pub fn sub(self, rhs: Value) -> Result<Value, ErrorKind> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a - b)),
            (a, b) => Ok(Value::Real(a.to_real()? - b.to_real()?)),
        }
    }

    pub fn mul(self, rhs: Value) -> Result<Value, ErrorKind> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a * b)),
            (a, b) => Ok(Value::Real(a.to_real()? * b.to_real()?)),
        }
    }

    /// Real-valued division, `6 / 3` is `2.0`.
    pub fn div(self, rhs: Value) -> Result<Value, ErrorKind> {
        if rhs.is_zero() {
            return Err(ErrorKind::ZeroDivision("division by zero"));
        }
        Ok(Value::Real(self.to_real()? / rhs.to_real()?))
    }

    /// Floored modulo: the result has the sign of the divisor.
    pub fn rem(self, rhs: Value) -> Result<Value, ErrorKind> {
        if rhs.is_zero() {
            return Err(ErrorKind::ZeroDivision("modulo by zero"));
        }
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => {
                let r = a % &b;
                let floored = if !r.is_zero() && r.is_negative() != b.is_negative() {
                    r + b
                } else {
                    r
                };
                Ok(Value::Int(floored))
            }
            (a, b) => {
                let (a, b) = (a.to_real()?, b.to_real()?);
                let r = a % b;
                Ok(Value::Real(if r != 0.0 && (r < 0.0) != (b < 0.0) { r + b } else { r }))
            }
        }
    }

    pub fn pow(self, rhs: Value) -> Result<Value, ErrorKind> {
        match (self, rhs) {
            (Value::Int(base), Value::Int(exp)) if !exp.is_negative() => {
                let exp = exp
                    .to_u32()
                    .ok_or_else(|| ErrorKind::Overflow(format!("exponent {} is too large", exp)))?;
                Ok(Value::Int(base.pow(exp)))
            }
            (base, exp) => {
                if base.is_zero() && exp.as_f64() < 0.0 {
                    return Err(ErrorKind::ZeroDivision(
                        "zero cannot be raised to a negative power",
                    ));
                }
                let result = base.to_real()?.powf(exp.to_real()?);
                if result.is_infinite() {
                    return Err(ErrorKind::Overflow(
                        "real exponentiation result too large".to_string(),
                    ));
                }
                Ok(Value::Real(result))
            }
        }
    }

    pub fn neg(self) -> Value {
        match self {
            Value::Int(i) => Value::Int(-i),
            Value::Real(r) => Value::Real(-r),
        }
    }
}

impl From<BigInt> for Value {
    fn from(i: BigInt) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(BigInt::from(i))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::from(b as i64)
    }
}

/// The character's code point.
impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Int(BigInt::from(c as u32))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (a, b) => a.as_f64() == b.as_f64(),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Real(r) if r.is_finite() && r.fract() == 0.0 => write!(f, "{:.1}", r),
            Value::Real(r) => write!(f, "{}", r),
        }
    }
}
