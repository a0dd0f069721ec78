//! JSON numbers with mathematical (not representational) equality.

use std::cmp::Ordering;
use std::fmt;

/// Relative tolerance used when testing float quotients for integrality.
const MULTIPLE_OF_TOLERANCE: f64 = 1e-9;

/// A JSON number.
///
/// Integers that fit `i64`/`u64` are kept exact; everything else is an
/// `f64`. Comparisons treat `1` and `1.0` as the same number.
#[derive(Debug, Clone, Copy)]
pub struct Number(Repr);

#[derive(Debug, Clone, Copy)]
enum Repr {
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl Number {
    /// Create a number from a float.
    pub fn from_f64(value: f64) -> Self {
        Self(Repr::Float(value))
    }

    /// The value as `f64` (possibly lossy for very large integers).
    pub fn as_f64(&self) -> f64 {
        match self.0 {
            Repr::Int(i) => i as f64,
            Repr::UInt(u) => u as f64,
            Repr::Float(f) => f,
        }
    }

    /// The value as `i64`, when it is an integer in range.
    pub fn as_i64(&self) -> Option<i64> {
        match self.0 {
            Repr::Int(i) => Some(i),
            Repr::UInt(u) => i64::try_from(u).ok(),
            Repr::Float(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                Some(f as i64)
            }
            Repr::Float(_) => None,
        }
    }

    /// The value as `u64`, when it is a non-negative integer in range.
    pub fn as_u64(&self) -> Option<u64> {
        match self.0 {
            Repr::Int(i) => u64::try_from(i).ok(),
            Repr::UInt(u) => Some(u),
            Repr::Float(f) if f.fract() == 0.0 && f >= 0.0 && f <= u64::MAX as f64 => {
                Some(f as u64)
            }
            Repr::Float(_) => None,
        }
    }

    /// True when the number has no fractional part (`1.0` counts).
    pub fn is_integer(&self) -> bool {
        match self.0 {
            Repr::Int(_) | Repr::UInt(_) => true,
            Repr::Float(f) => f.is_finite() && f.fract() == 0.0,
        }
    }

    /// True when `self` is an integer multiple of `divisor`.
    ///
    /// Exact for integers; for floats the quotient is tested for
    /// integrality with a small relative tolerance. An overflowing quotient
    /// is never a multiple.
    pub fn is_multiple_of(&self, divisor: &Number) -> bool {
        if let (Some(value), Some(div)) = (self.as_exact_int(), divisor.as_exact_int()) {
            return div != 0 && value % div == 0;
        }
        let divisor = divisor.as_f64();
        if divisor == 0.0 {
            return false;
        }
        let quotient = self.as_f64() / divisor;
        if !quotient.is_finite() {
            return false;
        }
        (quotient - quotient.round()).abs() <= MULTIPLE_OF_TOLERANCE * quotient.abs().max(1.0)
    }

    fn as_exact_int(&self) -> Option<i128> {
        match self.0 {
            Repr::Int(i) => Some(i128::from(i)),
            Repr::UInt(u) => Some(i128::from(u)),
            Repr::Float(_) => None,
        }
    }

    /// Convert to a `serde_json::Number`. Non-finite floats have no JSON
    /// representation and become `None`.
    pub fn to_serde(&self) -> Option<serde_json::Number> {
        match self.0 {
            Repr::Int(i) => Some(i.into()),
            Repr::UInt(u) => Some(u.into()),
            Repr::Float(f) => serde_json::Number::from_f64(f),
        }
    }
}

impl From<&serde_json::Number> for Number {
    fn from(n: &serde_json::Number) -> Self {
        if let Some(i) = n.as_i64() {
            Number(Repr::Int(i))
        } else if let Some(u) = n.as_u64() {
            Number(Repr::UInt(u))
        } else {
            Number(Repr::Float(n.as_f64().unwrap_or(f64::NAN)))
        }
    }
}

impl From<i64> for Number {
    fn from(i: i64) -> Self {
        Number(Repr::Int(i))
    }
}

impl From<u64> for Number {
    fn from(u: u64) -> Self {
        Number(Repr::UInt(u))
    }
}

impl From<f64> for Number {
    fn from(f: f64) -> Self {
        Number(Repr::Float(f))
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.as_exact_int(), other.as_exact_int()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Repr::Int(i) => write!(f, "{}", i),
            Repr::UInt(u) => write!(f, "{}", u),
            Repr::Float(x) => match serde_json::Number::from_f64(x) {
                Some(n) => write!(f, "{}", n),
                None => write!(f, "{}", x),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_and_float_compare_equal() {
        assert_eq!(Number::from(1i64), Number::from(1.0));
        assert_ne!(Number::from(1i64), Number::from(1.5));
        assert!(Number::from(-1i64) < Number::from(u64::MAX));
    }

    #[test]
    fn test_is_integer() {
        assert!(Number::from(3i64).is_integer());
        assert!(Number::from(3.0).is_integer());
        assert!(!Number::from(3.5).is_integer());
    }

    #[test]
    fn test_multiple_of_integers() {
        assert!(Number::from(10i64).is_multiple_of(&Number::from(2i64)));
        assert!(!Number::from(7i64).is_multiple_of(&Number::from(2i64)));
        assert!(!Number::from(7i64).is_multiple_of(&Number::from(0i64)));
    }

    #[test]
    fn test_multiple_of_floats() {
        assert!(Number::from(4.5).is_multiple_of(&Number::from(1.5)));
        assert!(!Number::from(35i64).is_multiple_of(&Number::from(1.5)));
        assert!(Number::from(0.0075).is_multiple_of(&Number::from(0.0001)));
        assert!(!Number::from(0.00751).is_multiple_of(&Number::from(0.0001)));
    }

    #[test]
    fn test_multiple_of_overflowing_quotient() {
        assert!(!Number::from(1e308).is_multiple_of(&Number::from(0.123456789)));
    }
}
