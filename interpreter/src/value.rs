use std::fmt;

/// A script-interpreter value. The script language only has numbers and
/// strings; everything else in a script is structure, not data.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Str(String),
}

impl Value {
    /// Numeric coercion: numbers pass through, numeric-looking strings parse.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Str(s) => s.trim().parse().ok(),
        }
    }

    /// Loose equality in the source language's style: string-to-string
    /// compares text, anything involving a number compares numerically
    /// (so `5 == "5"` holds).
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Loose `<`: lexicographic between two strings, numeric otherwise.
    /// Comparisons that coerce to nothing are false, never an error.
    pub fn loose_lt(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a < b,
            _ => matches!(
                (self.as_number(), other.as_number()),
                (Some(a), Some(b)) if a < b
            ),
        }
    }

    /// Loose `>`, mirror of [`Value::loose_lt`].
    pub fn loose_gt(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a > b,
            _ => matches!(
                (self.as_number(), other.as_number()),
                (Some(a), Some(b)) if a > b
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                if n.is_finite() && *n == n.floor() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}
