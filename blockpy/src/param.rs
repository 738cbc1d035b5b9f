use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A block parameter value as the editor stores it: a JSON number or string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

/// Parameter map of one block instance, keyed by input name.
pub type Params = HashMap<String, ParamValue>;

impl ParamValue {
    /// Numeric coercion: numbers pass through, strings are parsed.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            ParamValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(n) => {
                if n.is_finite() && *n == n.floor() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            ParamValue::Text(s) => write!(f, "{}", s),
        }
    }
}
