use std::collections::HashMap;

/// A `(variable, operator, literal)` guard evaluated against the current
/// variable bindings. Used by `repeat_until` and `if` blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub variable: String,
    pub operator: String,
    pub value: f64,
}

impl Condition {
    /// Evaluate against `bindings`. A missing variable reads as 0, and an
    /// unrecognized operator is simply false; conditions never fail.
    pub fn evaluate(&self, bindings: &HashMap<String, f64>) -> bool {
        let lhs = bindings.get(&self.variable).copied().unwrap_or(0.0);
        match self.operator.as_str() {
            ">" => lhs > self.value,
            "<" => lhs < self.value,
            "==" => lhs == self.value,
            "!=" => lhs != self.value,
            _ => false,
        }
    }
}
