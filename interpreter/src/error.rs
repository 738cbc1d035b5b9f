use std::fmt;

/// A fault while executing a single block. Never escapes the engine as an
/// `Err`: `step()` records it into the run state and halts.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecError {
    /// A numeric parameter that neither was a number nor parsed as one.
    BadNumber {
        block_id: String,
        param: String,
        raw: String,
    },
    /// A parameter with no value set and no default in the definition.
    MissingParam { block_id: String, param: String },
    /// `run_to_completion` exhausted its step allowance.
    StepLimit(usize),
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::BadNumber { block_id, param, raw } => {
                write!(
                    f,
                    "block '{}': parameter '{}' is not a number (got \"{}\")",
                    block_id, param, raw
                )
            }
            ExecError::MissingParam { block_id, param } => {
                write!(f, "block '{}': missing parameter '{}'", block_id, param)
            }
            ExecError::StepLimit(max) => {
                write!(f, "program did not finish within {} steps", max)
            }
        }
    }
}

impl std::error::Error for ExecError {}
