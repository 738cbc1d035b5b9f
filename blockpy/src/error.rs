use std::fmt;

/// Failure to load a program document.
#[derive(Debug)]
pub enum LoadError {
    Io(String),
    Json(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(msg) => write!(f, "I/O error: {}", msg),
            LoadError::Json(msg) => write!(f, "invalid program document: {}", msg),
        }
    }
}

impl std::error::Error for LoadError {}

/// A structural problem in a loaded program, anchored to the block it
/// was found on.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidateError {
    pub block_id: String,
    pub message: String,
}

impl ValidateError {
    pub fn new(block_id: &str, message: impl Into<String>) -> Self {
        ValidateError {
            block_id: block_id.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block '{}': {}", self.block_id, self.message)
    }
}

impl std::error::Error for ValidateError {}
