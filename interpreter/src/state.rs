use std::collections::HashMap;

/// Snapshot of the block program engine's observable state.
///
/// The engine hands out clones only; callers cannot corrupt engine
/// internals through a snapshot. `is_finished` and `error` are terminal:
/// once either is set, further `step()` calls return the frozen state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunState {
    pub variables: HashMap<String, f64>,
    pub console_output: Vec<String>,
    /// Id of the block most recently executed, for editor highlighting.
    pub current_block_id: Option<String>,
    pub is_running: bool,
    pub is_finished: bool,
    pub error: Option<String>,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        self.is_finished || self.error.is_some()
    }
}
