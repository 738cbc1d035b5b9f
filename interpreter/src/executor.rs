use blockpy::Program;
use blockpy::block::BlockInstance;

use crate::condition::Condition;
use crate::error::ExecError;
use crate::state::RunState;
use crate::value::Value;

/// Loop bookkeeping carried by a stack frame.
#[derive(Debug)]
enum FrameKind {
    /// The root list or a one-shot `if` body.
    Body,
    /// A `repeat` body: rewinds until `iteration` reaches `total`.
    Counted { iteration: i64, total: i64 },
    /// A `repeat_until` body: rewinds while the stop condition is unmet.
    Until(Condition),
}

/// One activation record: a cursor into one sibling list of the program
/// tree. Frames borrow the immutable AST; the engine never copies blocks.
#[derive(Debug)]
struct Frame<'p> {
    position: usize,
    children: &'p [BlockInstance],
    kind: FrameKind,
}

/// Resumable single-step interpreter over a block program.
///
/// Each `step()` applies exactly one block effect or one stack transition,
/// so an editor can drive execution block-by-block and highlight
/// `current_block_id` between calls. All outcomes, including faults, are
/// data on the [`RunState`] snapshot; `step()` never fails.
pub struct Executor<'p> {
    program: &'p Program,
    state: RunState,
    stack: Vec<Frame<'p>>,
}

impl<'p> Executor<'p> {
    pub fn new(program: &'p Program) -> Self {
        let mut executor = Executor {
            program,
            state: RunState::default(),
            stack: Vec::new(),
        };
        executor.reset();
        executor
    }

    /// Discard all run state and rewind to the first root block.
    pub fn reset(&mut self) {
        let program = self.program;
        self.state = RunState::default();
        self.stack.clear();
        self.stack.push(Frame {
            position: 0,
            children: &program.blocks,
            kind: FrameKind::Body,
        });
    }

    /// Defensive snapshot; callers cannot corrupt engine state through it.
    pub fn state(&self) -> RunState {
        self.state.clone()
    }

    /// Advance one unit of work and return the resulting snapshot.
    /// A no-op once the state is terminal.
    pub fn step(&mut self) -> RunState {
        if self.state.is_terminal() {
            return self.state.clone();
        }
        self.state.is_running = true;

        // Unwind frames whose sibling list is exhausted: loop frames rewind
        // to position 0 when they have passes left, everything else pops.
        while let Some(frame) = self.stack.last_mut() {
            if frame.position < frame.children.len() {
                break;
            }
            match &mut frame.kind {
                FrameKind::Counted { iteration, total } => {
                    *iteration += 1;
                    if *iteration < *total {
                        frame.position = 0;
                        continue;
                    }
                }
                FrameKind::Until(stop) => {
                    if !stop.evaluate(&self.state.variables) {
                        frame.position = 0;
                        continue;
                    }
                }
                FrameKind::Body => {}
            }
            self.stack.pop();
        }

        // An empty stack is the terminal success state.
        if self.stack.is_empty() {
            self.finish();
            return self.state.clone();
        }

        // The frame's slice borrows the program, not the engine, so the
        // block reference stays valid while `execute` mutates the stack.
        let active = self.stack.len() - 1;
        let children = self.stack[active].children;
        let block = &children[self.stack[active].position];
        self.state.current_block_id = Some(block.id.clone());

        match self.execute(block) {
            // Advance past the block even when it pushed a child frame, so
            // popping that frame resumes at the next sibling.
            Ok(()) => self.stack[active].position += 1,
            Err(e) => {
                self.state.error = Some(e.to_string());
                self.state.is_running = false;
            }
        }
        self.state.clone()
    }

    /// Step until the program reaches a terminal state, up to `max_steps`.
    /// Exhausting the allowance is recorded as a state error.
    pub fn run_to_completion(&mut self, max_steps: usize) -> RunState {
        for _ in 0..max_steps {
            self.step();
            if self.state.is_terminal() {
                return self.state.clone();
            }
        }
        self.state.error = Some(ExecError::StepLimit(max_steps).to_string());
        self.state.is_running = false;
        self.state.clone()
    }

    fn finish(&mut self) {
        self.state.is_finished = true;
        self.state.is_running = false;
        self.state.current_block_id = None;
    }

    fn execute(&mut self, block: &'p BlockInstance) -> Result<(), ExecError> {
        match block.block_type.as_str() {
            "start" => {
                self.state.console_output.push("> Program Started".to_string());
            }
            "print" => {
                let message = text_param(block, "message")?;
                // a message naming a variable prints its value, anything
                // else prints verbatim
                let line = match self.state.variables.get(&message) {
                    Some(value) => format!("> {}", Value::Number(*value)),
                    None => format!("> {}", message),
                };
                self.state.console_output.push(line);
            }
            "set_var" => {
                let name = text_param(block, "name")?;
                let value = number_param(block, "value")?;
                self.state.variables.insert(name, value);
            }
            "change_var" => {
                let name = text_param(block, "name")?;
                let value = number_param(block, "value")?;
                *self.state.variables.entry(name).or_insert(0.0) += value;
            }
            "wait" => {
                let seconds = number_param(block, "seconds")?;
                self.state
                    .console_output
                    .push(format!("> Waiting {}s...", Value::Number(seconds)));
            }
            "move" => {
                let direction = text_param(block, "direction")?;
                self.state
                    .console_output
                    .push(format!("> Avatar moving {}", direction));
            }
            "repeat" => {
                if !block.children.is_empty() {
                    let times = block.param("times").and_then(|v| v.as_number());
                    // unset, unparsable and zero all fall back to one pass
                    let total = match times {
                        Some(n) if n.is_finite() && n != 0.0 => n as i64,
                        _ => 1,
                    };
                    self.stack.push(Frame {
                        position: 0,
                        children: &block.children,
                        kind: FrameKind::Counted { iteration: 0, total },
                    });
                }
            }
            "repeat_until" => {
                if !block.children.is_empty() {
                    let stop = condition_from(block)?;
                    if !stop.evaluate(&self.state.variables) {
                        self.stack.push(Frame {
                            position: 0,
                            children: &block.children,
                            kind: FrameKind::Until(stop),
                        });
                    }
                }
            }
            "if" => {
                if !block.children.is_empty()
                    && condition_from(block)?.evaluate(&self.state.variables)
                {
                    self.stack.push(Frame {
                        position: 0,
                        children: &block.children,
                        kind: FrameKind::Body,
                    });
                }
            }
            // unknown block types have no runtime effect
            _ => {}
        }
        Ok(())
    }
}

fn text_param(block: &BlockInstance, name: &str) -> Result<String, ExecError> {
    block
        .param(name)
        .map(|v| v.to_string())
        .ok_or_else(|| ExecError::MissingParam {
            block_id: block.id.clone(),
            param: name.to_string(),
        })
}

fn number_param(block: &BlockInstance, name: &str) -> Result<f64, ExecError> {
    let value = block.param(name).ok_or_else(|| ExecError::MissingParam {
        block_id: block.id.clone(),
        param: name.to_string(),
    })?;
    value.as_number().ok_or_else(|| ExecError::BadNumber {
        block_id: block.id.clone(),
        param: name.to_string(),
        raw: value.to_string(),
    })
}

/// Build the condition triple shared by `if` and `repeat_until` from a
/// block's parameters.
fn condition_from(block: &BlockInstance) -> Result<Condition, ExecError> {
    Ok(Condition {
        variable: text_param(block, "condition_var")?,
        operator: text_param(block, "operator")?,
        value: number_param(block, "value")?,
    })
}
