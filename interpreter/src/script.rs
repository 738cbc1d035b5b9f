use std::collections::HashMap;

use crate::value::Value;

/// Hard ceiling on dispatched lines per run. Exceeding it is the runaway
/// fault: the only bounded-execution guard in the system, and it counts
/// dispatched lines, never wall-clock time.
const MAX_STEPS: usize = 2000;

/// Structured description of the fault that ended a run early.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptFault {
    /// 1-based source line the fault is anchored to.
    pub line: usize,
    pub message: String,
    /// True when the step budget was exhausted rather than a single line
    /// failing.
    pub runaway: bool,
}

/// Everything a run produced: the console lines plus fault metadata for
/// callers that want to point back into the source.
#[derive(Debug, Clone)]
pub struct ScriptReport {
    pub output: Vec<String>,
    pub fault: Option<ScriptFault>,
}

/// Run a script and return its console lines.
///
/// Never fails: line faults and runaway execution become output lines,
/// and everything collected up to a fault is still returned.
pub fn run(source: &str) -> Vec<String> {
    run_report(source).output
}

/// Like [`run`], with structured fault metadata alongside the output.
pub fn run_report(source: &str) -> ScriptReport {
    Interp::new(source).run()
}

/// A classified single-token expression. Classification happens once per
/// evaluation site; only identifier resolution consults current bindings.
enum Token {
    Literal(Value),
    Identifier(String),
}

/// number → quoted string → identifier. The order is load-bearing.
fn classify(raw: &str) -> Token {
    let token = raw.trim();
    if let Ok(n) = token.parse::<f64>() {
        return Token::Literal(Value::Number(n));
    }
    if token.len() >= 2
        && ((token.starts_with('"') && token.ends_with('"'))
            || (token.starts_with('\'') && token.ends_with('\'')))
    {
        return Token::Literal(Value::Str(token[1..token.len() - 1].to_string()));
    }
    Token::Identifier(token.to_string())
}

enum Flow {
    Next,
    Jump(usize),
}

enum Interrupt {
    /// A line fault, already rendered into the output.
    Line(ScriptFault),
    /// Step budget exhausted; rendered by the top-level handler.
    Runaway { line: usize },
}

struct Interp<'s> {
    lines: Vec<&'s str>,
    variables: HashMap<String, Value>,
    output: Vec<String>,
    steps: usize,
}

impl<'s> Interp<'s> {
    fn new(source: &'s str) -> Self {
        Interp {
            lines: source.lines().collect(),
            variables: HashMap::new(),
            output: Vec::new(),
            steps: 0,
        }
    }

    fn run(mut self) -> ScriptReport {
        self.output.push("> Starting execution...".to_string());
        let fault = match self.execute_block(0, 0) {
            Ok(_) => {
                self.output.push("> Execution finished.".to_string());
                None
            }
            Err(Interrupt::Line(fault)) => {
                // the fault line is already in the output; the run just
                // stops early
                self.output.push("> Execution finished.".to_string());
                Some(fault)
            }
            Err(Interrupt::Runaway { line }) => {
                let message = "Infinite loop detected (max steps reached)".to_string();
                self.output.push(format!("Runtime Error: {}", message));
                Some(ScriptFault {
                    line,
                    message,
                    runaway: true,
                })
            }
        };
        ScriptReport {
            output: self.output,
            fault,
        }
    }

    /// Execute lines from `start` until one is indented less than
    /// `min_indent` (the caller's scope resumes there) or input ends.
    /// Returns the index of the first line outside this block.
    fn execute_block(&mut self, start: usize, min_indent: usize) -> Result<usize, Interrupt> {
        let mut i = start;
        while i < self.lines.len() {
            let raw = self.lines[i];
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                i += 1;
                continue;
            }
            let indent = indent_of(raw);
            if indent < min_indent {
                return Ok(i);
            }

            self.steps += 1;
            if self.steps > MAX_STEPS {
                return Err(Interrupt::Runaway { line: i + 1 });
            }

            match self.dispatch(i, indent, line)? {
                Flow::Next => i += 1,
                Flow::Jump(next) => i = next,
            }
        }
        Ok(i)
    }

    /// Classify and execute one trimmed line. The matcher order is
    /// load-bearing and must not be rearranged.
    fn dispatch(&mut self, i: usize, indent: usize, line: &str) -> Result<Flow, Interrupt> {
        // 1. assignment
        if let Some((name, expr)) = match_assignment(line) {
            let value = self.eval(expr);
            self.variables.insert(name.to_string(), value);
            return Ok(Flow::Next);
        }

        // 2. compound assignment, unset names start from 0
        if let Some((name, expr)) = match_compound(line) {
            let addend = self.eval(expr);
            let current = self
                .variables
                .get(name)
                .cloned()
                .unwrap_or(Value::Number(0.0));
            match (current.as_number(), addend.as_number()) {
                (Some(a), Some(b)) => {
                    self.variables.insert(name.to_string(), Value::Number(a + b));
                }
                _ => {
                    return Err(
                        self.line_fault(i, format!("cannot add non-numeric value to '{}'", name))
                    );
                }
            }
            return Ok(Flow::Next);
        }

        // 3. print
        if let Some(content) = line
            .strip_prefix("print(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let rendered = if content.contains(',') {
                content
                    .split(',')
                    .map(|part| self.eval(part).to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            } else {
                self.eval(content).to_string()
            };
            self.output.push(format!("> {}", rendered));
            return Ok(Flow::Next);
        }

        // 4. mocked runtime calls, echoed rather than interpreted
        if line.starts_with("time.sleep") || line.starts_with("avatar.move") {
            self.output.push(format!("> Executing: {}", line));
            return Ok(Flow::Next);
        }

        // 5. counted loop
        if line.starts_with("for ") {
            if let Some(count_expr) = match_range_header(line) {
                let count = self.eval(count_expr).as_number().unwrap_or(0.0);
                let passes = if count.is_finite() && count > 0.0 {
                    count.ceil() as i64
                } else {
                    0
                };
                let body_start = i + 1;
                let body_end = self.scan_block_end(body_start, indent);
                for _ in 0..passes {
                    if self.steps > MAX_STEPS {
                        return Err(Interrupt::Runaway { line: i + 1 });
                    }
                    self.execute_block(body_start, indent + 4)?;
                }
                return Ok(Flow::Jump(body_end));
            }
        }

        // 6. conditional
        if line.starts_with("if ") {
            if let Some((lhs, op, rhs)) = match_if_header(line) {
                let lhs = self.eval(lhs);
                let rhs = self.eval(rhs);
                let body_start = i + 1;
                let body_end = self.scan_block_end(body_start, indent);
                if compare(op, &lhs, &rhs) {
                    self.execute_block(body_start, indent + 4)?;
                }
                return Ok(Flow::Jump(body_end));
            }
        }

        // 7. anything else is inert and advances without effect
        Ok(Flow::Next)
    }

    /// Render a per-line fault into the output and build the interrupt
    /// that aborts the rest of the run.
    fn line_fault(&mut self, i: usize, message: String) -> Interrupt {
        self.output
            .push(format!("Error on line {}: {}", i + 1, message));
        Interrupt::Line(ScriptFault {
            line: i + 1,
            message,
            runaway: false,
        })
    }

    /// Forward-scan past a header's body: lines that are blank or indented
    /// deeper than the header belong to the body.
    fn scan_block_end(&self, start: usize, header_indent: usize) -> usize {
        let mut j = start;
        while j < self.lines.len() {
            let raw = self.lines[j];
            if !raw.trim().is_empty() && indent_of(raw) <= header_indent {
                break;
            }
            j += 1;
        }
        j
    }

    fn eval(&self, raw: &str) -> Value {
        match classify(raw) {
            Token::Literal(value) => value,
            // an unbound identifier evaluates to its own text
            Token::Identifier(name) => self
                .variables
                .get(&name)
                .cloned()
                .unwrap_or(Value::Str(name)),
        }
    }
}

/// Column of the first non-whitespace character; the scope key.
fn indent_of(raw: &str) -> usize {
    raw.chars().take_while(|c| c.is_whitespace()).count()
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn ident_prefix(line: &str) -> Option<&str> {
    let end = line
        .find(|c: char| !is_ident_char(c))
        .unwrap_or(line.len());
    if end == 0 { None } else { Some(&line[..end]) }
}

/// `name = expr` with a single `=` (`==` is a comparison, `+=` compound).
fn match_assignment(line: &str) -> Option<(&str, &str)> {
    let name = ident_prefix(line)?;
    let rest = line[name.len()..].trim_start();
    let expr = rest.strip_prefix('=')?;
    if expr.starts_with('=') {
        return None;
    }
    Some((name, expr))
}

/// `name += expr`.
fn match_compound(line: &str) -> Option<(&str, &str)> {
    let name = ident_prefix(line)?;
    let rest = line[name.len()..].trim_start();
    rest.strip_prefix("+=").map(|expr| (name, expr))
}

/// Extract N from a `for ... in range(N):` header.
fn match_range_header(line: &str) -> Option<&str> {
    let open = line.find("range(")? + "range(".len();
    let close = line[open..].rfind("):")? + open;
    Some(&line[open..close])
}

/// Split an `if <ident> <op> <value>:` header into its three parts.
fn match_if_header(line: &str) -> Option<(&str, &str, &str)> {
    let rest = line.strip_prefix("if ")?.trim_start();
    let ident = ident_prefix(rest)?;
    let rest = rest[ident.len()..].trim_start();
    let op_end = rest
        .find(|c: char| !matches!(c, '>' | '<' | '=' | '!'))
        .unwrap_or(rest.len());
    if op_end == 0 {
        return None;
    }
    let op = &rest[..op_end];
    let tail = &rest[op_end..];
    let colon = tail.rfind(':')?;
    let rhs = tail[..colon].trim();
    if rhs.is_empty() {
        return None;
    }
    Some((ident, op, rhs))
}

/// Operator dispatch over the shared operator set; unknown operators are
/// false, never an error.
fn compare(op: &str, lhs: &Value, rhs: &Value) -> bool {
    match op {
        ">" => lhs.loose_gt(rhs),
        "<" => lhs.loose_lt(rhs),
        "==" => lhs.loose_eq(rhs),
        "!=" => !lhs.loose_eq(rhs),
        _ => false,
    }
}
