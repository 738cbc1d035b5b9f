use blockpy::Program;
use blockpy::block::BlockInstance;

/// Lower a block program to its textual script form.
///
/// Pure and deterministic: the same tree always yields the same text, and
/// generation never fails; unrecognized block types become comments.
pub fn generate_python(program: &Program) -> String {
    let variables = collect_variables(&program.blocks);

    let mut code = String::from("# Generated Python Code\nimport time\n\n");
    code.push_str("# Setup\navatar = Avatar()\n");
    if !variables.is_empty() {
        code.push_str("# Initialize variables\n");
        for name in &variables {
            code.push_str(&format!("{} = 0\n", name));
        }
    }
    code.push('\n');

    for block in &program.blocks {
        emit_block(block, 0, &variables, &mut code);
    }
    code
}

/// Every variable name the program references, in first-encountered order:
/// assignment targets plus `if`/`repeat_until` condition variables. They
/// are declared up front so the script never reads an unbound name.
fn collect_variables(blocks: &[BlockInstance]) -> Vec<String> {
    let mut variables = Vec::new();
    walk_variables(blocks, &mut variables);
    variables
}

fn walk_variables(blocks: &[BlockInstance], variables: &mut Vec<String>) {
    for block in blocks {
        let referenced = match block.block_type.as_str() {
            "set_var" | "change_var" => Some(block.param_text("name")),
            "if" | "repeat_until" => Some(block.param_text("condition_var")),
            _ => None,
        };
        if let Some(name) = referenced {
            if !name.is_empty() && !variables.contains(&name) {
                variables.push(name);
            }
        }
        walk_variables(&block.children, variables);
    }
}

fn emit_block(block: &BlockInstance, indent: usize, variables: &[String], out: &mut String) {
    let line = match block.block_type.as_str() {
        "start" => "# Program Start".to_string(),
        "print" => {
            let message = block.param_text("message");
            // variable names and numbers are expressions, the rest is text
            if variables.contains(&message) || message.trim().parse::<f64>().is_ok() {
                format!("print({})", message)
            } else {
                format!("print(\"{}\")", message)
            }
        }
        "wait" => format!("time.sleep({})", block.param_text("seconds")),
        "move" => format!("avatar.move(\"{}\")", block.param_text("direction")),
        "set_var" => format!(
            "{} = {}",
            block.param_text("name"),
            block.param_text("value")
        ),
        "change_var" => format!(
            "{} += {}",
            block.param_text("name"),
            block.param_text("value")
        ),
        "repeat" => format!("for i in range({}):", block.param_text("times")),
        "repeat_until" => format!(
            "while not ({} {} {}):",
            block.param_text("condition_var"),
            block.param_text("operator"),
            block.param_text("value")
        ),
        "if" => format!(
            "if {} {} {}:",
            block.param_text("condition_var"),
            block.param_text("operator"),
            block.param_text("value")
        ),
        other => format!("# Unknown block {}", other),
    };

    for _ in 0..indent {
        out.push_str("    ");
    }
    out.push_str(&line);
    out.push('\n');

    for child in &block.children {
        emit_block(child, indent + 1, variables, out);
    }
}
