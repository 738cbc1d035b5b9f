mod test_runner;

use std::path::Path;
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use blockpy::Program;
use blockpy::block::BlockInstance;
use interpreter::script::{self, ScriptFault};
use interpreter::{ExecError, Executor, RunState, generate_python};

const SUBCOMMANDS: &[&str] = &["run", "gen", "exec", "test", "help"];

#[derive(Parser)]
#[command(name = "blockpy", version, about = "Block program and script interpreter")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a block program document
    Run(RunArgs),

    /// Lower a block program document to script text
    Gen(GenArgs),

    /// Execute a script with the line interpreter
    Exec(ExecArgs),

    /// Run .test.py test files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Program document (JSON) to execute
    file: String,

    /// Load and validate only, don't execute (exit 0 if valid)
    #[arg(long)]
    check: bool,

    /// Dump the parsed program
    #[arg(long)]
    ast: bool,

    /// Print the block tree
    #[arg(long)]
    tree: bool,

    /// Step allowance before the run is abandoned
    #[arg(long, default_value_t = 10_000)]
    max_steps: usize,

    /// Print each executed block id to stderr while stepping
    #[arg(long)]
    trace: bool,

    /// Print final variable bindings after the run
    #[arg(long)]
    vars: bool,
}

#[derive(clap::Args)]
struct GenArgs {
    /// Program document (JSON) to lower
    file: String,
}

#[derive(clap::Args)]
struct ExecArgs {
    /// Script file to execute
    file: String,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.py file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    // Backwards compatibility: if the first positional arg is not a known
    // subcommand, inject "run" so `blockpy program.json` works like
    // `blockpy run program.json`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(first_pos) = args.iter().skip(1).find(|a| !a.starts_with('-')) {
        let first_pos = first_pos.clone();
        if !SUBCOMMANDS.contains(&first_pos.as_str()) {
            let pos = args.iter().position(|a| *a == first_pos).unwrap();
            args.insert(pos, "run".to_string());
        }
    }

    let cli = Cli::parse_from(&args);

    match cli.command {
        Command::Run(run_args) => do_run(run_args),
        Command::Gen(gen_args) => do_gen(gen_args),
        Command::Exec(exec_args) => do_exec(exec_args, cli.no_color),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

/// Load a program document and bail out on load or validation problems.
fn load_program(file: &str) -> Program {
    let program = match Program::from_file(Path::new(file)) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    let problems = program.validate();
    if !problems.is_empty() {
        for problem in &problems {
            eprintln!("error: {}", problem);
        }
        process::exit(1);
    }
    program
}

fn do_run(args: RunArgs) {
    let program = load_program(&args.file);

    if args.check {
        eprintln!("ok: {} is a valid program", args.file);
        return;
    }

    if args.ast {
        println!("{:#?}", program);
        return;
    }

    if args.tree {
        print_tree(&program.blocks, 0);
        return;
    }

    let mut executor = Executor::new(&program);
    let state = if args.trace {
        run_traced(&mut executor, args.max_steps)
    } else {
        executor.run_to_completion(args.max_steps)
    };

    for line in &state.console_output {
        println!("{}", line);
    }

    if args.vars {
        let mut names: Vec<&String> = state.variables.keys().collect();
        names.sort();
        for name in names {
            eprintln!("{} = {}", name, state.variables[name]);
        }
    }

    if let Some(error) = &state.error {
        eprintln!("runtime error: {}", error);
        process::exit(1);
    }
}

/// Step the executor one block at a time, echoing each executed block id.
fn run_traced(executor: &mut Executor<'_>, max_steps: usize) -> RunState {
    for _ in 0..max_steps {
        let state = executor.step();
        if state.is_terminal() {
            return state;
        }
        if let Some(id) = &state.current_block_id {
            eprintln!("step: {}", id);
        }
    }
    eprintln!("runtime error: {}", ExecError::StepLimit(max_steps));
    process::exit(1);
}

fn print_tree(blocks: &[BlockInstance], indent: usize) {
    for block in blocks {
        let pad = "  ".repeat(indent);
        println!("{}{} [{}]", pad, block.block_type, block.id);
        print_tree(&block.children, indent + 1);
    }
}

fn do_gen(args: GenArgs) {
    let program = load_program(&args.file);
    print!("{}", generate_python(&program));
}

fn do_exec(args: ExecArgs, no_color: bool) {
    let source = match std::fs::read_to_string(&args.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", args.file, e);
            process::exit(1);
        }
    };

    let report = script::run_report(&source);
    for line in &report.output {
        println!("{}", line);
    }

    if let Some(fault) = &report.fault {
        emit_fault(&args.file, &source, fault, no_color);
        process::exit(1);
    }
}

/// Render a script fault as a diagnostic anchored to its source line.
fn emit_fault(name: &str, source: &str, fault: &ScriptFault, no_color: bool) {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let mut files = SimpleFiles::new();
    let file_id = files.add(name.to_string(), source.to_string());

    let diagnostic = Diagnostic::error()
        .with_message(&fault.message)
        .with_labels(vec![Label::primary(file_id, line_span(source, fault.line))]);

    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    let _ = term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
}

/// Byte range of a 1-based source line, for diagnostic labels.
fn line_span(source: &str, line: usize) -> std::ops::Range<usize> {
    let mut offset = 0;
    for (idx, text) in source.split('\n').enumerate() {
        if idx + 1 == line {
            return offset..offset + text.len();
        }
        offset += text.len() + 1;
    }
    let end = source.len();
    end..end
}
