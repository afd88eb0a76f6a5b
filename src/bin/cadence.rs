//! Cadence CLI.
//!
//! `run <file>` executes a program once; `repl` starts an interactive
//! read/eval/print loop; `--watch` re-runs a file whenever it changes
//! on disk.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use cadence::value::Data;
use cadence::EvalCtx;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(author, version, about = "Interpreter for the Cadence composition language")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Audio output device to select before running.
    #[arg(long, global = true)]
    device: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a source file once (or repeatedly with --watch).
    Run {
        file: PathBuf,

        /// Re-run whenever the file's modification time changes.
        #[arg(long)]
        watch: bool,
    },
    /// Start an interactive read/eval/print loop.
    Repl,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Repl) {
        Command::Run { file, watch } if watch => run_watch(&file, cli.device.as_deref()),
        Command::Run { file, .. } => run_once(&file, cli.device.as_deref()),
        Command::Repl => {
            run_repl(cli.device.as_deref());
            ExitCode::SUCCESS
        }
    }
}

fn run_once(path: &PathBuf, device: Option<&str>) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("cadence: cannot read {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
    };
    let mut ctx = EvalCtx::new(path.display().to_string());
    if let Some(device) = device {
        ctx.audio.set_device(device);
    }
    let value = evaluate_with(&mut ctx, &source);
    print_diagnostics(&ctx.diagnostics);
    if ctx.diagnostics.has_errors() {
        ExitCode::FAILURE
    } else {
        if !matches!(value.data, Data::Void) {
            println!("{value}");
        }
        ExitCode::SUCCESS
    }
}

/// Polls the file's modification time and re-evaluates on change.
/// There is no filesystem-event dependency in this crate's stack, so
/// this is a plain poll loop rather than an inotify/kqueue watch.
fn run_watch(path: &PathBuf, device: Option<&str>) -> ExitCode {
    let mut last_modified = None;
    loop {
        let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();
        if modified != last_modified {
            last_modified = modified;
            println!("cadence: running {}", path.display());
            run_once(path, device);
        }
        std::thread::sleep(Duration::from_millis(300));
    }
}

fn run_repl(device: Option<&str>) {
    let mut ctx = EvalCtx::new("<repl>");
    if let Some(device) = device {
        ctx.audio.set_device(device);
    }
    println!("cadence REPL — end input with an empty line, Ctrl-D to exit");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        let Some(first) = lines.next() else { break };
        let Ok(first) = first else { break };
        if first.trim().is_empty() {
            continue;
        }
        let mut buffer = first;
        while needs_continuation(&buffer) {
            print!(". ");
            let _ = io::stdout().flush();
            let Some(Ok(next)) = lines.next() else { break };
            buffer.push('\n');
            buffer.push_str(&next);
        }
        let value = evaluate_with(&mut ctx, &buffer);
        print_diagnostics(&ctx.diagnostics);
        ctx.diagnostics = cadence::Diagnostics::new("<repl>");
        if !matches!(value.data, Data::Void) {
            println!("{value}");
        }
    }
}

/// A line needs a follow-up line if it ends with an explicit `\`
/// continuation or opens a `proc ... end proc` block that hasn't
/// closed yet, per the REPL's multi-line input rule.
fn needs_continuation(buffer: &str) -> bool {
    if buffer.trim_end().ends_with('\\') {
        return true;
    }
    let opens = buffer.split_whitespace().filter(|w| *w == "proc").count();
    let closes = buffer
        .split_whitespace()
        .collect::<Vec<_>>()
        .windows(2)
        .filter(|w| w[0] == "end" && w[1] == "proc")
        .count();
    opens > closes
}

/// Runs `source` against an existing context, tolerating a trailing
/// `\` continuation marker (stripped before lexing).
fn evaluate_with(ctx: &mut EvalCtx, source: &str) -> cadence::Value {
    let source = source.replace('\\', "\n");
    let tokens = match cadence::lexer::Lexer::new(&source).tokenize() {
        Ok(t) => t,
        Err(e) => {
            ctx.diagnostics.record_error(&e);
            return cadence::Value::void();
        }
    };
    let program = match cadence::parser::Parser::new(tokens).parse_program() {
        Ok(p) => p,
        Err(e) => {
            ctx.diagnostics.record_error(&e);
            return cadence::Value::void();
        }
    };
    ctx.run_program(&program)
}

fn print_diagnostics(diagnostics: &cadence::Diagnostics) {
    for entry in diagnostics.entries() {
        eprintln!("{entry}");
    }
}
