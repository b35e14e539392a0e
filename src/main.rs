// transcript - A small dynamic object-oriented language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::process;

use rustyline::Context;
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Editor, Helper};

use transcript_core::{Error, Interpreter};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Handle --version flag
    if args.len() == 2 && (args[1] == "--version" || args[1] == "-v") {
        println!("TranScript v0.1.0");
        return;
    }

    let interp = match Interpreter::new() {
        Ok(i) => i,
        Err(e) => {
            eprintln!("Failed to start interpreter: {}", e);
            process::exit(1);
        }
    };

    match args.get(1).map(String::as_str) {
        Some("-e") => {
            let Some(expr) = args.get(2) else {
                eprintln!("Usage: transcript -e <expression>");
                process::exit(1);
            };
            match interp.eval(expr) {
                Ok(v) if !v.is_nil() => println!("{}", v),
                Ok(_) => {}
                Err(e) => {
                    eprintln!("{}", e);
                    process::exit(1);
                }
            }
        }
        Some("-c") => {
            let (Some(src), Some(out)) = (args.get(2), args.get(3)) else {
                eprintln!("Usage: transcript -c <source> <output>");
                process::exit(1);
            };
            if let Err(e) = compile_file(&interp, src, out) {
                eprintln!("{}", e);
                process::exit(1);
            }
        }
        Some(_) => run_files(&args[1..], &interp),
        None => run_repl(&interp),
    }
}

/// Run a sequence of code files (source or compiled)
fn run_files(files: &[String], interp: &Interpreter) {
    for file in files {
        if let Err(e) = interp.load(file) {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

/// Compile a source file into a unit file
fn compile_file(interp: &Interpreter, src: &str, out: &str) -> Result<(), Error> {
    let text =
        std::fs::read_to_string(src).map_err(|e| Error::io("read", Some(src.to_string()), e))?;
    let unit = interp.compile(&text, src)?;
    std::fs::write(out, unit.save()).map_err(|e| Error::io("write", Some(out.to_string()), e))?;
    Ok(())
}

// ============================================================================
// REPL
// ============================================================================

/// Tab completion over the defined globals.
struct ReplHelper {
    interp: Interpreter,
}

impl Completer for ReplHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        let start = line[..pos]
            .rfind(|c: char| !c.is_alphanumeric() && c != '_')
            .map(|i| i + 1)
            .unwrap_or(0);
        let prefix = &line[start..pos];
        let candidates = self
            .interp
            .list_defined()
            .into_iter()
            .filter(|n| n.starts_with(prefix))
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;
}
impl Highlighter for ReplHelper {}
impl Validator for ReplHelper {}
impl Helper for ReplHelper {}

fn history_path() -> Option<std::path::PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| std::path::Path::new(&h).join(".transcript_history"))
}

/// Read-eval-print loop. Uncaught errors print in red; the session
/// continues.
fn run_repl(interp: &Interpreter) {
    let mut editor: Editor<ReplHelper, DefaultHistory> = match Editor::new() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Failed to start line editor: {}", e);
            process::exit(1);
        }
    };
    editor.set_helper(Some(ReplHelper {
        interp: interp.clone(),
    }));
    let history = history_path();
    if let Some(p) = &history {
        let _ = editor.load_history(p);
    }

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(trimmed);
                match interp.eval(trimmed) {
                    Ok(v) if !v.is_nil() => println!("{}", v),
                    Ok(_) => {}
                    Err(e) => println!("\x1b[1;31m{}\x1b[0m", e),
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}", e);
                break;
            }
        }
    }
    if let Some(p) = &history {
        let _ = editor.save_history(p);
    }
    println!();
}
