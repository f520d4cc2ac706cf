//! Oxente interpreter command line.
//!
//! When called without argument it drops into an interactive
//! read-evaluate-print loop; errors are printed but the session continues.
//!
//! When called with a single path it runs that file end-to-end and exits
//! with a BSD-style status: 0 on success, 64 on usage error, 65 on scan or
//! parse errors, 70 on a runtime error, 74 when the file cannot be read.

use std::env;
use std::fs;
use std::io;
use std::io::prelude::*;
use std::process;

use anyhow::Context;

use oxente::interpreter::{Interpreter, OxenteError};

const EX_USAGE: i32 = 64;
const EX_DATAERR: i32 = 65;
const EX_SOFTWARE: i32 = 70;
const EX_IOERR: i32 = 74;

fn main() {
    env_logger::init();

    let args = env::args().skip(1).collect::<Vec<_>>();
    let status = match args.as_slice() {
        [] => run_prompt(),
        [path] => run_file(path),
        _ => {
            eprintln!("Usage: oxente [script]");
            EX_USAGE
        }
    };
    process::exit(status);
}

fn run_file(path: &str) -> i32 {
    let source = match fs::read_to_string(path).with_context(|| format!("failed to read {}", path))
    {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{:#}", e);
            return EX_IOERR;
        }
    };

    let mut interp_stdout = io::stdout();
    let mut interp = Interpreter::new(&mut interp_stdout);
    match interp.eval(&source) {
        Ok(()) => 0,
        Err(e @ OxenteError::Parse(_)) => {
            eprintln!("{}", e);
            EX_DATAERR
        }
        Err(e @ OxenteError::Runtime(_)) => {
            eprintln!("{}", e);
            EX_SOFTWARE
        }
    }
}

fn run_prompt() -> i32 {
    match repl() {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{:#}", e);
            EX_IOERR
        }
    }
}

fn repl() -> Result<(), anyhow::Error> {
    let stdin = io::stdin();
    let mut repl_stdout = io::stdout();
    let mut interp_stdout = io::stdout();

    let mut interp = Interpreter::new(&mut interp_stdout);

    let mut input = String::new();
    loop {
        repl_stdout.write_all(b"> ")?;
        repl_stdout.flush()?;

        input.clear();
        let nbytes = stdin.read_line(&mut input).context("failed to read line")?;
        if nbytes == 0 {
            println!("\nExiting.");
            break;
        }

        // Each eval call starts with clean error latches, so one bad line
        // never poisons the next.
        if let Err(e) = interp.eval(&input) {
            eprintln!("{}", e);
        }
    }

    Ok(())
}
