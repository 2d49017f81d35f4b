use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::time::Instant;

use howler::{
    compile_source, eval_program, run_bytecode, run_program, Bytecode, Engine, Repl, StdPrint,
    Value, PROMPT,
};

const USAGE: &str = "usage: howler [--eval] [--emit OUT] [FILE]

Runs FILE through the bytecode pipeline, or starts a REPL when no FILE is
given. A FILE ending in .hbc is treated as precompiled bytecode.

  --eval      use the tree-walking evaluator instead of the VM
  --emit OUT  compile FILE and write the bytecode to OUT instead of running";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    let mut engine = Engine::Bytecode;
    let mut emit: Option<String> = None;
    let mut file: Option<String> = None;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--eval" => engine = Engine::TreeWalk,
            "--emit" => {
                let Some(out) = iter.next() else {
                    eprintln!("error: --emit needs an output path\n\n{USAGE}");
                    return ExitCode::FAILURE;
                };
                emit = Some(out);
            }
            "--help" | "-h" => {
                println!("{USAGE}");
                return ExitCode::SUCCESS;
            }
            _ if file.is_none() => file = Some(arg),
            _ => {
                eprintln!("error: unexpected argument {arg:?}\n\n{USAGE}");
                return ExitCode::FAILURE;
            }
        }
    }

    match file {
        Some(path) => run_file(&path, engine, emit.as_deref()),
        None => run_repl(engine),
    }
}

fn run_file(path: &str, engine: Engine, emit: Option<&str>) -> ExitCode {
    let mut print = StdPrint;

    if path.ends_with(".hbc") {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                eprintln!("error: {path}: {err}");
                return ExitCode::FAILURE;
            }
        };
        let bytecode = match Bytecode::from_bytes(&bytes) {
            Ok(bytecode) => bytecode,
            Err(err) => {
                eprintln!("error: {path} is not valid bytecode: {err}");
                return ExitCode::FAILURE;
            }
        };
        let start = Instant::now();
        return report(run_bytecode(&bytecode, &mut print), start);
    }

    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: {path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(out) = emit {
        let bytecode = match compile_source(&source, &mut print) {
            Ok(bytecode) => bytecode,
            Err(err) => {
                eprintln!("error:\n{err}");
                return ExitCode::FAILURE;
            }
        };
        let bytes = match bytecode.to_bytes() {
            Ok(bytes) => bytes,
            Err(err) => {
                eprintln!("error: could not encode bytecode: {err}");
                return ExitCode::FAILURE;
            }
        };
        if let Err(err) = fs::write(out, bytes) {
            eprintln!("error: {out}: {err}");
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    }

    let start = Instant::now();
    let result = match engine {
        Engine::Bytecode => run_program(&source, &mut print),
        Engine::TreeWalk => eval_program(&source, &mut print),
    };
    report(result, start)
}

fn report<E: std::fmt::Display>(result: Result<Value, E>, start: Instant) -> ExitCode {
    let elapsed = start.elapsed();
    match result {
        Ok(value) => {
            eprintln!("success after: {elapsed:?}");
            if value != Value::Null {
                println!("{value}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error after: {elapsed:?}\n{err}");
            ExitCode::FAILURE
        }
    }
}

fn run_repl(engine: Engine) -> ExitCode {
    let mut repl = Repl::new(engine);
    let mut print = StdPrint;
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{PROMPT}");
        if stdout.flush().is_err() {
            return ExitCode::FAILURE;
        }
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => return ExitCode::SUCCESS,
            Ok(_) => {}
            Err(err) => {
                eprintln!("error: {err}");
                return ExitCode::FAILURE;
            }
        }
        if line.trim().is_empty() {
            continue;
        }
        match repl.feed(&line, &mut print) {
            Ok(Value::Null) => {}
            Ok(value) => println!("{value}"),
            Err(err) => eprintln!("{err}"),
        }
    }
}
