//! One-call entry points for embedders: source text in, value out.
//!
//! Both pipelines share the same front half (lex, parse, macro expansion)
//! and must produce observably equal results for programs in the common
//! operator subset; the integration suite holds them to that.

use std::fmt;

use crate::ast::Program;
use crate::bytecode::code::Bytecode;
use crate::bytecode::compiler::{CompileError, Compiler};
use crate::bytecode::vm::{Vm, VmError};
use crate::env::Environment;
use crate::eval::Evaluator;
use crate::io::PrintWriter;
use crate::lexer::Lexer;
use crate::macros;
use crate::parser::{ParseError, Parser};
use crate::value::Value;

/// Everything that can go wrong between source text and a value.
#[derive(Debug, Clone, PartialEq)]
pub enum RunError {
    Parse(Vec<ParseError>),
    MacroExpansion(String),
    Compile(CompileError),
    Vm(VmError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(errors) => {
                for (i, error) in errors.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{error}")?;
                }
                Ok(())
            }
            Self::MacroExpansion(message) => f.write_str(message),
            Self::Compile(error) => write!(f, "{error}"),
            Self::Vm(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for RunError {}

impl From<CompileError> for RunError {
    fn from(error: CompileError) -> Self {
        Self::Compile(error)
    }
}

impl From<VmError> for RunError {
    fn from(error: VmError) -> Self {
        Self::Vm(error)
    }
}

/// Lexes and parses `source`.
///
/// # Errors
///
/// Returns the parser's accumulated error list when it is non-empty.
pub fn parse_source(source: &str) -> Result<Program, Vec<ParseError>> {
    let mut parser = Parser::new(Lexer::new(source));
    let program = parser.parse_program();
    if parser.errors().is_empty() {
        Ok(program)
    } else {
        Err(parser.into_errors())
    }
}

fn parse_and_expand(
    source: &str,
    print: &mut impl PrintWriter,
) -> Result<Program, RunError> {
    let mut program = parse_source(source).map_err(RunError::Parse)?;
    let macro_env = Environment::new();
    macros::define_macros(&mut program, &macro_env);
    macros::expand_macros(program, &macro_env, print).map_err(RunError::MacroExpansion)
}

/// Runs `source` through the tree-walking pipeline.
///
/// Runtime failures of the evaluator come back as an ordinary
/// [`Value::Error`]; `Err` is reserved for parse and macro-expansion
/// failures.
///
/// # Errors
///
/// See above.
pub fn eval_program(source: &str, print: &mut impl PrintWriter) -> Result<Value, RunError> {
    let program = parse_and_expand(source, print)?;
    let env = Environment::new();
    Ok(Evaluator::new(print).eval_program(&program, &env))
}

/// Compiles `source` to bytecode, with macros expanded first.
///
/// # Errors
///
/// Returns parse, macro-expansion, or compile errors.
pub fn compile_source(
    source: &str,
    print: &mut impl PrintWriter,
) -> Result<Bytecode, RunError> {
    let program = parse_and_expand(source, print)?;
    let mut compiler = Compiler::new();
    compiler.compile(&program)?;
    Ok(compiler.bytecode())
}

/// Runs `source` through the compiled pipeline and returns the last popped
/// stack element.
///
/// # Errors
///
/// Returns parse, macro-expansion, compile, or VM errors.
pub fn run_program(source: &str, print: &mut impl PrintWriter) -> Result<Value, RunError> {
    let bytecode = compile_source(source, print)?;
    run_bytecode(&bytecode, print).map_err(RunError::Vm)
}

/// Executes already-compiled bytecode.
///
/// # Errors
///
/// Returns the VM's first error.
pub fn run_bytecode(
    bytecode: &Bytecode,
    print: &mut impl PrintWriter,
) -> Result<Value, VmError> {
    let mut vm = Vm::new(bytecode, print);
    vm.run()?;
    Ok(vm.last_popped_stack_elem())
}
