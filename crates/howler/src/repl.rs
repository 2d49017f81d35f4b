//! Stateful read-eval-print engine.
//!
//! Each fed line is lexed, parsed, macro-expanded and then run by the
//! selected engine. State persists between lines: the tree-walker keeps its
//! environment, the compiled engine threads its symbol table, constant pool
//! and globals array through every input so `let` bindings survive.

use std::mem;

use crate::bytecode::code::Constant;
use crate::bytecode::compiler::Compiler;
use crate::bytecode::symbol_table::SymbolTable;
use crate::bytecode::vm::{Vm, GLOBALS_SIZE};
use crate::env::{Env, Environment};
use crate::eval::Evaluator;
use crate::io::PrintWriter;
use crate::macros;
use crate::parser::Parser;
use crate::run::RunError;
use crate::lexer::Lexer;
use crate::value::Value;

/// The prompt the CLI prints before reading a line.
pub const PROMPT: &str = ">> ";

/// Which pipeline executes the fed lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Engine {
    /// Compile and run on the VM.
    #[default]
    Bytecode,
    /// Walk the AST directly.
    TreeWalk,
}

/// A REPL session.
pub struct Repl {
    engine: Engine,
    env: Env,
    macro_env: Env,
    symbol_table: SymbolTable,
    constants: Vec<Constant>,
    globals: Vec<Value>,
}

impl Repl {
    #[must_use]
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            env: Environment::new(),
            macro_env: Environment::new(),
            symbol_table: SymbolTable::new_with_builtins(),
            constants: Vec::new(),
            globals: vec![Value::Null; GLOBALS_SIZE],
        }
    }

    /// Runs one input line and returns its value.
    ///
    /// # Errors
    ///
    /// Returns parse, macro-expansion, compile, or VM errors; session state
    /// is kept either way so the next line can still run.
    pub fn feed(&mut self, line: &str, print: &mut impl PrintWriter) -> Result<Value, RunError> {
        let mut parser = Parser::new(Lexer::new(line));
        let mut program = parser.parse_program();
        if !parser.errors().is_empty() {
            return Err(RunError::Parse(parser.into_errors()));
        }

        macros::define_macros(&mut program, &self.macro_env);
        let program = macros::expand_macros(program, &self.macro_env, print)
            .map_err(RunError::MacroExpansion)?;

        match self.engine {
            Engine::TreeWalk => Ok(Evaluator::new(print).eval_program(&program, &self.env)),
            Engine::Bytecode => {
                let mut compiler = Compiler::with_state(
                    mem::take(&mut self.symbol_table),
                    mem::take(&mut self.constants),
                );
                let compiled = compiler.compile(&program);
                let bytecode = compiler.bytecode();
                (self.symbol_table, self.constants) = compiler.into_state();
                compiled?;

                let mut vm =
                    Vm::with_globals(&bytecode, mem::take(&mut self.globals), print);
                let ran = vm.run();
                let value = vm.last_popped_stack_elem();
                self.globals = vm.into_globals();
                ran?;
                Ok(value)
            }
        }
    }
}
