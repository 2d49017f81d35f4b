//! Lowers the AST to bytecode.
//!
//! The compiler keeps a stack of compilation scopes, one per function body
//! being compiled, and a lexically scoped symbol table that mirrors it.
//! Conditionals are emitted with placeholder jump operands (9999) that are
//! back-patched once the target offset is known; instructions already
//! emitted are only ever rewritten, never re-ordered.

use std::fmt;

use super::code::{Bytecode, CompiledFunction, Constant, Instructions};
use super::op::{make, Opcode};
use super::symbol_table::{Symbol, SymbolScope, SymbolTable};
use crate::ast::{BlockStatement, Expression, InfixOperator, PrefixOperator, Program, Statement};

/// A problem found while lowering; compilation stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The operator has no bytecode lowering (`&&`, `||`, `&` and `|` are
    /// tree-walk only).
    UnknownOperator(String),
    UndefinedVariable(String),
    /// A macro literal survived to compilation; macros must be expanded
    /// against the AST first.
    UnexpandedMacro,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOperator(operator) => write!(f, "unknown operator {operator}"),
            Self::UndefinedVariable(name) => write!(f, "undefined variable: {name}"),
            Self::UnexpandedMacro => {
                f.write_str("macro literal must be expanded before compilation")
            }
        }
    }
}

impl std::error::Error for CompileError {}

/// The opcode and offset of an already-emitted instruction.
#[derive(Debug, Clone, Copy)]
struct EmittedInstruction {
    opcode: Opcode,
    position: usize,
}

/// Per-function-body compilation state.
#[derive(Debug, Default)]
struct CompilationScope {
    instructions: Instructions,
    last_instruction: Option<EmittedInstruction>,
    previous_instruction: Option<EmittedInstruction>,
}

/// AST → [`Bytecode`] compiler.
#[derive(Debug)]
pub struct Compiler {
    constants: Vec<Constant>,
    symbol_table: SymbolTable,
    scopes: Vec<CompilationScope>,
    scope_index: usize,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    /// A fresh compiler with the builtins predefined.
    #[must_use]
    pub fn new() -> Self {
        Self::with_state(SymbolTable::new_with_builtins(), Vec::new())
    }

    /// A compiler that continues from an earlier symbol table and constant
    /// pool; this is what keeps REPL inputs sharing one global namespace.
    #[must_use]
    pub fn with_state(symbol_table: SymbolTable, constants: Vec<Constant>) -> Self {
        Self {
            constants,
            symbol_table,
            scopes: vec![CompilationScope::default()],
            scope_index: 0,
        }
    }

    /// Hands the symbol table and constant pool back for the next input.
    #[must_use]
    pub fn into_state(self) -> (SymbolTable, Vec<Constant>) {
        (self.symbol_table, self.constants)
    }

    /// Compiles a whole program into the current scope.
    ///
    /// # Errors
    ///
    /// Returns the first [`CompileError`] encountered; instructions emitted
    /// up to that point are left as-is.
    pub fn compile(&mut self, program: &Program) -> Result<(), CompileError> {
        for statement in &program.statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    /// The compiled program so far.
    #[must_use]
    pub fn bytecode(&self) -> Bytecode {
        Bytecode {
            instructions: self.current_scope().instructions.clone(),
            constants: self.constants.clone(),
        }
    }

    fn compile_statement(&mut self, statement: &Statement) -> Result<(), CompileError> {
        match statement {
            Statement::Let { name, value, .. } => {
                // The name is defined before its value is compiled so a
                // global function body can refer to itself.
                let symbol = self.symbol_table.define(&name.name);
                self.compile_expression(value)?;
                match symbol.scope {
                    SymbolScope::Global => self.emit(Opcode::SetGlobal, &[symbol.index]),
                    _ => self.emit(Opcode::SetLocal, &[symbol.index]),
                };
                Ok(())
            }
            Statement::Return { value, .. } => {
                self.compile_expression(value)?;
                self.emit(Opcode::ReturnValue, &[]);
                Ok(())
            }
            Statement::Expression { value, .. } => {
                self.compile_expression(value)?;
                self.emit(Opcode::Pop, &[]);
                Ok(())
            }
        }
    }

    fn compile_block(&mut self, block: &BlockStatement) -> Result<(), CompileError> {
        for statement in &block.statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    fn compile_expression(&mut self, expression: &Expression) -> Result<(), CompileError> {
        match expression {
            Expression::IntegerLiteral { value, .. } => {
                let index = self.add_constant(Constant::Integer(*value));
                self.emit(Opcode::Constant, &[index]);
            }
            Expression::StringLiteral { value, .. } => {
                let index = self.add_constant(Constant::Str(value.clone()));
                self.emit(Opcode::Constant, &[index]);
            }
            Expression::BooleanLiteral { value, .. } => {
                if *value {
                    self.emit(Opcode::True, &[]);
                } else {
                    self.emit(Opcode::False, &[]);
                }
            }
            Expression::Identifier(identifier) => {
                let Some(symbol) = self.symbol_table.resolve(&identifier.name) else {
                    return Err(CompileError::UndefinedVariable(identifier.name.clone()));
                };
                self.load_symbol(&symbol);
            }
            Expression::Prefix {
                operator, right, ..
            } => {
                self.compile_expression(right)?;
                match operator {
                    PrefixOperator::Bang => self.emit(Opcode::Bang, &[]),
                    PrefixOperator::Minus => self.emit(Opcode::Minus, &[]),
                };
            }
            Expression::Infix {
                operator,
                left,
                right,
                ..
            } => {
                // `<` has no opcode of its own: swap the operands and reuse
                // OpGreaterThan.
                if *operator == InfixOperator::Lt {
                    self.compile_expression(right)?;
                    self.compile_expression(left)?;
                    self.emit(Opcode::GreaterThan, &[]);
                    return Ok(());
                }
                self.compile_expression(left)?;
                self.compile_expression(right)?;
                match operator {
                    InfixOperator::Plus => self.emit(Opcode::Add, &[]),
                    InfixOperator::Minus => self.emit(Opcode::Sub, &[]),
                    InfixOperator::Asterisk => self.emit(Opcode::Mul, &[]),
                    InfixOperator::Slash => self.emit(Opcode::Div, &[]),
                    InfixOperator::Gt => self.emit(Opcode::GreaterThan, &[]),
                    InfixOperator::Eq => self.emit(Opcode::Equal, &[]),
                    InfixOperator::NotEq => self.emit(Opcode::NotEqual, &[]),
                    InfixOperator::Lt => unreachable!("handled above"),
                    other => return Err(CompileError::UnknownOperator(other.to_string())),
                };
            }
            Expression::If {
                condition,
                consequence,
                alternative,
                ..
            } => {
                self.compile_expression(condition)?;
                // Placeholder operand, patched once the consequence length
                // is known.
                let jump_not_truthy = self.emit(Opcode::JumpNotTruthy, &[9999]);

                self.compile_block(consequence)?;
                if self.last_instruction_is(Opcode::Pop) {
                    self.remove_last_pop();
                }
                let jump = self.emit(Opcode::Jump, &[9999]);

                let after_consequence = self.current_scope().instructions.len();
                self.change_operand(jump_not_truthy, after_consequence);

                match alternative {
                    None => {
                        self.emit(Opcode::Null, &[]);
                    }
                    Some(alternative) => {
                        self.compile_block(alternative)?;
                        if self.last_instruction_is(Opcode::Pop) {
                            self.remove_last_pop();
                        }
                    }
                }
                let after_alternative = self.current_scope().instructions.len();
                self.change_operand(jump, after_alternative);
            }
            Expression::ArrayLiteral { elements, .. } => {
                for element in elements {
                    self.compile_expression(element)?;
                }
                self.emit(Opcode::Array, &[elements.len()]);
            }
            Expression::HashLiteral { pairs, .. } => {
                // Sort keys by their canonical rendering so the constant
                // pool layout is deterministic.
                let mut sorted: Vec<&(Expression, Expression)> = pairs.iter().collect();
                sorted.sort_by_key(|(key, _)| key.to_string());
                for (key, value) in sorted {
                    self.compile_expression(key)?;
                    self.compile_expression(value)?;
                }
                self.emit(Opcode::Hash, &[pairs.len() * 2]);
            }
            Expression::Index { left, index, .. } => {
                self.compile_expression(left)?;
                self.compile_expression(index)?;
                self.emit(Opcode::Index, &[]);
            }
            Expression::FunctionLiteral {
                parameters, body, ..
            } => {
                self.enter_scope();
                for parameter in parameters {
                    self.symbol_table.define(&parameter.name);
                }
                self.compile_block(body)?;

                // A trailing expression becomes the return value; a body
                // that ends any other way returns null implicitly.
                if self.last_instruction_is(Opcode::Pop) {
                    self.replace_last_pop_with_return();
                }
                if !self.last_instruction_is(Opcode::ReturnValue) {
                    self.emit(Opcode::Return, &[]);
                }

                let free_symbols = std::mem::take(&mut self.symbol_table.free_symbols);
                let num_locals = self.symbol_table.num_definitions;
                let instructions = self.leave_scope();

                // Load each captured value in the enclosing scope; OpClosure
                // collects them off the stack in this order.
                for symbol in &free_symbols {
                    self.load_symbol(symbol);
                }

                let function = CompiledFunction {
                    instructions,
                    num_locals,
                    num_parameters: parameters.len(),
                };
                let index = self.add_constant(Constant::Function(function));
                self.emit(Opcode::Closure, &[index, free_symbols.len()]);
            }
            Expression::Call {
                function,
                arguments,
                ..
            } => {
                self.compile_expression(function)?;
                for argument in arguments {
                    self.compile_expression(argument)?;
                }
                self.emit(Opcode::Call, &[arguments.len()]);
            }
            Expression::MacroLiteral { .. } => return Err(CompileError::UnexpandedMacro),
        }
        Ok(())
    }

    fn load_symbol(&mut self, symbol: &Symbol) {
        match symbol.scope {
            SymbolScope::Global => self.emit(Opcode::GetGlobal, &[symbol.index]),
            SymbolScope::Local => self.emit(Opcode::GetLocal, &[symbol.index]),
            SymbolScope::Builtin => self.emit(Opcode::GetBuiltin, &[symbol.index]),
            SymbolScope::Free => self.emit(Opcode::GetFree, &[symbol.index]),
        };
    }

    fn add_constant(&mut self, constant: Constant) -> usize {
        self.constants.push(constant);
        self.constants.len() - 1
    }

    /// Emits one instruction into the current scope and returns its offset.
    fn emit(&mut self, op: Opcode, operands: &[usize]) -> usize {
        let instruction = make(op, operands);
        let position = self.current_scope_mut().instructions.extend(&instruction);
        self.set_last_instruction(op, position);
        position
    }

    fn set_last_instruction(&mut self, opcode: Opcode, position: usize) {
        let scope = self.current_scope_mut();
        scope.previous_instruction = scope.last_instruction;
        scope.last_instruction = Some(EmittedInstruction { opcode, position });
    }

    fn last_instruction_is(&self, op: Opcode) -> bool {
        self.current_scope()
            .last_instruction
            .is_some_and(|instruction| instruction.opcode == op)
    }

    fn remove_last_pop(&mut self) {
        let scope = self.current_scope_mut();
        if let Some(last) = scope.last_instruction {
            scope.instructions.truncate(last.position);
            scope.last_instruction = scope.previous_instruction;
        }
    }

    fn replace_last_pop_with_return(&mut self) {
        let scope = self.current_scope_mut();
        if let Some(last) = &mut scope.last_instruction {
            let position = last.position;
            last.opcode = Opcode::ReturnValue;
            scope
                .instructions
                .replace_at(position, &make(Opcode::ReturnValue, &[]));
        }
    }

    /// Rewrites the operand of the instruction at `position` in place.
    fn change_operand(&mut self, position: usize, operand: usize) {
        let op = Opcode::lookup(self.current_scope().instructions[position])
            .expect("change_operand points at an emitted opcode");
        let replacement = make(op, &[operand]);
        self.current_scope_mut()
            .instructions
            .replace_at(position, &replacement);
    }

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        self.scope_index += 1;
        let outer = std::mem::take(&mut self.symbol_table);
        self.symbol_table = SymbolTable::new_enclosed(outer);
    }

    fn leave_scope(&mut self) -> Instructions {
        let scope = self.scopes.pop().expect("scope stack is never empty");
        self.scope_index -= 1;
        self.symbol_table = std::mem::take(&mut self.symbol_table)
            .into_outer()
            .expect("leave_scope is only called after enter_scope");
        scope.instructions
    }

    fn current_scope(&self) -> &CompilationScope {
        &self.scopes[self.scope_index]
    }

    fn current_scope_mut(&mut self) -> &mut CompilationScope {
        &mut self.scopes[self.scope_index]
    }
}
