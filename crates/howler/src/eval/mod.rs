//! The tree-walking evaluator.
//!
//! Dispatches recursively on AST variants against an [`Environment`] chain.
//! Runtime errors and `return` values travel as ordinary [`Value`]s
//! (`Value::Error`, `Value::ReturnValue`) that statement loops watch for:
//! a program unwraps a return value, a block lets it propagate so outer
//! callers can unwind.

mod quote;

use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::{
    BlockStatement, Expression, InfixOperator, PrefixOperator, Program, Statement,
};
use crate::builtins::Builtin;
use crate::env::{Env, Environment};
use crate::io::PrintWriter;
use crate::value::{FunctionValue, HashPair, Value};

/// Evaluator instance; borrows the output sink used by `puts`.
pub struct Evaluator<'p, P: PrintWriter> {
    print: &'p mut P,
}

impl<'p, P: PrintWriter> Evaluator<'p, P> {
    pub fn new(print: &'p mut P) -> Self {
        Self { print }
    }

    /// Evaluates a program: statements in order, unwrapping a trailing
    /// return value and short-circuiting on error.
    pub fn eval_program(&mut self, program: &Program, env: &Env) -> Value {
        let mut result = Value::Null;
        for statement in &program.statements {
            match self.eval_statement(statement, env) {
                Value::ReturnValue(inner) => return *inner,
                error @ Value::Error(_) => return error,
                other => result = other,
            }
        }
        result
    }

    /// Evaluates a block. Unlike a program, return values propagate
    /// unwrapped so the enclosing call can unwind through nested blocks.
    pub(crate) fn eval_block(&mut self, block: &BlockStatement, env: &Env) -> Value {
        let mut result = Value::Null;
        for statement in &block.statements {
            match self.eval_statement(statement, env) {
                done @ (Value::ReturnValue(_) | Value::Error(_)) => return done,
                other => result = other,
            }
        }
        result
    }

    fn eval_statement(&mut self, statement: &Statement, env: &Env) -> Value {
        match statement {
            Statement::Let { name, value, .. } => {
                let value = self.eval_expression(value, env);
                if value.is_error() {
                    return value;
                }
                env.borrow_mut().set(&name.name, value);
                Value::Null
            }
            Statement::Return { value, .. } => {
                let value = self.eval_expression(value, env);
                if value.is_error() {
                    return value;
                }
                Value::ReturnValue(Box::new(value))
            }
            Statement::Expression { value, .. } => self.eval_expression(value, env),
        }
    }

    pub(crate) fn eval_expression(&mut self, expression: &Expression, env: &Env) -> Value {
        match expression {
            Expression::IntegerLiteral { value, .. } => Value::Integer(*value),
            Expression::StringLiteral { value, .. } => Value::Str(Rc::from(value.as_str())),
            Expression::BooleanLiteral { value, .. } => Value::Boolean(*value),
            Expression::Identifier(identifier) => self.eval_identifier(&identifier.name, env),
            Expression::Prefix {
                operator, right, ..
            } => {
                let right = self.eval_expression(right, env);
                if right.is_error() {
                    return right;
                }
                eval_prefix_expression(*operator, &right)
            }
            Expression::Infix {
                operator,
                left,
                right,
                ..
            } => {
                let left = self.eval_expression(left, env);
                if left.is_error() {
                    return left;
                }
                let right = self.eval_expression(right, env);
                if right.is_error() {
                    return right;
                }
                eval_infix_expression(*operator, &left, &right)
            }
            Expression::If {
                condition,
                consequence,
                alternative,
                ..
            } => {
                let condition = self.eval_expression(condition, env);
                if condition.is_error() {
                    return condition;
                }
                if condition.is_truthy() {
                    self.eval_block(consequence, env)
                } else if let Some(alternative) = alternative {
                    self.eval_block(alternative, env)
                } else {
                    Value::Null
                }
            }
            Expression::FunctionLiteral {
                parameters, body, ..
            } => Value::Function(Rc::new(FunctionValue {
                parameters: parameters.clone(),
                body: body.clone(),
                env: env.clone(),
            })),
            Expression::Call {
                function,
                arguments,
                ..
            } => {
                // `quote` is a special form: its argument is not evaluated.
                if let Expression::Identifier(identifier) = function.as_ref() {
                    if identifier.name == "quote" && arguments.len() == 1 {
                        return self.quote(arguments[0].clone(), env);
                    }
                }
                let function = self.eval_expression(function, env);
                if function.is_error() {
                    return function;
                }
                let arguments = match self.eval_expressions(arguments, env) {
                    Ok(arguments) => arguments,
                    Err(error) => return error,
                };
                self.apply_function(&function, &arguments)
            }
            Expression::ArrayLiteral { elements, .. } => {
                match self.eval_expressions(elements, env) {
                    Ok(elements) => Value::Array(Rc::new(elements)),
                    Err(error) => error,
                }
            }
            Expression::Index { left, index, .. } => {
                let left = self.eval_expression(left, env);
                if left.is_error() {
                    return left;
                }
                let index = self.eval_expression(index, env);
                if index.is_error() {
                    return index;
                }
                eval_index_expression(&left, &index)
            }
            Expression::HashLiteral { pairs, .. } => self.eval_hash_literal(pairs, env),
            // A macro literal in expression position has no runtime value;
            // macro definitions are stripped before evaluation.
            Expression::MacroLiteral { .. } => Value::Null,
        }
    }

    fn eval_identifier(&mut self, name: &str, env: &Env) -> Value {
        if let Some(value) = env.borrow().get(name) {
            return value;
        }
        if let Some(builtin) = Builtin::lookup(name) {
            return Value::Builtin(builtin);
        }
        Value::Error(format!("identifier not found: {name}"))
    }

    /// Evaluates expressions left to right, stopping at the first error.
    fn eval_expressions(
        &mut self,
        expressions: &[Expression],
        env: &Env,
    ) -> Result<Vec<Value>, Value> {
        let mut values = Vec::with_capacity(expressions.len());
        for expression in expressions {
            let value = self.eval_expression(expression, env);
            if value.is_error() {
                return Err(value);
            }
            values.push(value);
        }
        Ok(values)
    }

    pub(crate) fn apply_function(&mut self, function: &Value, arguments: &[Value]) -> Value {
        match function {
            Value::Function(function) => {
                let env = Environment::new_enclosed(function.env.clone());
                for (parameter, argument) in function.parameters.iter().zip(arguments) {
                    env.borrow_mut().set(&parameter.name, argument.clone());
                }
                match self.eval_block(&function.body, &env) {
                    Value::ReturnValue(inner) => *inner,
                    other => other,
                }
            }
            Value::Builtin(builtin) => builtin.call(arguments, self.print),
            other => Value::Error(format!("not a function: {}", other.type_name())),
        }
    }

    fn eval_hash_literal(&mut self, pairs: &[(Expression, Expression)], env: &Env) -> Value {
        let mut evaluated = IndexMap::new();
        for (key_expression, value_expression) in pairs {
            let key = self.eval_expression(key_expression, env);
            if key.is_error() {
                return key;
            }
            let Some(hash_key) = key.hash_key() else {
                return Value::Error(format!("unusable as hash key: {}", key.type_name()));
            };
            let value = self.eval_expression(value_expression, env);
            if value.is_error() {
                return value;
            }
            evaluated.insert(hash_key, HashPair { key, value });
        }
        Value::Hash(Rc::new(evaluated))
    }
}

fn eval_prefix_expression(operator: PrefixOperator, right: &Value) -> Value {
    match operator {
        PrefixOperator::Bang => eval_bang_expression(right),
        PrefixOperator::Minus => match right {
            Value::Integer(value) => Value::Integer(value.wrapping_neg()),
            other => Value::Error(format!("unknown operator: -{}", other.type_name())),
        },
    }
}

fn eval_bang_expression(right: &Value) -> Value {
    let negated = match right {
        Value::Boolean(value) => !value,
        Value::Null => true,
        // Zero is the only falsy integer under `!`.
        Value::Integer(0) => true,
        _ => false,
    };
    Value::Boolean(negated)
}

fn eval_infix_expression(operator: InfixOperator, left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Integer(left), Value::Integer(right)) => {
            eval_integer_infix_expression(operator, *left, *right)
        }
        (Value::Boolean(left), Value::Boolean(right)) => {
            eval_boolean_infix_expression(operator, *left, *right)
        }
        (Value::Str(left), Value::Str(right)) => {
            if operator == InfixOperator::Plus {
                let mut concatenated = String::with_capacity(left.len() + right.len());
                concatenated.push_str(left);
                concatenated.push_str(right);
                Value::Str(Rc::from(concatenated))
            } else {
                Value::Error(format!("unknown operator: STRING {operator} STRING"))
            }
        }
        _ if left.type_name() == right.type_name() => Value::Error(format!(
            "unknown operator: {} {operator} {}",
            left.type_name(),
            right.type_name()
        )),
        _ => Value::Error(format!(
            "type mismatch: {} {operator} {}",
            left.type_name(),
            right.type_name()
        )),
    }
}

fn eval_integer_infix_expression(operator: InfixOperator, left: i64, right: i64) -> Value {
    match operator {
        InfixOperator::Plus => Value::Integer(left.wrapping_add(right)),
        InfixOperator::Minus => Value::Integer(left.wrapping_sub(right)),
        InfixOperator::Asterisk => Value::Integer(left.wrapping_mul(right)),
        InfixOperator::Slash => {
            if right == 0 {
                Value::Error("division by zero".to_string())
            } else {
                // Truncating division, matching the VM.
                Value::Integer(left.wrapping_div(right))
            }
        }
        InfixOperator::BitAnd => Value::Integer(left & right),
        InfixOperator::BitOr => Value::Integer(left | right),
        InfixOperator::Lt => Value::Boolean(left < right),
        InfixOperator::Gt => Value::Boolean(left > right),
        InfixOperator::Eq => Value::Boolean(left == right),
        InfixOperator::NotEq => Value::Boolean(left != right),
        InfixOperator::LogicAnd | InfixOperator::LogicOr => {
            Value::Error(format!("unknown operator: INTEGER {operator} INTEGER"))
        }
    }
}

fn eval_boolean_infix_expression(operator: InfixOperator, left: bool, right: bool) -> Value {
    match operator {
        InfixOperator::LogicAnd => Value::Boolean(left && right),
        InfixOperator::LogicOr => Value::Boolean(left || right),
        InfixOperator::Eq => Value::Boolean(left == right),
        InfixOperator::NotEq => Value::Boolean(left != right),
        _ => Value::Error(format!("unknown operator: BOOLEAN {operator} BOOLEAN")),
    }
}

fn eval_index_expression(left: &Value, index: &Value) -> Value {
    match (left, index) {
        (Value::Array(elements), Value::Integer(i)) => {
            if *i < 0 || *i >= elements.len() as i64 {
                Value::Null
            } else {
                elements[*i as usize].clone()
            }
        }
        (Value::Hash(pairs), key) => match key.hash_key() {
            Some(hash_key) => pairs
                .get(&hash_key)
                .map_or(Value::Null, |pair| pair.value.clone()),
            None => Value::Error(format!("unusable as hash key: {}", key.type_name())),
        },
        _ => Value::Error(format!(
            "index operator not supported: {}",
            left.type_name()
        )),
    }
}
