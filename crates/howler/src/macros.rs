//! Macro definition and expansion.
//!
//! Runs between parsing and either pipeline. The define phase strips
//! `let NAME = macro(...) {...};` statements from the program's top level and
//! binds them in a dedicated macro environment; the expansion phase rewrites
//! every call to a defined macro with the AST node its body evaluates to.
//! Macro arguments are never evaluated: each parameter is bound to the
//! argument's AST wrapped in a quote value.

use std::rc::Rc;

use crate::ast::{self, Expression, Program, Statement};
use crate::env::{Env, Environment};
use crate::eval::Evaluator;
use crate::io::PrintWriter;
use crate::value::{MacroValue, Value};

/// Removes top-level macro definitions from `program` and binds them in
/// `env`.
pub fn define_macros(program: &mut Program, env: &Env) {
    program.statements.retain(|statement| {
        if let Some((name, macro_value)) = as_macro_definition(statement, env) {
            env.borrow_mut().set(name, Value::Macro(Rc::new(macro_value)));
            false
        } else {
            true
        }
    });
}

fn as_macro_definition(statement: &Statement, env: &Env) -> Option<(String, MacroValue)> {
    let Statement::Let { name, value, .. } = statement else {
        return None;
    };
    let Expression::MacroLiteral {
        parameters, body, ..
    } = value
    else {
        return None;
    };
    Some((
        name.name.clone(),
        MacroValue {
            parameters: parameters.clone(),
            body: body.clone(),
            env: env.clone(),
        },
    ))
}

/// Replaces every call to a macro bound in `env` with the node produced by
/// evaluating the macro body against quote-wrapped arguments.
///
/// # Errors
///
/// Returns an error when a macro body evaluates to anything other than a
/// quote value.
pub fn expand_macros(
    program: Program,
    env: &Env,
    print: &mut impl PrintWriter,
) -> Result<Program, String> {
    let mut failure: Option<String> = None;
    let mut evaluator = Evaluator::new(print);

    let expanded = ast::modify_program(program, &mut |expression| {
        if failure.is_some() {
            return expression;
        }
        let Some((macro_value, arguments)) = as_macro_call(&expression, env) else {
            return expression;
        };

        let eval_env = Environment::new_enclosed(macro_value.env.clone());
        for (parameter, argument) in macro_value.parameters.iter().zip(&arguments) {
            eval_env
                .borrow_mut()
                .set(&parameter.name, Value::Quote(Rc::new(argument.clone())));
        }

        match evaluator.eval_block(&macro_value.body, &eval_env) {
            Value::Quote(node) => node.as_ref().clone(),
            Value::ReturnValue(inner) => match *inner {
                Value::Quote(node) => node.as_ref().clone(),
                other => {
                    failure = Some(unexpected_macro_result(&other));
                    expression
                }
            },
            other => {
                failure = Some(unexpected_macro_result(&other));
                expression
            }
        }
    });

    match failure {
        Some(message) => Err(message),
        None => Ok(expanded),
    }
}

fn unexpected_macro_result(value: &Value) -> String {
    format!(
        "we only support returning AST-nodes from macros, got {}",
        value.type_name()
    )
}

fn as_macro_call(expression: &Expression, env: &Env) -> Option<(Rc<MacroValue>, Vec<Expression>)> {
    let Expression::Call {
        function,
        arguments,
        ..
    } = expression
    else {
        return None;
    };
    let Expression::Identifier(identifier) = function.as_ref() else {
        return None;
    };
    match env.borrow().get(&identifier.name) {
        Some(Value::Macro(macro_value)) => Some((macro_value, arguments.clone())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::NoPrint;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn parse(input: &str) -> Program {
        let mut parser = Parser::new(Lexer::new(input));
        let program = parser.parse_program();
        assert!(parser.errors().is_empty(), "parse errors: {:?}", parser.errors());
        program
    }

    #[test]
    fn test_define_macros() {
        let mut program = parse(
            "let number = 1;
             let function = fn(x, y) { x + y };
             let mymacro = macro(x, y) { x + y; };",
        );
        let env = Environment::new();
        define_macros(&mut program, &env);

        assert_eq!(program.statements.len(), 2);
        assert_eq!(env.borrow().get("number"), None);
        assert_eq!(env.borrow().get("function"), None);

        let bound = env.borrow().get("mymacro").expect("macro not in environment");
        let Value::Macro(macro_value) = bound else {
            panic!("expected macro, got {bound:?}");
        };
        assert_eq!(macro_value.parameters.len(), 2);
        assert_eq!(macro_value.parameters[0].name, "x");
        assert_eq!(macro_value.parameters[1].name, "y");
        assert_eq!(macro_value.body.to_string(), "(x + y)");
    }

    #[test]
    fn test_expand_macros() {
        let cases = [
            (
                "let infixExpression = macro() { quote(1 + 2); };
                 infixExpression();",
                "(1 + 2)",
            ),
            (
                "let reverse = macro(a, b) { quote(unquote(b) - unquote(a)); };
                 reverse(2 + 2, 10 - 5);",
                "((10 - 5) - (2 + 2))",
            ),
            (
                "let unless = macro(condition, consequence, alternative) {
                     quote(if (!(unquote(condition))) {
                         unquote(consequence);
                     } else {
                         unquote(alternative);
                     });
                 };
                 unless(10 > 5, puts(\"not greater\"), puts(\"greater\"));",
                "if (!(10 > 5)) {puts(not greater)} else {puts(greater)}",
            ),
        ];
        for (input, expected) in cases {
            let mut program = parse(input);
            let env = Environment::new();
            define_macros(&mut program, &env);
            let mut print = NoPrint;
            let expanded = expand_macros(program, &env, &mut print).unwrap();
            assert_eq!(expanded.to_string(), expected, "input {input:?}");
        }
    }

    #[test]
    fn test_macro_arguments_are_not_pre_evaluated() {
        // `undefinedVariable` would error if the argument were evaluated.
        let mut program = parse(
            "let ignore = macro(a) { quote(1); };
             ignore(undefinedVariable);",
        );
        let env = Environment::new();
        define_macros(&mut program, &env);
        let mut print = NoPrint;
        let expanded = expand_macros(program, &env, &mut print).unwrap();
        assert_eq!(expanded.to_string(), "1");
    }

    #[test]
    fn test_macro_body_must_produce_a_quote() {
        let mut program = parse(
            "let bad = macro() { 1 + 2; };
             bad();",
        );
        let env = Environment::new();
        define_macros(&mut program, &env);
        let mut print = NoPrint;
        let error = expand_macros(program, &env, &mut print).unwrap_err();
        assert_eq!(
            error,
            "we only support returning AST-nodes from macros, got INTEGER"
        );
    }
}
