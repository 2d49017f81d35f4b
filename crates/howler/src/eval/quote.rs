//! `quote` / `unquote`: expressions as values.
//!
//! `quote(expr)` wraps its unevaluated argument in a [`Value::Quote`], after
//! replacing every `unquote(x)` call inside it with the evaluation of `x`
//! converted back into an AST node. Only integers, booleans and quotes
//! convert; any other result leaves the original call node in place.

use std::rc::Rc;

use super::Evaluator;
use crate::ast::{self, Expression};
use crate::env::Env;
use crate::io::PrintWriter;
use crate::token::{Token, TokenKind};
use crate::value::Value;

impl<P: PrintWriter> Evaluator<'_, P> {
    pub(crate) fn quote(&mut self, expression: Expression, env: &Env) -> Value {
        let processed = self.eval_unquote_calls(expression, env);
        Value::Quote(Rc::new(processed))
    }

    fn eval_unquote_calls(&mut self, expression: Expression, env: &Env) -> Expression {
        ast::modify_expression(expression, &mut |node| {
            if !is_unquote_call(&node) {
                return node;
            }
            let Expression::Call { arguments, .. } = &node else {
                return node;
            };
            if arguments.len() != 1 {
                return node;
            }
            let unquoted = self.eval_expression(&arguments[0], env);
            convert_value_to_expression(&unquoted).unwrap_or(node)
        })
    }
}

fn is_unquote_call(expression: &Expression) -> bool {
    match expression {
        Expression::Call { function, .. } => {
            matches!(function.as_ref(), Expression::Identifier(identifier) if identifier.name == "unquote")
        }
        _ => false,
    }
}

/// Converts an evaluated value back into an AST node; `None` for values that
/// have no literal form.
fn convert_value_to_expression(value: &Value) -> Option<Expression> {
    match value {
        Value::Integer(integer) => Some(Expression::IntegerLiteral {
            token: Token::new(TokenKind::Int, integer.to_string()),
            value: *integer,
        }),
        Value::Boolean(boolean) => {
            let token = if *boolean {
                Token::new(TokenKind::True, "true")
            } else {
                Token::new(TokenKind::False, "false")
            };
            Some(Expression::BooleanLiteral {
                token,
                value: *boolean,
            })
        }
        Value::Quote(node) => Some(node.as_ref().clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Environment;
    use crate::io::NoPrint;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn eval_input(input: &str) -> Value {
        let mut parser = Parser::new(Lexer::new(input));
        let program = parser.parse_program();
        assert!(parser.errors().is_empty(), "parse errors: {:?}", parser.errors());
        let env = Environment::new();
        let mut print = NoPrint;
        Evaluator::new(&mut print).eval_program(&program, &env)
    }

    fn assert_quotes(cases: &[(&str, &str)]) {
        for (input, expected) in cases {
            let value = eval_input(input);
            let Value::Quote(node) = &value else {
                panic!("expected quote for {input:?}, got {value:?}");
            };
            assert_eq!(&node.to_string(), expected, "input {input:?}");
        }
    }

    #[test]
    fn test_quote() {
        assert_quotes(&[
            ("quote(5)", "5"),
            ("quote(5 + 8)", "(5 + 8)"),
            ("quote(foobar)", "foobar"),
            ("quote(foobar + barfoo)", "(foobar + barfoo)"),
        ]);
    }

    #[test]
    fn test_quote_unquote() {
        assert_quotes(&[
            ("quote(unquote(4))", "4"),
            ("quote(unquote(4 + 4))", "8"),
            ("quote(8 + unquote(4 + 4))", "(8 + 8)"),
            ("quote(unquote(4 + 4) + 8)", "(8 + 8)"),
            ("let foobar = 8; quote(foobar)", "foobar"),
            ("let foobar = 8; quote(unquote(foobar))", "8"),
            ("quote(unquote(true))", "true"),
            ("quote(unquote(true == false))", "false"),
            ("quote(unquote(quote(4 + 4)))", "(4 + 4)"),
            (
                "let quotedInfixExpression = quote(4 + 4);
                 quote(unquote(4 + 4) + unquote(quotedInfixExpression))",
                "(8 + (4 + 4))",
            ),
        ]);
    }

    #[test]
    fn test_quote_inspect() {
        assert_eq!(eval_input("quote(5 + 8)").inspect(), "QUOTE((5 + 8))");
    }

    #[test]
    fn test_unconvertible_unquote_leaves_node_in_place() {
        // A string has no literal conversion, so the call node survives.
        assert_quotes(&[("quote(unquote(\"hi\"))", "unquote(hi)")]);
    }
}
