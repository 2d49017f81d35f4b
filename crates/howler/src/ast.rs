//! The abstract syntax tree produced by the parser.
//!
//! Every node keeps the token it originated from for diagnostics. `Display`
//! renders the canonical parenthesised form used throughout the test corpus
//! (`-a * b` renders as `((-a) * b)`), and the bytecode compiler relies on it
//! for deterministic hash-literal key ordering.

use std::fmt;

use crate::token::{Token, TokenKind};

/// Unary operator of a [`Expression::Prefix`] node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOperator {
    Bang,
    Minus,
}

impl fmt::Display for PrefixOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bang => f.write_str("!"),
            Self::Minus => f.write_str("-"),
        }
    }
}

/// Binary operator of an [`Expression::Infix`] node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOperator {
    Plus,
    Minus,
    Asterisk,
    Slash,
    Lt,
    Gt,
    Eq,
    NotEq,
    LogicAnd,
    LogicOr,
    BitAnd,
    BitOr,
}

impl InfixOperator {
    /// Maps an operator token onto its AST operator, if it is one.
    #[must_use]
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Plus => Some(Self::Plus),
            TokenKind::Minus => Some(Self::Minus),
            TokenKind::Asterisk => Some(Self::Asterisk),
            TokenKind::Slash => Some(Self::Slash),
            TokenKind::Lt => Some(Self::Lt),
            TokenKind::Gt => Some(Self::Gt),
            TokenKind::Eq => Some(Self::Eq),
            TokenKind::NotEq => Some(Self::NotEq),
            TokenKind::LogicAnd => Some(Self::LogicAnd),
            TokenKind::LogicOr => Some(Self::LogicOr),
            TokenKind::BitAnd => Some(Self::BitAnd),
            TokenKind::BitOr => Some(Self::BitOr),
            _ => None,
        }
    }
}

impl fmt::Display for InfixOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Asterisk => "*",
            Self::Slash => "/",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::LogicAnd => "&&",
            Self::LogicOr => "||",
            Self::BitAnd => "&",
            Self::BitOr => "|",
        };
        f.write_str(text)
    }
}

/// A name in source, with the token it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub token: Token,
    pub name: String,
}

impl Identifier {
    #[must_use]
    pub fn new(token: Token) -> Self {
        let name = token.literal.clone();
        Self { token, name }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A `{ ... }` delimited statement list.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStatement {
    pub token: Token,
    pub statements: Vec<Statement>,
}

impl fmt::Display for BlockStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in &self.statements {
            write!(f, "{statement}")?;
        }
        Ok(())
    }
}

/// A statement node.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Let {
        token: Token,
        name: Identifier,
        value: Expression,
    },
    Return {
        token: Token,
        value: Expression,
    },
    /// A bare expression in statement position.
    Expression { token: Token, value: Expression },
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Let { name, value, .. } => write!(f, "let {name} = {value};"),
            Self::Return { value, .. } => write!(f, "return {value};"),
            Self::Expression { value, .. } => write!(f, "{value}"),
        }
    }
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier(Identifier),
    IntegerLiteral {
        token: Token,
        value: i64,
    },
    StringLiteral {
        token: Token,
        value: String,
    },
    BooleanLiteral {
        token: Token,
        value: bool,
    },
    Prefix {
        token: Token,
        operator: PrefixOperator,
        right: Box<Expression>,
    },
    Infix {
        token: Token,
        operator: InfixOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    If {
        token: Token,
        condition: Box<Expression>,
        consequence: BlockStatement,
        alternative: Option<BlockStatement>,
    },
    FunctionLiteral {
        token: Token,
        parameters: Vec<Identifier>,
        body: BlockStatement,
    },
    Call {
        token: Token,
        function: Box<Expression>,
        arguments: Vec<Expression>,
    },
    ArrayLiteral {
        token: Token,
        elements: Vec<Expression>,
    },
    /// Pairs are kept in source order; the compiler sorts a copy when it
    /// needs a deterministic constant-pool layout.
    HashLiteral {
        token: Token,
        pairs: Vec<(Expression, Expression)>,
    },
    Index {
        token: Token,
        left: Box<Expression>,
        index: Box<Expression>,
    },
    MacroLiteral {
        token: Token,
        parameters: Vec<Identifier>,
        body: BlockStatement,
    },
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(identifier) => write!(f, "{identifier}"),
            Self::IntegerLiteral { value, .. } => write!(f, "{value}"),
            Self::StringLiteral { value, .. } => f.write_str(value),
            Self::BooleanLiteral { token, .. } => f.write_str(&token.literal),
            Self::Prefix { operator, right, .. } => write!(f, "({operator}{right})"),
            Self::Infix {
                operator,
                left,
                right,
                ..
            } => write!(f, "({left} {operator} {right})"),
            Self::If {
                condition,
                consequence,
                alternative,
                ..
            } => {
                write!(f, "if {condition} {{{consequence}}}")?;
                if let Some(alternative) = alternative {
                    write!(f, " else {{{alternative}}}")?;
                }
                Ok(())
            }
            Self::FunctionLiteral {
                parameters, body, ..
            } => {
                write!(f, "fn({}) {{{body}}}", join(parameters))
            }
            Self::Call {
                function, arguments, ..
            } => write!(f, "{function}({})", join(arguments)),
            Self::ArrayLiteral { elements, .. } => write!(f, "[{}]", join(elements)),
            Self::HashLiteral { pairs, .. } => {
                let rendered: Vec<String> = pairs
                    .iter()
                    .map(|(key, value)| format!("{key}:{value}"))
                    .collect();
                write!(f, "{{{}}}", rendered.join(", "))
            }
            Self::Index { left, index, .. } => write!(f, "({left}[{index}])"),
            Self::MacroLiteral {
                parameters, body, ..
            } => write!(f, "macro({}) {{{body}}}", join(parameters)),
        }
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// The parse result: an ordered list of top-level statements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in &self.statements {
            write!(f, "{statement}")?;
        }
        Ok(())
    }
}

/// Rewrites every expression in `program` bottom-up with `modifier`.
///
/// Children are rewritten before their parent is handed to the modifier, so a
/// replacement sees already-transformed sub-expressions. This is the engine
/// behind `unquote` substitution and macro expansion.
pub fn modify_program<F>(program: Program, modifier: &mut F) -> Program
where
    F: FnMut(Expression) -> Expression,
{
    Program {
        statements: program
            .statements
            .into_iter()
            .map(|statement| modify_statement(statement, modifier))
            .collect(),
    }
}

pub fn modify_statement<F>(statement: Statement, modifier: &mut F) -> Statement
where
    F: FnMut(Expression) -> Expression,
{
    match statement {
        Statement::Let { token, name, value } => Statement::Let {
            token,
            name,
            value: modify_expression(value, modifier),
        },
        Statement::Return { token, value } => Statement::Return {
            token,
            value: modify_expression(value, modifier),
        },
        Statement::Expression { token, value } => Statement::Expression {
            token,
            value: modify_expression(value, modifier),
        },
    }
}

fn modify_block<F>(block: BlockStatement, modifier: &mut F) -> BlockStatement
where
    F: FnMut(Expression) -> Expression,
{
    BlockStatement {
        token: block.token,
        statements: block
            .statements
            .into_iter()
            .map(|statement| modify_statement(statement, modifier))
            .collect(),
    }
}

pub fn modify_expression<F>(expression: Expression, modifier: &mut F) -> Expression
where
    F: FnMut(Expression) -> Expression,
{
    let rebuilt = match expression {
        Expression::Prefix {
            token,
            operator,
            right,
        } => Expression::Prefix {
            token,
            operator,
            right: Box::new(modify_expression(*right, modifier)),
        },
        Expression::Infix {
            token,
            operator,
            left,
            right,
        } => Expression::Infix {
            token,
            operator,
            left: Box::new(modify_expression(*left, modifier)),
            right: Box::new(modify_expression(*right, modifier)),
        },
        Expression::If {
            token,
            condition,
            consequence,
            alternative,
        } => Expression::If {
            token,
            condition: Box::new(modify_expression(*condition, modifier)),
            consequence: modify_block(consequence, modifier),
            alternative: alternative.map(|block| modify_block(block, modifier)),
        },
        Expression::FunctionLiteral {
            token,
            parameters,
            body,
        } => Expression::FunctionLiteral {
            token,
            parameters,
            body: modify_block(body, modifier),
        },
        Expression::Call {
            token,
            function,
            arguments,
        } => Expression::Call {
            token,
            function: Box::new(modify_expression(*function, modifier)),
            arguments: arguments
                .into_iter()
                .map(|argument| modify_expression(argument, modifier))
                .collect(),
        },
        Expression::ArrayLiteral { token, elements } => Expression::ArrayLiteral {
            token,
            elements: elements
                .into_iter()
                .map(|element| modify_expression(element, modifier))
                .collect(),
        },
        Expression::HashLiteral { token, pairs } => Expression::HashLiteral {
            token,
            pairs: pairs
                .into_iter()
                .map(|(key, value)| {
                    (
                        modify_expression(key, modifier),
                        modify_expression(value, modifier),
                    )
                })
                .collect(),
        },
        Expression::Index { token, left, index } => Expression::Index {
            token,
            left: Box::new(modify_expression(*left, modifier)),
            index: Box::new(modify_expression(*index, modifier)),
        },
        Expression::MacroLiteral {
            token,
            parameters,
            body,
        } => Expression::MacroLiteral {
            token,
            parameters,
            body: modify_block(body, modifier),
        },
        leaf @ (Expression::Identifier(_)
        | Expression::IntegerLiteral { .. }
        | Expression::StringLiteral { .. }
        | Expression::BooleanLiteral { .. }) => leaf,
    };
    modifier(rebuilt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    fn token(kind: TokenKind, literal: &str) -> Token {
        Token::new(kind, literal)
    }

    fn int(value: i64) -> Expression {
        Expression::IntegerLiteral {
            token: token(TokenKind::Int, &value.to_string()),
            value,
        }
    }

    #[test]
    fn test_let_statement_display() {
        let program = Program {
            statements: vec![Statement::Let {
                token: token(TokenKind::Let, "let"),
                name: Identifier::new(token(TokenKind::Ident, "myVar")),
                value: Expression::Identifier(Identifier::new(token(
                    TokenKind::Ident,
                    "anotherVar",
                ))),
            }],
        };
        assert_eq!(program.to_string(), "let myVar = anotherVar;");
    }

    #[test]
    fn test_modify_replaces_leaves_bottom_up() {
        let mut one_to_two = |expression: Expression| match expression {
            Expression::IntegerLiteral { value: 1, .. } => int(2),
            other => other,
        };

        let cases: Vec<(Expression, Expression)> = vec![
            (int(1), int(2)),
            (
                Expression::Infix {
                    token: token(TokenKind::Plus, "+"),
                    operator: InfixOperator::Plus,
                    left: Box::new(int(1)),
                    right: Box::new(int(1)),
                },
                Expression::Infix {
                    token: token(TokenKind::Plus, "+"),
                    operator: InfixOperator::Plus,
                    left: Box::new(int(2)),
                    right: Box::new(int(2)),
                },
            ),
            (
                Expression::Index {
                    token: token(TokenKind::Lbracket, "["),
                    left: Box::new(int(1)),
                    index: Box::new(int(1)),
                },
                Expression::Index {
                    token: token(TokenKind::Lbracket, "["),
                    left: Box::new(int(2)),
                    index: Box::new(int(2)),
                },
            ),
            (
                Expression::ArrayLiteral {
                    token: token(TokenKind::Lbracket, "["),
                    elements: vec![int(1), int(1)],
                },
                Expression::ArrayLiteral {
                    token: token(TokenKind::Lbracket, "["),
                    elements: vec![int(2), int(2)],
                },
            ),
        ];

        for (input, expected) in cases {
            assert_eq!(modify_expression(input, &mut one_to_two), expected);
        }
    }

    #[test]
    fn test_modify_descends_into_blocks() {
        let block = BlockStatement {
            token: token(TokenKind::Lbrace, "{"),
            statements: vec![Statement::Return {
                token: token(TokenKind::Return, "return"),
                value: int(1),
            }],
        };
        let input = Expression::FunctionLiteral {
            token: token(TokenKind::Function, "fn"),
            parameters: vec![],
            body: block,
        };

        let mut one_to_two = |expression: Expression| match expression {
            Expression::IntegerLiteral { value: 1, .. } => int(2),
            other => other,
        };
        let modified = modify_expression(input, &mut one_to_two);
        assert_eq!(modified.to_string(), "fn() {return 2;}");
    }
}
