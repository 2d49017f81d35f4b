//! Runtime values shared by the tree-walking evaluator and the VM.
//!
//! `Value` is a closed sum; heavy payloads sit behind `Rc` so pushing a value
//! around the VM stack or an environment is a cheap pointer copy. Runtime
//! errors of the tree-walker are first-class `Value::Error` values, which is
//! what lets them short-circuit statement loops without a separate channel.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::{BlockStatement, Expression, Identifier};
use crate::builtins::Builtin;
use crate::bytecode::code::{Closure, CompiledFunction};
use crate::env::Env;

/// Type tag half of a [`HashKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashKind {
    Integer,
    Boolean,
    Str,
}

/// Key of a hash value: a type tag plus 64 bits derived from the value.
///
/// Integers use their own bits, booleans use 1/0, strings use the FNV-1a
/// 64-bit hash of their UTF-8 bytes. Within one tag the mapping is injective
/// for integers and booleans, and collision-resistant for strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashKey {
    pub kind: HashKind,
    pub value: u64,
}

/// FNV-1a, 64-bit variant.
#[must_use]
pub fn fnv1a_64(data: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = OFFSET_BASIS;
    for byte in data {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// One entry of a hash value. The original key is kept alongside the value
/// so `inspect` can render it.
#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    pub key: Value,
    pub value: Value,
}

/// A user function in the tree-walking pipeline: parameters, body, and the
/// environment it closed over.
#[derive(Debug)]
pub struct FunctionValue {
    pub parameters: Vec<Identifier>,
    pub body: BlockStatement,
    pub env: Env,
}

/// A macro definition: like a function, but applied to unevaluated AST.
#[derive(Debug)]
pub struct MacroValue {
    pub parameters: Vec<Identifier>,
    pub body: BlockStatement,
    pub env: Env,
}

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Boolean(bool),
    Str(Rc<str>),
    /// Wrapper that unwinds a `return` through nested blocks.
    ReturnValue(Box<Value>),
    /// A runtime error carried as a value; statement loops short-circuit on it.
    Error(String),
    Array(Rc<Vec<Value>>),
    /// Pairs keep insertion order.
    Hash(Rc<IndexMap<HashKey, HashPair>>),
    Function(Rc<FunctionValue>),
    Builtin(Builtin),
    Quote(Rc<Expression>),
    Macro(Rc<MacroValue>),
    CompiledFunction(Rc<CompiledFunction>),
    Closure(Rc<Closure>),
}

impl Value {
    pub const TRUE: Self = Self::Boolean(true);
    pub const FALSE: Self = Self::Boolean(false);

    /// The upper-case type tag used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Boolean(_) => "BOOLEAN",
            Self::Str(_) => "STRING",
            Self::ReturnValue(_) => "RETURN_VALUE",
            Self::Error(_) => "ERROR",
            Self::Array(_) => "ARRAY",
            Self::Hash(_) => "HASH",
            Self::Function(_) => "FUNCTION",
            Self::Builtin(_) => "BUILTIN",
            Self::Quote(_) => "QUOTE",
            Self::Macro(_) => "MACRO",
            Self::CompiledFunction(_) => "COMPILED_FUNCTION",
            Self::Closure(_) => "CLOSURE",
        }
    }

    /// Truthiness used by conditionals in both pipelines: only `null` and
    /// `false` are falsy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Null | Self::Boolean(false))
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// The hash key for this value, or `None` for unhashable types.
    #[must_use]
    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Self::Integer(value) => Some(HashKey {
                kind: HashKind::Integer,
                value: *value as u64,
            }),
            Self::Boolean(value) => Some(HashKey {
                kind: HashKind::Boolean,
                value: u64::from(*value),
            }),
            Self::Str(value) => Some(HashKey {
                kind: HashKind::Str,
                value: fnv1a_64(value.as_bytes()),
            }),
            _ => None,
        }
    }

    /// The canonical human-readable rendering of the value.
    #[must_use]
    pub fn inspect(&self) -> String {
        self.to_string()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::ReturnValue(a), Self::ReturnValue(b)) => a == b,
            (Self::Error(a), Self::Error(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Hash(a), Self::Hash(b)) => a == b,
            // Functions and macros have no structural identity.
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Macro(a), Self::Macro(b)) => Rc::ptr_eq(a, b),
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            (Self::Quote(a), Self::Quote(b)) => a == b,
            (Self::CompiledFunction(a), Self::CompiledFunction(b)) => a == b,
            (Self::Closure(a), Self::Closure(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Str(value) => f.write_str(value),
            Self::ReturnValue(inner) => write!(f, "{inner}"),
            Self::Error(message) => write!(f, "ERROR: {message}"),
            Self::Array(elements) => {
                let rendered: Vec<String> = elements.iter().map(Value::inspect).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
            Self::Hash(pairs) => {
                let rendered: Vec<String> = pairs
                    .values()
                    .map(|pair| format!("{}: {}", pair.key.inspect(), pair.value.inspect()))
                    .collect();
                write!(f, "{{{}}}", rendered.join(", "))
            }
            Self::Function(function) => {
                let parameters: Vec<String> =
                    function.parameters.iter().map(ToString::to_string).collect();
                write!(f, "fn({}) {{\n{}\n}}", parameters.join(", "), function.body)
            }
            Self::Builtin(_) => f.write_str("builtin function"),
            Self::Quote(node) => write!(f, "QUOTE({node})"),
            Self::Macro(r#macro) => {
                let parameters: Vec<String> =
                    r#macro.parameters.iter().map(ToString::to_string).collect();
                write!(f, "macro({}) {{\n{}\n}}", parameters.join(", "), r#macro.body)
            }
            Self::CompiledFunction(function) => {
                write!(f, "CompiledFunction[{:p}]", Rc::as_ptr(function))
            }
            Self::Closure(closure) => write!(f, "Closure[{:p}]", Rc::as_ptr(closure)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_value(text: &str) -> Value {
        Value::Str(Rc::from(text))
    }

    #[test]
    fn test_string_hash_keys() {
        let hello1 = string_value("Hello World");
        let hello2 = string_value("Hello World");
        let diff1 = string_value("My name is johnny");
        let diff2 = string_value("My name is johnny");

        assert_eq!(hello1.hash_key(), hello2.hash_key());
        assert_eq!(diff1.hash_key(), diff2.hash_key());
        assert_ne!(hello1.hash_key(), diff1.hash_key());
    }

    #[test]
    fn test_integer_and_boolean_hash_keys() {
        assert_eq!(Value::Integer(1).hash_key(), Value::Integer(1).hash_key());
        assert_ne!(Value::Integer(1).hash_key(), Value::Integer(2).hash_key());
        // Negative integers keep distinct keys.
        assert_ne!(Value::Integer(-1).hash_key(), Value::Integer(1).hash_key());
        assert_eq!(Value::TRUE.hash_key(), Value::Boolean(true).hash_key());
        assert_ne!(Value::TRUE.hash_key(), Value::FALSE.hash_key());
        // Same numeric payload under a different type tag is a different key.
        assert_ne!(Value::Integer(1).hash_key(), Value::TRUE.hash_key());
    }

    #[test]
    fn test_unhashable_values() {
        assert_eq!(Value::Null.hash_key(), None);
        assert_eq!(Value::Array(Rc::new(vec![])).hash_key(), None);
    }

    #[test]
    fn test_fnv1a_64_vectors() {
        assert_eq!(fnv1a_64(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a_64(b"a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_inspect() {
        assert_eq!(Value::Null.inspect(), "null");
        assert_eq!(Value::Integer(-42).inspect(), "-42");
        assert_eq!(Value::TRUE.inspect(), "true");
        assert_eq!(string_value("hi").inspect(), "hi");
        assert_eq!(Value::Error("boom".to_string()).inspect(), "ERROR: boom");
        let array = Value::Array(Rc::new(vec![
            Value::Integer(1),
            Value::Integer(2),
            Value::Integer(3),
        ]));
        assert_eq!(array.inspect(), "[1, 2, 3]");
    }

    #[test]
    fn test_hash_inspect_preserves_insertion_order() {
        let mut pairs = IndexMap::new();
        for (key, value) in [("b", 2), ("a", 1)] {
            let key_value = string_value(key);
            pairs.insert(
                key_value.hash_key().unwrap(),
                HashPair {
                    key: key_value,
                    value: Value::Integer(value),
                },
            );
        }
        assert_eq!(Value::Hash(Rc::new(pairs)).inspect(), "{b: 2, a: 1}");
    }
}
