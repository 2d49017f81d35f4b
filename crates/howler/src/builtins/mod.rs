//! Native functions available to programs in both pipelines.
//!
//! The enum discriminant is the builtin's global index, so `OpGetBuiltin i`
//! and the symbol table's builtin scope stay stable across both pipelines
//! and any persisted bytecode. The order is part of the wire format:
//! `len, puts, first, last, rest, push`.

mod first;
mod last;
mod len;
mod push;
mod puts;
mod rest;

use strum::{Display, EnumString, FromRepr, IntoStaticStr};

use crate::io::PrintWriter;
use crate::value::Value;

/// Enumerates every interpreter-native builtin function.
///
/// Uses strum derives for `Display`, `FromStr`, and `AsRef<str>`; all
/// variants render lowercase (e.g. `Len` -> "len").
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, FromRepr, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum Builtin {
    Len,
    Puts,
    First,
    Last,
    Rest,
    Push,
}

impl Builtin {
    /// All builtins in index order; the basis for symbol-table predefinition.
    pub const ALL: [Self; 6] = [
        Self::Len,
        Self::Puts,
        Self::First,
        Self::Last,
        Self::Rest,
        Self::Push,
    ];

    /// Resolves a source-level name to a builtin.
    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        name.parse().ok()
    }

    /// Resolves a bytecode operand back to a builtin.
    #[must_use]
    pub fn from_index(index: u8) -> Option<Self> {
        Self::from_repr(index)
    }

    /// The stable global index emitted as the `OpGetBuiltin` operand.
    #[must_use]
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Calls this builtin. Misuse is reported as a `Value::Error`, which both
    /// pipelines propagate as an ordinary value.
    pub fn call(self, args: &[Value], print: &mut impl PrintWriter) -> Value {
        match self {
            Self::Len => len::call(args),
            Self::Puts => puts::call(args, print),
            Self::First => first::call(args),
            Self::Last => last::call(args),
            Self::Rest => rest::call(args),
            Self::Push => push::call(args),
        }
    }
}

/// Error value for an arity violation.
pub(crate) fn wrong_arity(got: usize, want: usize) -> Value {
    Value::Error(format!("wrong number of arguments. got={got}, want={want}"))
}

/// Error value for a builtin applied to an unsupported type.
pub(crate) fn must_be_array(builtin: Builtin, got: &Value) -> Value {
    Value::Error(format!(
        "argument to '{builtin}' must be ARRAY, got {}",
        got.type_name()
    ))
}
