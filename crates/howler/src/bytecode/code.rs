//! Compiled code objects: instruction streams, the constant pool, and the
//! serializable [`Bytecode`] container.

use std::fmt;
use std::ops::Index;
use std::rc::Rc;

use super::op::{read_operands, Definition, Opcode};
use crate::value::Value;

/// A flat byte stream of encoded instructions.
///
/// `Display` renders the human-readable disassembly, one instruction per
/// line: a four-digit byte offset, the opcode name, then the operands.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Instructions(Vec<u8>);

impl Instructions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Appends another instruction stream, returning the offset where it
    /// starts.
    pub fn extend(&mut self, other: &Self) -> usize {
        let position = self.0.len();
        self.0.extend_from_slice(&other.0);
        position
    }

    /// Drops everything at and after `position`.
    pub fn truncate(&mut self, position: usize) {
        self.0.truncate(position);
    }

    /// Overwrites bytes starting at `position` with `replacement`.
    ///
    /// # Panics
    ///
    /// Panics if the replacement runs past the end of the stream; the
    /// compiler only rewrites instructions it has already emitted.
    pub fn replace_at(&mut self, position: usize, replacement: &Self) {
        self.0[position..position + replacement.len()].copy_from_slice(&replacement.0);
    }
}

impl From<Vec<u8>> for Instructions {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Index<usize> for Instructions {
    type Output = u8;

    fn index(&self, index: usize) -> &u8 {
        &self.0[index]
    }
}

impl fmt::Display for Instructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut i = 0;
        while i < self.0.len() {
            let Some(op) = Opcode::lookup(self.0[i]) else {
                writeln!(f, "ERROR: opcode {} undefined", self.0[i])?;
                i += 1;
                continue;
            };
            let definition = op.definition();
            let (operands, read) = read_operands(definition, &self.0[i + 1..]);
            writeln!(f, "{i:04} {}", format_instruction(definition, &operands))?;
            i += 1 + read;
        }
        Ok(())
    }
}

fn format_instruction(definition: &Definition, operands: &[usize]) -> String {
    let operand_count = definition.operand_widths.len();
    if operands.len() != operand_count {
        return format!(
            "ERROR: operand len {} does not match defined {}",
            operands.len(),
            operand_count
        );
    }
    match operands {
        [] => definition.name.to_string(),
        [a] => format!("{} {a}", definition.name),
        [a, b] => format!("{} {a} {b}", definition.name),
        _ => format!("ERROR: unhandled operand count for {}", definition.name),
    }
}

/// A function lowered to bytecode: its instructions plus the frame layout
/// the VM needs (how many local slots to reserve, how many of them are
/// parameters).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CompiledFunction {
    pub instructions: Instructions,
    pub num_locals: usize,
    pub num_parameters: usize,
}

/// A compiled function together with the values it captured.
#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    pub function: Rc<CompiledFunction>,
    pub free: Vec<Value>,
}

/// A constant-pool entry.
///
/// Only literals and compiled functions can appear in a pool, which is what
/// makes [`Bytecode`] serializable: closures and environments exist only at
/// run time.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Constant {
    Integer(i64),
    Str(String),
    Function(CompiledFunction),
}

impl Constant {
    /// The runtime value this constant loads as.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Integer(value) => Value::Integer(*value),
            Self::Str(text) => Value::Str(Rc::from(text.as_str())),
            Self::Function(function) => Value::CompiledFunction(Rc::new(function.clone())),
        }
    }
}

/// A compiled program: the top-level instruction stream and its constant
/// pool. This is the compiler's output, the VM's input, and the persisted
/// wire format.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bytecode {
    pub instructions: Instructions,
    pub constants: Vec<Constant>,
}

impl Bytecode {
    /// Serializes to the compact binary format.
    ///
    /// # Errors
    ///
    /// Returns an error when encoding fails, which only happens on allocation
    /// failure.
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Deserializes a program previously written by [`Self::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns an error when the input is truncated or malformed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::op::make;

    #[test]
    fn test_disassembly() {
        let mut instructions = Instructions::new();
        for piece in [
            make(Opcode::Add, &[]),
            make(Opcode::GetLocal, &[1]),
            make(Opcode::Constant, &[2]),
            make(Opcode::Constant, &[65535]),
            make(Opcode::Closure, &[65535, 255]),
        ] {
            instructions.extend(&piece);
        }
        let expected = "0000 OpAdd\n\
                        0001 OpGetLocal 1\n\
                        0003 OpConstant 2\n\
                        0006 OpConstant 65535\n\
                        0009 OpClosure 65535 255\n";
        assert_eq!(instructions.to_string(), expected);
    }

    #[test]
    fn test_disassembly_reports_undefined_opcodes() {
        let instructions = Instructions::from(vec![200, Opcode::Pop as u8]);
        assert_eq!(
            instructions.to_string(),
            "ERROR: opcode 200 undefined\n0001 OpPop\n"
        );
    }

    #[test]
    fn test_replace_at() {
        let mut instructions = make(Opcode::JumpNotTruthy, &[9999]);
        instructions.replace_at(0, &make(Opcode::JumpNotTruthy, &[7]));
        assert_eq!(
            instructions.as_bytes(),
            make(Opcode::JumpNotTruthy, &[7]).as_bytes()
        );
    }

    #[test]
    fn test_bytecode_round_trips_through_postcard() {
        let mut instructions = Instructions::new();
        instructions.extend(&make(Opcode::Constant, &[0]));
        instructions.extend(&make(Opcode::Pop, &[]));
        let bytecode = Bytecode {
            instructions,
            constants: vec![
                Constant::Integer(7),
                Constant::Str("hello".to_string()),
                Constant::Function(CompiledFunction {
                    instructions: make(Opcode::Return, &[]),
                    num_locals: 1,
                    num_parameters: 0,
                }),
            ],
        };

        let bytes = bytecode.to_bytes().unwrap();
        let decoded = Bytecode::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, bytecode);
    }
}
