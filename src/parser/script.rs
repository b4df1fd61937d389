//! Eagerly decoded programs

use super::instruction::{DecodeError, Instruction, InstructionIterator};
use std::fmt;

/// A program together with every instruction it decodes to.
///
/// Construction walks the whole byte string once and fails on the first
/// malformed instruction, so the engine never meets a decode error mid-run.
/// An empty script is valid and contains no instructions.
#[derive(Clone, PartialEq, Eq)]
pub struct Script {
    bytes: Vec<u8>,
    instructions: Vec<Instruction>,
}

impl Script {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, DecodeError> {
        let bytes = bytes.into();
        let instructions = InstructionIterator::new(&bytes, 0).collect::<Result<Vec<_>, _>>()?;
        Ok(Script {
            bytes,
            instructions,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// The instruction starting exactly at `position`, `None` if `position`
    /// is not an instruction boundary
    pub fn instruction_at(&self, position: usize) -> Option<&Instruction> {
        self.instructions
            .binary_search_by_key(&position, |i| i.position)
            .ok()
            .map(|index| &self.instructions[index])
    }

    /// Whether `position` is an instruction boundary or the end of the script
    pub fn is_boundary(&self, position: usize) -> bool {
        position == self.bytes.len() || self.instruction_at(position).is_some()
    }
}

impl TryFrom<&[u8]> for Script {
    type Error = DecodeError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Script::new(bytes)
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Script")
            .field("bytes", &hex::encode(&self.bytes))
            .field("instructions", &self.instructions.len())
            .finish()
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instruction in &self.instructions {
            writeln!(f, "{:04}: {}", instruction.position, instruction)?;
        }
        Ok(())
    }
}
