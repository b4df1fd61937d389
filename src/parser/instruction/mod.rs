//! Instruction representation and decoding
//!
//! An [`Instruction`] is a decoded view of one opcode and its operand at a
//! byte position in a script. Decoding is stateless: any instruction boundary
//! can be decoded on its own, and [`Instruction::walk`] continues forward from
//! an already decoded instruction.

pub mod decode;

pub use decode::{DecodeError, InstructionIterator};

use super::opcode::OpCode;
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;

/// Operand bytes following an opcode
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Operand {
    /// Decoded length prefix, 0 when the opcode has no prefix
    pub prefix: usize,
    /// Payload bytes after any length prefix
    pub data: Vec<u8>,
    /// Total operand length in the script, prefix bytes included
    pub size: usize,
}

macro_rules! read_fixed {
    ($name:ident, $t:ty, $width:expr, $read:expr) => {
        #[doc = concat!("Read a little-endian `", stringify!($t), "` from the start of the payload")]
        pub fn $name(&self) -> Result<$t, DecodeError> {
            let bytes = self.take($width)?;
            Ok($read(bytes))
        }
    };
}

impl Operand {
    fn take(&self, width: usize) -> Result<&[u8], DecodeError> {
        if width > self.data.len() {
            return Err(DecodeError::OperandTooSmall {
                requested: width,
                available: self.data.len(),
            });
        }
        Ok(&self.data[..width])
    }

    read_fixed!(read_u8, u8, 1, |b: &[u8]| b[0]);
    read_fixed!(read_i8, i8, 1, |b: &[u8]| b[0] as i8);
    read_fixed!(read_u16, u16, 2, LittleEndian::read_u16);
    read_fixed!(read_i16, i16, 2, LittleEndian::read_i16);
    read_fixed!(read_u32, u32, 4, LittleEndian::read_u32);
    read_fixed!(read_i32, i32, 4, LittleEndian::read_i32);

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// A decoded instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: OpCode,
    pub operand: Operand,
    /// Byte offset of the opcode in the script
    pub position: usize,
    /// Opcode byte plus operand bytes
    pub size: usize,
}

impl Instruction {
    /// Decode the instruction starting at `start`
    pub fn decode(script: &[u8], start: usize) -> Result<Instruction, DecodeError> {
        decode::decode_at(script, start)
    }

    /// Offset of the instruction that follows this one
    pub fn next_position(&self) -> usize {
        self.position + self.size
    }

    /// Iterate from this instruction to the end of `script`
    pub fn walk(self, script: &[u8]) -> InstructionIterator<'_> {
        InstructionIterator::starting_with(script, self)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        if !self.operand.data.is_empty() {
            write!(f, " {}", hex::encode(&self.operand.data))?;
        }
        Ok(())
    }
}
