//! Instruction decoding from the binary format

use super::{Instruction, Operand};
use crate::parser::opcode::{OpCode, OperandShape, OPERAND_TABLE};
use byteorder::{ByteOrder, LittleEndian};

/// Error type for instruction decoding
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("empty script")]
    EmptyScript,
    #[error("offset {offset} is outside a script of {len} bytes")]
    OffsetOutOfRange { offset: usize, len: usize },
    #[error("undefined opcode {opcode:#04x} at position {position}")]
    UndefinedOpcode { opcode: u8, position: usize },
    #[error("instruction at position {position} needs {needed} bytes, {available} available")]
    Truncated {
        position: usize,
        needed: usize,
        available: usize,
    },
    #[error("cannot read {requested} bytes from an operand of {available} bytes")]
    OperandTooSmall { requested: usize, available: usize },
}

/// Decode one instruction at `start`.
///
/// Steps, in order:
/// 1. Read the opcode byte and reject undefined opcodes.
/// 2. Look up the operand shape in [`OPERAND_TABLE`].
/// 3. For a length-prefixed operand, read the little-endian prefix.
/// 4. Reject any operand that extends past the end of the script.
pub(crate) fn decode_at(script: &[u8], start: usize) -> Result<Instruction, DecodeError> {
    if script.is_empty() {
        return Err(DecodeError::EmptyScript);
    }
    if start >= script.len() {
        return Err(DecodeError::OffsetOutOfRange {
            offset: start,
            len: script.len(),
        });
    }

    let byte = script[start];
    let (opcode, shape) = match (OpCode::from_u8(byte), OPERAND_TABLE[byte as usize]) {
        (Some(opcode), Some(shape)) => (opcode, shape),
        _ => {
            return Err(DecodeError::UndefinedOpcode {
                opcode: byte,
                position: start,
            })
        }
    };

    let operand_start = start + 1;
    let available = script.len() - operand_start;
    let truncated = |needed: usize| DecodeError::Truncated {
        position: start,
        needed,
        available,
    };

    let (prefix, payload_start, payload_len) = match shape {
        OperandShape::Fixed(n) => (0, operand_start, n),
        OperandShape::Prefixed(width) => {
            if width > available {
                return Err(truncated(width));
            }
            let prefix_bytes = &script[operand_start..operand_start + width];
            let prefix = match width {
                1 => prefix_bytes[0] as usize,
                2 => LittleEndian::read_u16(prefix_bytes) as usize,
                _ => LittleEndian::read_u32(prefix_bytes) as usize,
            };
            (prefix, operand_start + width, prefix)
        }
    };

    let operand_size = shape
        .prefix_width()
        .checked_add(payload_len)
        .ok_or_else(|| truncated(usize::MAX))?;
    if operand_size > available {
        return Err(truncated(operand_size));
    }

    Ok(Instruction {
        opcode,
        operand: Operand {
            prefix,
            data: script[payload_start..payload_start + payload_len].to_vec(),
            size: operand_size,
        },
        position: start,
        size: 1 + operand_size,
    })
}

/// Iterator walking instructions forward through a script
pub struct InstructionIterator<'a> {
    script: &'a [u8],
    pos: usize,
    pending: Option<Instruction>,
    ended: bool,
}

impl<'a> InstructionIterator<'a> {
    /// Create a new instruction iterator starting at `start`
    pub fn new(script: &'a [u8], start: usize) -> Self {
        InstructionIterator {
            script,
            pos: start,
            pending: None,
            ended: false,
        }
    }

    pub(crate) fn starting_with(script: &'a [u8], first: Instruction) -> Self {
        InstructionIterator {
            script,
            pos: first.next_position(),
            pending: Some(first),
            ended: false,
        }
    }
}

impl<'a> Iterator for InstructionIterator<'a> {
    type Item = Result<Instruction, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(first) = self.pending.take() {
            return Some(Ok(first));
        }
        if self.ended || self.pos >= self.script.len() {
            self.ended = true;
            return None;
        }

        match decode_at(self.script, self.pos) {
            Ok(instruction) => {
                self.pos = instruction.next_position();
                Some(Ok(instruction))
            }
            Err(e) => {
                self.ended = true;
                Some(Err(e))
            }
        }
    }
}
