//! Bytecode decoding
//!
//! - [`opcode`] declares the instruction set and its operand shapes.
//! - [`instruction`] decodes single instructions and walks a script forward.
//! - [`script`] decodes a whole program up front.
//! - [`limits`] holds the size and depth bounds shared with the runtime.

pub mod instruction;
pub mod limits;
pub mod opcode;
pub mod script;

pub use instruction::{DecodeError, Instruction, InstructionIterator, Operand};
pub use opcode::{OpCode, OperandShape};
pub use script::Script;
