//! Bytecode runtime
//!
//! This module provides the execution engine: the evaluation stack, the value
//! representation, slots and call frames, the opcode dispatch table and the
//! instruction handlers.

pub mod diagnostics;
pub mod engine;
pub mod frame;
pub mod jump_table;
pub mod ops;
pub mod reference;
pub mod slot;
pub mod stack;
pub mod test_utils;
pub mod value;

pub use diagnostics::{DiagnosticSink, Diagnostics, StepEvent};
pub use engine::Engine;
pub use jump_table::{Handler, JumpTable, TableError};
pub use reference::ReferenceCounter;
pub use slot::Slot;
pub use stack::Stack;
pub use value::{Array, CompoundType, Map, StackItemType, Struct, Value, ValueError};

use crate::parser::instruction::DecodeError;
use crate::parser::limits;
use crate::parser::opcode::OpCode;
use serde::{Deserialize, Serialize};

/// Run state of an [`Engine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum VmState {
    /// Not started, or between steps
    None = 0,
    /// Finished successfully
    Halt = 1,
    /// Stopped by an error
    Fault = 2,
    /// Paused at a breakpoint
    Break = 4,
}

impl VmState {
    /// `Halt` and `Fault` end a run
    pub fn is_terminal(self) -> bool {
        matches!(self, VmState::Halt | VmState::Fault)
    }
}

impl Default for VmState {
    fn default() -> Self {
        VmState::None
    }
}

/// Bounds enforced while executing a script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLimits {
    pub max_stack_size: usize,
    pub max_invocation_depth: usize,
    pub max_item_size: usize,
    pub max_shift: u32,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        ExecutionLimits {
            max_stack_size: limits::MAX_STACK_SIZE,
            max_invocation_depth: limits::MAX_INVOCATION_DEPTH,
            max_item_size: limits::MAX_ITEM_SIZE,
            max_shift: limits::MAX_SHIFT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("Stack underflow")]
    StackUnderflow,
    #[error("Stack overflow: {0} items exceeds the limit")]
    StackOverflow(usize),
    #[error("Undefined opcode: {0:#04x}")]
    UndefinedOpcode(u8),
    #[error("Not implemented: {0}")]
    NotImplemented(OpCode),
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Invalid jump target: {0}")]
    InvalidJumpTarget(i64),
    #[error("Instruction pointer {0} is not an instruction boundary")]
    InvalidInstructionPointer(usize),
    #[error("{0} slot is not initialised")]
    SlotNotInitialised(&'static str),
    #[error("{0} slot is already initialised")]
    SlotAlreadyInitialised(&'static str),
    #[error("Slot index {index} out of range for {len} entries")]
    SlotIndexOutOfRange { index: usize, len: usize },
    #[error("Invocation depth exceeds the limit of {0}")]
    InvocationDepthExceeded(usize),
    #[error("Item size {size} exceeds the limit of {max} bytes")]
    ItemTooLarge { size: usize, max: usize },
    #[error("ABORT is executed: {}", .0.as_deref().unwrap_or("no message"))]
    Abort(Option<String>),
    #[error("ASSERT failed: {}", .0.as_deref().unwrap_or("no message"))]
    AssertFailed(Option<String>),
    #[error("Thrown: {0}")]
    Throw(String),
    #[error("Instruction budget exhausted")]
    InstructionBudgetExhausted,
    #[error("Execution cancelled")]
    Cancelled,
}
