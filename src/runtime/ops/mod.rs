//! Instruction handlers
//!
//! One function per opcode family, organised by category. Every handler has
//! the [`Handler`](super::jump_table::Handler) signature: it receives the
//! engine, the decoded instruction and the step's diagnostics, pops its
//! operands, pushes its results, and propagates errors with `?`.

pub mod bitwise;
pub mod compound;
pub mod control;
pub mod numeric;
pub mod push;
pub mod slot;
pub mod splice;
pub mod stack;
pub mod types;

// Re-export commonly used types for handler implementations
pub(crate) use crate::parser::instruction::Instruction;
pub(crate) use crate::runtime::diagnostics::Diagnostics;
pub(crate) use crate::runtime::engine::Engine;
pub(crate) use crate::runtime::{RuntimeError, Value};

/// Result type of every handler
pub(crate) type HandlerResult = Result<(), RuntimeError>;
