//! A stack-based bytecode virtual machine written in Rust.
//!
//! stackvm decodes compact bytecode scripts and executes them on an
//! evaluation stack of dynamically typed values: arbitrary-precision
//! integers, byte strings, booleans, and shared arrays, structs and maps.
//!
//! # Modules
//!
//! - [`parser`] -- Opcode table, instruction decoder and eagerly decoded [`parser::Script`]s.
//! - [`runtime`] -- Values, the evaluation stack, slots, the dispatch table and the [`runtime::Engine`].
//! - [`builder`] -- [`builder::ScriptBuilder`] for assembling scripts with the most compact encodings.
//!
//! # Example
//!
//! Assemble a script, run it, and inspect the result:
//!
//! ```
//! use stackvm::builder::ScriptBuilder;
//! use stackvm::parser::opcode::OpCode;
//! use stackvm::runtime::{Engine, Value, VmState};
//!
//! let script = ScriptBuilder::new()
//!     .push_int(40)
//!     .push_int(2)
//!     .emit(OpCode::Add)
//!     .build();
//!
//! let mut engine = Engine::load(script).unwrap();
//! assert_eq!(engine.run(), VmState::Halt);
//! assert_eq!(engine.stack().values(), &[Value::from_int(42)]);
//! ```
//!
//! Errors raised while executing put the engine into `Fault`; the error is
//! kept for inspection and nothing is rolled back.
//!
//! ```
//! use stackvm::runtime::{Engine, RuntimeError, VmState};
//!
//! // PUSH1 PUSH0 DIV
//! let mut engine = Engine::load(vec![0x11, 0x10, 0xa1]).unwrap();
//! assert_eq!(engine.run(), VmState::Fault);
//! assert_eq!(engine.error(), Some(&RuntimeError::DivisionByZero));
//! ```

pub mod builder;
pub mod parser;
pub mod runtime;
