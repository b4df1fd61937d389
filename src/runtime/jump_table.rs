//! Opcode dispatch table
//!
//! A [`JumpTable`] maps every one of the 256 byte values to a [`Handler`].
//! The default table binds each opcode through the exhaustive match in
//! [`handler_for`], so adding an opcode without a handler is a compile error.
//! Bytes with no binding resolve to a handler that raises
//! [`RuntimeError::UndefinedOpcode`].

use super::diagnostics::Diagnostics;
use super::engine::Engine;
use super::ops::{bitwise, compound, control, numeric, push, slot, splice, stack, types};
use super::RuntimeError;
use crate::parser::instruction::Instruction;
use crate::parser::opcode::OpCode;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;

/// Signature shared by every instruction handler
pub type Handler = fn(&mut Engine, &Instruction, &mut Diagnostics) -> Result<(), RuntimeError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("{0} is already bound")]
    DuplicateOpcode(OpCode),
}

static SHARED: Lazy<Arc<JumpTable>> = Lazy::new(|| Arc::new(JumpTable::default()));

#[derive(Clone)]
pub struct JumpTable {
    handlers: [Handler; 256],
    bound: [bool; 256],
}

impl JumpTable {
    /// A table with nothing bound
    pub fn empty() -> Self {
        JumpTable {
            handlers: [undefined as Handler; 256],
            bound: [false; 256],
        }
    }

    /// The process-wide default table
    pub fn shared() -> Arc<JumpTable> {
        Arc::clone(&SHARED)
    }

    /// Bind a handler to an unbound opcode
    pub fn bind(&mut self, opcode: OpCode, handler: Handler) -> Result<(), TableError> {
        if self.is_bound(opcode) {
            return Err(TableError::DuplicateOpcode(opcode));
        }
        self.rebind(opcode, handler);
        Ok(())
    }

    /// Bind a handler, replacing any existing binding
    pub fn rebind(&mut self, opcode: OpCode, handler: Handler) {
        let index = opcode.byte() as usize;
        self.handlers[index] = handler;
        self.bound[index] = true;
    }

    /// Remove a binding; the opcode then faults as undefined
    pub fn unbind(&mut self, opcode: OpCode) {
        let index = opcode.byte() as usize;
        self.handlers[index] = undefined;
        self.bound[index] = false;
    }

    pub fn is_bound(&self, opcode: OpCode) -> bool {
        self.bound[opcode.byte() as usize]
    }

    pub fn handler(&self, byte: u8) -> Handler {
        self.handlers[byte as usize]
    }
}

impl Default for JumpTable {
    fn default() -> Self {
        let mut table = JumpTable::empty();
        for &opcode in OpCode::ALL {
            table.rebind(opcode, handler_for(opcode));
        }
        table
    }
}

impl fmt::Debug for JumpTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JumpTable")
            .field("bound", &self.bound.iter().filter(|b| **b).count())
            .finish()
    }
}

fn undefined(_: &mut Engine, instruction: &Instruction, _: &mut Diagnostics) -> Result<(), RuntimeError> {
    Err(RuntimeError::UndefinedOpcode(instruction.opcode.byte()))
}

/// Default handler for each opcode
pub fn handler_for(opcode: OpCode) -> Handler {
    use OpCode::*;
    match opcode {
        // Constants
        PushInt8 | PushInt16 | PushInt32 | PushInt64 | PushInt128 | PushInt256 => push::push_int,
        PushT => push::push_true,
        PushF => push::push_false,
        PushA => control::not_implemented,
        PushNull => push::push_null,
        PushData1 | PushData2 | PushData4 => push::push_data,
        PushM1 | Push0 | Push1 | Push2 | Push3 | Push4 | Push5 | Push6 | Push7 | Push8 | Push9 | Push10
        | Push11 | Push12 | Push13 | Push14 | Push15 | Push16 => push::push_small_int,

        // Flow control
        Nop => control::nop,
        Jmp | JmpL => control::jmp,
        JmpIf | JmpIfL => control::jmp_if,
        JmpIfNot | JmpIfNotL => control::jmp_if_not,
        JmpEq | JmpEqL => control::jmp_eq,
        JmpNe | JmpNeL => control::jmp_ne,
        JmpGt | JmpGtL => control::jmp_gt,
        JmpGe | JmpGeL => control::jmp_ge,
        JmpLt | JmpLtL => control::jmp_lt,
        JmpLe | JmpLeL => control::jmp_le,
        Call | CallL => control::call,
        CallA | CallT => control::not_implemented,
        Abort => control::abort,
        Assert => control::assert,
        Throw => control::throw,
        Try | TryL | EndTry | EndTryL | EndFinally => control::not_implemented,
        Ret => control::ret,
        Syscall => control::not_implemented,

        // Stack
        Depth => stack::depth,
        Drop => stack::drop,
        Nip => stack::nip,
        XDrop => stack::xdrop,
        Clear => stack::clear,
        Dup => stack::dup,
        Over => stack::over,
        Pick => stack::pick,
        Tuck => stack::tuck,
        Swap => stack::swap,
        Rot => stack::rot,
        Roll => stack::roll,
        Reverse3 => stack::reverse3,
        Reverse4 => stack::reverse4,
        ReverseN => stack::reverse_n,

        // Slots
        InitSSlot => slot::init_sslot,
        InitSlot => slot::init_slot,
        LdSFld0 | LdSFld1 | LdSFld2 | LdSFld3 | LdSFld4 | LdSFld5 | LdSFld6 | LdSFld => slot::ld_sfld,
        StSFld0 | StSFld1 | StSFld2 | StSFld3 | StSFld4 | StSFld5 | StSFld6 | StSFld => slot::st_sfld,
        LdLoc0 | LdLoc1 | LdLoc2 | LdLoc3 | LdLoc4 | LdLoc5 | LdLoc6 | LdLoc => slot::ld_loc,
        StLoc0 | StLoc1 | StLoc2 | StLoc3 | StLoc4 | StLoc5 | StLoc6 | StLoc => slot::st_loc,
        LdArg0 | LdArg1 | LdArg2 | LdArg3 | LdArg4 | LdArg5 | LdArg6 | LdArg => slot::ld_arg,
        StArg0 | StArg1 | StArg2 | StArg3 | StArg4 | StArg5 | StArg6 | StArg => slot::st_arg,

        // Splice
        Cat => splice::cat,
        Substr => splice::substr,
        Left => splice::left,
        Right => splice::right,

        // Bitwise logic
        Invert => bitwise::invert,
        And => bitwise::and,
        Or => bitwise::or,
        Xor => bitwise::xor,
        Equal => bitwise::equal,
        NotEqual => bitwise::not_equal,

        // Arithmetic
        Sign => numeric::sign,
        Abs => numeric::abs,
        Negate => numeric::negate,
        Inc => numeric::inc,
        Dec => numeric::dec,
        Add => numeric::add,
        Sub => numeric::sub,
        Mul => numeric::mul,
        Div => numeric::div,
        Mod => numeric::modulo,
        Pow => numeric::pow,
        Sqrt => numeric::sqrt,
        ModMul => numeric::mod_mul,
        ModPow => numeric::mod_pow,
        Shl => numeric::shl,
        Shr => numeric::shr,
        Not => numeric::not,
        BoolAnd => numeric::bool_and,
        BoolOr => numeric::bool_or,
        Nz => numeric::nz,
        NumEqual => numeric::num_equal,
        NumNotEqual => numeric::num_not_equal,
        Lt => numeric::lt,
        Le => numeric::le,
        Gt => numeric::gt,
        Ge => numeric::ge,
        Min => numeric::min,
        Max => numeric::max,
        Within => numeric::within,

        // Compound types
        PackMap => compound::pack_map,
        PackStruct => compound::pack_struct,
        Pack => compound::pack,
        Unpack => compound::unpack,
        NewArray0 => compound::new_array0,
        NewArray => compound::new_array,
        NewArrayT => compound::new_array_t,
        NewStruct0 => compound::new_struct0,
        NewStruct => compound::new_struct,
        NewMap => compound::new_map,
        Size => compound::size,
        HasKey => compound::has_key,
        Keys => compound::keys,
        Values => compound::values,
        PickItem => compound::pick_item,
        Append => compound::append,
        SetItem => compound::set_item,
        ReverseItems => compound::reverse_items,
        Remove => compound::remove,
        ClearItems => compound::clear_items,
        PopItem => compound::pop_item,

        // Types
        IsNull => types::is_null,
        IsType => types::is_type,
        Convert => types::convert,

        // Extensions
        AbortMsg => control::abort_msg,
        AssertMsg => control::assert_msg,
    }
}
