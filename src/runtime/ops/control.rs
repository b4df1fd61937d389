//! Flow control operations
//!
//! Jump and call offsets are signed and relative to the position of the
//! instruction itself: a 1-byte operand for the short forms, 4 bytes for the
//! `_L` forms. The pointer moves in raw bytes, and a target must be an
//! instruction boundary or the end of the script.

use super::*;
use num_bigint::BigInt;

fn offset(instruction: &Instruction) -> Result<i32, RuntimeError> {
    if instruction.operand.size == 1 {
        Ok(instruction.operand.read_i8()? as i32)
    } else {
        Ok(instruction.operand.read_i32()?)
    }
}

fn jump_if(
    engine: &mut Engine,
    instruction: &Instruction,
    diagnostics: &mut Diagnostics,
    condition: bool,
) -> HandlerResult {
    if condition {
        let target = engine.jump_relative(instruction, offset(instruction)?)?;
        diagnostics.note(|| format!("jump to {target}"));
    }
    Ok(())
}

/// Pop x2 then x1 as integers and jump when `compare(x1, x2)` holds
fn jump_compare(
    engine: &mut Engine,
    instruction: &Instruction,
    diagnostics: &mut Diagnostics,
    compare: fn(&BigInt, &BigInt) -> bool,
) -> HandlerResult {
    let x2 = engine.stack_mut().pop_integer()?;
    let x1 = engine.stack_mut().pop_integer()?;
    jump_if(engine, instruction, diagnostics, compare(&x1, &x2))
}

pub fn nop(_: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    Ok(())
}

/// JMP / JMP_L
pub fn jmp(engine: &mut Engine, instruction: &Instruction, diagnostics: &mut Diagnostics) -> HandlerResult {
    jump_if(engine, instruction, diagnostics, true)
}

/// JMPIF / JMPIF_L: pop a boolean, jump when true
pub fn jmp_if(engine: &mut Engine, instruction: &Instruction, diagnostics: &mut Diagnostics) -> HandlerResult {
    let condition = engine.stack_mut().pop_bool()?;
    jump_if(engine, instruction, diagnostics, condition)
}

/// JMPIFNOT / JMPIFNOT_L: pop a boolean, jump when false
pub fn jmp_if_not(engine: &mut Engine, instruction: &Instruction, diagnostics: &mut Diagnostics) -> HandlerResult {
    let condition = engine.stack_mut().pop_bool()?;
    jump_if(engine, instruction, diagnostics, !condition)
}

pub fn jmp_eq(engine: &mut Engine, instruction: &Instruction, diagnostics: &mut Diagnostics) -> HandlerResult {
    jump_compare(engine, instruction, diagnostics, |a, b| a == b)
}

pub fn jmp_ne(engine: &mut Engine, instruction: &Instruction, diagnostics: &mut Diagnostics) -> HandlerResult {
    jump_compare(engine, instruction, diagnostics, |a, b| a != b)
}

pub fn jmp_gt(engine: &mut Engine, instruction: &Instruction, diagnostics: &mut Diagnostics) -> HandlerResult {
    jump_compare(engine, instruction, diagnostics, |a, b| a > b)
}

pub fn jmp_ge(engine: &mut Engine, instruction: &Instruction, diagnostics: &mut Diagnostics) -> HandlerResult {
    jump_compare(engine, instruction, diagnostics, |a, b| a >= b)
}

pub fn jmp_lt(engine: &mut Engine, instruction: &Instruction, diagnostics: &mut Diagnostics) -> HandlerResult {
    jump_compare(engine, instruction, diagnostics, |a, b| a < b)
}

pub fn jmp_le(engine: &mut Engine, instruction: &Instruction, diagnostics: &mut Diagnostics) -> HandlerResult {
    jump_compare(engine, instruction, diagnostics, |a, b| a <= b)
}

/// CALL / CALL_L
/// 1. Fail if the invocation depth limit is reached
/// 2. Push a frame returning to the next instruction
/// 3. Jump to the offset
pub fn call(engine: &mut Engine, instruction: &Instruction, diagnostics: &mut Diagnostics) -> HandlerResult {
    let target = engine.call_relative(instruction, offset(instruction)?)?;
    let depth = engine.invocation_depth();
    diagnostics.note(|| format!("call {target}, depth {depth}"));
    Ok(())
}

/// RET
/// 1. Release the current frame's slots
/// 2. Resume at the return address, or halt when leaving the entry frame
pub fn ret(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    engine.return_from_frame()
}

pub fn abort(_: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    Err(RuntimeError::Abort(None))
}

/// ABORTMSG: pop a message and abort with it
pub fn abort_msg(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let message = message(engine.stack_mut().pop()?);
    Err(RuntimeError::Abort(Some(message)))
}

/// ASSERT: pop a boolean, fault when false
pub fn assert(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    if !engine.stack_mut().pop_bool()? {
        return Err(RuntimeError::AssertFailed(None));
    }
    Ok(())
}

/// ASSERTMSG: pop a message, then a boolean; fault with the message when false
pub fn assert_msg(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let message = message(engine.stack_mut().pop()?);
    if !engine.stack_mut().pop_bool()? {
        return Err(RuntimeError::AssertFailed(Some(message)));
    }
    Ok(())
}

/// THROW: pop a value and fault with it
pub fn throw(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let value = engine.stack_mut().pop()?;
    Err(RuntimeError::Throw(message(value)))
}

/// Opcodes that decode but have no runtime support
pub fn not_implemented(_: &mut Engine, instruction: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    Err(RuntimeError::NotImplemented(instruction.opcode))
}

fn message(value: Value) -> String {
    match value.get_string() {
        Ok(Some(text)) => text,
        _ => value.to_string(),
    }
}
