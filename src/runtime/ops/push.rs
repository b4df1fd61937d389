//! Constant push operations
//!
//! - `PUSHINT8`..`PUSHINT256`: signed little-endian immediate of 1..32 bytes
//! - `PUSHT`, `PUSHF`, `PUSHNULL`
//! - `PUSHDATA1/2/4`: length-prefixed byte string
//! - `PUSHM1`, `PUSH0`..`PUSH16`: small integers encoded in the opcode

use super::*;
use crate::parser::opcode::OpCode;
use crate::runtime::value::Integer;

/// PUSHINT8 .. PUSHINT256
/// 1. Decode the operand as a little-endian two's complement integer
/// 2. Push it
pub fn push_int(engine: &mut Engine, instruction: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let value = Integer::from_signed_bytes_le(&instruction.operand.data)?;
    engine.stack_mut().push(Value::from_integer(value));
    Ok(())
}

pub fn push_true(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    engine.stack_mut().push(Value::from_bool(true));
    Ok(())
}

pub fn push_false(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    engine.stack_mut().push(Value::from_bool(false));
    Ok(())
}

pub fn push_null(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    engine.stack_mut().push(Value::Null);
    Ok(())
}

/// PUSHDATA1 / PUSHDATA2 / PUSHDATA4
/// 1. Fail if the payload exceeds the item size limit
/// 2. Push the payload as a byte string
pub fn push_data(engine: &mut Engine, instruction: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let data = &instruction.operand.data;
    engine.check_item_size(data.len())?;
    engine.stack_mut().push(Value::from_bytes(data.as_slice()));
    Ok(())
}

/// PUSHM1, PUSH0 .. PUSH16
pub fn push_small_int(engine: &mut Engine, instruction: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let value = instruction.opcode.byte() as i64 - OpCode::Push0.byte() as i64;
    engine.stack_mut().push(Value::from_int(value));
    Ok(())
}
