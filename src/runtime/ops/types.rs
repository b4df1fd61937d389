//! Type inspection and conversion

use super::*;
use crate::runtime::value::StackItemType;

fn item_type_operand(instruction: &Instruction) -> Result<StackItemType, RuntimeError> {
    let tag = instruction.operand.read_u8()?;
    StackItemType::from_u8(tag)
        .ok_or_else(|| RuntimeError::InvalidArgument(format!("undefined item type 0x{tag:02x}")))
}

/// ISNULL: pop x, push whether it is null
pub fn is_null(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let x = stack.pop()?;
    stack.push(Value::from_bool(x.is_null()));
    Ok(())
}

/// ISTYPE
/// 1. Read the type tag operand; `Any` is not a valid tag here
/// 2. Pop x, push whether x has that type
pub fn is_type(engine: &mut Engine, instruction: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let item_type = item_type_operand(instruction)?;
    if item_type == StackItemType::Any {
        return Err(RuntimeError::InvalidArgument("ISTYPE cannot test for Any".into()));
    }
    let stack = engine.stack_mut();
    let x = stack.pop()?;
    stack.push(Value::from_bool(x.item_type() == item_type));
    Ok(())
}

/// CONVERT: pop x, push x converted to the operand's type
pub fn convert(engine: &mut Engine, instruction: &Instruction, diagnostics: &mut Diagnostics) -> HandlerResult {
    let item_type = item_type_operand(instruction)?;
    let stack = engine.stack_mut();
    let x = stack.pop()?;
    let from = x.item_type();
    stack.push(x.convert_to(item_type)?);
    diagnostics.note(|| format!("{from} -> {item_type}"));
    Ok(())
}
