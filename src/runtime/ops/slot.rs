//! Slot operations: static fields, locals and arguments
//!
//! `LDxxx0`..`LDxxx6` and `STxxx0`..`STxxx6` encode the index in the opcode;
//! the plain forms (`LDLOC`, `STARG`, ...) carry it as a 1-byte operand.

use super::*;
use crate::parser::opcode::OpCode;
use crate::runtime::frame::Frame;
use crate::runtime::Slot;

#[derive(Clone, Copy)]
enum SlotKind {
    Static,
    Local,
    Argument,
}

impl SlotKind {
    fn name(self) -> &'static str {
        match self {
            SlotKind::Static => "static field",
            SlotKind::Local => "local",
            SlotKind::Argument => "argument",
        }
    }
}

fn slot_index(instruction: &Instruction, base: OpCode) -> Result<usize, RuntimeError> {
    if instruction.operand.size == 1 {
        Ok(instruction.operand.read_u8()? as usize)
    } else {
        Ok((instruction.opcode.byte() - base.byte()) as usize)
    }
}

fn frame_slot(frame: &Frame, kind: SlotKind) -> Option<&Slot> {
    match kind {
        SlotKind::Local => frame.locals.as_ref(),
        _ => frame.arguments.as_ref(),
    }
}

fn frame_slot_mut(frame: &mut Frame, kind: SlotKind) -> Option<&mut Slot> {
    match kind {
        SlotKind::Local => frame.locals.as_mut(),
        _ => frame.arguments.as_mut(),
    }
}

fn load(engine: &mut Engine, kind: SlotKind, index: usize) -> HandlerResult {
    let slot = match kind {
        SlotKind::Static => engine.static_fields(),
        _ => frame_slot(engine.current_frame()?, kind),
    };
    let value = slot.ok_or(RuntimeError::SlotNotInitialised(kind.name()))?.get(index)?;
    engine.stack_mut().push(value);
    Ok(())
}

fn store(engine: &mut Engine, kind: SlotKind, index: usize) -> HandlerResult {
    let value = engine.stack_mut().pop()?;
    let slot = match kind {
        SlotKind::Static => engine.static_fields_mut(),
        _ => frame_slot_mut(engine.current_frame_mut()?, kind),
    };
    slot.ok_or(RuntimeError::SlotNotInitialised(kind.name()))?.set(index, value)
}

/// INITSSLOT
/// 1. Fail if the count operand is zero
/// 2. Fail if static fields already exist
/// 3. Create `count` null static fields
pub fn init_sslot(engine: &mut Engine, instruction: &Instruction, diagnostics: &mut Diagnostics) -> HandlerResult {
    let count = instruction.operand.read_u8()? as usize;
    if count == 0 {
        return Err(RuntimeError::InvalidArgument("INITSSLOT count is zero".into()));
    }
    engine.init_static_fields(count)?;
    diagnostics.note(|| format!("{count} static fields"));
    Ok(())
}

/// INITSLOT
/// 1. Read the local count and the argument count; fail if both are zero
/// 2. Fail if the current frame already has slots
/// 3. Create null locals
/// 4. Pop one value per argument; the first popped becomes argument 0
pub fn init_slot(engine: &mut Engine, instruction: &Instruction, diagnostics: &mut Diagnostics) -> HandlerResult {
    let locals = instruction.operand.read_u8()? as usize;
    let arguments = instruction.operand.data.get(1).copied().unwrap_or(0) as usize;
    if locals == 0 && arguments == 0 {
        return Err(RuntimeError::InvalidArgument("INITSLOT counts are zero".into()));
    }
    {
        let frame = engine.current_frame()?;
        if frame.locals.is_some() || frame.arguments.is_some() {
            return Err(RuntimeError::SlotAlreadyInitialised("frame"));
        }
    }

    let mut values = Vec::with_capacity(arguments);
    for _ in 0..arguments {
        values.push(engine.stack_mut().pop()?);
    }
    let local_slot = (locals > 0).then(|| engine.new_slot(vec![Value::Null; locals]));
    let argument_slot = (arguments > 0).then(|| engine.new_slot(values));

    let frame = engine.current_frame_mut()?;
    frame.locals = local_slot;
    frame.arguments = argument_slot;
    diagnostics.note(|| format!("{locals} locals, {arguments} arguments"));
    Ok(())
}

pub fn ld_sfld(engine: &mut Engine, instruction: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    load(engine, SlotKind::Static, slot_index(instruction, OpCode::LdSFld0)?)
}

pub fn st_sfld(engine: &mut Engine, instruction: &Instruction, diagnostics: &mut Diagnostics) -> HandlerResult {
    let index = slot_index(instruction, OpCode::StSFld0)?;
    store(engine, SlotKind::Static, index)?;
    diagnostics.note(|| format!("static field {index}"));
    Ok(())
}

pub fn ld_loc(engine: &mut Engine, instruction: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    load(engine, SlotKind::Local, slot_index(instruction, OpCode::LdLoc0)?)
}

pub fn st_loc(engine: &mut Engine, instruction: &Instruction, diagnostics: &mut Diagnostics) -> HandlerResult {
    let index = slot_index(instruction, OpCode::StLoc0)?;
    store(engine, SlotKind::Local, index)?;
    diagnostics.note(|| format!("local {index}"));
    Ok(())
}

pub fn ld_arg(engine: &mut Engine, instruction: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    load(engine, SlotKind::Argument, slot_index(instruction, OpCode::LdArg0)?)
}

pub fn st_arg(engine: &mut Engine, instruction: &Instruction, diagnostics: &mut Diagnostics) -> HandlerResult {
    let index = slot_index(instruction, OpCode::StArg0)?;
    store(engine, SlotKind::Argument, index)?;
    diagnostics.note(|| format!("argument {index}"));
    Ok(())
}
